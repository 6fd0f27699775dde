pub mod alert_routes;
pub mod metrics_routes;
pub mod resource_routes;
