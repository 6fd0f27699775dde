pub mod agent;
pub mod alerting;
pub mod config;
pub mod db;
pub mod monitoring;
pub mod orchestrator;
pub mod probe;
pub mod services;
pub mod web;
