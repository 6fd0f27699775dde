//! Owned Prometheus registry for per-resource gauge readings. Constructed at
//! startup and passed to the components that publish or clear readings; there
//! is no process-global registry.

use prometheus::{opts, Encoder, GaugeVec, Registry, TextEncoder};

use crate::db::models::{NewMetricSample, Resource};

const LABELS: &[&str] = &["resource_id", "resource_name", "ip_address"];

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    cpu_usage: GaugeVec,
    memory_usage: GaugeVec,
    disk_usage: GaugeVec,
    network_in: GaugeVec,
    network_out: GaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cpu_usage = GaugeVec::new(
            opts!("opspro_cpu_usage_percent", "CPU usage percentage"),
            LABELS,
        )?;
        let memory_usage = GaugeVec::new(
            opts!("opspro_memory_usage_percent", "Memory usage percentage"),
            LABELS,
        )?;
        let disk_usage = GaugeVec::new(
            opts!("opspro_disk_usage_percent", "Disk usage percentage"),
            LABELS,
        )?;
        let network_in = GaugeVec::new(
            opts!("opspro_network_in_mb", "Network incoming traffic (MB/s)"),
            LABELS,
        )?;
        let network_out = GaugeVec::new(
            opts!("opspro_network_out_mb", "Network outgoing traffic (MB/s)"),
            LABELS,
        )?;

        registry.register(Box::new(cpu_usage.clone()))?;
        registry.register(Box::new(memory_usage.clone()))?;
        registry.register(Box::new(disk_usage.clone()))?;
        registry.register(Box::new(network_in.clone()))?;
        registry.register(Box::new(network_out.clone()))?;

        Ok(MetricsRegistry {
            registry,
            cpu_usage,
            memory_usage,
            disk_usage,
            network_in,
            network_out,
        })
    }

    fn label_values(resource: &Resource) -> [String; 3] {
        [
            resource.id.to_string(),
            resource.name.clone(),
            resource.ip_address.clone().unwrap_or_default(),
        ]
    }

    /// Publishes the latest readings for one resource.
    pub fn publish(&self, resource: &Resource, sample: &NewMetricSample) {
        let values = Self::label_values(resource);
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        self.cpu_usage.with_label_values(&labels).set(sample.cpu_usage);
        self.memory_usage
            .with_label_values(&labels)
            .set(sample.memory_usage);
        self.disk_usage
            .with_label_values(&labels)
            .set(sample.disk_usage);
        self.network_in
            .with_label_values(&labels)
            .set(sample.network_in);
        self.network_out
            .with_label_values(&labels)
            .set(sample.network_out);
    }

    /// Drops all readings for a decommissioned resource.
    pub fn clear_resource(&self, resource: &Resource) {
        let values = Self::label_values(resource);
        let labels: Vec<&str> = values.iter().map(String::as_str).collect();

        let _ = self.cpu_usage.remove_label_values(&labels);
        let _ = self.memory_usage.remove_label_values(&labels);
        let _ = self.disk_usage.remove_label_values(&labels);
        let _ = self.network_in.remove_label_values(&labels);
        let _ = self.network_out.remove_label_values(&labels);
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn resource() -> Resource {
        Resource {
            id: 7,
            name: "web-01".to_string(),
            ip_address: Some("10.0.0.5".to_string()),
            hostname: None,
            cpu_cores: None,
            memory_gb: None,
            disk_gb: None,
            os_type: None,
            os_version: None,
            status: "active".to_string(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            encrypted_password: None,
            encrypted_private_key: None,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_seen: None,
        }
    }

    #[test]
    fn test_publish_and_clear() {
        let registry = MetricsRegistry::new().unwrap();
        let resource = resource();
        let sample = NewMetricSample {
            cpu_usage: 42.5,
            memory_usage: 60.0,
            disk_usage: 10.0,
            network_in: 1.5,
            network_out: 0.5,
        };

        registry.publish(&resource, &sample);
        let rendered = registry.render();
        assert!(rendered.contains("opspro_cpu_usage_percent"));
        assert!(rendered.contains("web-01"));
        assert!(rendered.contains("42.5"));

        registry.clear_resource(&resource);
        assert!(!registry.render().contains("web-01"));
    }
}
