use serde::{Deserialize, Serialize};

/// Identity and topology settings for the published device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    /// Host-visible device name
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Model identifier used for host matching
    #[serde(default = "default_model_uid")]
    pub model_uid: String,

    /// Manufacturer string published alongside the device
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Number of ports the device starts with (must be at least 1)
    #[serde(default = "default_initial_ports")]
    pub initial_ports: u32,
}

fn default_device_name() -> String {
    "MidibusDevice".to_string()
}

fn default_model_uid() -> String {
    format!("{}-Model", default_device_name())
}

fn default_manufacturer() -> String {
    "Midibus".to_string()
}

fn default_initial_ports() -> u32 {
    1
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            model_uid: default_model_uid(),
            manufacturer: default_manufacturer(),
            initial_ports: default_initial_ports(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity() {
        let config = DriverConfig::default();
        assert_eq!(config.device_name, "MidibusDevice");
        assert_eq!(config.model_uid, "MidibusDevice-Model");
        assert_eq!(config.initial_ports, 1);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DriverConfig =
            serde_json::from_value(serde_json::json!({ "initial_ports": 3 })).unwrap();
        assert_eq!(config.initial_ports, 3);
        assert_eq!(config.device_name, "MidibusDevice");
    }
}
