use serde::{Deserialize, Serialize};

use crate::probe::{Category, UNDETERMINED};

/// Hostname recorded when the lookup fails.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// The classification of one process. Field order is the serialized key
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub hostname: String,
    pub id: String,
    pub image_format: String,
    pub pid: u32,
    pub runtime: String,
    pub scheduler: String,
}

impl Inventory {
    /// Nothing determined. Only the pid is real.
    pub fn fallback() -> Self {
        Self {
            hostname: UNKNOWN_HOSTNAME.to_string(),
            id: UNDETERMINED.to_string(),
            image_format: UNDETERMINED.to_string(),
            pid: std::process::id(),
            runtime: UNDETERMINED.to_string(),
            scheduler: UNDETERMINED.to_string(),
        }
    }

    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Runtime => &self.runtime,
            Category::Scheduler => &self.scheduler,
            Category::ImageFormat => &self.image_format,
        }
    }

    pub fn is_determined(&self, category: Category) -> bool {
        self.get(category) != UNDETERMINED
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("inventory is plain strings and integers")
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).expect("inventory is plain strings and integers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Inventory {
        Inventory {
            hostname: "web-01".to_string(),
            id: "abc123".to_string(),
            image_format: "docker".to_string(),
            pid: 42,
            runtime: "docker".to_string(),
            scheduler: UNDETERMINED.to_string(),
        }
    }

    #[test]
    fn test_fallback() {
        let inventory = Inventory::fallback();
        assert_eq!(inventory.pid, std::process::id());
        assert_eq!(inventory.hostname, "unknown");
        for category in Category::ALL {
            assert!(!inventory.is_determined(category));
        }
    }

    #[test]
    fn test_json_key_order() {
        let json = sample().to_json();
        let expected = r#"{
  "hostname": "web-01",
  "id": "abc123",
  "image_format": "docker",
  "pid": 42,
  "runtime": "docker",
  "scheduler": "undetermined"
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_yaml() {
        let yaml = sample().to_yaml();
        assert!(yaml.starts_with("hostname: web-01\n"));
        assert!(yaml.contains("pid: 42\n"));
        assert!(yaml.contains("scheduler: undetermined\n"));
    }

    #[test]
    fn test_get_by_category() {
        let inventory = sample();
        assert_eq!(inventory.get(Category::Runtime), "docker");
        assert!(inventory.is_determined(Category::ImageFormat));
        assert!(!inventory.is_determined(Category::Scheduler));
    }
}
