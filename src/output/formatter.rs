use crate::cli::OutputFormat;

use super::Inventory;

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format(inventory: &Inventory, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => inventory.to_json(),
            OutputFormat::Yaml => inventory.to_yaml(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trips() {
        let inventory = Inventory::fallback();
        let text = OutputFormatter::format(&inventory, OutputFormat::Json);
        let parsed: Inventory = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, inventory);
    }

    #[test]
    fn test_yaml_round_trips() {
        let inventory = Inventory::fallback();
        let text = OutputFormatter::format(&inventory, OutputFormat::Yaml);
        let parsed: Inventory = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed, inventory);
    }
}
