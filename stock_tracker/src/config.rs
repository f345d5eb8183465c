//! Product catalogue and watch list configuration
//!
//! Loaded from a JSON file when `--config` is given, otherwise the built-in
//! catalogue below is used.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stock_common::{Product, ProductLayout, Vendor};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub products: Vec<Product>,
    /// Regular expressions matched against `"<product>: <item>"`
    #[serde(default)]
    pub watch: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            products: default_products(),
            watch: DEFAULT_WATCH_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Config {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;

        if config.products.is_empty() {
            return Err(TrackerError::Config(format!(
                "{}: no products configured",
                path.display()
            )));
        }

        log::info!(
            "Loaded {} products and {} watch terms from {}",
            config.products.len(),
            config.watch.len(),
            path.display()
        );
        Ok(config)
    }

    /// Config file when given, built-in catalogue otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                log::debug!("No config file given, using built-in product list");
                Ok(Self::default())
            }
        }
    }
}

const DEFAULT_WATCH_TERMS: [&str; 6] = [
    r"Rogue Ohio Power Bar 45LB",
    r"Rogue (Fleck|Color).*(10|25|45|55)LB",
    r"Rogue Echo Bumper Plate v2: (10|25|45)LB",
    r": (1\.25|2\.5|5|45)LB Rogue Olympic",
    r"Rep Fitness Iron.*45lb",
    r"PR 1100",
];

fn default_products() -> Vec<Product> {
    use ProductLayout::{Multi, Single};
    use Vendor::{RepFitness, Rogue};

    vec![
        Product::new(
            "Rogue Olympic Plates",
            "https://www.roguefitness.com/rogue-olympic-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Deep Dish Plates",
            "https://www.roguefitness.com/rogue-deep-dish-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Steel Plates",
            "https://www.roguefitness.com/rogue-calibrated-lb-steel-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue HG Bumper Plates",
            "https://www.roguefitness.com/rogue-hg-2-0-bumper-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Fleck Plates",
            "https://www.roguefitness.com/rogue-fleck-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Echo Bumper Plate v2",
            "https://www.roguefitness.com/rogue-echo-bumper-plates-with-white-text",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Color Echo Bumper Plates",
            "https://www.roguefitness.com/rogue-color-echo-bumper-plate",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Mil Spec Bumper Plates",
            "https://www.roguefitness.com/rogue-us-mil-sprc-bumper-plates",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Mil Spec Echo Bumper Plates",
            "https://www.roguefitness.com/rogue-mil-echo-bumper-plates-black",
            Rogue,
            Multi,
        ),
        Product::new(
            "Rogue Ohio Power Bar Stainless Steel",
            "https://www.roguefitness.com/rogue-45lb-ohio-power-bar-stainless",
            Rogue,
            Single,
        ),
        Product::new(
            "Rep Fitness Iron Plates",
            "https://www.repfitness.com/bars-plates/olympic-plates/iron-plates/rep-iron-plates",
            RepFitness,
            Multi,
        ),
        Product::new(
            "Rep Fitness Black Bumper Plates",
            "https://www.repfitness.com/bars-plates/olympic-plates/bumper-plates/rep-black-bumper-plates",
            RepFitness,
            Multi,
        ),
        Product::new(
            "Rep Fitness Color Bumper Plates",
            "https://www.repfitness.com/bars-plates/olympic-plates/rep-color-bumper-plates",
            RepFitness,
            Multi,
        ),
        Product::new(
            "Rep Fitness PR 1100",
            "https://www.repfitness.com/strength-equipment/power-racks/rep-pr-1100",
            RepFitness,
            Single,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn default_catalogue_has_unique_fixture_names() {
        let config = Config::default();
        let names: HashSet<String> = config.products.iter().map(|p| p.test_file_name()).collect();
        assert_eq!(names.len(), config.products.len());
        assert_eq!(config.watch.len(), 6);
    }

    #[test]
    fn load_reads_products_and_watch_terms() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "products": [
                    {"name": "Rogue Fleck Plates", "url": "https://www.roguefitness.com/rogue-fleck-plates",
                     "vendor": "Rogue", "layout": "script"}
                ],
                "watch": ["Fleck.*45LB"]
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.products[0].layout, ProductLayout::Script);
        assert_eq!(config.products[0].vendor, Vendor::Rogue);
        assert_eq!(config.watch, vec!["Fleck.*45LB".to_string()]);
    }

    #[test]
    fn watch_defaults_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"products": [{"name": "P", "url": "https://x/p", "vendor": "RepFitness", "layout": "single"}]}"#,
        )
        .unwrap();

        assert!(Config::load(&path).unwrap().watch.is_empty());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"products": [{"name": "P", "vendor": "Titan"}]}"#).unwrap();

        assert!(matches!(Config::load(&path), Err(TrackerError::Config(_))));
    }

    #[test]
    fn empty_product_list_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"products": []}"#).unwrap();

        assert!(matches!(Config::load(&path), Err(TrackerError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }

    #[test]
    fn no_path_uses_defaults() {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
