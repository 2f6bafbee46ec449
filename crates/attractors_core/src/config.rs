//! Serializable defaults for region computations and preset catalogs.

use crate::engine::{self, Window};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters of a multi-origin region computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
    /// Iterations attempted from each origin.
    pub points_per_origin: usize,
    pub origin_count: usize,
    pub worker_count: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            xlim: (-2.0, 2.0),
            ylim: (-2.0, 2.0),
            points_per_origin: 1_000_000,
            origin_count: 4,
            worker_count: 8,
        }
    }
}

impl RegionConfig {
    pub fn window(&self) -> engine::Result<Window> {
        Window::new(self.xlim, self.ylim)
    }
}

/// Where a preset catalog is read from and written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub data_folder: PathBuf,
    pub input_file: String,
    pub output_file: String,
}

/// File name of the catalog that ships with the crate. Saving over it is refused.
pub const DEFAULT_CATALOG_FILE: &str = "attractors.json";

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"),
            input_file: DEFAULT_CATALOG_FILE.to_string(),
            output_file: "saved_attractors.json".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn input_path(&self) -> PathBuf {
        self.data_folder.join(&self.input_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_folder.join(&self.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RegionConfig =
            serde_json::from_str(r#"{"xlim": [-1.0, 1.0], "origin_count": 12}"#).unwrap();
        assert_eq!(config.xlim, (-1.0, 1.0));
        assert_eq!(config.ylim, (-2.0, 2.0));
        assert_eq!(config.origin_count, 12);
        assert_eq!(config.points_per_origin, 1_000_000);
        assert_eq!(config.worker_count, 8);
    }

    #[test]
    fn inverted_limits_surface_when_building_the_window() {
        let config = RegionConfig {
            ylim: (1.0, -1.0),
            ..RegionConfig::default()
        };
        assert!(config.window().is_err());
        assert!(RegionConfig::default().window().is_ok());
    }

    #[test]
    fn catalog_paths_live_in_the_data_folder() {
        let config = CatalogConfig {
            data_folder: PathBuf::from("/tmp/presets"),
            ..CatalogConfig::default()
        };
        assert_eq!(config.input_path(), PathBuf::from("/tmp/presets/attractors.json"));
        assert_eq!(
            config.output_path(),
            PathBuf::from("/tmp/presets/saved_attractors.json")
        );
    }
}
