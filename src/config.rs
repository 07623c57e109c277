//! Configuration management with YAML support

use anyhow::Result;
use chrono::{Datelike, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::coco::Info;
use crate::split::{AnnotationKey, SplitRatios};

/// Environment variable overriding `database.path`
pub const DATABASE_ENV: &str = "COCOSTORE_DATABASE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Default train/val/test split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_ratio")]
    pub test_ratio: f64,

    #[serde(default = "default_ratio")]
    pub val_ratio: f64,

    /// Fixed seed for reproducible splits
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub annotation_key: AnnotationKey,
}

/// Values for the `info` block of exported files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Defaults to the current year
    #[serde(default)]
    pub year: Option<String>,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub contributor: String,

    #[serde(default)]
    pub url: String,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/cocostore/cocostore.db".to_string()
}

fn default_ratio() -> f64 {
    0.2
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: default_ratio(),
            val_ratio: default_ratio(),
            seed: None,
            annotation_key: AnnotationKey::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            year: None,
            version: default_version(),
            contributor: String::new(),
            url: String::new(),
        }
    }
}

impl SplitConfig {
    pub fn ratios(&self) -> SplitRatios {
        SplitRatios {
            test: self.test_ratio,
            val: self.val_ratio,
        }
    }
}

impl ExportConfig {
    /// Build the `info` block for one output file, stamped with the local time
    pub fn info(&self, description: &str) -> Info {
        let now = Local::now();
        Info {
            year: self
                .year
                .clone()
                .unwrap_or_else(|| now.year().to_string()),
            version: self.version.clone(),
            description: description.to_string(),
            contributor: self.contributor.clone(),
            url: self.url.clone(),
            date_created: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./cocostore.yaml (current directory)
    /// 3. ~/.config/cocostore/cocostore.yaml
    ///
    /// `COCOSTORE_DATABASE` (also read from a `.env` file) overrides the
    /// database path.
    pub fn load(path: &str) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "cocostore.yaml".to_string(),
            shellexpand::tilde("~/.config/cocostore/cocostore.yaml").to_string(),
        ];

        let mut config = Config::default();
        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                debug!("loading config from {}", search_path);
                let content = std::fs::read_to_string(search_path)?;
                config = serde_yaml::from_str(&content)?;
                break;
            }
        }

        if let Ok(database) = std::env::var(DATABASE_ENV) {
            config.database.path = database;
        }

        Ok(config)
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }
}
