/// Configuration management for the club service
///
/// Loads configuration from environment variables.
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Blob store settings
    pub blob: BlobConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
}

/// Blob store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Path prefix for club cover images
    #[serde(default = "default_covers_prefix")]
    pub covers_prefix: String,
}

fn default_covers_prefix() -> String {
    "club_covers".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let blob = BlobConfig {
            covers_prefix: std::env::var("CLUB_COVERS_PREFIX")
                .unwrap_or_else(|_| default_covers_prefix()),
        };

        Ok(Config { app, blob })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                env: "development".to_string(),
            },
            blob: BlobConfig {
                covers_prefix: default_covers_prefix(),
            },
        }
    }
}
