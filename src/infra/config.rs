//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Only collaborator knobs live here (pins, endpoint, display, metrics).
//! The debounce and cooldown windows are compile-time constants in
//! `services::report_gate` / `services::monitor` and are deliberately not
//! configurable at runtime.

use crate::domain::types::SENSOR_COUNT;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique site identifier (e.g., "lot-north")
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

fn default_site_id() -> String {
    "parkwatch".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    /// Sysfs GPIO numbers wired to the beam sensors, slot order.
    /// Must list exactly one pin per slot.
    pub gpio_pins: Vec<u32>,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self { gpio_pins: default_gpio_pins() }
    }
}

fn default_gpio_pins() -> Vec<u32> {
    // Pin map of the reference lot controller board
    vec![13, 4, 14, 27, 26, 25, 33, 32]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_url")]
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_telemetry_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_telemetry_url() -> String {
    "https://api.thingspeak.com/update".to_string()
}

fn default_telemetry_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_enabled")]
    pub enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { enabled: default_display_enabled() }
    }
}

fn default_display_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
    /// Prometheus metrics HTTP port (0 to disable)
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

fn default_metrics_interval_secs() -> u64 {
    10
}

fn default_prometheus_port() -> u16 {
    9464
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    gpio_pins: Vec<u32>,
    telemetry_url: String,
    telemetry_api_key: String,
    telemetry_timeout_ms: u64,
    display_enabled: bool,
    metrics_interval_secs: u64,
    prometheus_port: u16,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            gpio_pins: default_gpio_pins(),
            telemetry_url: default_telemetry_url(),
            telemetry_api_key: String::new(),
            telemetry_timeout_ms: default_telemetry_timeout_ms(),
            display_enabled: true,
            metrics_interval_secs: default_metrics_interval_secs(),
            prometheus_port: default_prometheus_port(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from the environment, default path otherwise
    pub fn resolve_config_path() -> String {
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        anyhow::ensure!(
            toml_config.sensors.gpio_pins.len() == SENSOR_COUNT,
            "sensors.gpio_pins must list exactly {} pins, got {}",
            SENSOR_COUNT,
            toml_config.sensors.gpio_pins.len()
        );

        Ok(Self {
            site_id: toml_config.site.id,
            gpio_pins: toml_config.sensors.gpio_pins,
            telemetry_url: toml_config.telemetry.url,
            telemetry_api_key: toml_config.telemetry.api_key,
            telemetry_timeout_ms: toml_config.telemetry.timeout_ms,
            display_enabled: toml_config.display.enabled,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            prometheus_port: toml_config.metrics.prometheus_port,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn gpio_pins(&self) -> &[u32] {
        &self.gpio_pins
    }

    pub fn telemetry_url(&self) -> &str {
        &self.telemetry_url
    }

    pub fn telemetry_api_key(&self) -> &str {
        &self.telemetry_api_key
    }

    pub fn telemetry_timeout_ms(&self) -> u64 {
        self.telemetry_timeout_ms
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn prometheus_port(&self) -> u16 {
        self.prometheus_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
