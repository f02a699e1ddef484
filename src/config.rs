//! Configuration management for the engine
//!
//! Provides TOML configuration file support with environment variable
//! overrides and sensible defaults. The defaults reproduce the simulated
//! backend the engine ships with: 100-1000 ms delivery latency and a
//! multi-year hourly synthetic series.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Simulated delivery latency
    #[serde(default)]
    pub latency: LatencyConfig,

    /// Synthetic series generator
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Coordinator policy
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Simulated delivery latency configuration
///
/// Each summary response is delivered after a delay drawn uniformly from
/// `[min_delay_ms, max_delay_ms]`. This is the sole source of response
/// reordering in the system; setting both bounds to 0 makes delivery order
/// match issue order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatencyConfig {
    /// Minimum delivery delay in milliseconds
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Maximum delivery delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Synthetic series generator configuration
///
/// The generator produces a bounded random walk whose slope re-derives at
/// every trend period, plus additive uniform noise. Only strict time
/// ordering is contractual; the shape knobs exist so demos look plausible.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// First sample timestamp in epoch milliseconds.
    /// `None` means 2010-06-01T00:00:00Z.
    #[serde(default)]
    pub start_ms: Option<i64>,

    /// Last sample timestamp in epoch milliseconds.
    /// `None` means five days before now.
    #[serde(default)]
    pub end_ms: Option<i64>,

    /// Sample spacing in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: i64,

    /// How long one trend slope lasts in milliseconds
    #[serde(default = "default_trend_period_ms")]
    pub trend_period_ms: i64,

    /// Lower bound the walk reflects off
    #[serde(default = "default_value_min")]
    pub value_min: f64,

    /// Upper bound the walk reflects off
    #[serde(default = "default_value_max")]
    pub value_max: f64,

    /// Amplitude of the additive uniform noise
    #[serde(default = "default_noise_amplitude")]
    pub noise_amplitude: f64,

    /// RNG seed; `None` seeds from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Coordinator policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Downsampling density: one bucket per this many pixels of chart
    /// width, so `bucket_count = pixel_width / points_per_pixel`
    #[serde(default = "default_points_per_pixel")]
    pub points_per_pixel: u32,

    /// Whether summaries carry per-bucket extrema in addition to the mean
    #[serde(default = "default_true")]
    pub include_min_max: bool,

    /// Buffer size of the notification broadcast channels
    #[serde(default = "default_channel_buffer_size")]
    pub channel_buffer_size: usize,
}

// Default value functions
fn default_min_delay_ms() -> u64 { 100 }
fn default_max_delay_ms() -> u64 { 1000 }
fn default_sample_interval_ms() -> i64 { 3_600_000 } // 1 hour
fn default_trend_period_ms() -> i64 { 37 * 24 * 3_600_000 } // 37 days
fn default_value_min() -> f64 { 0.0 }
fn default_value_max() -> f64 { 1000.0 }
fn default_noise_amplitude() -> f64 { 500.0 }
fn default_points_per_pixel() -> u32 { 2 }
fn default_channel_buffer_size() -> usize { 16 }
fn default_true() -> bool { true }

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl LatencyConfig {
    /// Zero-delay configuration for deterministic delivery order
    pub fn immediate() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_ms: None,
            end_ms: None,
            sample_interval_ms: default_sample_interval_ms(),
            trend_period_ms: default_trend_period_ms(),
            value_min: default_value_min(),
            value_max: default_value_max(),
            noise_amplitude: default_noise_amplitude(),
            seed: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            points_per_pixel: default_points_per_pixel(),
            include_min_max: default_true(),
            channel_buffer_size: default_channel_buffer_size(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration from a TOML file with environment overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GRAPHSOURCE_MIN_DELAY_MS") {
            if let Ok(ms) = v.parse() {
                self.latency.min_delay_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("GRAPHSOURCE_MAX_DELAY_MS") {
            if let Ok(ms) = v.parse() {
                self.latency.max_delay_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("GRAPHSOURCE_POINTS_PER_PIXEL") {
            if let Ok(ppp) = v.parse() {
                self.provider.points_per_pixel = ppp;
            }
        }
        if let Ok(v) = std::env::var("GRAPHSOURCE_SEED") {
            if let Ok(seed) = v.parse() {
                self.generator.seed = Some(seed);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.latency.max_delay_ms < self.latency.min_delay_ms {
            return Err(format!(
                "max_delay_ms {} is below min_delay_ms {}",
                self.latency.max_delay_ms, self.latency.min_delay_ms
            ));
        }

        if self.generator.sample_interval_ms <= 0 {
            return Err("sample_interval_ms must be > 0".to_string());
        }
        if self.generator.trend_period_ms <= 0 {
            return Err("trend_period_ms must be > 0".to_string());
        }
        if self.generator.value_max <= self.generator.value_min {
            return Err("value_max must be above value_min".to_string());
        }
        if let (Some(start), Some(end)) = (self.generator.start_ms, self.generator.end_ms) {
            if end <= start {
                return Err("generator end_ms must be after start_ms".to_string());
            }
        }

        if self.provider.points_per_pixel == 0 {
            return Err("points_per_pixel must be > 0".to_string());
        }
        if self.provider.channel_buffer_size == 0 {
            return Err("channel_buffer_size must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.latency.min_delay_ms, 100);
        assert_eq!(config.latency.max_delay_ms, 1000);
        assert_eq!(config.provider.points_per_pixel, 2);
        assert!(config.provider.include_min_max);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_delay_range() {
        let mut config = Config::default();
        config.latency.min_delay_ms = 500;
        config.latency.max_delay_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_generator_bounds() {
        let mut config = Config::default();
        config.generator.value_max = config.generator.value_min;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [latency]
            min_delay_ms = 0
            max_delay_ms = 0

            [provider]
            points_per_pixel = 4
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.latency.max_delay_ms, 0);
        assert_eq!(config.provider.points_per_pixel, 4);
        // Unspecified sections fall back to defaults
        assert_eq!(config.generator.sample_interval_ms, 3_600_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("GRAPHSOURCE_POINTS_PER_PIXEL", "8");
        let config = Config::from_env();
        assert_eq!(config.provider.points_per_pixel, 8);
        std::env::remove_var("GRAPHSOURCE_POINTS_PER_PIXEL");
    }
}
