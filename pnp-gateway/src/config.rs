use pnp_cache::CategoryTtls;
use pnp_core::{Axis, SafetyLimits};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Explicit configuration record enumerating every recognized option with a
/// default (spec §6, redesign: no dynamic duck-typed config objects).
/// Loaded from an optional YAML file, then overridden by a small set of
/// `PNP_*` environment variables for container deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub controller_host: String,
    pub controller_port: u16,
    pub controller_api_key: Option<String>,
    pub controller_timeout_ms: u64,
    pub rate_limit_default_budget: u32,
    pub credentials_store_path: Option<PathBuf>,
    pub task_preemption_grace_ms: u64,
    pub auth_failure_threshold: u32,
    pub auth_failure_window_secs: u64,
    /// Open Question 3: when true, `vacuum_on` with `vacuum_power == 0`
    /// forwards as `vacuum_off`; when false, it's rejected.
    pub vacuum_zero_is_off: bool,
    #[serde(default)]
    pub cache_ttls_per_category: CategoryTtlsConfig,
    #[serde(default)]
    pub safety_limits: SafetyLimitsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            controller_host: "127.0.0.1".to_string(),
            controller_port: 7125,
            controller_api_key: None,
            controller_timeout_ms: 5_000,
            rate_limit_default_budget: 100,
            credentials_store_path: None,
            task_preemption_grace_ms: 500,
            auth_failure_threshold: 10,
            auth_failure_window_secs: 60,
            vacuum_zero_is_off: true,
            cache_ttls_per_category: CategoryTtlsConfig::default(),
            safety_limits: SafetyLimitsConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
                serde_yaml::from_str(&content).map_err(|e| format!("parsing {}: {e}", path.display()))?
            }
            _ => GatewayConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PNP_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("PNP_CONTROLLER_HOST") {
            self.controller_host = v;
        }
        if let Ok(v) = std::env::var("PNP_CONTROLLER_PORT") {
            if let Ok(port) = v.parse() {
                self.controller_port = port;
            }
        }
        if let Ok(v) = std::env::var("PNP_CONTROLLER_API_KEY") {
            self.controller_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("PNP_CREDENTIALS_STORE_PATH") {
            self.credentials_store_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("PNP_VACUUM_ZERO_IS_OFF") {
            if let Ok(parsed) = v.parse() {
                self.vacuum_zero_is_off = parsed;
            }
        }
    }

    pub fn controller_timeout(&self) -> Duration {
        Duration::from_millis(self.controller_timeout_ms)
    }

    pub fn task_preemption_grace(&self) -> Duration {
        Duration::from_millis(self.task_preemption_grace_ms)
    }

    pub fn auth_failure_window(&self) -> Duration {
        Duration::from_secs(self.auth_failure_window_secs)
    }
}

/// Millisecond-based mirror of [`CategoryTtls`] so the YAML surface stays
/// plain integers instead of requiring a custom `Duration` deserializer.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CategoryTtlsConfig {
    pub positions_ms: u64,
    pub fans_ms: u64,
    pub pwm_ms: u64,
    pub gpio_ms: u64,
    pub sensors_ms: u64,
    pub system_ms: u64,
}

impl Default for CategoryTtlsConfig {
    fn default() -> Self {
        let defaults = CategoryTtls::default();
        Self {
            positions_ms: defaults.positions.as_millis() as u64,
            fans_ms: defaults.fans.as_millis() as u64,
            pwm_ms: defaults.pwm.as_millis() as u64,
            gpio_ms: defaults.gpio.as_millis() as u64,
            sensors_ms: defaults.sensors.as_millis() as u64,
            system_ms: defaults.system.as_millis() as u64,
        }
    }
}

impl From<CategoryTtlsConfig> for CategoryTtls {
    fn from(c: CategoryTtlsConfig) -> Self {
        CategoryTtls {
            positions: Duration::from_millis(c.positions_ms),
            fans: Duration::from_millis(c.fans_ms),
            pwm: Duration::from_millis(c.pwm_ms),
            gpio: Duration::from_millis(c.gpio_ms),
            sensors: Duration::from_millis(c.sensors_ms),
            system: Duration::from_millis(c.system_ms),
        }
    }
}

/// Plain-YAML mirror of [`SafetyLimits`] — axis bounds keyed by lowercase
/// axis letter instead of the `Axis` enum, so the config surface is just
/// strings and numbers (spec §6, redesign guidance against duck-typed
/// config objects cuts both ways: explicit fields, but still plain data).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyLimitsConfig {
    pub axis_min: HashMap<String, f64>,
    pub axis_max: HashMap<String, f64>,
    pub max_feedrate: f64,
    pub pwm_min: f64,
    pub pwm_max: f64,
    pub max_feed_distance: f64,
    pub max_feed_speed: Option<f64>,
    pub require_homed_before_move: bool,
    pub gpio_allow_list: Option<HashSet<String>>,
    pub known_sensors: HashSet<String>,
}

impl Default for SafetyLimitsConfig {
    fn default() -> Self {
        let defaults = SafetyLimits::default();
        Self {
            axis_min: defaults.axis_min.iter().map(|(axis, v)| (axis.as_str().to_string(), *v)).collect(),
            axis_max: defaults.axis_max.iter().map(|(axis, v)| (axis.as_str().to_string(), *v)).collect(),
            max_feedrate: defaults.max_feedrate,
            pwm_min: defaults.pwm_min,
            pwm_max: defaults.pwm_max,
            max_feed_distance: defaults.max_feed_distance,
            max_feed_speed: defaults.max_feed_speed,
            require_homed_before_move: defaults.require_homed_before_move,
            gpio_allow_list: defaults.gpio_allow_list,
            known_sensors: defaults.known_sensors,
        }
    }
}

impl From<SafetyLimitsConfig> for SafetyLimits {
    fn from(c: SafetyLimitsConfig) -> Self {
        let parse_axis_map = |map: HashMap<String, f64>| -> HashMap<Axis, f64> {
            map.into_iter().filter_map(|(k, v)| Axis::parse(&k).map(|axis| (axis, v))).collect()
        };
        SafetyLimits {
            axis_min: parse_axis_map(c.axis_min),
            axis_max: parse_axis_map(c.axis_max),
            max_feedrate: c.max_feedrate,
            pwm_min: c.pwm_min,
            pwm_max: c.pwm_max,
            max_feed_distance: c.max_feed_distance,
            max_feed_speed: c.max_feed_speed,
            require_homed_before_move: c.require_homed_before_move,
            gpio_allow_list: c.gpio_allow_list,
            known_sensors: c.known_sensors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_used_when_no_file_given() {
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.controller_port, 7125);
        assert_eq!(config.rate_limit_default_budget, 100);
    }

    #[test]
    fn missing_file_falls_back_to_defaults_rather_than_erroring() {
        let config = GatewayConfig::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn parses_a_yaml_override_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("pnp-gateway-test-config.yaml");
        std::fs::write(&path, "bind_addr: \"127.0.0.1:9090\"\ncontroller_port: 1234\n").unwrap();
        let config = GatewayConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.controller_port, 1234);
    }
}
