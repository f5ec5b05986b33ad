//! Simulation configuration resource.
//!
//! Tuning values for the tick pipeline, loaded from an INI file on top of
//! safe defaults. Velocities and gravity are expressed per *tick*, so the
//! physics feel does not change with the tick rate's millisecond length.
//!
//! # Configuration File Format
//!
//! ```ini
//! [simulation]
//! tick_rate = 60
//! time_scale = 1.0
//!
//! [physics]
//! gravity = 0.2
//! max_fall_speed = 6.0
//! settle_epsilon = 0.05
//!
//! [scripting]
//! max_publish_depth = 100
//! max_deliveries_per_tick = 10000
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

const DEFAULT_TICK_RATE: u32 = 60;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_GRAVITY: f32 = 0.2;
const DEFAULT_MAX_FALL_SPEED: f32 = 6.0;
const DEFAULT_SETTLE_EPSILON: f32 = 0.05;
const DEFAULT_MAX_PUBLISH_DEPTH: usize = 100;
const DEFAULT_MAX_DELIVERIES_PER_TICK: usize = 10_000;
const DEFAULT_CONFIG_PATH: &str = "./doodads.ini";

#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    pub time_scale: f32,
    /// Downward acceleration in pixels per tick squared.
    pub gravity: f32,
    /// Terminal fall speed in pixels per tick.
    pub max_fall_speed: f32,
    /// Movement below this (pixels per tick) counts as settled.
    pub settle_epsilon: f32,
    /// Nested publish depth beyond which deliveries are dropped.
    pub max_publish_depth: usize,
    /// Upper bound on message deliveries within one tick.
    pub max_deliveries_per_tick: usize,
    pub config_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            time_scale: DEFAULT_TIME_SCALE,
            gravity: DEFAULT_GRAVITY,
            max_fall_speed: DEFAULT_MAX_FALL_SPEED,
            settle_epsilon: DEFAULT_SETTLE_EPSILON,
            max_publish_depth: DEFAULT_MAX_PUBLISH_DEPTH,
            max_deliveries_per_tick: DEFAULT_MAX_DELIVERIES_PER_TICK,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration that loads from a custom file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Nominal tick length in milliseconds.
    pub fn tick_ms(&self) -> f32 {
        1000.0 / self.tick_rate.max(1) as f32
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        info!(
            "Loaded config: tick_rate={}, gravity={}, max_fall_speed={}, settle_epsilon={}, max_publish_depth={}",
            self.tick_rate,
            self.gravity,
            self.max_fall_speed,
            self.settle_epsilon,
            self.max_publish_depth
        );
        Ok(())
    }

    /// Apply overrides from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [simulation] section
        match read_uint::<u32>(config, "simulation", "tick_rate") {
            Some(0) => warn!("tick_rate must be positive; keeping {}", self.tick_rate),
            Some(rate) => self.tick_rate = rate,
            None => {}
        }
        if let Some(scale) = config.getfloat("simulation", "time_scale").ok().flatten() {
            self.time_scale = scale as f32;
        }

        // [physics] section
        if let Some(gravity) = config.getfloat("physics", "gravity").ok().flatten() {
            self.gravity = gravity as f32;
        }
        if let Some(max_fall) = config.getfloat("physics", "max_fall_speed").ok().flatten() {
            self.max_fall_speed = max_fall as f32;
        }
        if let Some(eps) = config.getfloat("physics", "settle_epsilon").ok().flatten() {
            self.settle_epsilon = eps as f32;
        }

        // [scripting] section
        if let Some(depth) = read_uint(config, "scripting", "max_publish_depth") {
            self.max_publish_depth = depth;
        }
        if let Some(budget) = read_uint(config, "scripting", "max_deliveries_per_tick") {
            self.max_deliveries_per_tick = budget;
        }
    }

    /// Save configuration to the INI file.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set("simulation", "tick_rate", Some(self.tick_rate.to_string()));
        config.set("simulation", "time_scale", Some(self.time_scale.to_string()));

        config.set("physics", "gravity", Some(self.gravity.to_string()));
        config.set("physics", "max_fall_speed", Some(self.max_fall_speed.to_string()));
        config.set("physics", "settle_epsilon", Some(self.settle_epsilon.to_string()));

        config.set(
            "scripting",
            "max_publish_depth",
            Some(self.max_publish_depth.to_string()),
        );
        config.set(
            "scripting",
            "max_deliveries_per_tick",
            Some(self.max_deliveries_per_tick.to_string()),
        );

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

/// Read an unsigned key, warning about values that are not integers or do
/// not fit `T`. Such values are ignored.
fn read_uint<T: TryFrom<u64>>(config: &Ini, section: &str, key: &str) -> Option<T> {
    match config.getuint(section, key) {
        Ok(Some(value)) => match T::try_from(value) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("[{}] {} = {} is out of range; ignored", section, key, value);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("[{}] {}: {}; ignored", section, key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platformer_balance() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.tick_rate, 60);
        assert_eq!(cfg.gravity, 0.2);
        assert_eq!(cfg.max_fall_speed, 6.0);
        assert_eq!(cfg.max_publish_depth, 100);
        assert_eq!(cfg.max_deliveries_per_tick, 10_000);
        assert!((cfg.tick_ms() - 16.666_666).abs() < 1e-3);
    }

    #[test]
    fn ini_overrides_only_present_keys() {
        let mut cfg = SimConfig::default();
        cfg.load_from_str("[physics]\ngravity = 0.5\n\n[scripting]\nmax_publish_depth = 8\n")
            .unwrap();
        assert_eq!(cfg.gravity, 0.5);
        assert_eq!(cfg.max_publish_depth, 8);
        assert_eq!(cfg.max_fall_speed, 6.0);
        assert_eq!(cfg.tick_rate, 60);
    }

    #[test]
    fn bad_tick_rates_keep_the_previous_value() {
        for text in [
            "[simulation]\ntick_rate = 59.5\n",
            "[simulation]\ntick_rate = 0\n",
            "[simulation]\ntick_rate = 99999999999\n",
            "[simulation]\ntick_rate = -30\n",
        ] {
            let mut cfg = SimConfig::default();
            cfg.load_from_str(text).unwrap();
            assert_eq!(cfg.tick_rate, 60, "{:?}", text);
        }

        let mut cfg = SimConfig::default();
        cfg.load_from_str("[simulation]\ntick_rate = 30\n[scripting]\nmax_deliveries_per_tick = lots\n")
            .unwrap();
        assert_eq!(cfg.tick_rate, 30);
        assert_eq!(cfg.max_deliveries_per_tick, 10_000);
    }

    #[test]
    fn save_then_load_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!("doodads-{}.ini", std::process::id()));
        let mut cfg = SimConfig::with_path(&path);
        cfg.tick_rate = 30;
        cfg.settle_epsilon = 0.25;
        cfg.save_to_file().unwrap();

        let mut loaded = SimConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        assert_eq!(loaded.tick_rate, 30);
        assert_eq!(loaded.settle_epsilon, 0.25);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut cfg = SimConfig::with_path("/nonexistent/doodads.ini");
        assert!(cfg.load_from_file().is_err());
    }
}
