use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Category, ConfigError, FetchSettings};

/// Everything needed to set up a `Scene`. Missing fields in a config file fall back to the
/// defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of the virtual timeline, in the units tracklet timestamps are folded into
    pub loop_length: f64,
    /// Virtual units per real second
    pub animation_speed: f64,
    /// Footprint templates are converted from meters to degrees at this latitude
    pub reference_latitude: f64,
    /// Below this map zoom, nothing is drawn
    pub min_zoom: f64,
    pub categories: BTreeMap<Category, CategoryConfig>,
    pub fetch: FetchSettings,
}

/// Physical size and rendering style for one kind of object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Extent along the east/west axis when heading north
    pub width_meters: f64,
    /// Extent along the north/south axis when heading north
    pub length_meters: f64,
    pub height_meters: f64,
    pub color: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            Category::Person,
            CategoryConfig {
                width_meters: 0.53,
                length_meters: 0.55,
                height_meters: 2.0,
                color: "rgb(0, 255, 0)".to_string(),
            },
        );
        categories.insert(
            Category::Vehicle,
            CategoryConfig {
                width_meters: 2.52,
                length_meters: 5.06,
                height_meters: 2.0,
                color: "rgb(255, 0, 0)".to_string(),
            },
        );

        Self {
            loop_length: 1800.0,
            animation_speed: 7.0,
            reference_latitude: 40.81773,
            min_zoom: 10.0,
            categories,
            fetch: FetchSettings::default(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. Anything it leaves out keeps the default.
    pub fn load(path: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(&fs_err::read_to_string(path)?)?;
        if let Err(err) = config.loop_parameters() {
            bail!("{path}: {err}");
        }
        Ok(config)
    }

    pub fn loop_parameters(&self) -> Result<LoopParameters, ConfigError> {
        LoopParameters::from_speed(self.loop_length, self.animation_speed)
    }
}

/// How recorded timestamps map onto the repeating virtual timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopParameters {
    pub loop_length: f64,
    /// Real seconds mapped onto one pass through the loop
    pub loop_time_seconds: f64,
}

impl LoopParameters {
    pub fn from_speed(loop_length: f64, animation_speed: f64) -> Result<Self, ConfigError> {
        let valid = |x: f64| x.is_finite() && x > 0.0;
        if !valid(loop_length) || !valid(animation_speed) {
            return Err(ConfigError::BadLoop {
                loop_length,
                animation_speed,
            });
        }
        Ok(Self {
            loop_length,
            loop_time_seconds: loop_length / animation_speed,
        })
    }

    /// Maps a timestamp in milliseconds onto the virtual timeline, in `[0, loop_length)`.
    pub fn fold(&self, timestamp_ms: f64) -> f64 {
        // rem_euclid keeps timestamps before the epoch inside the loop too
        let seconds = (timestamp_ms / 1000.0).rem_euclid(self.loop_time_seconds);
        seconds / self.loop_time_seconds * self.loop_length
    }
}

impl Default for LoopParameters {
    fn default() -> Self {
        Self {
            loop_length: 1800.0,
            loop_time_seconds: 1800.0 / 7.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn default_loop_matches_config() {
        let params = Config::default().loop_parameters().unwrap();
        assert_eq!(params, LoopParameters::default());
    }

    #[test]
    fn fold_wraps_around() {
        let params = LoopParameters::from_speed(1000.0, 1000.0).unwrap();
        assert_eq!(params.loop_time_seconds, 1.0);
        assert_relative_eq!(params.fold(0.0), 0.0);
        assert_relative_eq!(params.fold(500.0), 500.0);
        assert_relative_eq!(params.fold(1250.0), 250.0, epsilon = 1e-9);
        assert_relative_eq!(params.fold(-250.0), 750.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_nonsense_speed() {
        assert!(LoopParameters::from_speed(1800.0, 0.0).is_err());
        assert!(LoopParameters::from_speed(-5.0, 7.0).is_err());
        assert!(LoopParameters::from_speed(f64::NAN, 7.0).is_err());
    }

    #[test]
    fn partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"loop_length": 900}"#).unwrap();
        assert_eq!(config.loop_length, 900.0);
        assert_eq!(config.animation_speed, 7.0);
        assert_eq!(config.categories.len(), 2);
    }
}
