//! Navigator configuration.

use std::time::Duration;

use lamplight_paths::SearchLimits;

/// Runtime settings for a [`Navigator`](crate::Navigator).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavConfig {
    /// Whether paths are computed at all. Turning this off clears the
    /// published path.
    #[cfg_attr(feature = "serde", serde(default = "default_show_path"))]
    pub show_path: bool,

    /// Minimum time between two scheduled path computations, in
    /// milliseconds.
    #[cfg_attr(feature = "serde", serde(default = "default_recompute_cooldown_ms"))]
    pub recompute_cooldown_ms: u64,

    /// Suggest teleporting when the nearest fixture is farther than this
    /// many tiles (0 disables the hint).
    #[cfg_attr(feature = "serde", serde(default = "default_teleport_hint_distance"))]
    pub teleport_hint_distance: i32,

    /// Bounds applied to every search scheduled after this config is set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limits: SearchLimits,
}

fn default_show_path() -> bool {
    true
}

fn default_recompute_cooldown_ms() -> u64 {
    600
}

fn default_teleport_hint_distance() -> i32 {
    64
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            show_path: default_show_path(),
            recompute_cooldown_ms: default_recompute_cooldown_ms(),
            teleport_hint_distance: default_teleport_hint_distance(),
            limits: SearchLimits::default(),
        }
    }
}

impl NavConfig {
    #[inline]
    pub fn recompute_cooldown(&self) -> Duration {
        Duration::from_millis(self.recompute_cooldown_ms)
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let c: NavConfig = serde_json::from_str(r#"{"show_path": false}"#).unwrap();
        assert!(!c.show_path);
        assert_eq!(c.recompute_cooldown_ms, 600);
        assert_eq!(c.limits.max_iterations, 10_000);
    }

    #[test]
    fn round_trip() {
        let c = NavConfig {
            recompute_cooldown_ms: 250,
            ..NavConfig::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: NavConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
