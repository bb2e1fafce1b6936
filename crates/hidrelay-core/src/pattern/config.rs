//! Movement pattern configuration schema.
//!
//! Loaded once at startup from a TOML file; every field has a serde default
//! so a partial file works, and the daemon falls back to the full defaults
//! when the file is missing or malformed. Numeric parameters are either a
//! fixed scalar or a `[min, max]` range resolved to a concrete value once per
//! movement cycle.
//!
//! ```toml
//! default_pattern = "random"
//! random_pattern_change_interval = 20.0
//!
//! [patterns.circle]
//! radius = [5.0, 20.0]
//! steps = [20, 50]
//! delay = 0.05
//! ```

use serde::{Deserialize, Serialize};

/// A numeric parameter: fixed, or drawn uniformly from `[min, max]` once per
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Fixed(f64),
    Range(f64, f64),
}

/// The movement pattern to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternName {
    Circle,
    Zigzag,
    Square,
    /// Cycles circle → zigzag → square on a timer.
    Mix,
    /// Redraws a random shape with random parameters at cycle boundaries.
    Random,
}

impl std::fmt::Display for PatternName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PatternName::Circle => "circle",
            PatternName::Zigzag => "zigzag",
            PatternName::Square => "square",
            PatternName::Mix => "mix",
            PatternName::Random => "random",
        })
    }
}

/// Top-level movement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    #[serde(default = "default_pattern")]
    pub default_pattern: PatternName,
    /// Seconds between forced redraws in `random` mode.
    #[serde(default = "default_change_interval")]
    pub random_pattern_change_interval: f64,
    #[serde(default)]
    pub patterns: PatternTable,
}

/// Per-pattern parameter blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternTable {
    #[serde(default)]
    pub circle: CircleParams,
    #[serde(default)]
    pub zigzag: ZigzagParams,
    #[serde(default)]
    pub square: SquareParams,
    #[serde(default)]
    pub mix: MixParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleParams {
    #[serde(default = "default_radius")]
    pub radius: Param,
    #[serde(default = "default_circle_steps")]
    pub steps: Param,
    #[serde(default = "default_delay")]
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZigzagParams {
    #[serde(default = "default_width")]
    pub width: Param,
    #[serde(default = "default_height")]
    pub height: Param,
    #[serde(default = "default_sweep_steps")]
    pub steps: Param,
    #[serde(default = "default_delay")]
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareParams {
    #[serde(default = "default_size")]
    pub size: Param,
    #[serde(default = "default_sweep_steps")]
    pub steps: Param,
    #[serde(default = "default_delay")]
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixParams {
    /// Seconds spent on each sub-pattern before advancing.
    #[serde(default = "default_mix_duration")]
    pub duration_per_pattern: f64,
    #[serde(default = "default_delay")]
    pub delay: f64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_pattern() -> PatternName {
    PatternName::Random
}
fn default_change_interval() -> f64 {
    20.0
}
fn default_radius() -> Param {
    Param::Range(5.0, 20.0)
}
fn default_circle_steps() -> Param {
    Param::Range(20.0, 50.0)
}
fn default_width() -> Param {
    Param::Range(10.0, 30.0)
}
fn default_height() -> Param {
    Param::Range(5.0, 15.0)
}
fn default_size() -> Param {
    Param::Range(10.0, 25.0)
}
fn default_sweep_steps() -> Param {
    Param::Range(30.0, 60.0)
}
fn default_delay() -> f64 {
    0.05
}
fn default_mix_duration() -> f64 {
    10.0
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            default_pattern: default_pattern(),
            random_pattern_change_interval: default_change_interval(),
            patterns: PatternTable::default(),
        }
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self {
            circle: CircleParams::default(),
            zigzag: ZigzagParams::default(),
            square: SquareParams::default(),
            mix: MixParams::default(),
        }
    }
}

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            steps: default_circle_steps(),
            delay: default_delay(),
        }
    }
}

impl Default for ZigzagParams {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            steps: default_sweep_steps(),
            delay: default_delay(),
        }
    }
}

impl Default for SquareParams {
    fn default() -> Self {
        Self {
            size: default_size(),
            steps: default_sweep_steps(),
            delay: default_delay(),
        }
    }
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            duration_per_pattern: default_mix_duration(),
            delay: default_delay(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
