//! Synthetic mouse movement pattern engine.
//!
//! A [`PatternCursor`] produces a lazy, infinite, restartable sequence of
//! relative displacement [`Step`]s according to a [`MovementConfig`]. The
//! engine performs no I/O and never sleeps; the owning relay applies each
//! step through the gadget sink and waits out `Step::delay` between steps.
//!
//! Geometry is cycle-based: at each cycle boundary range-valued parameters
//! are resolved to concrete values, so a single cycle is geometrically
//! consistent. Deltas are computed against the integer position emitted so
//! far (not the previous float sample), which keeps a closed shape closed:
//! the sum of a circle cycle's deltas is exactly zero.
//!
//! `mix` walks circle → zigzag → square on a wall-clock timer; `random`
//! redraws the shape and its parameters at every cycle boundary and forces a
//! redraw mid-cycle once `random_pattern_change_interval` elapses.

pub mod config;

use std::time::{Duration, Instant};

use tracing::debug;

pub use config::{
    CircleParams, MixParams, MovementConfig, Param, PatternName, PatternTable, SquareParams,
    ZigzagParams,
};

/// One relative displacement, due `delay` after the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub dx: i32,
    pub dy: i32,
    pub delay: Duration,
}

/// A concrete shape with all parameters resolved for one cycle.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Circle { radius: f64 },
    Zigzag { width: f64, height: f64 },
    Square { size: f64 },
}

impl Shape {
    fn name(&self) -> PatternName {
        match self {
            Shape::Circle { .. } => PatternName::Circle,
            Shape::Zigzag { .. } => PatternName::Zigzag,
            Shape::Square { .. } => PatternName::Square,
        }
    }

    /// Position of step `k` out of `n` on this shape, relative to the cycle
    /// origin. `point(0, n)` is the start; for closed shapes `point(n, n)`
    /// coincides with it.
    fn point(&self, k: u32, n: u32) -> (f64, f64) {
        let n = n.max(1);
        match *self {
            Shape::Circle { radius } => {
                let angle = std::f64::consts::TAU * f64::from(k) / f64::from(n);
                (radius * angle.cos(), radius * angle.sin())
            }
            Shape::Square { size } => {
                let perimeter = 4.0 * f64::from(k) / f64::from(n);
                let side = (perimeter.floor() as u32).min(3);
                let frac = perimeter - f64::from(side);
                match side {
                    0 => (size * frac, 0.0),
                    1 => (size, size * frac),
                    2 => (size * (1.0 - frac), size),
                    _ => (0.0, size * (1.0 - frac)),
                }
            }
            Shape::Zigzag { width, height } => {
                let rows = (height.round().max(1.0)) as u32;
                let steps_per_row = (n / rows).max(1);
                let row = (k / steps_per_row).min(rows - 1);
                let progress =
                    (f64::from(k - row * steps_per_row) / f64::from(steps_per_row)).min(1.0);
                let direction = if row % 2 == 0 { 1.0 } else { -1.0 };
                let spacing = if rows > 1 {
                    height / f64::from(rows - 1)
                } else {
                    0.0
                };
                (width * progress * direction, f64::from(row) * spacing)
            }
        }
    }
}

/// One in-progress cycle.
#[derive(Debug)]
struct Cycle {
    shape: Shape,
    steps: u32,
    step: u32,
    delay: Duration,
    /// Integer position emitted so far, relative to the cycle origin.
    emitted: (i64, i64),
}

/// The restartable step generator.
#[derive(Debug)]
pub struct PatternCursor {
    config: MovementConfig,
    rng: SplitMix64,
    cycle: Option<Cycle>,
    mix_started: Option<Instant>,
    last_draw: Option<Instant>,
}

impl PatternCursor {
    /// Creates a cursor seeded from the clock.
    pub fn new(config: MovementConfig) -> Self {
        Self::with_rng(config, SplitMix64::from_entropy())
    }

    /// Creates a cursor with a fixed seed. Range resolution and random-mode
    /// draws become reproducible; fixed-parameter patterns are identical
    /// regardless of seed.
    pub fn with_seed(config: MovementConfig, seed: u64) -> Self {
        Self::with_rng(config, SplitMix64::new(seed))
    }

    fn with_rng(config: MovementConfig, rng: SplitMix64) -> Self {
        Self {
            config,
            rng,
            cycle: None,
            mix_started: None,
            last_draw: None,
        }
    }

    /// The shape currently being traced, once the first step was taken.
    pub fn active_pattern(&self) -> Option<PatternName> {
        self.cycle.as_ref().map(|c| c.shape.name())
    }

    /// Produces the next displacement. Cycle boundaries (and, in `random`
    /// mode, an elapsed change interval) transparently start a fresh cycle.
    pub fn next_step(&mut self, now: Instant) -> Step {
        let finished = self.cycle.as_ref().map_or(true, |c| c.step >= c.steps);
        let interval_elapsed = self.config.default_pattern == PatternName::Random
            && self.last_draw.map_or(false, |t| {
                now.duration_since(t).as_secs_f64() >= self.config.random_pattern_change_interval
            });
        if finished || interval_elapsed {
            self.begin_cycle(now);
        }

        let cycle = self.cycle.as_mut().expect("begin_cycle always sets a cycle");
        cycle.step += 1;
        let (tx, ty) = cycle.shape.point(cycle.step, cycle.steps);
        let (tx, ty) = (tx.round() as i64, ty.round() as i64);
        let dx = (tx - cycle.emitted.0) as i32;
        let dy = (ty - cycle.emitted.1) as i32;
        cycle.emitted = (tx, ty);
        Step {
            dx,
            dy,
            delay: cycle.delay,
        }
    }

    /// Resolves parameters for a fresh cycle.
    fn begin_cycle(&mut self, now: Instant) {
        let patterns = self.config.patterns.clone();
        let (shape, steps, delay) = match self.config.default_pattern {
            PatternName::Circle => self.resolve_circle(&patterns.circle),
            PatternName::Zigzag => self.resolve_zigzag(&patterns.zigzag),
            PatternName::Square => self.resolve_square(&patterns.square),
            PatternName::Mix => {
                let started = *self.mix_started.get_or_insert(now);
                let duration = patterns.mix.duration_per_pattern.max(f64::EPSILON);
                let index = (now.duration_since(started).as_secs_f64() / duration) as u64 % 3;
                let (shape, steps, _) = match index {
                    0 => self.resolve_circle(&patterns.circle),
                    1 => self.resolve_zigzag(&patterns.zigzag),
                    _ => self.resolve_square(&patterns.square),
                };
                (shape, steps, patterns.mix.delay)
            }
            PatternName::Random => {
                self.last_draw = Some(now);
                match self.rng.pick_index(3) {
                    0 => self.resolve_circle(&patterns.circle),
                    1 => self.resolve_zigzag(&patterns.zigzag),
                    _ => self.resolve_square(&patterns.square),
                }
            }
        };

        debug!(pattern = %shape.name(), steps, "movement cycle started");
        let origin = shape.point(0, steps);
        self.cycle = Some(Cycle {
            shape,
            steps,
            step: 0,
            delay: Duration::from_secs_f64(delay.max(0.0)),
            emitted: (origin.0.round() as i64, origin.1.round() as i64),
        });
    }

    fn resolve_circle(&mut self, p: &CircleParams) -> (Shape, u32, f64) {
        let radius = self.rng.resolve(p.radius);
        let steps = self.resolve_steps(p.steps);
        (Shape::Circle { radius }, steps, p.delay)
    }

    fn resolve_zigzag(&mut self, p: &ZigzagParams) -> (Shape, u32, f64) {
        let width = self.rng.resolve(p.width);
        let height = self.rng.resolve(p.height);
        let steps = self.resolve_steps(p.steps);
        (Shape::Zigzag { width, height }, steps, p.delay)
    }

    fn resolve_square(&mut self, p: &SquareParams) -> (Shape, u32, f64) {
        let size = self.rng.resolve(p.size);
        let steps = self.resolve_steps(p.steps);
        (Shape::Square { size }, steps, p.delay)
    }

    fn resolve_steps(&mut self, param: Param) -> u32 {
        (self.rng.resolve(param).round() as u32).max(1)
    }
}

// ── PRNG ──────────────────────────────────────────────────────────────────────

/// SplitMix64: tiny, fast, and good enough for jitter amounts. Not
/// cryptographic, which is fine here.
#[derive(Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds from the clock and thread identity.
    fn from_entropy() -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        use std::time::SystemTime;

        let mut hasher = DefaultHasher::new();
        SystemTime::now().hash(&mut hasher);
        std::thread::current().id().hash(&mut hasher);
        Self::new(hasher.finish())
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw from `[min, max)`; degenerate ranges collapse to `min`.
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        min + (max - min) * unit
    }

    fn resolve(&mut self, param: Param) -> f64 {
        match param {
            Param::Fixed(v) => v,
            Param::Range(min, max) => self.uniform(min, max),
        }
    }

    fn pick_index(&mut self, len: usize) -> usize {
        (self.next_u64() % len as u64) as usize
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_circle_config(radius: f64, steps: u32) -> MovementConfig {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Circle;
        cfg.patterns.circle.radius = Param::Fixed(radius);
        cfg.patterns.circle.steps = Param::Fixed(f64::from(steps));
        cfg
    }

    #[test]
    fn test_circle_cycle_has_n_steps_and_closes_at_origin() {
        let mut cursor = PatternCursor::with_seed(fixed_circle_config(10.0, 20), 1);
        let t0 = Instant::now();

        let steps: Vec<Step> = (0..20).map(|_| cursor.next_step(t0)).collect();

        assert_eq!(steps.len(), 20);
        let sum_x: i32 = steps.iter().map(|s| s.dx).sum();
        let sum_y: i32 = steps.iter().map(|s| s.dy).sum();
        assert_eq!((sum_x, sum_y), (0, 0), "a full revolution must return to origin");
        assert!(
            steps.iter().any(|s| s.dx != 0 || s.dy != 0),
            "a 10px circle must actually move"
        );
    }

    #[test]
    fn test_circle_regeneration_is_deterministic_for_fixed_parameters() {
        let t0 = Instant::now();
        let mut a = PatternCursor::with_seed(fixed_circle_config(10.0, 20), 1);
        let mut b = PatternCursor::with_seed(fixed_circle_config(10.0, 20), 999);

        // Different seeds: fixed parameters leave nothing for the RNG to vary.
        for _ in 0..40 {
            assert_eq!(a.next_step(t0), b.next_step(t0));
        }
    }

    #[test]
    fn test_square_cycle_closes_at_origin() {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Square;
        cfg.patterns.square.size = Param::Fixed(12.0);
        cfg.patterns.square.steps = Param::Fixed(40.0);
        let mut cursor = PatternCursor::with_seed(cfg, 7);
        let t0 = Instant::now();

        let sum = (0..40).fold((0, 0), |acc, _| {
            let s = cursor.next_step(t0);
            (acc.0 + s.dx, acc.1 + s.dy)
        });
        assert_eq!(sum, (0, 0));
    }

    #[test]
    fn test_zigzag_stays_within_configured_width() {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Zigzag;
        cfg.patterns.zigzag.width = Param::Fixed(20.0);
        cfg.patterns.zigzag.height = Param::Fixed(5.0);
        cfg.patterns.zigzag.steps = Param::Fixed(50.0);
        let mut cursor = PatternCursor::with_seed(cfg, 3);
        let t0 = Instant::now();

        let mut x: i64 = 0;
        for _ in 0..50 {
            x += i64::from(cursor.next_step(t0).dx);
            assert!(x.abs() <= 21, "|x|={x} escaped the configured width");
        }
    }

    #[test]
    fn test_range_parameters_resolve_once_per_cycle() {
        // With a ranged radius the cycle must still be one consistent circle:
        // it closes even though the radius was drawn at random.
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Circle;
        cfg.patterns.circle.radius = Param::Range(5.0, 20.0);
        cfg.patterns.circle.steps = Param::Fixed(24.0);
        let mut cursor = PatternCursor::with_seed(cfg, 42);
        let t0 = Instant::now();

        for _cycle in 0..3 {
            let sum = (0..24).fold((0, 0), |acc, _| {
                let s = cursor.next_step(t0);
                (acc.0 + s.dx, acc.1 + s.dy)
            });
            assert_eq!(sum, (0, 0));
        }
    }

    #[test]
    fn test_mix_advances_through_sub_patterns_over_time() {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Mix;
        cfg.patterns.mix.duration_per_pattern = 10.0;
        // Short cycles so each call to next_step can hit a cycle boundary.
        cfg.patterns.circle.steps = Param::Fixed(2.0);
        cfg.patterns.zigzag.steps = Param::Fixed(2.0);
        cfg.patterns.square.steps = Param::Fixed(2.0);
        let mut cursor = PatternCursor::with_seed(cfg, 5);
        let t0 = Instant::now();

        cursor.next_step(t0);
        assert_eq!(cursor.active_pattern(), Some(PatternName::Circle));

        // Burn through the current cycle, then cross the 10 s boundary.
        cursor.next_step(t0);
        cursor.next_step(t0 + Duration::from_secs(12));
        assert_eq!(cursor.active_pattern(), Some(PatternName::Zigzag));

        cursor.next_step(t0 + Duration::from_secs(12));
        cursor.next_step(t0 + Duration::from_secs(23));
        assert_eq!(cursor.active_pattern(), Some(PatternName::Square));
    }

    #[test]
    fn test_random_mode_redraws_when_interval_elapses_mid_cycle() {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Random;
        cfg.random_pattern_change_interval = 20.0;
        // Very long cycles: only the interval can trigger a redraw.
        cfg.patterns.circle.steps = Param::Fixed(10_000.0);
        cfg.patterns.zigzag.steps = Param::Fixed(10_000.0);
        cfg.patterns.square.steps = Param::Fixed(10_000.0);
        let mut cursor = PatternCursor::with_seed(cfg, 11);
        let t0 = Instant::now();

        cursor.next_step(t0);
        let first = cursor.active_pattern().unwrap();
        assert!(matches!(
            first,
            PatternName::Circle | PatternName::Zigzag | PatternName::Square
        ));

        // Mid-cycle, before the interval: no redraw, same shape.
        cursor.next_step(t0 + Duration::from_secs(5));
        assert_eq!(cursor.active_pattern(), Some(first));

        // After the interval: a fresh draw happened (shape may repeat by
        // chance, but the cycle restarted — observable via step delays only,
        // so assert the cursor keeps producing valid steps).
        let step = cursor.next_step(t0 + Duration::from_secs(25));
        assert!(step.delay > Duration::ZERO);
    }

    #[test]
    fn test_random_mode_draw_sequence_is_reproducible_with_a_seed() {
        let mut cfg = MovementConfig::default();
        cfg.default_pattern = PatternName::Random;
        let t0 = Instant::now();

        let mut a = PatternCursor::with_seed(cfg.clone(), 1234);
        let mut b = PatternCursor::with_seed(cfg, 1234);
        for _ in 0..100 {
            assert_eq!(a.next_step(t0), b.next_step(t0));
        }
    }

    #[test]
    fn test_step_delay_comes_from_the_pattern_config() {
        let mut cfg = fixed_circle_config(10.0, 8);
        cfg.patterns.circle.delay = 0.25;
        let mut cursor = PatternCursor::with_seed(cfg, 1);
        let step = cursor.next_step(Instant::now());
        assert_eq!(step.delay, Duration::from_millis(250));
    }
}
