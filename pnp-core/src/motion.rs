use std::collections::HashMap;
use std::fmt;

/// The three linear axes the gateway knows how to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn parse(s: &str) -> Option<Axis> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositioningMode {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Mm,
    Inch,
}

/// Authoritative per-connection motion state: positioning mode, units,
/// feedrate, and last commanded position per axis.
///
/// Mutated only by the Command Translator, after validation has passed
/// (spec §9, Open Question 2): a rejected translation never touches this.
#[derive(Debug, Clone)]
pub struct MotionContext {
    positioning_mode: PositioningMode,
    units: Units,
    feedrate: f64,
    position: HashMap<Axis, f64>,
}

impl Default for MotionContext {
    fn default() -> Self {
        let mut position = HashMap::new();
        for axis in Axis::ALL {
            position.insert(axis, 0.0);
        }
        Self {
            positioning_mode: PositioningMode::Absolute,
            units: Units::Mm,
            feedrate: 1500.0,
            position,
        }
    }
}

impl MotionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: Axis) -> f64 {
        *self.position.get(&axis).unwrap_or(&0.0)
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        self.position.insert(axis, value);
    }

    pub fn positioning_mode(&self) -> PositioningMode {
        self.positioning_mode
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn feedrate(&self) -> f64 {
        self.feedrate
    }

    pub fn set_mode(&mut self, mode: PositioningMode) {
        self.positioning_mode = mode;
    }

    /// Setting units to the same value is a no-op; positions are never
    /// rescaled (spec §4.A edge case).
    pub fn set_units(&mut self, units: Units) {
        if units != self.units {
            self.units = units;
        }
    }

    pub fn set_feedrate(&mut self, feedrate: f64) {
        self.feedrate = feedrate;
    }

    /// Apply a move in the given mode to the supplied per-axis values.
    /// Absolute writes the target directly; relative adds the delta.
    pub fn apply_move(&mut self, mode: PositioningMode, deltas_or_targets: &HashMap<Axis, f64>) {
        for (&axis, &value) in deltas_or_targets {
            match mode {
                PositioningMode::Absolute => self.set(axis, value),
                PositioningMode::Relative => {
                    let current = self.get(axis);
                    self.set(axis, current + value);
                }
            }
        }
    }

    /// Snapshot used by property tests to assert "unchanged on rejection".
    pub fn snapshot(&self) -> MotionSnapshot {
        MotionSnapshot {
            positioning_mode: self.positioning_mode,
            units: self.units,
            feedrate: self.feedrate,
            position: Axis::ALL.map(|a| self.get(a)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSnapshot {
    positioning_mode: PositioningMode,
    units: Units,
    feedrate: f64,
    position: [f64; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_absolute_mm_1500_origin() {
        let ctx = MotionContext::new();
        assert_eq!(ctx.positioning_mode(), PositioningMode::Absolute);
        assert_eq!(ctx.units(), Units::Mm);
        assert_eq!(ctx.feedrate(), 1500.0);
        for axis in Axis::ALL {
            assert_eq!(ctx.get(axis), 0.0);
        }
    }

    #[test]
    fn absolute_move_writes_target() {
        let mut ctx = MotionContext::new();
        let mut targets = HashMap::new();
        targets.insert(Axis::X, 100.0);
        ctx.apply_move(PositioningMode::Absolute, &targets);
        assert_eq!(ctx.get(Axis::X), 100.0);
    }

    #[test]
    fn relative_move_adds_delta() {
        let mut ctx = MotionContext::new();
        ctx.set(Axis::X, 10.0);
        let mut deltas = HashMap::new();
        deltas.insert(Axis::X, 5.0);
        ctx.apply_move(PositioningMode::Relative, &deltas);
        assert_eq!(ctx.get(Axis::X), 15.0);
    }

    #[test]
    fn setting_same_units_is_a_no_op() {
        let mut ctx = MotionContext::new();
        ctx.set(Axis::X, 42.0);
        ctx.set_units(Units::Mm);
        assert_eq!(ctx.units(), Units::Mm);
        assert_eq!(ctx.get(Axis::X), 42.0);
    }

    #[test]
    fn snapshot_equality_detects_mutation() {
        let mut ctx = MotionContext::new();
        let before = ctx.snapshot();
        ctx.set(Axis::Z, 1.0);
        assert_ne!(before, ctx.snapshot());
    }
}
