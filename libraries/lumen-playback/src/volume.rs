//! Volume level and mute state
//!
//! The controller keeps the user-facing level (0-100) and mute flag; the
//! engine receives a perceptual linear gain: 0% is silence, 1-100% maps
//! onto -60 dB..0 dB.

/// Lowest audible level in dB (1%)
const FLOOR_DB: f32 = -60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,

    /// Mute state (level is preserved)
    muted: bool,
}

impl Volume {
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    /// Set volume level, clamped to 100
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Linear gain sent to the engine, 0.0 when muted
    pub fn gain(&self) -> f32 {
        if self.muted || self.level == 0 {
            return 0.0;
        }

        let db = f32::from(100 - self.level) * FLOOR_DB / 100.0;
        10.0_f32.powf(db / 20.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(100)
    }
}
