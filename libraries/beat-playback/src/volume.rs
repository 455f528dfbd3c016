//! Output level with logarithmic scaling
//!
//! The UI works in percent; the device wants a linear gain. Levels map to
//! -60 dB..0 dB so equal slider steps sound like equal loudness steps.

/// Volume level plus mute flag
#[derive(Debug, Clone)]
pub struct Volume {
    /// Level (0-100)
    level: u8,

    /// Mute state (level survives a mute)
    muted: bool,
}

impl Volume {
    /// Create a volume at `level` percent (clamped to 100)
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    /// Set level (0-100)
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    /// Current level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Silence output, keeping the level
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Restore output at the kept level
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Flip mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Linear gain to hand to the device
    ///
    /// `10^((level - 100) * 0.6 / 20)`: 100% is unity, 80% is -12 dB,
    /// 50% is -30 dB. Level 0 and mute are hard silence.
    pub fn gain(&self) -> f32 {
        if self.muted || self.level == 0 {
            return 0.0;
        }

        let db = (f32::from(self.level) - 100.0) * 0.6;
        10.0_f32.powf(db / 20.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_clamped() {
        let mut vol = Volume::new(150);
        assert_eq!(vol.level(), 100);

        vol.set_level(75);
        assert_eq!(vol.level(), 75);
    }

    #[test]
    fn mute_preserves_level() {
        let mut vol = Volume::new(80);

        vol.mute();
        assert!(vol.is_muted());
        assert_eq!(vol.level(), 80);
        assert_eq!(vol.gain(), 0.0);

        vol.toggle_mute();
        assert!(!vol.is_muted());
        assert!(vol.gain() > 0.0);
    }

    #[test]
    fn gain_calculation() {
        assert_eq!(Volume::new(0).gain(), 0.0);
        assert!((Volume::new(100).gain() - 1.0).abs() < 0.001);
        assert!((Volume::new(50).gain() - 0.0316).abs() < 0.001);
        assert!((Volume::new(80).gain() - 0.251).abs() < 0.01);
    }
}
