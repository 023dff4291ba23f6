//! # Mixer
//!
//! Software volume, mute and balance state for the audio output path.
//! Values are percentages (0..=100) for volume and -1..=1 for balance;
//! the audio pipeline samples this state when writing frames.

#[derive(Debug, Clone)]
pub struct Mixer {
    volume: f64,
    muted: bool,
    /// Volume remembered across mute so unmute restores it.
    restore_volume: f64,
    balance: f64,
    /// Step applied by volume up/down switching.
    pub volstep: f64,
}

impl Default for Mixer {
    fn default() -> Self {
        Self {
            volume: 100.0,
            muted: false,
            restore_volume: 100.0,
            balance: 0.0,
            volstep: 3.0,
        }
    }
}

impl Mixer {
    pub fn volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 100.0);
        if self.muted {
            // Setting a volume while muted unmutes, as turning the knob would.
            self.muted = false;
        }
        self.volume = volume;
        self.restore_volume = volume;
    }

    pub fn inc_volume(&mut self) {
        self.set_volume(self.volume + self.volstep);
    }

    pub fn dec_volume(&mut self) {
        self.set_volume(self.volume - self.volstep);
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_mute(&mut self, mute: bool) {
        if mute == self.muted {
            return;
        }
        if mute {
            self.restore_volume = self.volume;
            self.muted = true;
        } else {
            self.muted = false;
            self.volume = self.restore_volume;
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.balance = balance.clamp(-1.0, 1.0);
    }

    /// OSD rendering of the balance position.
    pub fn balance_text(&self) -> String {
        let bal = self.balance;
        if bal == 0.0 {
            "center".to_string()
        } else if bal == -1.0 {
            "left only".to_string()
        } else if bal == 1.0 {
            "right only".to_string()
        } else {
            let right = ((bal + 1.0) / 2.0 * 100.0) as u32;
            format!("left {}%, right {}%", 100 - right, right)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps() {
        let mut mixer = Mixer::default();
        mixer.set_volume(150.0);
        assert_eq!(mixer.volume(), 100.0);
        mixer.set_volume(-10.0);
        assert_eq!(mixer.volume(), 0.0);
    }

    #[test]
    fn test_mute_restores_volume() {
        let mut mixer = Mixer::default();
        mixer.set_volume(42.0);
        mixer.set_mute(true);
        assert_eq!(mixer.volume(), 0.0);
        assert!(mixer.muted());
        mixer.set_mute(false);
        assert_eq!(mixer.volume(), 42.0);
    }

    #[test]
    fn test_set_volume_unmutes() {
        let mut mixer = Mixer::default();
        mixer.set_mute(true);
        mixer.set_volume(30.0);
        assert!(!mixer.muted());
        assert_eq!(mixer.volume(), 30.0);
    }

    #[test]
    fn test_balance_text() {
        let mut mixer = Mixer::default();
        assert_eq!(mixer.balance_text(), "center");
        mixer.set_balance(1.0);
        assert_eq!(mixer.balance_text(), "right only");
        mixer.set_balance(0.5);
        assert_eq!(mixer.balance_text(), "left 25%, right 75%");
    }
}
