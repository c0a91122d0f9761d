//! Rewrite configuration.

use serde::Serialize;

use crate::error::BankError;

/// Lowest target sample rate accepted.
pub const MIN_TARGET_RATE: u32 = 4000;
/// Highest sample rate the 18-bit format field can hold.
pub const MAX_TARGET_RATE: u32 = 0x3_FFFF;

/// Options for a rewrite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewriteOptions {
    /// Sample rate every converted entry is resampled to.
    pub target_rate: u32,
    /// Decode MS-ADPCM entries to 16-bit PCM instead of re-encoding them.
    pub force_pcm: bool,
    /// Collapse multi-channel PCM and ADPCM entries to mono.
    pub force_mono: bool,
}

impl RewriteOptions {
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            force_pcm: false,
            force_mono: false,
        }
    }

    pub fn with_force_pcm(mut self, force_pcm: bool) -> Self {
        self.force_pcm = force_pcm;
        self
    }

    pub fn with_force_mono(mut self, force_mono: bool) -> Self {
        self.force_mono = force_mono;
        self
    }

    pub fn validate(&self) -> Result<(), BankError> {
        if !(MIN_TARGET_RATE..=MAX_TARGET_RATE).contains(&self.target_rate) {
            return Err(BankError::InvalidRate {
                rate: self.target_rate,
                min: MIN_TARGET_RATE,
                max: MAX_TARGET_RATE,
            });
        }
        Ok(())
    }
}
