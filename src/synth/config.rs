use crate::{
    dsp::Interpolation,
    error::{Result, SynthError},
    settings::{keys, Settings},
};

pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;
pub const DEFAULT_CHANNELS: i32 = 16;
pub const DEFAULT_POLYPHONY: i32 = 256;
pub const DEFAULT_GAIN: f64 = 0.2;
pub const DEFAULT_MAX_BANKS: i32 = 16;

/// Engine parameters resolved from a [`Settings`] snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f32,
    pub channels: usize,
    pub polyphony: usize,
    pub gain: f32,
    pub max_banks: usize,
    pub interpolation: Interpolation,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
            channels: DEFAULT_CHANNELS as usize,
            polyphony: DEFAULT_POLYPHONY as usize,
            gain: DEFAULT_GAIN as f32,
            max_banks: DEFAULT_MAX_BANKS as usize,
            interpolation: Interpolation::Linear,
        }
    }
}

impl SynthConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let sample_rate = settings.num_or(keys::SAMPLE_RATE, DEFAULT_SAMPLE_RATE)?;
        let channels = settings.int_or(keys::MIDI_CHANNELS, DEFAULT_CHANNELS)?;
        let polyphony = settings.int_or(keys::POLYPHONY, DEFAULT_POLYPHONY)?;
        let gain = settings.num_or(keys::GAIN, DEFAULT_GAIN)?;
        let max_banks = settings.int_or(keys::MAX_BANKS, DEFAULT_MAX_BANKS)?;
        let interpolation = settings
            .str_or(keys::INTERPOLATION, "linear")?
            .parse::<Interpolation>()
            .map_err(SynthError::InvalidConfiguration)?;

        if !(8_000.0..=192_000.0).contains(&sample_rate) {
            return Err(invalid(format!(
                "sample rate {sample_rate} outside 8000..=192000"
            )));
        }
        if !(1..=256).contains(&channels) {
            return Err(invalid(format!("channel count {channels} outside 1..=256")));
        }
        if !(1..=65_535).contains(&polyphony) {
            return Err(invalid(format!("polyphony {polyphony} outside 1..=65535")));
        }
        if !(0.0..=10.0).contains(&gain) {
            return Err(invalid(format!("gain {gain} outside 0..=10")));
        }
        if max_banks < 1 {
            return Err(invalid(format!("max banks {max_banks} must be positive")));
        }

        Ok(Self {
            sample_rate: sample_rate as f32,
            channels: channels as usize,
            polyphony: polyphony as usize,
            gain: gain as f32,
            max_banks: max_banks as usize,
            interpolation,
        })
    }
}

fn invalid(reason: String) -> SynthError {
    SynthError::InvalidConfiguration(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_resolve_to_defaults() {
        let config = SynthConfig::from_settings(&Settings::new()).unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut settings = Settings::new();
        settings.set_num(keys::SAMPLE_RATE, 48_000.0).unwrap();
        settings.set_int(keys::POLYPHONY, 4).unwrap();
        settings.set_str(keys::INTERPOLATION, "cubic").unwrap();

        let config = SynthConfig::from_settings(&settings).unwrap();
        assert_eq!(config.sample_rate, 48_000.0);
        assert_eq!(config.polyphony, 4);
        assert_eq!(config.interpolation, Interpolation::Cubic);
    }

    #[test]
    fn non_positive_polyphony_is_invalid() {
        let mut settings = Settings::new();
        settings.set_int(keys::POLYPHONY, 0).unwrap();

        assert!(matches!(
            SynthConfig::from_settings(&settings),
            Err(SynthError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn unknown_interpolation_is_invalid() {
        let mut settings = Settings::new();
        settings.set_str(keys::INTERPOLATION, "sinc").unwrap();

        assert!(SynthConfig::from_settings(&settings).is_err());
    }
}
