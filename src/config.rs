//! TOML configuration for the synth.
//!
//! ```toml
//! mode = "polyphonic"
//! cleanup_margin = 0.1
//! key_gate = 0.25
//!
//! [params]
//! master_gain = 0.1
//! octave = 0
//!
//! [params.envelope]
//! attack = 0.01
//! release = 0.3
//!
//! [[params.oscillators]]
//! waveform = "sawtooth"
//! detune_cents = -7.0
//! ```
//!
//! Every key is optional. One `[[params.oscillators]]` entry configures the
//! first slot and leaves the second at its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    params::{EnvelopeSettings, OscillatorSettings, Parameters, PlaybackMode, OSCILLATOR_COUNT},
    synth::DEFAULT_CLEANUP_MARGIN,
};

/// Seconds a typed key sounds when the terminal reports no key release.
pub const DEFAULT_KEY_GATE: f64 = 0.25;

/// Startup settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub mode: PlaybackMode,
    /// Seconds between the end of a release ramp and voice removal.
    pub cleanup_margin: f64,
    pub key_gate: f64,
    pub params: Parameters,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::default(),
            cleanup_margin: DEFAULT_CLEANUP_MARGIN,
            key_gate: DEFAULT_KEY_GATE,
            params: Parameters::default(),
        }
    }
}

impl SynthConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(toml_str)?;
        let config = file.into_config()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&ConfigFile::from(self))?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = &self.params.envelope;
        non_negative("params.envelope.attack", env.attack as f64)?;
        non_negative("params.envelope.decay", env.decay as f64)?;
        non_negative("params.envelope.release", env.release as f64)?;
        unit("params.envelope.sustain", env.sustain as f64)?;
        unit("params.master_gain", self.params.master_gain as f64)?;

        let octave = self.params.octave;
        if !(-1..=7).contains(&octave) {
            return Err(ConfigError::OutOfRange {
                field: "params.octave",
                value: octave as f64,
                expected: "-1..=7",
            });
        }
        if !self.params.fine_tune_hz.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "params.fine_tune_hz",
                value: self.params.fine_tune_hz as f64,
                expected: "a finite number",
            });
        }
        for osc in &self.params.oscillators {
            if !osc.detune_cents.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field: "params.oscillators.detune_cents",
                    value: osc.detune_cents as f64,
                    expected: "a finite number",
                });
            }
        }

        non_negative("cleanup_margin", self.cleanup_margin)?;
        non_negative("key_gate", self.key_gate)?;
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: ">= 0",
        })
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "0..=1",
        })
    }
}

/// On-disk layout. Oscillators are a list so one entry is enough.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    mode: PlaybackMode,
    cleanup_margin: f64,
    key_gate: f64,
    params: ParamsFile,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ParamsFile {
    master_gain: f32,
    octave: i8,
    fine_tune_hz: f32,
    envelope: EnvelopeSettings,
    oscillators: Vec<OscillatorSettings>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from(&SynthConfig::default())
    }
}

impl Default for ParamsFile {
    fn default() -> Self {
        Self::from(&Parameters::default())
    }
}

impl From<&SynthConfig> for ConfigFile {
    fn from(config: &SynthConfig) -> Self {
        Self {
            mode: config.mode,
            cleanup_margin: config.cleanup_margin,
            key_gate: config.key_gate,
            params: ParamsFile::from(&config.params),
        }
    }
}

impl From<&Parameters> for ParamsFile {
    fn from(params: &Parameters) -> Self {
        Self {
            master_gain: params.master_gain,
            octave: params.octave,
            fine_tune_hz: params.fine_tune_hz,
            envelope: params.envelope,
            oscillators: params.oscillators.to_vec(),
        }
    }
}

impl ConfigFile {
    fn into_config(self) -> Result<SynthConfig, ConfigError> {
        let given = self.params.oscillators.len();
        if !(1..=OSCILLATOR_COUNT).contains(&given) {
            return Err(ConfigError::OscillatorCount(given));
        }

        let mut oscillators = Parameters::default().oscillators;
        for (slot, osc) in oscillators.iter_mut().zip(self.params.oscillators) {
            *slot = osc;
        }

        Ok(SynthConfig {
            mode: self.mode,
            cleanup_margin: self.cleanup_margin,
            key_gate: self.key_gate,
            params: Parameters {
                envelope: self.params.envelope,
                master_gain: self.params.master_gain,
                octave: self.params.octave,
                fine_tune_hz: self.params.fine_tune_hz,
                oscillators,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Waveform;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(SynthConfig::from_toml("").unwrap(), SynthConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = SynthConfig::from_toml(
            r#"
            mode = "monophonic"

            [params.envelope]
            release = 1.5

            [[params.oscillators]]
            waveform = "sawtooth"
            detune_cents = -7.0
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, PlaybackMode::Monophonic);
        assert_eq!(config.params.envelope.release, 1.5);
        assert_eq!(config.params.envelope.attack, EnvelopeSettings::default().attack);
        assert_eq!(config.params.oscillators[0].waveform, Waveform::Sawtooth);
        assert!(config.params.oscillators[0].enabled);
        assert_eq!(
            config.params.oscillators[1],
            Parameters::default().oscillators[1]
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = SynthConfig::from_toml("[params.envelope]\nsustain = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "params.envelope.sustain",
                ..
            }
        ));

        let err = SynthConfig::from_toml("[params]\noctave = 9").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "params.octave", .. }));

        let err = SynthConfig::from_toml("cleanup_margin = -0.5").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "cleanup_margin", .. }));
    }

    #[test]
    fn oscillator_count_is_checked() {
        let err = SynthConfig::from_toml("[params]\noscillators = []").unwrap_err();
        assert!(matches!(err, ConfigError::OscillatorCount(0)));

        let three = "[[params.oscillators]]\n[[params.oscillators]]\n[[params.oscillators]]\n";
        let err = SynthConfig::from_toml(three).unwrap_err();
        assert!(matches!(err, ConfigError::OscillatorCount(3)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SynthConfig::from_toml("mode = \"stereo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn written_config_reads_back() {
        let mut config = SynthConfig::default();
        config.mode = PlaybackMode::Monophonic;
        config.params.oscillators[1].enabled = false;
        let text = config.to_toml().unwrap();
        assert_eq!(SynthConfig::from_toml(&text).unwrap(), config);
    }
}
