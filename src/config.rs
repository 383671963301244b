// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{path::Path, time::Duration};

use config::{Config, Environment, File, FileFormat};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::DEFAULT_FLASH;
use crate::instruments::InstrumentSettings;
use crate::kinematics::{Estimator, DEFAULT_NOISE_FLOOR, DEFAULT_STALENESS};
use crate::trigger::{Cooldowns, TriggerRegistry, DEFAULT_DEBOUNCE_FRAMES, DEFAULT_RELEASE_FRAMES};

mod dispatch;
mod error;
mod instruments;

pub use dispatch::Dispatch;
pub use error::ConfigError;
pub use instruments::Instruments;

/// Prefix of environment variables that override the config file,
/// e.g. `AIRBAND_INSTRUMENTS__DRUMS__COOLDOWN=50ms`.
pub const ENV_PREFIX: &str = "AIRBAND";

fn duration(value: &str) -> Result<Duration, ConfigError> {
    Ok(DurationString::from_string(value.to_string())?.into())
}

fn duration_string(value: Duration) -> String {
    DurationString::from(value).to_string()
}

/// The `kinematics` section.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Kinematics {
    /// History older than this is discarded and velocities restart at zero.
    staleness: String,

    /// Frames closer together than this are too noisy to differentiate.
    noise_floor: String,
}

impl Default for Kinematics {
    fn default() -> Self {
        Kinematics {
            staleness: duration_string(DEFAULT_STALENESS),
            noise_floor: duration_string(DEFAULT_NOISE_FLOOR),
        }
    }
}

impl Kinematics {
    pub fn staleness(&self) -> Result<Duration, ConfigError> {
        duration(&self.staleness)
    }

    pub fn noise_floor(&self) -> Result<Duration, ConfigError> {
        duration(&self.noise_floor)
    }
}

/// The `debounce` section.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Debounce {
    /// Number of recent contact frames retained per gesture source.
    buffer_size: usize,

    /// Consecutive non-contact frames needed before a source can fire again.
    release_frames: usize,
}

impl Default for Debounce {
    fn default() -> Self {
        Debounce {
            buffer_size: DEFAULT_DEBOUNCE_FRAMES,
            release_frames: DEFAULT_RELEASE_FRAMES,
        }
    }
}

impl Debounce {
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn release_frames(&self) -> usize {
        self.release_frames
    }
}

/// The `feedback` section.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Feedback {
    /// How long the flash indicator stays lit after an event.
    flash: String,
}

impl Default for Feedback {
    fn default() -> Self {
        Feedback {
            flash: duration_string(DEFAULT_FLASH),
        }
    }
}

impl Feedback {
    pub fn flash(&self) -> Result<Duration, ConfigError> {
        duration(&self.flash)
    }
}

/// The complete airband configuration. Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Airband {
    kinematics: Kinematics,
    debounce: Debounce,
    feedback: Feedback,
    instruments: Instruments,
    dispatch: Dispatch,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Airband {
    /// Loads the configuration from an optional YAML file with environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Airband, ConfigError> {
        Airband::build(path, environment())
    }

    /// Parses the configuration from a YAML string without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Airband, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Airband>()?;
        config.validate()?;
        Ok(config)
    }

    fn build(path: Option<&Path>, environment: Environment) -> Result<Airband, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading config");
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<Airband>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let staleness = self.kinematics.staleness()?;
        let noise_floor = self.kinematics.noise_floor()?;
        if noise_floor >= staleness {
            return Err(ConfigError::invalid(
                "kinematics.noise_floor",
                format!(
                    "{} must be shorter than the staleness bound {}",
                    self.kinematics.noise_floor, self.kinematics.staleness
                ),
            ));
        }

        if self.debounce.buffer_size == 0 {
            return Err(ConfigError::invalid(
                "debounce.buffer_size",
                "must be at least 1",
            ));
        }
        let release_frames = self.debounce.release_frames;
        if release_frames == 0 || release_frames > self.debounce.buffer_size {
            return Err(ConfigError::invalid(
                "debounce.release_frames",
                format!(
                    "{} must be between 1 and the buffer size {}",
                    release_frames, self.debounce.buffer_size
                ),
            ));
        }

        self.feedback.flash()?;
        self.instruments.validate()?;
        self.instruments.cooldowns()?;
        self.dispatch.osc_relay()?;
        self.dispatch.json_relay()?;
        Ok(())
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn debounce(&self) -> &Debounce {
        &self.debounce
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut Dispatch {
        &mut self.dispatch
    }

    /// Builds a kinematics estimator from this configuration.
    pub fn estimator(&self) -> Result<Estimator, ConfigError> {
        Ok(Estimator::new(
            self.kinematics.staleness()?,
            self.kinematics.noise_floor()?,
        ))
    }

    /// The per-role cooldown table.
    pub fn cooldowns(&self) -> Result<Cooldowns, ConfigError> {
        self.instruments.cooldowns()
    }

    /// Builds an empty trigger registry from this configuration.
    pub fn trigger_registry(&self) -> Result<TriggerRegistry, ConfigError> {
        Ok(TriggerRegistry::new(
            self.cooldowns()?,
            self.debounce.buffer_size,
            self.debounce.release_frames,
        ))
    }

    pub fn instrument_settings(&self) -> InstrumentSettings {
        self.instruments.settings()
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io::Write};

    use super::*;
    use crate::instruments::{drums::StrikePolicy, Role};

    fn with_env(vars: &[(&str, &str)]) -> Result<Airband, ConfigError> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Airband::build(None, environment().source(Some(vars)))
    }

    #[test]
    fn test_empty_config_is_default() -> Result<(), Box<dyn Error>> {
        let config = Airband::from_yaml("")?;
        assert_eq!(Airband::default(), config);
        assert_eq!(DEFAULT_STALENESS, config.kinematics().staleness()?);
        assert_eq!(DEFAULT_NOISE_FLOOR, config.kinematics().noise_floor()?);
        assert_eq!(DEFAULT_FLASH, config.feedback().flash()?);
        assert_eq!(Cooldowns::default(), config.cooldowns()?);
        assert_eq!(InstrumentSettings::default(), config.instrument_settings());
        Ok(())
    }

    #[test]
    fn test_partial_config() -> Result<(), Box<dyn Error>> {
        let config = Airband::from_yaml(
            r#"
            kinematics:
              staleness: 500ms
            debounce:
              buffer_size: 5
              release_frames: 2
            instruments:
              drums:
                cooldown: 50ms
                strike_policy: either
                velocity_ceiling: 12.0
              pads:
                smoothing: 0.5
            dispatch:
              midi_device: IAC
              osc_relay: 127.0.0.1:9000
            "#,
        )?;

        assert_eq!(Duration::from_millis(500), config.kinematics().staleness()?);
        assert_eq!(DEFAULT_NOISE_FLOOR, config.kinematics().noise_floor()?);
        assert_eq!(5, config.debounce().buffer_size());
        assert_eq!(2, config.debounce().release_frames());

        let cooldowns = config.cooldowns()?;
        assert_eq!(Duration::from_millis(50), cooldowns.get(Role::Drums));
        assert_eq!(Cooldowns::default().get(Role::Piano), cooldowns.get(Role::Piano));
        assert_eq!(Cooldowns::default().get(Role::Pads), cooldowns.get(Role::Pads));

        let settings = config.instrument_settings();
        assert_eq!(StrikePolicy::Either, settings.drums.strike_policy);
        assert_eq!(12.0, settings.drums.velocity_ceiling);
        assert_eq!(drums_default().strike_threshold, settings.drums.strike_threshold);
        assert_eq!(0.5, settings.pads.smoothing);

        assert_eq!(Some("IAC"), config.dispatch().midi_device());
        assert_eq!(
            Some("127.0.0.1:9000".parse()?),
            config.dispatch().osc_relay()?
        );
        assert_eq!(None, config.dispatch().json_relay()?);
        Ok(())
    }

    fn drums_default() -> crate::instruments::drums::Settings {
        Default::default()
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            "kinematics:\n  noise_floor: 400ms\n",
            "kinematics:\n  staleness: forever\n",
            "debounce:\n  buffer_size: 2\n  release_frames: 3\n",
            "debounce:\n  release_frames: 0\n",
            "instruments:\n  drums:\n    velocity_ceiling: 0.0\n",
            "instruments:\n  piano:\n    tap_threshold: -1.0\n",
            "instruments:\n  pads:\n    smoothing: 0.0\n",
            "instruments:\n  pads:\n    min_extended: 6\n",
            "instruments:\n  guitar:\n    role_ratio: 0.5\n",
            "instruments:\n  theremin:\n    vibrato_damping: 1.0\n",
            "instruments:\n  bass:\n    cooldown: soon\n",
            "dispatch:\n  json_relay: nowhere\n",
        ];
        for yaml in cases {
            assert!(Airband::from_yaml(yaml).is_err(), "accepted {:?}", yaml);
        }
    }

    #[test]
    fn test_invalid_value_names_field() {
        match Airband::from_yaml("instruments:\n  strings:\n    speed_ceiling: 0.0\n") {
            Err(ConfigError::Invalid { field, .. }) => {
                assert_eq!("instruments.strings.speed_ceiling", field)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_environment_overrides() -> Result<(), Box<dyn Error>> {
        let config = with_env(&[
            ("AIRBAND_KINEMATICS__STALENESS", "250ms"),
            ("AIRBAND_DEBOUNCE__BUFFER_SIZE", "4"),
            ("AIRBAND_INSTRUMENTS__GUITAR__COOLDOWN", "90ms"),
            ("AIRBAND_INSTRUMENTS__GUITAR__STRUM_THRESHOLD", "2.5"),
            ("AIRBAND_DISPATCH__JSON_RELAY", "127.0.0.1:9001"),
        ])?;

        assert_eq!(Duration::from_millis(250), config.kinematics().staleness()?);
        assert_eq!(4, config.debounce().buffer_size());
        assert_eq!(Duration::from_millis(90), config.cooldowns()?.get(Role::Guitar));
        assert_eq!(2.5, config.instrument_settings().guitar.strum_threshold);
        assert_eq!(
            Some("127.0.0.1:9001".parse()?),
            config.dispatch().json_relay()?
        );
        Ok(())
    }

    #[test]
    fn test_load_file() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(file, "feedback:\n  flash: 250ms")?;

        let config = Airband::load(Some(file.path()))?;
        assert_eq!(Duration::from_millis(250), config.feedback().flash()?);
        Ok(())
    }

    #[test]
    fn test_defaults_round_trip_through_yaml() -> Result<(), Box<dyn Error>> {
        let yaml = serde_yml::to_string(&Airband::default())?;
        assert_eq!(Airband::default(), Airband::from_yaml(&yaml)?);
        Ok(())
    }

    #[test]
    fn test_built_components() -> Result<(), Box<dyn Error>> {
        let config = Airband::from_yaml("debounce:\n  buffer_size: 4\n")?;
        let registry = config.trigger_registry()?;
        assert!(registry.is_empty());
        assert_eq!(&config.cooldowns()?, registry.cooldowns());
        config.estimator()?;
        Ok(())
    }
}
