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

use duration_string::DurationString;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::instruments::{
    bass, drums, guitar, pads, piano, strings, theremin, InstrumentSettings, Role,
};
use crate::trigger::Cooldowns;

/// One instrument's tunables plus its trigger cooldown.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Instrument<S> {
    /// Minimum time between two triggers from the same gesture source.
    cooldown: Option<String>,

    /// Flattened so that the classifier settings appear at the instrument level in YAML.
    #[serde(flatten)]
    settings: S,
}

impl<S> Instrument<S> {
    fn with_default_cooldown(role: Role, settings: S) -> Instrument<S> {
        Instrument {
            cooldown: Some(DurationString::from(Cooldowns::default().get(role)).to_string()),
            settings,
        }
    }

    /// Returns the cooldown, if configured.
    pub fn cooldown(&self) -> Result<Option<std::time::Duration>, ConfigError> {
        match &self.cooldown {
            Some(cooldown) => Ok(Some(DurationString::from_string(cooldown.clone())?.into())),
            None => Ok(None),
        }
    }
}

/// The `instruments` section, one entry per role.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Instruments {
    drums: Instrument<drums::Settings>,
    piano: Instrument<piano::Settings>,
    guitar: Instrument<guitar::Settings>,
    bass: Instrument<bass::Settings>,
    theremin: Instrument<theremin::Settings>,
    strings: Instrument<strings::Settings>,
    pads: Instrument<pads::Settings>,
}

impl Default for Instruments {
    fn default() -> Self {
        Instruments {
            drums: Instrument::with_default_cooldown(Role::Drums, Default::default()),
            piano: Instrument::with_default_cooldown(Role::Piano, Default::default()),
            guitar: Instrument::with_default_cooldown(Role::Guitar, Default::default()),
            bass: Instrument::with_default_cooldown(Role::Bass, Default::default()),
            theremin: Instrument::with_default_cooldown(Role::Theremin, Default::default()),
            strings: Instrument::with_default_cooldown(Role::Strings, Default::default()),
            pads: Instrument::with_default_cooldown(Role::Pads, Default::default()),
        }
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must be positive", value)))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must not be negative", value)))
    }
}

fn unit(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must be within [0, 1]", value)))
    }
}

impl Instruments {
    /// Gets the classifier settings for every role.
    pub fn settings(&self) -> InstrumentSettings {
        InstrumentSettings {
            drums: self.drums.settings.clone(),
            piano: self.piano.settings.clone(),
            guitar: self.guitar.settings.clone(),
            bass: self.bass.settings.clone(),
            theremin: self.theremin.settings.clone(),
            strings: self.strings.settings.clone(),
            pads: self.pads.settings.clone(),
        }
    }

    /// Gets the cooldown table. Roles without a configured cooldown keep the default.
    pub fn cooldowns(&self) -> Result<Cooldowns, ConfigError> {
        let mut cooldowns = Cooldowns::default();
        let configured = [
            (Role::Drums, self.drums.cooldown()?),
            (Role::Piano, self.piano.cooldown()?),
            (Role::Guitar, self.guitar.cooldown()?),
            (Role::Bass, self.bass.cooldown()?),
            (Role::Theremin, self.theremin.cooldown()?),
            (Role::Strings, self.strings.cooldown()?),
            (Role::Pads, self.pads.cooldown()?),
        ];
        for (role, cooldown) in configured {
            if let Some(cooldown) = cooldown {
                cooldowns.set(role, cooldown);
            }
        }
        Ok(cooldowns)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let drums = &self.drums.settings;
        non_negative("instruments.drums.strike_threshold", drums.strike_threshold)?;
        positive("instruments.drums.velocity_ceiling", drums.velocity_ceiling)?;
        unit("instruments.drums.min_velocity", drums.min_velocity)?;

        let piano = &self.piano.settings;
        non_negative("instruments.piano.tap_threshold", piano.tap_threshold)?;
        positive("instruments.piano.velocity_ceiling", piano.velocity_ceiling)?;
        unit("instruments.piano.min_velocity", piano.min_velocity)?;

        let guitar = &self.guitar.settings;
        non_negative("instruments.guitar.strum_threshold", guitar.strum_threshold)?;
        positive("instruments.guitar.velocity_ceiling", guitar.velocity_ceiling)?;
        unit("instruments.guitar.min_velocity", guitar.min_velocity)?;
        non_negative("instruments.guitar.role_min_speed", guitar.role_min_speed)?;
        if guitar.role_ratio < 1.0 {
            return Err(ConfigError::invalid(
                "instruments.guitar.role_ratio",
                format!("{} must be at least 1", guitar.role_ratio),
            ));
        }

        let bass = &self.bass.settings;
        non_negative("instruments.bass.pluck_threshold", bass.pluck_threshold)?;
        positive("instruments.bass.velocity_ceiling", bass.velocity_ceiling)?;
        unit("instruments.bass.min_velocity", bass.min_velocity)?;

        let theremin = &self.theremin.settings;
        non_negative("instruments.theremin.vibrato_gain", theremin.vibrato_gain)?;
        if !(0.0..1.0).contains(&theremin.vibrato_damping) {
            return Err(ConfigError::invalid(
                "instruments.theremin.vibrato_damping",
                format!("{} must be within [0, 1)", theremin.vibrato_damping),
            ));
        }

        let strings = &self.strings.settings;
        non_negative(
            "instruments.strings.direction_threshold",
            strings.direction_threshold,
        )?;
        positive("instruments.strings.speed_ceiling", strings.speed_ceiling)?;

        let pads = &self.pads.settings;
        if !(pads.smoothing > 0.0 && pads.smoothing <= 1.0) {
            return Err(ConfigError::invalid(
                "instruments.pads.smoothing",
                format!("{} must be within (0, 1]", pads.smoothing),
            ));
        }
        if !(1..=5).contains(&pads.min_extended) {
            return Err(ConfigError::invalid(
                "instruments.pads.min_extended",
                format!("{} must be between 1 and 5", pads.min_extended),
            ));
        }

        Ok(())
    }
}
