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

//! Instrument gesture classifiers.
//!
//! Each classifier consumes the two-hand kinematic snapshot for a frame along
//! with its own retained state and emits zero or more performance events.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::events::PerformanceEvent;
use crate::hands::{Finger, Handedness, TwoHandFrame};
use crate::trigger::TriggerRegistry;

pub mod bass;
pub mod drums;
pub mod guitar;
pub mod pads;
pub mod piano;
pub mod strings;
pub mod theremin;

/// The instrument a performer is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Drums,
    Piano,
    Guitar,
    Bass,
    Theremin,
    Strings,
    Pads,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Drums,
        Role::Piano,
        Role::Guitar,
        Role::Bass,
        Role::Theremin,
        Role::Strings,
        Role::Pads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drums => "drums",
            Self::Piano => "piano",
            Self::Guitar => "guitar",
            Self::Bass => "bass",
            Self::Theremin => "theremin",
            Self::Strings => "strings",
            Self::Pads => "pads",
        }
    }

    /// The number of semitones covered by a synth pitch value going from 0 to 1.
    pub fn pitch_span(&self) -> u8 {
        match self {
            Self::Drums => 4,
            Self::Piano => 11,
            Self::Guitar => guitar::PITCH_SPAN,
            Self::Bass => bass::PITCH_SPAN,
            Self::Theremin | Self::Strings | Self::Pads => 24,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown instrument {}", s))
    }
}

/// A gesture classifier for one instrument.
pub trait Classifier {
    /// The instrument this classifier plays.
    fn role(&self) -> Role;

    /// Classifies one frame. Missing hands or fingers produce no events.
    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent>;

    /// Clears all retained state.
    fn reset(&mut self);

    /// Ends every gesture that is still sounding and clears all retained
    /// state. Returns the terminal events, stamped with `timestamp`.
    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let _ = timestamp;
        self.reset();
        Vec::new()
    }
}

/// Tunables for every instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentSettings {
    pub drums: drums::Settings,
    pub piano: piano::Settings,
    pub guitar: guitar::Settings,
    pub bass: bass::Settings,
    pub theremin: theremin::Settings,
    pub strings: strings::Settings,
    pub pads: pads::Settings,
}

/// The active classifier.
#[derive(Debug)]
pub enum Instrument {
    Drums(drums::Drums),
    Piano(piano::Piano),
    Guitar(guitar::Guitar),
    Bass(bass::Bass),
    Theremin(theremin::Theremin),
    Strings(strings::Strings),
    Pads(pads::Pads),
}

impl Instrument {
    /// Creates the classifier for the given role.
    pub fn new(role: Role, settings: &InstrumentSettings) -> Instrument {
        match role {
            Role::Drums => Instrument::Drums(drums::Drums::new(settings.drums.clone())),
            Role::Piano => Instrument::Piano(piano::Piano::new(settings.piano.clone())),
            Role::Guitar => Instrument::Guitar(guitar::Guitar::new(settings.guitar.clone())),
            Role::Bass => Instrument::Bass(bass::Bass::new(settings.bass.clone())),
            Role::Theremin => {
                Instrument::Theremin(theremin::Theremin::new(settings.theremin.clone()))
            }
            Role::Strings => Instrument::Strings(strings::Strings::new(settings.strings.clone())),
            Role::Pads => Instrument::Pads(pads::Pads::new(settings.pads.clone())),
        }
    }

    fn classifier(&mut self) -> &mut dyn Classifier {
        match self {
            Instrument::Drums(c) => c,
            Instrument::Piano(c) => c,
            Instrument::Guitar(c) => c,
            Instrument::Bass(c) => c,
            Instrument::Theremin(c) => c,
            Instrument::Strings(c) => c,
            Instrument::Pads(c) => c,
        }
    }
}

impl Classifier for Instrument {
    fn role(&self) -> Role {
        match self {
            Instrument::Drums(c) => c.role(),
            Instrument::Piano(c) => c.role(),
            Instrument::Guitar(c) => c.role(),
            Instrument::Bass(c) => c.role(),
            Instrument::Theremin(c) => c.role(),
            Instrument::Strings(c) => c.role(),
            Instrument::Pads(c) => c.role(),
        }
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        self.classifier().process(frame, triggers)
    }

    fn reset(&mut self) {
        self.classifier().reset()
    }

    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        self.classifier().release_all(timestamp)
    }
}

/// Splits a normalized value into `count` equal zones, clamping out of range
/// values into the first or last zone.
pub(crate) fn zone_of(value: f32, count: usize) -> usize {
    if count == 0 || value.is_nan() {
        return 0;
    }
    let scaled = (value.clamp(0.0, 1.0) * count as f32).floor() as usize;
    scaled.min(count - 1)
}

/// Scales a speed into a velocity in [floor, 1].
pub(crate) fn normalize_velocity(speed: f32, ceiling: f32, floor: f32) -> f32 {
    if ceiling <= 0.0 || speed.is_nan() {
        return floor;
    }
    (speed.abs() / ceiling).clamp(floor, 1.0)
}

/// The trigger-control identifier for a gesture source.
pub(crate) fn trigger_id(hand: Handedness, finger: Finger, role: Role) -> String {
    format!("{}-{}-{}", hand, finger.as_str(), role)
}
