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

//! Performance events emitted by the gesture classifiers.

use std::time::Duration;

use serde::Serialize;

use crate::hands::{Finger, Handedness, Point3};
use crate::instruments::Role;

/// The five drum pads, left to right across the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumZone {
    HiHat,
    Snare,
    Kick,
    Tom,
    Crash,
}

impl DrumZone {
    pub const ALL: [DrumZone; 5] = [
        DrumZone::HiHat,
        DrumZone::Snare,
        DrumZone::Kick,
        DrumZone::Tom,
        DrumZone::Crash,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiHat => "hihat",
            Self::Snare => "snare",
            Self::Kick => "kick",
            Self::Tom => "tom",
            Self::Crash => "crash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrumDirection {
    Down,
    Up,
}

impl StrumDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringsKind {
    Swell,
    Accent,
    Sustain,
    Release,
}

impl StringsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swell => "swell",
            Self::Accent => "accent",
            Self::Sustain => "sustain",
            Self::Release => "release",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PadPhase {
    Start,
    Sustain,
    Release,
}

impl PadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Sustain => "sustain",
            Self::Release => "release",
        }
    }
}

/// Open-string names for the bass, low to high.
pub const BASS_STRINGS: [&str; 4] = ["E", "A", "D", "G"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrumHit {
    pub hand: Handedness,
    pub zone: DrumZone,
    pub velocity: f32,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PianoKey {
    pub hand: Handedness,
    pub finger: Finger,
    /// Key index, 0 through 11.
    pub key: usize,
    pub action: KeyAction,
    pub velocity: f32,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuitarStrum {
    pub direction: StrumDirection,
    pub strum_hand: Handedness,
    /// String index, 0 through 5.
    pub string: usize,
    /// Fret position, 0 through 12.
    pub fret: usize,
    pub velocity: f32,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BassPluck {
    pub hand: Handedness,
    /// String index into [`BASS_STRINGS`].
    pub string: usize,
    pub velocity: f32,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThereminControl {
    pub pitch: f32,
    pub volume: f32,
    pub vibrato: f32,
    pub active: bool,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringsGesture {
    pub kind: StringsKind,
    pub intensity: f32,
    /// Distance between both index fingertips, when both hands are tracked.
    pub spread: Option<f32>,
    pub position: Point3,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadGesture {
    pub phase: PadPhase,
    pub intensity: f32,
    pub position: Point3,
    pub timestamp: Duration,
}

/// A single performance event. Events are plain values: produced by a
/// classifier, handed to the dispatcher and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "instrument", rename_all = "lowercase")]
pub enum PerformanceEvent {
    Drum(DrumHit),
    Piano(PianoKey),
    Guitar(GuitarStrum),
    Bass(BassPluck),
    Theremin(ThereminControl),
    Strings(StringsGesture),
    Pads(PadGesture),
}

impl PerformanceEvent {
    pub fn role(&self) -> Role {
        match self {
            Self::Drum(_) => Role::Drums,
            Self::Piano(_) => Role::Piano,
            Self::Guitar(_) => Role::Guitar,
            Self::Bass(_) => Role::Bass,
            Self::Theremin(_) => Role::Theremin,
            Self::Strings(_) => Role::Strings,
            Self::Pads(_) => Role::Pads,
        }
    }

    /// The event's velocity in [0, 1]. Continuous instruments report volume or
    /// intensity here.
    pub fn velocity(&self) -> f32 {
        match self {
            Self::Drum(e) => e.velocity,
            Self::Piano(e) => e.velocity,
            Self::Guitar(e) => e.velocity,
            Self::Bass(e) => e.velocity,
            Self::Theremin(e) => e.volume,
            Self::Strings(e) => e.intensity,
            Self::Pads(e) => e.intensity,
        }
    }

    pub fn timestamp(&self) -> Duration {
        match self {
            Self::Drum(e) => e.timestamp,
            Self::Piano(e) => e.timestamp,
            Self::Guitar(e) => e.timestamp,
            Self::Bass(e) => e.timestamp,
            Self::Theremin(e) => e.timestamp,
            Self::Strings(e) => e.timestamp,
            Self::Pads(e) => e.timestamp,
        }
    }

    /// Where the gesture happened, in normalized screen space.
    pub fn position(&self) -> Point3 {
        match self {
            Self::Drum(e) => e.position,
            Self::Piano(e) => e.position,
            Self::Guitar(e) => e.position,
            Self::Bass(e) => e.position,
            Self::Theremin(e) => e.position,
            Self::Strings(e) => e.position,
            Self::Pads(e) => e.position,
        }
    }

    /// A short label for the zone or gesture subtype.
    pub fn zone(&self) -> String {
        match self {
            Self::Drum(e) => e.zone.as_str().to_string(),
            Self::Piano(e) => match e.action {
                KeyAction::Press => format!("key-{}", e.key),
                KeyAction::Release => format!("key-{}-release", e.key),
            },
            Self::Guitar(e) => format!(
                "{}-string-{}-fret-{}",
                e.direction.as_str(),
                e.string,
                e.fret
            ),
            Self::Bass(e) => format!("string-{}", BASS_STRINGS[e.string.min(3)]),
            Self::Theremin(e) => if e.active { "active" } else { "inactive" }.to_string(),
            Self::Strings(e) => e.kind.as_str().to_string(),
            Self::Pads(e) => e.phase.as_str().to_string(),
        }
    }

    /// True for events that end a sounding note.
    pub fn is_release(&self) -> bool {
        match self {
            Self::Piano(e) => e.action == KeyAction::Release,
            Self::Theremin(e) => !e.active,
            Self::Strings(e) => e.kind == StringsKind::Release,
            Self::Pads(e) => e.phase == PadPhase::Release,
            Self::Drum(_) | Self::Guitar(_) | Self::Bass(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::ms;

    #[test]
    fn test_zone_labels() {
        let hit = PerformanceEvent::Drum(DrumHit {
            hand: Handedness::Left,
            zone: DrumZone::HiHat,
            velocity: 0.5,
            position: Point3::new(0.1, 0.8, 0.0),
            timestamp: ms(50),
        });
        assert_eq!("hihat", hit.zone());
        assert_eq!(Role::Drums, hit.role());
        assert_eq!(0.5, hit.velocity());
        assert!(!hit.is_release());

        let release = PerformanceEvent::Piano(PianoKey {
            hand: Handedness::Right,
            finger: Finger::Middle,
            key: 7,
            action: KeyAction::Release,
            velocity: 0.0,
            position: Point3::ZERO,
            timestamp: ms(0),
        });
        assert_eq!("key-7-release", release.zone());
        assert!(release.is_release());

        let strum = PerformanceEvent::Guitar(GuitarStrum {
            direction: StrumDirection::Up,
            strum_hand: Handedness::Right,
            string: 2,
            fret: 5,
            velocity: 1.0,
            position: Point3::ZERO,
            timestamp: ms(0),
        });
        assert_eq!("up-string-2-fret-5", strum.zone());

        let pluck = PerformanceEvent::Bass(BassPluck {
            hand: Handedness::Left,
            string: 1,
            velocity: 1.0,
            position: Point3::ZERO,
            timestamp: ms(0),
        });
        assert_eq!("string-A", pluck.zone());
    }

    #[test]
    fn test_serialize_tagged() -> Result<(), serde_json::Error> {
        let event = PerformanceEvent::Pads(PadGesture {
            phase: PadPhase::Start,
            intensity: 0.4,
            position: Point3::new(0.5, 0.5, 0.0),
            timestamp: ms(10),
        });
        let json = serde_json::to_value(&event)?;
        assert_eq!("pads", json["instrument"]);
        assert_eq!("start", json["phase"]);
        Ok(())
    }
}
