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

//! Two-handed strumming. One hand strums horizontally while the other picks
//! the fret by height. Which hand does what is inferred from their speeds.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{normalize_velocity, trigger_id, zone_of, Classifier, Role};
use crate::events::{GuitarStrum, PerformanceEvent, StrumDirection};
use crate::hands::{Finger, Handedness, TwoHandFrame};
use crate::trigger::TriggerRegistry;

pub const STRING_COUNT: usize = 6;
pub const FRET_COUNT: usize = 13;

/// Semitone offsets of the open strings in standard tuning, low E first.
const OPEN_STRINGS: [u8; STRING_COUNT] = [0, 5, 10, 15, 19, 24];

/// Semitones from the lowest open string to the highest fretted note.
pub const PITCH_SPAN: u8 = OPEN_STRINGS[STRING_COUNT - 1] + (FRET_COUNT as u8 - 1);

/// The semitone above the low open string for a string and fret.
pub fn semitone(string: usize, fret: usize) -> u8 {
    OPEN_STRINGS[string.min(STRING_COUNT - 1)] + fret.min(FRET_COUNT - 1) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum horizontal fingertip speed of the strumming hand.
    pub strum_threshold: f32,
    pub velocity_ceiling: f32,
    pub min_velocity: f32,
    /// How many times faster one hand must move to take over strumming.
    pub role_ratio: f32,
    /// Speeds below this never reassign hands.
    pub role_min_speed: f32,
    /// The hand that strums until the performer shows otherwise.
    pub initial_strum_hand: Handedness,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strum_threshold: 1.5,
            velocity_ceiling: 8.0,
            min_velocity: 0.1,
            role_ratio: 1.5,
            role_min_speed: 0.05,
            initial_strum_hand: Handedness::Right,
        }
    }
}

#[derive(Debug)]
pub struct Guitar {
    settings: Settings,
    strum_hand: Handedness,
}

impl Guitar {
    pub fn new(settings: Settings) -> Guitar {
        let strum_hand = settings.initial_strum_hand;
        Guitar {
            settings,
            strum_hand,
        }
    }

    /// The hand currently assigned to strumming.
    pub fn strum_hand(&self) -> Handedness {
        self.strum_hand
    }

    /// Reassigns the strumming hand when one hand is clearly faster than the
    /// other. Otherwise the current assignment holds.
    fn update_roles(&mut self, left_speed: f32, right_speed: f32) {
        let ratio = self.settings.role_ratio;
        let min_speed = self.settings.role_min_speed;

        let candidate = if right_speed > min_speed && right_speed >= left_speed * ratio {
            Some(Handedness::Right)
        } else if left_speed > min_speed && left_speed >= right_speed * ratio {
            Some(Handedness::Left)
        } else {
            None
        };

        if let Some(hand) = candidate {
            if hand != self.strum_hand {
                info!(strum_hand = %hand, "Guitar hands swapped");
                self.strum_hand = hand;
            }
        }
    }
}

impl Classifier for Guitar {
    fn role(&self) -> Role {
        Role::Guitar
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let (Some(left), Some(right)) = (
            frame.left.as_ref().and_then(|h| h.index_finger()),
            frame.right.as_ref().and_then(|h| h.index_finger()),
        ) else {
            return Vec::new();
        };

        self.update_roles(left.speed(), right.speed());
        let (strum, fret) = match self.strum_hand {
            Handedness::Left => (left, right),
            Handedness::Right => (right, left),
        };

        let vx = strum.velocity.x;
        let striking = vx.abs() > self.settings.strum_threshold;
        let direction = if vx > 0.0 {
            StrumDirection::Down
        } else {
            StrumDirection::Up
        };

        let id = trigger_id(self.strum_hand, Finger::Index, Role::Guitar);
        let clean = triggers.register_contact(&id, striking);
        if !striking {
            return Vec::new();
        }
        // A reversal mid-stroke counts as a fresh strum.
        let reversed = triggers.should_retrigger(&id, direction as usize);
        if !(clean || reversed) || !triggers.can_trigger(&id, Role::Guitar, frame.timestamp) {
            return Vec::new();
        }

        let string = zone_of(strum.tip.y, STRING_COUNT);
        let fret = zone_of(fret.tip.y, FRET_COUNT);
        let velocity = normalize_velocity(
            vx,
            self.settings.velocity_ceiling,
            self.settings.min_velocity,
        );
        debug!(direction = direction.as_str(), string, fret, velocity, "Strum");

        vec![PerformanceEvent::Guitar(GuitarStrum {
            direction,
            strum_hand: self.strum_hand,
            string,
            fret,
            velocity,
            position: strum.tip,
            timestamp: frame.timestamp,
        })]
    }

    fn reset(&mut self) {
        self.strum_hand = self.settings.initial_strum_hand;
    }
}
