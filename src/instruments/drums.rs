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

//! Percussive strikes: a fast index-finger drop over one of five pads.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_velocity, trigger_id, Classifier, Role};
use crate::events::{DrumHit, DrumZone, PerformanceEvent};
use crate::hands::{Finger, TwoHandFrame};
use crate::trigger::TriggerRegistry;

/// Left edges of the snare, kick, tom and crash pads.
const ZONE_BOUNDARIES: [f32; 4] = [0.2, 0.4, 0.6, 0.8];

/// Which vertical directions count as a strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikePolicy {
    /// Only downward (increasing y) motion strikes.
    #[default]
    DownOnly,
    /// Fast motion in either vertical direction strikes.
    Either,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum vertical fingertip speed for a strike, in units per second.
    pub strike_threshold: f32,
    /// Speed that maps to full velocity.
    pub velocity_ceiling: f32,
    /// Lowest velocity reported for an accepted strike.
    pub min_velocity: f32,
    pub strike_policy: StrikePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strike_threshold: 2.0,
            velocity_ceiling: 10.0,
            min_velocity: 0.1,
            strike_policy: StrikePolicy::DownOnly,
        }
    }
}

/// Maps a horizontal position to a drum pad. Every value, including those
/// outside [0, 1], maps to exactly one pad.
pub fn zone_at(x: f32) -> DrumZone {
    let index = ZONE_BOUNDARIES.iter().filter(|edge| x >= **edge).count();
    DrumZone::ALL[index]
}

#[derive(Debug)]
pub struct Drums {
    settings: Settings,
}

impl Drums {
    pub fn new(settings: Settings) -> Drums {
        Drums { settings }
    }

    fn is_strike(&self, vy: f32) -> bool {
        match self.settings.strike_policy {
            StrikePolicy::DownOnly => vy > self.settings.strike_threshold,
            StrikePolicy::Either => vy.abs() > self.settings.strike_threshold,
        }
    }
}

impl Classifier for Drums {
    fn role(&self) -> Role {
        Role::Drums
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let mut events = Vec::new();
        for hand in frame.hands() {
            let Some(index) = hand.index_finger() else {
                continue;
            };

            let vy = index.velocity.y;
            let id = trigger_id(hand.handedness, Finger::Index, Role::Drums);
            if !triggers.try_attack(&id, Role::Drums, self.is_strike(vy), frame.timestamp) {
                continue;
            }

            let zone = zone_at(index.tip.x);
            let velocity = normalize_velocity(
                vy,
                self.settings.velocity_ceiling,
                self.settings.min_velocity,
            );
            debug!(hand = %hand.handedness, zone = zone.as_str(), velocity, "Drum hit");
            events.push(PerformanceEvent::Drum(DrumHit {
                hand: hand.handedness,
                zone,
                velocity,
                position: index.tip,
                timestamp: frame.timestamp,
            }));
        }
        events
    }

    fn reset(&mut self) {}
}
