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

//! Conducting a string section. Raising the index finger swells, a downbeat
//! accents and anything else sustains at an intensity set by how fast the
//! index fingertip moves.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{trigger_id, Classifier, Role};
use crate::events::{PerformanceEvent, StringsGesture, StringsKind};
use crate::hands::{Finger, Handedness, Point3, TwoHandFrame};
use crate::trigger::TriggerRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vertical fingertip speed that separates swells and accents from sustain.
    pub direction_threshold: f32,
    /// Fingertip speed that maps to full intensity.
    pub speed_ceiling: f32,
    pub conducting_hand: Handedness,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            direction_threshold: 1.0,
            speed_ceiling: 3.0,
            conducting_hand: Handedness::Right,
        }
    }
}

#[derive(Debug)]
pub struct Strings {
    settings: Settings,
    active: bool,
    last_position: Point3,
}

impl Strings {
    pub fn new(settings: Settings) -> Strings {
        Strings {
            settings,
            active: false,
            last_position: Point3::ZERO,
        }
    }

    /// A single release if the section was playing.
    fn release(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        vec![PerformanceEvent::Strings(StringsGesture {
            kind: StringsKind::Release,
            intensity: 0.0,
            spread: None,
            position: self.last_position,
            timestamp,
        })]
    }
}

/// Distance between both index fingertips, if both are tracked.
fn spread(frame: &TwoHandFrame) -> Option<f32> {
    let left = frame.left.as_ref()?.index_finger()?;
    let right = frame.right.as_ref()?.index_finger()?;
    Some(left.tip.planar_distance(&right.tip))
}

impl Classifier for Strings {
    fn role(&self) -> Role {
        Role::Strings
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let Some(hand) = frame.preferred(self.settings.conducting_hand) else {
            if self.active {
                debug!("Conducting hand lost");
            }
            return self.release(frame.timestamp);
        };
        let Some(index) = hand.index_finger() else {
            return Vec::new();
        };

        let vy = index.velocity.y;
        let threshold = self.settings.direction_threshold;
        let mut kind = if vy < -threshold {
            StringsKind::Swell
        } else if vy > threshold {
            StringsKind::Accent
        } else {
            StringsKind::Sustain
        };

        if kind != StringsKind::Sustain {
            let id = trigger_id(hand.handedness, Finger::Index, Role::Strings);
            if !triggers.can_trigger(&id, Role::Strings, frame.timestamp) {
                kind = StringsKind::Sustain;
            } else {
                debug!(kind = kind.as_str(), "Strings gesture");
            }
        }

        let intensity = if self.settings.speed_ceiling > 0.0 {
            (index.speed() / self.settings.speed_ceiling).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let position = index.tip;
        self.active = true;
        self.last_position = position;

        vec![PerformanceEvent::Strings(StringsGesture {
            kind,
            intensity,
            spread: spread(frame),
            position,
            timestamp: frame.timestamp,
        })]
    }

    fn reset(&mut self) {
        self.active = false;
        self.last_position = Point3::ZERO;
    }

    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let events = self.release(timestamp);
        self.reset();
        events
    }
}
