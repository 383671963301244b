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

//! Continuous theremin control. Height sets pitch, horizontal position sets
//! volume and vertical shaking adds vibrato.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Classifier, Role};
use crate::events::{PerformanceEvent, ThereminControl};
use crate::hands::{Handedness, HandSample, Point3, TwoHandFrame};
use crate::trigger::TriggerRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub control_hand: Handedness,
    /// Use the other hand when the control hand is not tracked.
    pub fallback: bool,
    /// Fraction of the previous vibrato kept each frame, in [0, 1).
    pub vibrato_damping: f32,
    /// Scales smoothed vertical speed into vibrato depth.
    pub vibrato_gain: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            control_hand: Handedness::Right,
            fallback: true,
            vibrato_damping: 0.8,
            vibrato_gain: 0.5,
        }
    }
}

#[derive(Debug)]
pub struct Theremin {
    settings: Settings,
    active: bool,
    smoothed_speed: f32,
    last_pitch: f32,
    last_position: Point3,
}

impl Theremin {
    pub fn new(settings: Settings) -> Theremin {
        Theremin {
            settings,
            active: false,
            smoothed_speed: 0.0,
            last_pitch: 0.0,
            last_position: Point3::ZERO,
        }
    }

    fn control_hand<'a>(&self, frame: &'a TwoHandFrame) -> Option<&'a HandSample> {
        if self.settings.fallback {
            frame.preferred(self.settings.control_hand)
        } else {
            frame.hand(self.settings.control_hand)
        }
    }

    /// A single inactive event if the theremin was sounding.
    fn silence(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        self.smoothed_speed = 0.0;
        vec![PerformanceEvent::Theremin(ThereminControl {
            pitch: self.last_pitch,
            volume: 0.0,
            vibrato: 0.0,
            active: false,
            position: self.last_position,
            timestamp,
        })]
    }
}

impl Classifier for Theremin {
    fn role(&self) -> Role {
        Role::Theremin
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        _triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let Some(index) = self.control_hand(frame).and_then(|h| h.index_finger()) else {
            if self.active {
                debug!("Theremin hand lost");
            }
            return self.silence(frame.timestamp);
        };

        let damping = self.settings.vibrato_damping;
        self.smoothed_speed =
            damping * self.smoothed_speed + (1.0 - damping) * index.velocity.y.abs();

        let pitch = (1.0 - index.tip.y).clamp(0.0, 1.0);
        let volume = index.tip.x.clamp(0.0, 1.0);
        let vibrato = (self.smoothed_speed * self.settings.vibrato_gain).clamp(0.0, 1.0);

        self.active = true;
        self.last_pitch = pitch;
        self.last_position = index.tip;

        vec![PerformanceEvent::Theremin(ThereminControl {
            pitch,
            volume,
            vibrato,
            active: true,
            position: index.tip,
            timestamp: frame.timestamp,
        })]
    }

    fn reset(&mut self) {
        self.active = false;
        self.smoothed_speed = 0.0;
        self.last_pitch = 0.0;
        self.last_position = Point3::ZERO;
    }

    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let events = self.silence(timestamp);
        self.reset();
        events
    }
}
