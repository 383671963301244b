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

//! Ambient pads. Opening the hand starts a pad, holding it open sustains and
//! closing or removing it releases. More open fingers means a denser pad.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{trigger_id, Classifier, Role};
use crate::events::{PadGesture, PadPhase, PerformanceEvent};
use crate::hands::{Finger, Handedness, Point3, TwoHandFrame};
use crate::trigger::TriggerRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fraction of the way the smoothed position moves towards the hand each
    /// frame, in (0, 1].
    pub smoothing: f32,
    /// Extended fingers needed to hold the pad.
    pub min_extended: usize,
    pub hand: Handedness,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smoothing: 0.3,
            min_extended: 2,
            hand: Handedness::Right,
        }
    }
}

#[derive(Debug)]
pub struct Pads {
    settings: Settings,
    active: bool,
    position: Option<Point3>,
}

impl Pads {
    pub fn new(settings: Settings) -> Pads {
        Pads {
            settings,
            active: false,
            position: None,
        }
    }

    fn gesture(
        phase: PadPhase,
        intensity: f32,
        position: Point3,
        timestamp: Duration,
    ) -> PerformanceEvent {
        PerformanceEvent::Pads(PadGesture {
            phase,
            intensity,
            position,
            timestamp,
        })
    }

    /// Releases a sounding pad at its last position.
    fn release(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let last = self.position.take();
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        vec![Self::gesture(PadPhase::Release, 0.0, last.unwrap_or_default(), timestamp)]
    }
}

impl Classifier for Pads {
    fn role(&self) -> Role {
        Role::Pads
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let Some(hand) = frame.preferred(self.settings.hand) else {
            if self.active {
                debug!("Pad hand lost");
            }
            return self.release(frame.timestamp);
        };

        let target = hand.wrist();
        let position = match self.position {
            Some(previous) => previous.lerp(&target, self.settings.smoothing),
            None => target,
        };
        self.position = Some(position);

        let extended = hand.extended_count();
        let intensity = extended as f32 / Finger::ALL.len() as f32;
        let open = extended >= self.settings.min_extended;

        match (self.active, open) {
            (false, true) => {
                let id = trigger_id(hand.handedness, Finger::Index, Role::Pads);
                if !triggers.can_trigger(&id, Role::Pads, frame.timestamp) {
                    return Vec::new();
                }
                debug!(intensity, "Pad started");
                self.active = true;
                vec![Self::gesture(PadPhase::Start, intensity, position, frame.timestamp)]
            }
            (true, true) => {
                vec![Self::gesture(PadPhase::Sustain, intensity, position, frame.timestamp)]
            }
            (true, false) => {
                debug!("Pad released");
                self.active = false;
                vec![Self::gesture(PadPhase::Release, intensity, position, frame.timestamp)]
            }
            (false, false) => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.active = false;
        self.position = None;
    }

    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let events = self.release(timestamp);
        self.reset();
        events
    }
}
