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

//! Air piano. Each extended finger tapping downwards holds a key. The left
//! hand covers keys 0 through 5 and the right hand keys 6 through 11.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_velocity, trigger_id, zone_of, Classifier, Role};
use crate::events::{KeyAction, PerformanceEvent, PianoKey};
use crate::hands::{Finger, Handedness, HandSample, Point3, TwoHandFrame};
use crate::trigger::TriggerRegistry;

/// Keys under each hand.
pub const KEYS_PER_HAND: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum downward fingertip speed that holds a key.
    pub tap_threshold: f32,
    pub velocity_ceiling: f32,
    pub min_velocity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tap_threshold: 0.8,
            velocity_ceiling: 6.0,
            min_velocity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeldKey {
    key: usize,
    position: Point3,
}

#[derive(Debug)]
pub struct Piano {
    settings: Settings,
    /// Keys held in the previous frame, by hand and finger.
    held: [[Option<HeldKey>; 5]; 2],
}

fn hand_slot(hand: Handedness) -> usize {
    match hand {
        Handedness::Left => 0,
        Handedness::Right => 1,
    }
}

/// The key under a fingertip.
pub fn key_at(hand: Handedness, x: f32) -> usize {
    hand_slot(hand) * KEYS_PER_HAND + zone_of(x, KEYS_PER_HAND)
}

impl Piano {
    pub fn new(settings: Settings) -> Piano {
        Piano {
            settings,
            held: [[None; 5]; 2],
        }
    }

    /// The keys currently held, in hand then finger order.
    pub fn held_keys(&self) -> Vec<usize> {
        self.held.iter().flatten().flatten().map(|h| h.key).collect()
    }

    fn release(
        hand: Handedness,
        finger: Finger,
        held: HeldKey,
        timestamp: Duration,
    ) -> PerformanceEvent {
        debug!(hand = %hand, finger = finger.as_str(), key = held.key, "Key released");
        PerformanceEvent::Piano(PianoKey {
            hand,
            finger,
            key: held.key,
            action: KeyAction::Release,
            velocity: 0.0,
            position: held.position,
            timestamp,
        })
    }

    fn process_hand(
        &mut self,
        handedness: Handedness,
        sample: Option<&HandSample>,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
        events: &mut Vec<PerformanceEvent>,
    ) {
        let slot = hand_slot(handedness);
        for finger in Finger::ALL {
            let previous = self.held[slot][finger.index()];
            let current = sample
                .and_then(|s| s.finger(finger))
                .filter(|f| f.extended && f.velocity.y > self.settings.tap_threshold);

            let Some(kinematics) = current else {
                if let Some(held) = previous {
                    events.push(Self::release(handedness, finger, held, frame.timestamp));
                    self.held[slot][finger.index()] = None;
                }
                continue;
            };

            let key = key_at(handedness, kinematics.tip.x);
            match previous {
                Some(held) if held.key == key => {
                    self.held[slot][finger.index()] = Some(HeldKey {
                        key,
                        position: kinematics.tip,
                    });
                    continue;
                }
                Some(held) => {
                    // Slid onto a neighbouring key.
                    events.push(Self::release(handedness, finger, held, frame.timestamp));
                    self.held[slot][finger.index()] = None;
                }
                None => {}
            }

            let id = trigger_id(handedness, finger, Role::Piano);
            if !triggers.can_trigger(&id, Role::Piano, frame.timestamp) {
                continue;
            }

            let velocity = normalize_velocity(
                kinematics.velocity.y,
                self.settings.velocity_ceiling,
                self.settings.min_velocity,
            );
            debug!(hand = %handedness, finger = finger.as_str(), key, velocity, "Key pressed");
            events.push(PerformanceEvent::Piano(PianoKey {
                hand: handedness,
                finger,
                key,
                action: KeyAction::Press,
                velocity,
                position: kinematics.tip,
                timestamp: frame.timestamp,
            }));
            self.held[slot][finger.index()] = Some(HeldKey {
                key,
                position: kinematics.tip,
            });
        }
    }
}

impl Classifier for Piano {
    fn role(&self) -> Role {
        Role::Piano
    }

    fn process(
        &mut self,
        frame: &TwoHandFrame,
        triggers: &mut TriggerRegistry,
    ) -> Vec<PerformanceEvent> {
        let mut events = Vec::new();
        for handedness in [Handedness::Left, Handedness::Right] {
            self.process_hand(
                handedness,
                frame.hand(handedness),
                frame,
                triggers,
                &mut events,
            );
        }
        events
    }

    fn reset(&mut self) {
        self.held = [[None; 5]; 2];
    }

    fn release_all(&mut self, timestamp: Duration) -> Vec<PerformanceEvent> {
        let mut events = Vec::new();
        for handedness in [Handedness::Left, Handedness::Right] {
            for finger in Finger::ALL {
                if let Some(held) = self.held[hand_slot(handedness)][finger.index()].take() {
                    events.push(Self::release(handedness, finger, held, timestamp));
                }
            }
        }
        events
    }
}
