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

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_velocity, trigger_id, zone_of, Classifier, Role};
use crate::events::{BassPluck, PerformanceEvent, BASS_STRINGS};
use crate::hands::{Finger, TwoHandFrame};
use crate::trigger::TriggerRegistry;

/// Semitone offsets of the open E, A, D and G strings.
const OPEN_STRINGS: [u8; 4] = [0, 5, 10, 15];

/// Semitones from the low E to the open G.
pub const PITCH_SPAN: u8 = OPEN_STRINGS[3];

/// The semitone above the low E for a string.
pub fn semitone(string: usize) -> u8 {
    OPEN_STRINGS[string.min(OPEN_STRINGS.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum vertical fingertip speed for a pluck.
    pub pluck_threshold: f32,
    pub velocity_ceiling: f32,
    pub min_velocity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pluck_threshold: 1.5,
            velocity_ceiling: 8.0,
            min_velocity: 0.1,
        }
    }
}

/// Plucks a string with a fast vertical flick of either index finger. The
/// string is chosen by horizontal position.
#[derive(Debug)]
pub struct Bass {
    settings: Settings,
}

impl Bass {
    pub fn new(settings: Settings) -> Bass {
        Bass { settings }
    }
}

impl Classifier for Bass {
    fn role(&self) -> Role {
        Role::Bass
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
            let plucking = vy.abs() > self.settings.pluck_threshold;
            let id = trigger_id(hand.handedness, Finger::Index, Role::Bass);
            if !triggers.try_attack(&id, Role::Bass, plucking, frame.timestamp) {
                continue;
            }

            let string = zone_of(index.tip.x, BASS_STRINGS.len());
            let velocity = normalize_velocity(
                vy,
                self.settings.velocity_ceiling,
                self.settings.min_velocity,
            );
            debug!(hand = %hand.handedness, string = BASS_STRINGS[string], velocity, "Pluck");
            events.push(PerformanceEvent::Bass(BassPluck {
                hand: hand.handedness,
                string,
                velocity,
                position: index.tip,
                timestamp: frame.timestamp,
            }));
        }
        events
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hands::Handedness;
    use crate::testutil::{classify, ms, open_hand, RawFrameBuilder};

    #[test]
    fn test_pluck_strings() {
        let mut bass = Bass::new(Settings::default());
        let frames = [
            RawFrameBuilder::at(ms(0))
                .hand(open_hand(Handedness::Left, 0.1, 0.5))
                .hand(open_hand(Handedness::Right, 0.9, 0.5))
                .build(),
            RawFrameBuilder::at(ms(30))
                .hand(open_hand(Handedness::Left, 0.1, 0.6))
                .hand(open_hand(Handedness::Right, 0.9, 0.4))
                .build(),
        ];
        let events = classify(&mut bass, &frames);
        assert!(events[0].is_empty());
        let zones: Vec<String> = events[1].iter().map(|e| e.zone()).collect();
        assert_eq!(vec!["string-E", "string-G"], zones);
        assert!(events[1].iter().all(|e| e.velocity() >= 0.1 && e.velocity() <= 1.0));
    }

    #[test]
    fn test_cooldown_limits_repeated_plucks() {
        let mut bass = Bass::new(Settings::default());
        // Flick down, pause one frame, flick again within the cooldown.
        let frames = [
            RawFrameBuilder::at(ms(0))
                .hand(open_hand(Handedness::Left, 0.3, 0.5))
                .build(),
            RawFrameBuilder::at(ms(30))
                .hand(open_hand(Handedness::Left, 0.3, 0.6))
                .build(),
            RawFrameBuilder::at(ms(60))
                .hand(open_hand(Handedness::Left, 0.3, 0.6))
                .build(),
            RawFrameBuilder::at(ms(90))
                .hand(open_hand(Handedness::Left, 0.3, 0.7))
                .build(),
            RawFrameBuilder::at(ms(120))
                .hand(open_hand(Handedness::Left, 0.3, 0.7))
                .build(),
            RawFrameBuilder::at(ms(200))
                .hand(open_hand(Handedness::Left, 0.3, 0.9))
                .build(),
        ];
        let plucks: Vec<usize> = classify(&mut bass, &frames)
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(vec![0, 1, 0, 0, 0, 1], plucks);
    }

    #[test]
    fn test_semitones() {
        assert_eq!(15, PITCH_SPAN);
        assert_eq!(5, semitone(1));
        assert_eq!(15, semitone(9));
    }
}
