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

//! Synthetic hands and frames for tests.

use std::{
    thread,
    time::{Duration, SystemTime},
};

use crate::events::PerformanceEvent;
use crate::hands::{Finger, Handedness, Point3, RawFrame, RawHand, WRIST};
use crate::instruments::Classifier;
use crate::kinematics::Estimator;
use crate::trigger::TriggerRegistry;

/// Landmark offsets relative to the index fingertip for an open, upright hand.
const OPEN_HAND: [(f32, f32); 21] = [
    (0.0, 0.30),
    (-0.04, 0.26),
    (-0.07, 0.22),
    (-0.10, 0.19),
    (-0.13, 0.16),
    (0.0, 0.15),
    (0.0, 0.09),
    (0.0, 0.04),
    (0.0, 0.0),
    (0.03, 0.15),
    (0.03, 0.08),
    (0.03, 0.03),
    (0.03, -0.01),
    (0.06, 0.16),
    (0.06, 0.10),
    (0.06, 0.06),
    (0.06, 0.03),
    (0.09, 0.18),
    (0.09, 0.13),
    (0.09, 0.10),
    (0.09, 0.08),
];

/// Shorthand for a millisecond duration.
pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// An open hand with every finger extended and the index fingertip at (x, y).
pub fn open_hand(handedness: Handedness, x: f32, y: f32) -> RawHand {
    RawHand::new(
        handedness,
        OPEN_HAND
            .iter()
            .map(|(dx, dy)| Point3::new(x + dx, y + dy, 0.0))
            .collect(),
    )
}

/// Folds a finger so it is no longer classified as extended.
pub fn curl(hand: &mut RawHand, finger: Finger) {
    match finger {
        Finger::Thumb => {
            let wrist_x = hand.landmarks[WRIST].x;
            hand.landmarks[finger.tip()].x = wrist_x;
        }
        _ => {
            let middle_y = hand.landmarks[finger.middle_joint()].y;
            hand.landmarks[finger.tip()].y = middle_y + 0.03;
        }
    }
}

/// An open hand with only the index finger extended.
pub fn pointing_hand(handedness: Handedness, x: f32, y: f32) -> RawHand {
    let mut hand = open_hand(handedness, x, y);
    for finger in [Finger::Thumb, Finger::Middle, Finger::Ring, Finger::Pinky] {
        curl(&mut hand, finger);
    }
    hand
}

/// A hand with the given number of extended fingers, counted from the index
/// finger towards the pinky and then the thumb.
pub fn hand_with_extended(handedness: Handedness, x: f32, y: f32, extended: usize) -> RawHand {
    let mut hand = open_hand(handedness, x, y);
    let order = [
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
        Finger::Thumb,
    ];
    for finger in order.iter().skip(extended) {
        curl(&mut hand, *finger);
    }
    hand
}

/// Builds raw frames.
pub struct RawFrameBuilder {
    frame: RawFrame,
}

impl RawFrameBuilder {
    pub fn at(timestamp: Duration) -> RawFrameBuilder {
        RawFrameBuilder {
            frame: RawFrame::new(Vec::new(), timestamp),
        }
    }

    pub fn hand(mut self, hand: RawHand) -> RawFrameBuilder {
        self.frame.hands.push(hand);
        self
    }

    pub fn build(self) -> RawFrame {
        self.frame
    }
}

/// Runs raw frames through a fresh estimator and registry into the classifier,
/// returning the events of each frame.
pub fn classify<C: Classifier>(
    classifier: &mut C,
    frames: &[RawFrame],
) -> Vec<Vec<PerformanceEvent>> {
    let mut estimator = Estimator::default();
    let mut triggers = TriggerRegistry::default();
    frames
        .iter()
        .map(|raw| classifier.process(&estimator.estimate(raw), &mut triggers))
        .collect()
}

/// Wait for the given predicate to return true or fail.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().unwrap_or_default();
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::is_extended;

    #[test]
    fn test_hand_with_extended() {
        for count in 0..=5 {
            let hand = hand_with_extended(Handedness::Left, 0.5, 0.5, count);
            let extended = Finger::ALL
                .iter()
                .filter(|finger| is_extended(&hand, **finger))
                .count();
            assert_eq!(count, extended);
        }
    }

    #[test]
    fn test_pointing_hand() {
        let hand = pointing_hand(Handedness::Right, 0.3, 0.3);
        assert!(is_extended(&hand, Finger::Index));
        assert!(!is_extended(&hand, Finger::Middle));
        assert!(!is_extended(&hand, Finger::Thumb));
    }
}
