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

//! Velocity and acceleration estimation from successive landmark samples.
//!
//! Only one previous snapshot per hand is retained. Velocities are in
//! normalized units per second.

use std::time::Duration;

use tracing::{debug, trace};

use crate::hands::{
    Finger, FingerKinematics, HandSample, Handedness, Point3, RawFrame, RawHand, TwoHandFrame,
    WRIST,
};

/// Default gap after which a hand is considered to have lost tracking.
pub const DEFAULT_STALENESS: Duration = Duration::from_millis(300);

/// Default minimum spacing between samples that are used for estimation.
pub const DEFAULT_NOISE_FLOOR: Duration = Duration::from_millis(10);

/// The cached state for a single fingertip.
#[derive(Debug, Clone, Copy)]
struct TipHistory {
    position: Point3,
    velocity: Point3,
}

/// The single retained snapshot for a hand.
#[derive(Debug, Clone)]
struct HandHistory {
    timestamp: Duration,
    wrist: Point3,
    velocity: Point3,
    acceleration: Point3,
    tips: [Option<TipHistory>; 5],
}

impl HandHistory {
    /// Starts a fresh history at the given sample with zero kinematics.
    fn start(hand: &RawHand, wrist: Point3, timestamp: Duration) -> HandHistory {
        HandHistory {
            timestamp,
            wrist,
            velocity: Point3::ZERO,
            acceleration: Point3::ZERO,
            tips: Finger::ALL.map(|finger| {
                hand.landmark(finger.tip()).map(|position| TipHistory {
                    position,
                    velocity: Point3::ZERO,
                })
            }),
        }
    }
}

/// Estimates hand and fingertip kinematics frame to frame.
#[derive(Debug)]
pub struct Estimator {
    staleness: Duration,
    noise_floor: Duration,
    left: Option<HandHistory>,
    right: Option<HandHistory>,
}

impl Default for Estimator {
    fn default() -> Self {
        Estimator::new(DEFAULT_STALENESS, DEFAULT_NOISE_FLOOR)
    }
}

impl Estimator {
    /// Creates a new estimator.
    pub fn new(staleness: Duration, noise_floor: Duration) -> Estimator {
        Estimator {
            staleness,
            noise_floor,
            left: None,
            right: None,
        }
    }

    /// Drops all cached history.
    pub fn reset(&mut self) {
        self.left = None;
        self.right = None;
    }

    /// Converts a raw tracker frame into a kinematic snapshot of both hands.
    pub fn estimate(&mut self, raw: &RawFrame) -> TwoHandFrame {
        let left = self.estimate_hand(raw, Handedness::Left);
        let right = self.estimate_hand(raw, Handedness::Right);
        TwoHandFrame {
            left,
            right,
            timestamp: raw.timestamp,
        }
    }

    fn estimate_hand(&mut self, raw: &RawFrame, handedness: Handedness) -> Option<HandSample> {
        let (staleness, noise_floor) = (self.staleness, self.noise_floor);
        let history = match handedness {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        };

        let Some(hand) = raw.hand(handedness) else {
            *history = None;
            return None;
        };

        // Without a wrist there is no hand-level reference for this frame.
        let Some(wrist) = hand.landmark(WRIST) else {
            debug!(hand = %handedness, "Hand reported without a wrist, skipping");
            *history = None;
            return None;
        };

        let now = raw.timestamp;
        let Some(previous) = history.as_mut() else {
            let fresh = HandHistory::start(hand, wrist, now);
            let sample = build_sample(hand, &fresh);
            *history = Some(fresh);
            return Some(sample);
        };

        let elapsed = match now.checked_sub(previous.timestamp) {
            Some(elapsed) if elapsed >= noise_floor => elapsed,
            _ => {
                trace!(hand = %handedness, "Sample under the noise floor, carrying kinematics");
                return Some(build_sample(hand, previous));
            }
        };

        if elapsed > staleness {
            debug!(
                hand = %handedness,
                elapsed_ms = elapsed.as_millis() as u64,
                "Tracking gap exceeded staleness bound, resetting"
            );
            *previous = HandHistory::start(hand, wrist, now);
            return Some(build_sample(hand, previous));
        }

        let dt = elapsed.as_secs_f32();
        let velocity = (wrist - previous.wrist) / dt;
        let acceleration = (velocity - previous.velocity) / dt;

        let mut tips = [None; 5];
        for finger in Finger::ALL {
            let i = finger.index();
            tips[i] = hand.landmark(finger.tip()).map(|position| {
                let velocity = previous.tips[i]
                    .map(|tip| (position - tip.position) / dt)
                    .unwrap_or(Point3::ZERO);
                TipHistory { position, velocity }
            });
        }

        *previous = HandHistory {
            timestamp: now,
            wrist,
            velocity,
            acceleration,
            tips,
        };
        Some(build_sample(hand, previous))
    }
}

/// Builds the sample for this frame using the current landmarks and the
/// kinematics held in the history.
fn build_sample(hand: &RawHand, history: &HandHistory) -> HandSample {
    let fingers = Finger::ALL.map(|finger| {
        let tip = hand.landmark(finger.tip())?;
        let velocity = history.tips[finger.index()]
            .map(|t| t.velocity)
            .unwrap_or(Point3::ZERO);
        Some(FingerKinematics {
            tip,
            extended: is_extended(hand, finger),
            velocity,
        })
    });

    HandSample {
        handedness: hand.handedness,
        landmarks: hand.landmarks.clone(),
        fingers,
        velocity: history.velocity,
        acceleration: history.acceleration,
    }
}

/// Classifies whether a finger is extended. The thumb is extended when its tip
/// is farther from the wrist along x than its base knuckle. The other fingers
/// are extended when tip, middle joint and base joint climb monotonically.
pub fn is_extended(hand: &RawHand, finger: Finger) -> bool {
    let tip = hand.landmark(finger.tip());
    match finger {
        Finger::Thumb => {
            let (Some(wrist), Some(tip), Some(knuckle)) = (
                hand.landmark(WRIST),
                tip,
                hand.landmark(finger.middle_joint()),
            ) else {
                return false;
            };
            (tip.x - wrist.x).abs() > (knuckle.x - wrist.x).abs()
        }
        _ => {
            let (Some(tip), Some(middle), Some(base)) = (
                tip,
                hand.landmark(finger.middle_joint()),
                hand.landmark(finger.base_joint()),
            ) else {
                return false;
            };
            tip.y < middle.y && middle.y < base.y
        }
    }
}
