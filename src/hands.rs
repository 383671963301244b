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

//! Hand pose data as delivered by the tracker and as seen by the classifiers.

use std::{fmt, ops, time::Duration};

use serde::{Deserialize, Serialize};

/// Number of landmarks in a fully tracked hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark index of the wrist.
pub const WRIST: usize = 0;

/// A point in normalized tracker space. x and y are in [0, 1] with y growing
/// downwards; z is relative depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Point3 {
        Point3 { x, y, z }
    }

    /// Euclidean length of this point as a vector.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Distance in the screen plane, ignoring depth.
    pub fn planar_distance(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves this point towards the target by the given factor.
    pub fn lerp(&self, target: &Point3, factor: f32) -> Point3 {
        *self + (*target - *self) * factor
    }
}

impl From<[f32; 3]> for Point3 {
    fn from(value: [f32; 3]) -> Self {
        Point3::new(value[0], value[1], value[2])
    }
}

impl From<Point3> for [f32; 3] {
    fn from(value: Point3) -> Self {
        [value.x, value.y, value.z]
    }
}

impl ops::Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl ops::Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl ops::Mul<f32> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f32) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl ops::Div<f32> for Point3 {
    type Output = Point3;

    fn div(self, rhs: f32) -> Point3 {
        Point3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Which hand a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn other(&self) -> Handedness {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five fingers, in landmark order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Position of this finger in [`Finger::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Landmark index of the fingertip.
    pub fn tip(&self) -> usize {
        4 + self.index() * 4
    }

    /// Landmark index of the middle joint (PIP, or IP for the thumb).
    pub fn middle_joint(&self) -> usize {
        self.tip() - 2
    }

    /// Landmark index of the base joint (MCP).
    pub fn base_joint(&self) -> usize {
        self.tip() - 3
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }
}

/// One hand exactly as the tracker reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHand {
    pub handedness: Handedness,
    pub landmarks: Vec<Point3>,
}

impl RawHand {
    pub fn new(handedness: Handedness, landmarks: Vec<Point3>) -> RawHand {
        RawHand {
            handedness,
            landmarks,
        }
    }

    /// Gets a landmark, or None if the tracker did not supply it this frame.
    pub fn landmark(&self, index: usize) -> Option<Point3> {
        self.landmarks.get(index).copied()
    }
}

/// One tracker callback: zero to two hands and the time they were captured.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFrame {
    pub hands: Vec<RawHand>,
    pub timestamp: Duration,
}

impl RawFrame {
    pub fn new(hands: Vec<RawHand>, timestamp: Duration) -> RawFrame {
        RawFrame { hands, timestamp }
    }

    /// Gets the hand with the given handedness. If the tracker reports the same
    /// handedness twice the first one wins.
    pub fn hand(&self, handedness: Handedness) -> Option<&RawHand> {
        self.hands.iter().find(|h| h.handedness == handedness)
    }
}

/// Derived per-finger kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerKinematics {
    pub tip: Point3,
    pub extended: bool,
    pub velocity: Point3,
}

impl FingerKinematics {
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// One hand's pose and kinematics for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSample {
    pub handedness: Handedness,
    pub landmarks: Vec<Point3>,
    pub fingers: [Option<FingerKinematics>; 5],
    pub velocity: Point3,
    pub acceleration: Point3,
}

impl HandSample {
    pub fn finger(&self, finger: Finger) -> Option<&FingerKinematics> {
        self.fingers[finger.index()].as_ref()
    }

    pub fn index_finger(&self) -> Option<&FingerKinematics> {
        self.finger(Finger::Index)
    }

    /// Wrist position. Samples are only built for hands with a wrist landmark.
    pub fn wrist(&self) -> Point3 {
        self.landmarks.get(WRIST).copied().unwrap_or_default()
    }

    /// Number of fingers currently classified as extended.
    pub fn extended_count(&self) -> usize {
        self.fingers.iter().flatten().filter(|f| f.extended).count()
    }
}

/// The unit every classifier consumes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TwoHandFrame {
    pub left: Option<HandSample>,
    pub right: Option<HandSample>,
    pub timestamp: Duration,
}

impl TwoHandFrame {
    pub fn hand(&self, handedness: Handedness) -> Option<&HandSample> {
        match handedness {
            Handedness::Left => self.left.as_ref(),
            Handedness::Right => self.right.as_ref(),
        }
    }

    /// Iterates the present hands, left first.
    pub fn hands(&self) -> impl Iterator<Item = &HandSample> {
        self.left.iter().chain(self.right.iter())
    }

    /// Gets the preferred hand, or the other one if the preferred hand is missing.
    pub fn preferred(&self, handedness: Handedness) -> Option<&HandSample> {
        self.hand(handedness)
            .or_else(|| self.hand(handedness.other()))
    }
}
