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

//! Turns hand-pose streams into velocity-scaled instrument events.
//!
//! Frames flow from a [source::FrameSource] through the [kinematics]
//! estimator and the active [instruments] classifier, gated by [trigger]
//! control, and out through the [dispatch] collaborators. A [session::Session]
//! runs that pipeline for one frame; a [performer::Performer] drives a session
//! from a source.

pub mod config;
pub mod dispatch;
pub mod events;
pub mod hands;
pub mod instruments;
pub mod kinematics;
pub mod performer;
pub mod session;
pub mod source;
pub mod trigger;

#[cfg(test)]
mod testutil;
