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

//! Instrument-agnostic trigger control: cooldowns, retrigger-on-change and
//! contact debouncing, all keyed by a caller supplied identifier.
//!
//! Times are monotonic offsets from the start of the session, normally the
//! timestamp of the frame being processed.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::trace;

use crate::instruments::Role;

/// Default number of frames kept in the contact buffer.
pub const DEFAULT_DEBOUNCE_FRAMES: usize = 3;

/// Default number of non-contact frames required before a new attack.
pub const DEFAULT_RELEASE_FRAMES: usize = 1;

/// Cooldown durations per instrument role.
#[derive(Debug, Clone, PartialEq)]
pub struct Cooldowns {
    drums: Duration,
    piano: Duration,
    guitar: Duration,
    bass: Duration,
    theremin: Duration,
    strings: Duration,
    pads: Duration,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            drums: Duration::from_millis(60),
            piano: Duration::from_millis(100),
            guitar: Duration::from_millis(100),
            bass: Duration::from_millis(120),
            theremin: Duration::ZERO,
            strings: Duration::from_millis(150),
            pads: Duration::from_millis(200),
        }
    }
}

impl Cooldowns {
    /// Gets the cooldown for the given role.
    pub fn get(&self, role: Role) -> Duration {
        match role {
            Role::Drums => self.drums,
            Role::Piano => self.piano,
            Role::Guitar => self.guitar,
            Role::Bass => self.bass,
            Role::Theremin => self.theremin,
            Role::Strings => self.strings,
            Role::Pads => self.pads,
        }
    }

    /// Sets the cooldown for the given role.
    pub fn set(&mut self, role: Role, cooldown: Duration) {
        let slot = match role {
            Role::Drums => &mut self.drums,
            Role::Piano => &mut self.piano,
            Role::Guitar => &mut self.guitar,
            Role::Bass => &mut self.bass,
            Role::Theremin => &mut self.theremin,
            Role::Strings => &mut self.strings,
            Role::Pads => &mut self.pads,
        };
        *slot = cooldown;
    }
}

/// Bookkeeping for a single gesture source.
#[derive(Debug, Clone)]
struct TriggerState {
    last_trigger: Option<Duration>,
    last_index: Option<usize>,
    contacts: VecDeque<bool>,
}

impl TriggerState {
    fn new(capacity: usize) -> TriggerState {
        TriggerState {
            last_trigger: None,
            last_index: None,
            contacts: VecDeque::with_capacity(capacity),
        }
    }
}

/// Owns the trigger state of every identifier seen during a session.
#[derive(Debug, Clone)]
pub struct TriggerRegistry {
    cooldowns: Cooldowns,
    buffer_size: usize,
    release_frames: usize,
    states: HashMap<String, TriggerState>,
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        TriggerRegistry::new(
            Cooldowns::default(),
            DEFAULT_DEBOUNCE_FRAMES,
            DEFAULT_RELEASE_FRAMES,
        )
    }
}

impl TriggerRegistry {
    /// Creates a new registry. The release frame count is capped at the buffer size.
    pub fn new(cooldowns: Cooldowns, buffer_size: usize, release_frames: usize) -> TriggerRegistry {
        let buffer_size = buffer_size.max(1);
        TriggerRegistry {
            cooldowns,
            buffer_size,
            release_frames: release_frames.clamp(1, buffer_size),
            states: HashMap::new(),
        }
    }

    fn state(&mut self, id: &str) -> &mut TriggerState {
        let capacity = self.buffer_size;
        self.states
            .entry(id.to_owned())
            .or_insert_with(|| TriggerState::new(capacity))
    }

    /// Returns true if the cooldown for the given role has elapsed since the last
    /// accepted trigger of this identifier, recording `now` as the new trigger time.
    pub fn can_trigger(&mut self, id: &str, role: Role, now: Duration) -> bool {
        let cooldown = self.cooldowns.get(role);
        let state = self.state(id);
        let allowed = match state.last_trigger {
            None => true,
            Some(last) => now
                .checked_sub(last)
                .is_some_and(|elapsed| elapsed >= cooldown),
        };
        if allowed {
            state.last_trigger = Some(now);
        } else {
            trace!(id, "Trigger suppressed by cooldown");
        }
        allowed
    }

    /// Returns true if the discrete index differs from the last one recorded for
    /// this identifier, recording the new index.
    pub fn should_retrigger(&mut self, id: &str, index: usize) -> bool {
        let state = self.state(id);
        if state.last_index == Some(index) {
            return false;
        }
        state.last_index = Some(index);
        true
    }

    /// Records this frame's contact state and returns true if it is a clean attack:
    /// in contact now, after enough recorded frames without contact.
    pub fn register_contact(&mut self, id: &str, in_contact: bool) -> bool {
        let release_frames = self.release_frames;
        let buffer_size = self.buffer_size;
        let state = self.state(id);

        let clean = in_contact
            && state.contacts.len() >= release_frames
            && state
                .contacts
                .iter()
                .rev()
                .take(release_frames)
                .all(|contact| !contact);

        state.contacts.push_back(in_contact);
        while state.contacts.len() > buffer_size {
            state.contacts.pop_front();
        }
        clean
    }

    /// A clean attack whose cooldown has also elapsed. The cooldown is only
    /// consumed when the attack is clean.
    pub fn try_attack(&mut self, id: &str, role: Role, in_contact: bool, now: Duration) -> bool {
        self.register_contact(id, in_contact) && self.can_trigger(id, role, now)
    }

    /// A change of discrete index whose cooldown has also elapsed. The index is
    /// recorded even when the cooldown blocks the trigger.
    pub fn try_zone_attack(&mut self, id: &str, role: Role, index: usize, now: Duration) -> bool {
        self.should_retrigger(id, index) && self.can_trigger(id, role, now)
    }

    /// Forgets everything recorded for the identifier.
    pub fn clear(&mut self, id: &str) {
        self.states.remove(id);
    }

    /// Forgets every identifier.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }
}
