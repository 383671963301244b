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

//! Recording collaborators. Nothing leaves the process.

use std::io;

use parking_lot::Mutex;

use super::{DispatchError, RelayPayload, SynthTrigger};

/// A mock synth. Records every trigger it receives.
#[derive(Default)]
pub struct MockSynth {
    triggers: Mutex<Vec<SynthTrigger>>,
    fail: bool,
}

impl MockSynth {
    pub fn new() -> MockSynth {
        MockSynth::default()
    }

    /// A synth that rejects every trigger.
    pub fn failing() -> MockSynth {
        MockSynth {
            fail: true,
            ..Default::default()
        }
    }

    /// Gets the triggers received so far.
    pub fn triggers(&self) -> Vec<SynthTrigger> {
        self.triggers.lock().clone()
    }
}

impl super::Synth for MockSynth {
    fn trigger(&self, trigger: &SynthTrigger) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Io(io::Error::other("mock synth failure")));
        }
        self.triggers.lock().push(trigger.clone());
        Ok(())
    }
}

/// A mock relay. Records every payload it receives.
#[derive(Default)]
pub struct MockRelay {
    payloads: Mutex<Vec<RelayPayload>>,
    fail: bool,
}

impl MockRelay {
    pub fn new() -> MockRelay {
        MockRelay::default()
    }

    /// A relay whose sends always fail.
    pub fn failing() -> MockRelay {
        MockRelay {
            fail: true,
            ..Default::default()
        }
    }

    /// Gets the payloads received so far.
    pub fn payloads(&self) -> Vec<RelayPayload> {
        self.payloads.lock().clone()
    }
}

impl super::Relay for MockRelay {
    fn send(&self, payload: &RelayPayload) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock relay failure",
            )));
        }
        self.payloads.lock().push(payload.clone());
        Ok(())
    }
}
