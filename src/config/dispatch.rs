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

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// The `dispatch` section: where events go.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Dispatch {
    /// The MIDI output to play on. No sound is made if unset.
    midi_device: Option<String>,

    /// Address to relay OSC messages to.
    osc_relay: Option<String>,

    /// Address to relay JSON datagrams to.
    json_relay: Option<String>,
}

fn parse_address(value: &Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .as_ref()
        .map(|value| {
            value.parse().map_err(|source| ConfigError::Address {
                value: value.clone(),
                source,
            })
        })
        .transpose()
}

impl Dispatch {
    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    pub fn osc_relay(&self) -> Result<Option<SocketAddr>, ConfigError> {
        parse_address(&self.osc_relay)
    }

    pub fn json_relay(&self) -> Result<Option<SocketAddr>, ConfigError> {
        parse_address(&self.json_relay)
    }

    /// Overrides the MIDI device, e.g. from the command line.
    pub fn set_midi_device(&mut self, device: Option<String>) {
        if device.is_some() {
            self.midi_device = device;
        }
    }

    /// Overrides the relay addresses, e.g. from the command line.
    pub fn set_relays(&mut self, osc: Option<String>, json: Option<String>) {
        if osc.is_some() {
            self.osc_relay = osc;
        }
        if json.is_some() {
            self.json_relay = json;
        }
    }
}
