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

use rosc::{OscMessage, OscPacket, OscType};
use tracing::debug;

use super::udp::DatagramSender;
use super::{DispatchError, RelayPayload};

/// Prefix of every relay address. The role is appended, e.g. `/airband/drums`.
pub const ADDRESS_PREFIX: &str = "/airband";

/// Relays payloads as OSC messages over UDP.
///
/// Arguments, in order: velocity (float), active (bool), hand x (float),
/// hand y (float), zone (string), timestamp in milliseconds (long).
pub struct OscRelay {
    sender: DatagramSender,
}

impl OscRelay {
    /// Starts relaying to `target`. Must be called from within a tokio runtime.
    pub fn new(target: SocketAddr) -> Result<OscRelay, DispatchError> {
        // The room relay may be a broadcast address.
        Ok(OscRelay {
            sender: DatagramSender::new("osc", target, true)?,
        })
    }

    fn packet(payload: &RelayPayload) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: format!("{}/{}", ADDRESS_PREFIX, payload.role),
            args: vec![
                OscType::Float(payload.velocity),
                OscType::Bool(payload.is_active),
                OscType::Float(payload.hand_position.x),
                OscType::Float(payload.hand_position.y),
                OscType::String(payload.zone.clone()),
                OscType::Long(payload.timestamp as i64),
            ],
        })
    }
}

impl super::Relay for OscRelay {
    fn send(&self, payload: &RelayPayload) -> Result<(), DispatchError> {
        let buf = rosc::encoder::encode(&OscRelay::packet(payload))
            .map_err(|e| DispatchError::Encode(e.to_string()))?;
        debug!(role = %payload.role, zone = payload.zone, "Sending OSC payload.");
        self.sender.send(buf)
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, time::Duration};

    use tokio::{net::UdpSocket, time::timeout};

    use super::*;
    use crate::dispatch::{HandPosition, Relay};
    use crate::instruments::Role;

    #[tokio::test]
    async fn test_send() -> Result<(), Box<dyn Error>> {
        let receiver = UdpSocket::bind("127.0.0.1:0").await?;
        let relay = OscRelay::new(receiver.local_addr()?)?;

        relay.send(&RelayPayload {
            role: Role::Bass,
            velocity: 0.5,
            is_active: true,
            hand_position: HandPosition { x: 0.25, y: 0.75 },
            zone: "string-A".to_string(),
            timestamp: 1500,
        })?;

        let mut buf = [0u8; rosc::decoder::MTU];
        let size = timeout(Duration::from_secs(3), receiver.recv(&mut buf)).await??;
        let (_, packet) = rosc::decoder::decode_udp(&buf[..size]).map_err(|e| e.to_string())?;
        match packet {
            OscPacket::Message(message) => {
                assert_eq!("/airband/bass", message.addr);
                assert_eq!(
                    vec![
                        OscType::Float(0.5),
                        OscType::Bool(true),
                        OscType::Float(0.25),
                        OscType::Float(0.75),
                        OscType::String("string-A".to_string()),
                        OscType::Long(1500),
                    ],
                    message.args
                );
            }
            other => panic!("unexpected packet {:?}", other),
        }
        Ok(())
    }
}
