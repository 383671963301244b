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

use tracing::debug;

use super::udp::DatagramSender;
use super::{DispatchError, RelayPayload};

/// Relays each payload as a single JSON datagram.
pub struct JsonRelay {
    sender: DatagramSender,
}

impl JsonRelay {
    /// Starts relaying to `target`. Must be called from within a tokio runtime.
    pub fn new(target: SocketAddr) -> Result<JsonRelay, DispatchError> {
        Ok(JsonRelay {
            sender: DatagramSender::new("json", target, false)?,
        })
    }
}

impl super::Relay for JsonRelay {
    fn send(&self, payload: &RelayPayload) -> Result<(), DispatchError> {
        let buf = serde_json::to_vec(payload).map_err(|e| DispatchError::Encode(e.to_string()))?;
        debug!(role = %payload.role, bytes = buf.len(), "Sending JSON payload.");
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
        let relay = JsonRelay::new(receiver.local_addr()?)?;

        relay.send(&RelayPayload {
            role: Role::Pads,
            velocity: 0.4,
            is_active: true,
            hand_position: HandPosition { x: 0.5, y: 0.5 },
            zone: "start".to_string(),
            timestamp: 42,
        })?;

        let mut buf = [0u8; 1024];
        let size = timeout(Duration::from_secs(3), receiver.recv(&mut buf)).await??;
        let json: serde_json::Value = serde_json::from_slice(&buf[..size])?;
        assert_eq!("pads", json["role"]);
        assert_eq!("start", json["zone"]);
        assert_eq!(true, json["isActive"]);
        assert_eq!(42, json["timestamp"]);
        assert_eq!(0.5, json["handPosition"]["x"]);
        Ok(())
    }
}
