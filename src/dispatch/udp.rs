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

//! Datagram delivery for the relays. Encoded payloads are queued and sent
//! from a task that owns the socket, so relaying never blocks the performer.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, span, warn, Instrument, Level};

use super::DispatchError;

/// Datagrams queued before new ones are refused.
const QUEUE_DEPTH: usize = 64;

/// Queues datagrams for a single target.
pub struct DatagramSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl DatagramSender {
    /// Binds an ephemeral socket and starts the task that sends on it. Must be
    /// called from within a tokio runtime.
    pub fn new(
        name: &'static str,
        target: SocketAddr,
        broadcast: bool,
    ) -> Result<DatagramSender, DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        if broadcast {
            socket.set_broadcast(true)?;
        }
        socket.set_nonblocking(true)?;

        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let span = span!(Level::INFO, "relay", relay = name);
        handle.spawn(DatagramSender::run(socket, target, rx).instrument(span));
        Ok(DatagramSender { tx })
    }

    /// Queues a datagram without waiting for it to be sent.
    pub fn send(&self, datagram: Vec<u8>) -> Result<(), DispatchError> {
        self.tx.try_send(datagram).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::Backlog,
            TrySendError::Closed(_) => DispatchError::RelayClosed,
        })
    }

    async fn run(
        socket: std::net::UdpSocket,
        target: SocketAddr,
        mut rx: mpsc::Receiver<Vec<u8>>,
    ) {
        let socket = match UdpSocket::from_std(socket) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(err = e.to_string(), "Unable to start relay socket");
                return;
            }
        };
        info!(target = %target, "Relay started.");

        while let Some(datagram) = rx.recv().await {
            if let Err(e) = socket.send_to(&datagram, target).await {
                warn!(err = e.to_string(), target = %target, "Error sending datagram");
            }
        }
        info!("Relay closed.");
    }
}
