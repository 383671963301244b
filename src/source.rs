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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::hands::RawFrame;

pub mod clock;
pub mod replay;

/// Errors reading frames from a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Malformed frame on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Delivers raw tracker frames. The driver stops when the receiving side of
/// the channel is dropped or when it runs out of frames.
pub trait FrameSource: Send + Sync + 'static {
    fn monitor_frames(&self, frames_tx: Sender<RawFrame>) -> JoinHandle<Result<(), io::Error>>;
}
