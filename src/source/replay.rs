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

//! Replays recorded tracker output from a JSON-lines file, one frame per line:
//!
//! ```text
//! {"timestamp_ms": 20, "hands": [{"handedness": "left", "landmarks": [[0.1, 0.8, 0.0], ...]}]}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Frames without a
//! timestamp are stamped with the session clock.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use serde::Deserialize;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, warn, Level};

use super::clock::{session_clock, Clock};
use super::SourceError;
use crate::hands::{RawFrame, RawHand};

#[derive(Deserialize)]
struct Record {
    timestamp_ms: Option<u64>,
    #[serde(default)]
    hands: Vec<RawHand>,
}

/// Parses one line of a replay file. Returns None for lines with no frame.
pub fn parse_line(
    line: &str,
    number: usize,
    clock: &dyn Clock,
) -> Result<Option<RawFrame>, SourceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let record: Record = serde_json::from_str(trimmed).map_err(|source| SourceError::Parse {
        line: number,
        source,
    })?;
    let timestamp = match record.timestamp_ms {
        Some(millis) => Duration::from_millis(millis),
        None => clock.elapsed(),
    };
    Ok(Some(RawFrame::new(record.hands, timestamp)))
}

/// A frame source that replays a recorded session.
pub struct Driver {
    path: PathBuf,
    realtime: bool,
    clock: Arc<dyn Clock>,
}

impl Driver {
    /// Creates a replay driver. With `realtime` set, frames are paced by
    /// their timestamps, otherwise they are delivered as fast as they are consumed.
    pub fn new(path: &Path, realtime: bool) -> Driver {
        Driver::with_clock(path, realtime, session_clock())
    }

    pub fn with_clock(path: &Path, realtime: bool, clock: Arc<dyn Clock>) -> Driver {
        Driver {
            path: path.to_path_buf(),
            realtime,
            clock,
        }
    }

    fn replay<R: BufRead>(
        frames_tx: &Sender<RawFrame>,
        reader: R,
        realtime: bool,
        clock: &dyn Clock,
    ) -> Result<usize, io::Error> {
        let started = clock.elapsed();
        let mut sent = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let frame = match parse_line(&line, index + 1, clock) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    warn!(err = e.to_string(), "Skipping frame");
                    continue;
                }
            };

            if realtime {
                let due = started + frame.timestamp;
                let now = clock.elapsed();
                if due > now {
                    thread::sleep(due - now);
                }
            }

            if frames_tx.blocking_send(frame).is_err() {
                debug!("Frame receiver closed, stopping replay.");
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }
}

impl super::FrameSource for Driver {
    fn monitor_frames(&self, frames_tx: Sender<RawFrame>) -> JoinHandle<Result<(), io::Error>> {
        let path = self.path.clone();
        let realtime = self.realtime;
        let clock = self.clock.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "replay driver");
            let _enter = span.enter();

            info!(path = %path.display(), realtime, "Replay started.");
            let reader = BufReader::new(File::open(&path)?);
            let sent = Self::replay(&frames_tx, reader, realtime, clock.as_ref())?;
            info!(frames = sent, "Replay finished.");
            Ok(())
        })
    }
}
