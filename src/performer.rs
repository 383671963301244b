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
use std::{str::FromStr, sync::Arc};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, span, Instrument, Level};

use crate::dispatch::DispatchStats;
use crate::events::PerformanceEvent;
use crate::instruments::Role;
use crate::session::Session;
use crate::source::FrameSource;

/// Number of frames buffered between the source and the performer.
const FRAME_BUFFER: usize = 8;

/// Commands that change the performer while it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switches to another instrument, discarding all gesture state.
    SwitchInstrument(Role),

    /// Discards all gesture state.
    Reset,
}

impl FromStr for Command {
    type Err = String;

    /// Parses `reset` or an instrument name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reset" => Ok(Command::Reset),
            other => Ok(Command::SwitchInstrument(other.parse()?)),
        }
    }
}

/// Runs a session against a frame source until the source runs dry.
pub struct Performer {
    handle: JoinHandle<DispatchStats>,
}

impl Performer {
    /// Starts performing. Events are also handed to `events_tx` after dispatch.
    pub fn new(
        session: Session,
        source: Arc<dyn FrameSource>,
        commands_rx: mpsc::Receiver<Command>,
        events_tx: crossbeam_channel::Sender<PerformanceEvent>,
    ) -> Performer {
        Performer {
            handle: tokio::spawn(
                Performer::perform(session, source, commands_rx, events_tx)
                    .instrument(span!(Level::INFO, "performer")),
            ),
        }
    }

    /// Join will block until the source is exhausted, returning the dispatch counters.
    pub async fn join(&mut self) -> Result<DispatchStats, JoinError> {
        (&mut self.handle).await
    }

    async fn perform(
        mut session: Session,
        source: Arc<dyn FrameSource>,
        mut commands_rx: mpsc::Receiver<Command>,
        events_tx: crossbeam_channel::Sender<PerformanceEvent>,
    ) -> DispatchStats {
        let (frames_tx, mut frames_rx) = mpsc::channel(FRAME_BUFFER);
        let join_handle = source.monitor_frames(frames_tx);
        let mut commands_open = true;

        info!(instrument = %session.role(), "Performer started.");

        loop {
            tokio::select! {
                biased;

                command = commands_rx.recv(), if commands_open => match command {
                    Some(command) => {
                        info!(command = format!("{:?}", command), "Received command.");
                        let released = match command {
                            Command::SwitchInstrument(role) => session.switch_instrument(role),
                            Command::Reset => session.reset(),
                        };
                        forward(&events_tx, released);
                    }
                    None => commands_open = false,
                },

                frame = frames_rx.recv() => match frame {
                    Some(frame) => forward(&events_tx, session.process(&frame)),
                    None => break,
                },
            }
        }

        let stats = session.stats();
        info!(
            dispatched = stats.dispatched,
            synth_failures = stats.synth_failures,
            relay_failures = stats.relay_failures,
            "Performer closing."
        );
        match join_handle.await {
            Ok(Err(e)) => error!(err = e.to_string(), "Frame source failed"),
            Err(e) => error!("Error waiting for frame source to stop: {}", e),
            Ok(Ok(())) => {}
        }
        stats
    }
}

fn forward(events_tx: &crossbeam_channel::Sender<PerformanceEvent>, events: Vec<PerformanceEvent>) {
    for event in events {
        if events_tx.send(event).is_err() {
            debug!("Event receiver closed.");
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, io};

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::*;
    use crate::dispatch::mock::{MockRelay, MockSynth};
    use crate::dispatch::Dispatcher;
    use crate::hands::{Handedness, RawFrame};
    use crate::instruments::InstrumentSettings;
    use crate::kinematics::Estimator;
    use crate::testutil::{eventually, ms, open_hand, RawFrameBuilder};
    use crate::trigger::TriggerRegistry;

    /// Sends a fixed list of frames and then closes.
    struct TestSource {
        frames: Vec<RawFrame>,
    }

    impl FrameSource for TestSource {
        fn monitor_frames(&self, frames_tx: Sender<RawFrame>) -> JoinHandle<Result<(), io::Error>> {
            let frames = self.frames.clone();
            tokio::task::spawn_blocking(move || {
                for frame in frames {
                    frames_tx
                        .blocking_send(frame)
                        .map_err(|e| io::Error::other(e.to_string()))?;
                }
                Ok(())
            })
        }
    }

    fn session(role: Role, synth: Arc<MockSynth>) -> Session {
        Session::new(
            role,
            Estimator::default(),
            TriggerRegistry::default(),
            InstrumentSettings::default(),
            Dispatcher::new(synth, Arc::new(MockRelay::new()), ms(100)),
        )
    }

    fn strike_frames(hand: Handedness) -> Vec<RawFrame> {
        vec![
            RawFrameBuilder::at(ms(0))
                .hand(open_hand(hand, 0.1, 0.3))
                .build(),
            RawFrameBuilder::at(ms(30))
                .hand(open_hand(hand, 0.1, 0.5))
                .build(),
        ]
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(Ok(Command::Reset), "reset".parse());
        assert_eq!(Ok(Command::Reset), " RESET\n".parse());
        assert_eq!(
            Ok(Command::SwitchInstrument(Role::Strings)),
            "strings".parse()
        );
        assert!("tuba".parse::<Command>().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_performer_plays_frames() -> Result<(), Box<dyn Error>> {
        let synth = Arc::new(MockSynth::new());
        let (_commands_tx, commands_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let mut performer = Performer::new(
            session(Role::Drums, synth.clone()),
            Arc::new(TestSource {
                frames: strike_frames(Handedness::Left),
            }),
            commands_rx,
            events_tx,
        );

        eventually(|| events_rx.len() == 1, "Performer never produced a hit");
        let stats = performer.join().await?;
        assert_eq!(1, stats.dispatched);
        assert_eq!(1, synth.triggers().len());

        let event = events_rx.try_recv()?;
        assert_eq!(Role::Drums, event.role());
        assert_eq!("hihat", event.zone());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_switch_instrument_command() -> Result<(), Box<dyn Error>> {
        let (commands_tx, commands_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        commands_tx.send(Command::SwitchInstrument(Role::Theremin)).await?;
        drop(commands_tx);

        let mut performer = Performer::new(
            session(Role::Drums, Arc::new(MockSynth::new())),
            Arc::new(TestSource {
                frames: strike_frames(Handedness::Right),
            }),
            commands_rx,
            events_tx,
        );
        performer.join().await?;

        let roles: Vec<Role> = events_rx.try_iter().map(|event| event.role()).collect();
        assert_eq!(vec![Role::Theremin, Role::Theremin], roles);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_performer_survives_closed_event_receiver() -> Result<(), Box<dyn Error>> {
        let (_commands_tx, commands_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        drop(events_rx);

        let mut performer = Performer::new(
            session(Role::Drums, Arc::new(MockSynth::new())),
            Arc::new(TestSource {
                frames: strike_frames(Handedness::Left),
            }),
            commands_rx,
            events_tx,
        );
        assert_eq!(1, performer.join().await?.dispatched);
        Ok(())
    }
}
