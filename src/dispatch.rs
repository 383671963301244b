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

//! Routes performance events to the synthesizer, the network relay and the
//! visual feedback state.

use std::{io, sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{trace, warn};

use crate::events::{KeyAction, PadPhase, PerformanceEvent, StringsKind};
use crate::instruments::{bass, guitar, Role};

pub mod json;
pub mod midi;
pub mod mock;
pub mod osc;
pub mod udp;

/// How long the flash indicator stays lit after an event by default.
pub const DEFAULT_FLASH: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("MIDI init error: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    #[error("MIDI send error: {0}")]
    MidiSend(#[from] midir::SendError),

    #[error("no MIDI device found with name {0}")]
    DeviceNotFound(String),

    #[error("found too many devices that match ({0}), use a less ambiguous device name")]
    AmbiguousDevice(String),

    #[error("relay I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("relay queue is full")]
    Backlog,

    #[error("relay has stopped")]
    RelayClosed,

    #[error("relays must be started inside a tokio runtime")]
    NoRuntime,
}

/// What a synth trigger asks the synthesizer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Start a note.
    Attack,
    /// End a note.
    Release,
    /// Update a continuously sounding voice.
    Control,
}

/// A request to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthTrigger {
    pub role: Role,
    pub kind: TriggerKind,
    /// Loudness in [0, 1].
    pub velocity: f32,
    /// Pitch in [0, 1] across the role's range.
    pub pitch: f32,
    /// Stereo position in [0, 1], left to right.
    pub pan: Option<f32>,
    /// Secondary continuous control in [0, 1]: theremin vibrato or string
    /// section spread.
    pub modulation: Option<f32>,
}

/// Scales a semitone offset into [0, 1] across the role's range.
fn pitch_of(role: Role, semitone: u8) -> f32 {
    (semitone as f32 / role.pitch_span() as f32).clamp(0.0, 1.0)
}

impl SynthTrigger {
    /// Builds the synth trigger for an event.
    pub fn from_event(event: &PerformanceEvent) -> SynthTrigger {
        let role = event.role();
        let position = event.position();
        let height = (1.0 - position.y).clamp(0.0, 1.0);

        let (kind, pitch, modulation) = match event {
            PerformanceEvent::Drum(hit) => (
                TriggerKind::Attack,
                pitch_of(role, hit.zone.index() as u8),
                None,
            ),
            PerformanceEvent::Piano(key) => (
                match key.action {
                    KeyAction::Press => TriggerKind::Attack,
                    KeyAction::Release => TriggerKind::Release,
                },
                pitch_of(role, key.key as u8),
                None,
            ),
            PerformanceEvent::Guitar(strum) => (
                TriggerKind::Attack,
                pitch_of(role, guitar::semitone(strum.string, strum.fret)),
                None,
            ),
            PerformanceEvent::Bass(pluck) => (
                TriggerKind::Attack,
                pitch_of(role, bass::semitone(pluck.string)),
                None,
            ),
            PerformanceEvent::Theremin(control) => (
                if control.active {
                    TriggerKind::Control
                } else {
                    TriggerKind::Release
                },
                control.pitch,
                Some(control.vibrato),
            ),
            PerformanceEvent::Strings(gesture) => (
                match gesture.kind {
                    StringsKind::Accent => TriggerKind::Attack,
                    StringsKind::Release => TriggerKind::Release,
                    StringsKind::Swell | StringsKind::Sustain => TriggerKind::Control,
                },
                height,
                gesture.spread.map(|spread| spread.clamp(0.0, 1.0)),
            ),
            PerformanceEvent::Pads(gesture) => (
                match gesture.phase {
                    PadPhase::Start => TriggerKind::Attack,
                    PadPhase::Sustain => TriggerKind::Control,
                    PadPhase::Release => TriggerKind::Release,
                },
                height,
                None,
            ),
        };

        SynthTrigger {
            role,
            kind,
            velocity: event.velocity().clamp(0.0, 1.0),
            pitch,
            pan: Some(position.x.clamp(0.0, 1.0)),
            modulation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandPosition {
    pub x: f32,
    pub y: f32,
}

/// The message broadcast to the other performers in the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    pub role: Role,
    pub velocity: f32,
    pub is_active: bool,
    pub hand_position: HandPosition,
    pub zone: String,
    /// Milliseconds since the session started.
    pub timestamp: u64,
}

impl RelayPayload {
    pub fn from_event(event: &PerformanceEvent) -> RelayPayload {
        let position = event.position();
        RelayPayload {
            role: event.role(),
            velocity: event.velocity(),
            is_active: true,
            hand_position: HandPosition {
                x: position.x,
                y: position.y,
            },
            zone: event.zone(),
            timestamp: event.timestamp().as_millis() as u64,
        }
    }
}

/// The sound engine.
pub trait Synth: Send + Sync {
    fn trigger(&self, trigger: &SynthTrigger) -> Result<(), DispatchError>;
}

/// The network relay to other performers.
pub trait Relay: Send + Sync {
    fn send(&self, payload: &RelayPayload) -> Result<(), DispatchError>;
}

/// A synth that makes no sound.
pub struct NullSynth;

impl Synth for NullSynth {
    fn trigger(&self, _: &SynthTrigger) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// A relay for solo sessions.
pub struct NullRelay;

impl Relay for NullRelay {
    fn send(&self, _: &RelayPayload) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Sends every payload to several relays. All relays are attempted and the
/// first failure is reported.
pub struct MultiRelay {
    relays: Vec<Arc<dyn Relay>>,
}

impl MultiRelay {
    pub fn new(relays: Vec<Arc<dyn Relay>>) -> MultiRelay {
        MultiRelay { relays }
    }
}

impl Relay for MultiRelay {
    fn send(&self, payload: &RelayPayload) -> Result<(), DispatchError> {
        let mut result = Ok(());
        for relay in self.relays.iter() {
            if let Err(e) = relay.send(payload) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

/// Transient display state driven by events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualFeedback {
    meter: f32,
    flash_until: Option<Duration>,
}

impl VisualFeedback {
    fn update(&mut self, velocity: f32, timestamp: Duration, flash: Duration) {
        self.meter = velocity.clamp(0.0, 1.0);
        self.flash_until = Some(timestamp + flash);
    }

    /// The velocity of the most recent event.
    pub fn meter(&self) -> f32 {
        self.meter
    }

    /// Returns true while the flash is lit. Once `now` passes the flash
    /// deadline the flash is cleared.
    pub fn is_flashing(&mut self, now: Duration) -> bool {
        match self.flash_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.flash_until = None;
                false
            }
            None => false,
        }
    }
}

/// Counters for dispatched events and collaborator failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub synth_failures: u64,
    pub relay_failures: u64,
}

/// Fans events out to the collaborators. Failures are logged and counted and
/// never retried.
pub struct Dispatcher {
    synth: Arc<dyn Synth>,
    relay: Arc<dyn Relay>,
    flash: Duration,
    feedback: VisualFeedback,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(synth: Arc<dyn Synth>, relay: Arc<dyn Relay>, flash: Duration) -> Dispatcher {
        Dispatcher {
            synth,
            relay,
            flash,
            feedback: VisualFeedback::default(),
            stats: DispatchStats::default(),
        }
    }

    pub fn dispatch(&mut self, event: &PerformanceEvent) {
        trace!(role = %event.role(), zone = event.zone(), "Dispatching event");
        self.stats.dispatched += 1;

        if let Err(e) = self.synth.trigger(&SynthTrigger::from_event(event)) {
            self.stats.synth_failures += 1;
            warn!(err = e.to_string(), role = %event.role(), "Error triggering synth");
        }

        if let Err(e) = self.relay.send(&RelayPayload::from_event(event)) {
            self.stats.relay_failures += 1;
            warn!(err = e.to_string(), role = %event.role(), "Error sending to relay");
        }

        self.feedback
            .update(event.velocity(), event.timestamp(), self.flash);
    }

    pub fn feedback(&mut self) -> &mut VisualFeedback {
        &mut self.feedback
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}
