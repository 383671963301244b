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

//! Plays synth triggers on an external MIDI instrument.
//!
//! Each role gets its own channel. Drums use the General MIDI percussion
//! channel and note map. Piano is polyphonic; every other role holds at most
//! one sounding note, which is stopped before the next one starts.

use std::{collections::HashMap, fmt};

use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use midly::{live::LiveEvent, MidiMessage, PitchBend};
use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use super::{DispatchError, SynthTrigger, TriggerKind};
use crate::instruments::Role;

/// General MIDI notes for hi-hat, snare, kick, tom and crash.
pub const DRUM_NOTES: [u8; 5] = [42, 38, 36, 45, 49];

const CC_MODULATION: u8 = 1;
const CC_VOLUME: u8 = 7;
const CC_PAN: u8 = 10;
const CC_EXPRESSION: u8 = 11;

/// Velocity used when a continuous role starts sounding.
const CONTINUOUS_VELOCITY: u8 = 100;

/// Pitch bend range of the receiving instrument, in semitones either way.
const BEND_RANGE: f32 = 2.0;
const BEND_CENTER: f32 = 8192.0;

/// The zero-based MIDI channel for a role.
pub fn channel(role: Role) -> u8 {
    match role {
        Role::Piano => 0,
        Role::Guitar => 1,
        Role::Bass => 2,
        Role::Theremin => 3,
        Role::Strings => 4,
        Role::Pads => 5,
        Role::Drums => 9,
    }
}

/// The note played for a pitch of zero.
fn base_note(role: Role) -> u8 {
    match role {
        Role::Drums => DRUM_NOTES[0],
        Role::Piano => 60,
        Role::Guitar => 40,
        Role::Bass => 28,
        Role::Theremin | Role::Strings | Role::Pads => 48,
    }
}

/// Semitone steps above the base note for a pitch, and the remainder in
/// semitones.
fn steps(role: Role, pitch: f32) -> (u8, f32) {
    let exact = pitch.clamp(0.0, 1.0) * role.pitch_span() as f32;
    let step = exact.round();
    (step as u8, exact - step)
}

/// The MIDI note for a role and pitch.
pub fn note_for(role: Role, pitch: f32) -> u8 {
    let (step, _) = steps(role, pitch);
    match role {
        Role::Drums => DRUM_NOTES[(step as usize).min(DRUM_NOTES.len() - 1)],
        _ => base_note(role) + step,
    }
}

fn velocity_byte(velocity: f32) -> u8 {
    ((velocity.clamp(0.0, 1.0) * 127.0).round() as u8).clamp(1, 127)
}

fn control_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

fn midi(role: Role, message: MidiMessage) -> LiveEvent<'static> {
    LiveEvent::Midi {
        channel: channel(role).into(),
        message,
    }
}

fn note_on(role: Role, note: u8, velocity: u8) -> LiveEvent<'static> {
    midi(
        role,
        MidiMessage::NoteOn {
            key: note.into(),
            vel: velocity.into(),
        },
    )
}

fn note_off(role: Role, note: u8) -> LiveEvent<'static> {
    midi(
        role,
        MidiMessage::NoteOff {
            key: note.into(),
            vel: 0.into(),
        },
    )
}

fn control_change(role: Role, controller: u8, value: u8) -> LiveEvent<'static> {
    midi(
        role,
        MidiMessage::Controller {
            controller: controller.into(),
            value: value.into(),
        },
    )
}

/// Turns synth triggers into MIDI messages, remembering which note each
/// monophonic role is holding.
#[derive(Debug, Default)]
pub struct Voicer {
    sounding: HashMap<Role, u8>,
}

impl Voicer {
    pub fn new() -> Voicer {
        Voicer::default()
    }

    /// The note a monophonic role is holding.
    pub fn sounding(&self, role: Role) -> Option<u8> {
        self.sounding.get(&role).copied()
    }

    fn start(&mut self, role: Role, note: u8, velocity: u8, events: &mut Vec<LiveEvent<'static>>) {
        if let Some(previous) = self.sounding.insert(role, note) {
            events.push(note_off(role, previous));
        }
        events.push(note_on(role, note, velocity));
    }

    fn stop(&mut self, role: Role, events: &mut Vec<LiveEvent<'static>>) {
        if let Some(previous) = self.sounding.remove(&role) {
            events.push(note_off(role, previous));
        }
    }

    /// The messages that realize a trigger.
    pub fn messages(&mut self, trigger: &SynthTrigger) -> Vec<LiveEvent<'static>> {
        let role = trigger.role;
        let note = note_for(role, trigger.pitch);
        let mut events = Vec::new();

        match trigger.kind {
            TriggerKind::Attack => {
                if let Some(pan) = trigger.pan {
                    events.push(control_change(role, CC_PAN, control_byte(pan)));
                }
                let velocity = velocity_byte(trigger.velocity);
                match role {
                    Role::Drums => {
                        events.push(note_on(role, note, velocity));
                        events.push(note_off(role, note));
                    }
                    Role::Piano => events.push(note_on(role, note, velocity)),
                    _ => self.start(role, note, velocity, &mut events),
                }
                if matches!(role, Role::Strings | Role::Pads) {
                    events.push(control_change(
                        role,
                        CC_EXPRESSION,
                        control_byte(trigger.velocity),
                    ));
                }
            }
            TriggerKind::Release => match role {
                Role::Drums => {}
                Role::Piano => events.push(note_off(role, note)),
                Role::Theremin => {
                    self.stop(role, &mut events);
                    events.push(control_change(role, CC_VOLUME, 0));
                }
                _ => self.stop(role, &mut events),
            },
            TriggerKind::Control => {
                let retune = role == Role::Theremin && self.sounding(role) != Some(note);
                if retune || self.sounding(role).is_none() {
                    self.start(role, note, CONTINUOUS_VELOCITY, &mut events);
                }
                match role {
                    Role::Theremin => {
                        let (_, remainder) = steps(role, trigger.pitch);
                        let bend = (BEND_CENTER + remainder / BEND_RANGE * BEND_CENTER)
                            .clamp(0.0, 16383.0) as u16;
                        events.push(midi(
                            role,
                            MidiMessage::PitchBend {
                                bend: PitchBend(bend.into()),
                            },
                        ));
                        events.push(control_change(
                            role,
                            CC_VOLUME,
                            control_byte(trigger.velocity),
                        ));
                        events.push(control_change(
                            role,
                            CC_MODULATION,
                            control_byte(trigger.modulation.unwrap_or_default()),
                        ));
                    }
                    _ => {
                        events.push(control_change(
                            role,
                            CC_EXPRESSION,
                            control_byte(trigger.velocity),
                        ));
                        if let Some(modulation) = trigger.modulation {
                            events.push(control_change(
                                role,
                                CC_MODULATION,
                                control_byte(modulation),
                            ));
                        }
                    }
                }
            }
        }
        events
    }
}

/// A synth backed by a MIDI output port.
pub struct MidiSynth {
    name: String,
    connection: Mutex<MidiOutputConnection>,
    voicer: Mutex<Voicer>,
}

impl MidiSynth {
    /// Connects to the only output port whose name contains `name`.
    pub fn connect(name: &str) -> Result<MidiSynth, DispatchError> {
        let output = MidiOutput::new("airband output")?;
        let (port_name, port) = find_port(&output, name)?;
        let connection = output
            .connect(&port, "airband")
            .map_err(|e| DispatchError::MidiConnect(e.to_string()))?;
        info!(device = port_name, "Connected to MIDI output.");

        Ok(MidiSynth {
            name: port_name,
            connection: Mutex::new(connection),
            voicer: Mutex::new(Voicer::new()),
        })
    }
}

impl super::Synth for MidiSynth {
    fn trigger(&self, trigger: &SynthTrigger) -> Result<(), DispatchError> {
        let span = span!(Level::DEBUG, "trigger (midir)");
        let _enter = span.enter();

        let events = self.voicer.lock().messages(trigger);
        let mut connection = self.connection.lock();
        for event in events {
            debug!(
                device = self.name,
                event = format!("{:?}", event),
                "Emitting event."
            );
            let mut buf: Vec<u8> = Vec::with_capacity(8);
            event
                .write(&mut buf)
                .map_err(|e| DispatchError::Encode(e.to_string()))?;
            connection.send(&buf)?;
        }
        Ok(())
    }
}

impl fmt::Display for MidiSynth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Output)", self.name)
    }
}

/// Lists the names of all MIDI output ports.
pub fn list_devices() -> Result<Vec<String>, DispatchError> {
    let output = MidiOutput::new("airband output listing")?;
    let mut names = output
        .ports()
        .iter()
        .filter_map(|port| output.port_name(port).ok())
        .collect::<Vec<String>>();
    names.sort();
    Ok(names)
}

fn find_port(output: &MidiOutput, name: &str) -> Result<(String, MidiOutputPort), DispatchError> {
    let mut matches = output
        .ports()
        .into_iter()
        .filter_map(|port| {
            let port_name = output.port_name(&port).ok()?;
            port_name.contains(name).then_some((port_name, port))
        })
        .collect::<Vec<(String, MidiOutputPort)>>();

    match matches.len() {
        0 => Err(DispatchError::DeviceNotFound(name.to_string())),
        1 => Ok(matches.swap_remove(0)),
        _ => Err(DispatchError::AmbiguousDevice(
            matches
                .iter()
                .map(|(port_name, _)| port_name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn trigger(role: Role, kind: TriggerKind, pitch: f32) -> SynthTrigger {
        SynthTrigger {
            role,
            kind,
            velocity: 0.8,
            pitch,
            pan: None,
            modulation: None,
        }
    }

    #[test]
    fn test_note_for() {
        assert_eq!(42, note_for(Role::Drums, 0.0));
        assert_eq!(36, note_for(Role::Drums, 0.5));
        assert_eq!(49, note_for(Role::Drums, 1.0));
        assert_eq!(60, note_for(Role::Piano, 0.0));
        assert_eq!(71, note_for(Role::Piano, 1.0));
        assert_eq!(76, note_for(Role::Guitar, 1.0));
        assert_eq!(43, note_for(Role::Bass, 1.0));
        assert_eq!(60, note_for(Role::Theremin, 0.5));
    }

    #[test]
    fn test_drum_hit() {
        let mut voicer = Voicer::new();
        let events = voicer.messages(&trigger(Role::Drums, TriggerKind::Attack, 0.25));
        assert_eq!(
            vec![note_on(Role::Drums, 38, 102), note_off(Role::Drums, 38)],
            events
        );
        assert_eq!(None, voicer.sounding(Role::Drums));
    }

    #[test]
    fn test_monophonic_roles() {
        let mut voicer = Voicer::new();
        let first = voicer.messages(&trigger(Role::Bass, TriggerKind::Attack, 0.0));
        assert_eq!(vec![note_on(Role::Bass, 28, 102)], first);

        let second = voicer.messages(&trigger(Role::Bass, TriggerKind::Attack, 1.0));
        assert_eq!(
            vec![note_off(Role::Bass, 28), note_on(Role::Bass, 43, 102)],
            second
        );
        assert_eq!(Some(43), voicer.sounding(Role::Bass));
    }

    #[test]
    fn test_piano_is_polyphonic() {
        let mut voicer = Voicer::new();
        voicer.messages(&trigger(Role::Piano, TriggerKind::Attack, 0.0));
        let second = voicer.messages(&trigger(Role::Piano, TriggerKind::Attack, 1.0));
        assert_eq!(vec![note_on(Role::Piano, 71, 102)], second);
        let release = voicer.messages(&trigger(Role::Piano, TriggerKind::Release, 0.0));
        assert_eq!(vec![note_off(Role::Piano, 60)], release);
    }

    #[test]
    fn test_theremin_control() {
        let mut voicer = Voicer::new();
        let mut control = trigger(Role::Theremin, TriggerKind::Control, 0.5);
        control.velocity = 1.0;
        control.modulation = Some(0.5);

        let events = voicer.messages(&control);
        assert_eq!(
            vec![
                note_on(Role::Theremin, 60, CONTINUOUS_VELOCITY),
                midi(
                    Role::Theremin,
                    MidiMessage::PitchBend {
                        bend: PitchBend(8192.into()),
                    },
                ),
                control_change(Role::Theremin, CC_VOLUME, 127),
                control_change(Role::Theremin, CC_MODULATION, 64),
            ],
            events
        );

        // Same note, no retrigger.
        let events = voicer.messages(&control);
        assert_eq!(3, events.len());

        let release = voicer.messages(&trigger(Role::Theremin, TriggerKind::Release, 0.5));
        assert_eq!(
            vec![
                note_off(Role::Theremin, 60),
                control_change(Role::Theremin, CC_VOLUME, 0),
            ],
            release
        );
        assert_eq!(None, voicer.sounding(Role::Theremin));
    }

    #[test]
    fn test_pads_lifecycle() {
        let mut voicer = Voicer::new();
        let mut start = trigger(Role::Pads, TriggerKind::Attack, 0.5);
        start.pan = Some(0.0);
        assert_eq!(
            vec![
                control_change(Role::Pads, CC_PAN, 0),
                note_on(Role::Pads, 60, 102),
                control_change(Role::Pads, CC_EXPRESSION, 102),
            ],
            voicer.messages(&start)
        );
        assert_eq!(
            vec![control_change(Role::Pads, CC_EXPRESSION, 102)],
            voicer.messages(&trigger(Role::Pads, TriggerKind::Control, 0.5))
        );
        assert_eq!(
            vec![note_off(Role::Pads, 60)],
            voicer.messages(&trigger(Role::Pads, TriggerKind::Release, 0.5))
        );
    }
}
