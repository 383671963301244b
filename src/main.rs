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
use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use airband::config::Airband;
use airband::dispatch::json::JsonRelay;
use airband::dispatch::midi::{self, MidiSynth};
use airband::dispatch::osc::OscRelay;
use airband::dispatch::{MultiRelay, NullRelay, NullSynth, Relay, Synth};
use airband::instruments::Role;
use airband::performer::{Command, Performer};
use airband::session::Session;
use airband::source::replay;
use clap::{crate_version, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays instruments from hand-pose streams."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replays a recorded JSON-lines frame file through an instrument.
    Replay {
        /// The path to the recorded frames.
        file: PathBuf,
        /// The instrument to play.
        #[arg(short, long, default_value = "drums")]
        instrument: Role,
        /// The configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The MIDI output device to play on.
        #[arg(short, long)]
        midi_device: Option<String>,
        /// Relays events as OSC messages to this address.
        #[arg(long)]
        osc: Option<String>,
        /// Relays events as JSON datagrams to this address.
        #[arg(long)]
        json: Option<String>,
        /// Paces frames by their timestamps instead of replaying as fast as possible.
        #[arg(long)]
        realtime: bool,
        /// Reads commands (an instrument name or `reset`) from stdin while replaying.
        #[arg(long)]
        interactive: bool,
    },
    /// Lists the available MIDI output devices.
    MidiDevices {},
    /// Prints the default configuration.
    Defaults {},
}

fn relay(config: &Airband) -> Result<Arc<dyn Relay>, Box<dyn Error>> {
    let mut relays: Vec<Arc<dyn Relay>> = Vec::new();
    if let Some(target) = config.dispatch().osc_relay()? {
        relays.push(Arc::new(OscRelay::new(target)?));
    }
    if let Some(target) = config.dispatch().json_relay()? {
        relays.push(Arc::new(JsonRelay::new(target)?));
    }
    Ok(match relays.len() {
        0 => Arc::new(NullRelay),
        1 => relays.remove(0),
        _ => Arc::new(MultiRelay::new(relays)),
    })
}

fn read_commands(commands_tx: mpsc::Sender<Command>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                return;
            };
            match line.parse::<Command>() {
                Ok(command) => {
                    if commands_tx.blocking_send(command).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(input = line, err = e, "Unrecognized command"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            file,
            instrument,
            config,
            midi_device,
            osc,
            json,
            realtime,
            interactive,
        } => {
            let mut config = Airband::load(config.as_deref())?;
            config.dispatch_mut().set_midi_device(midi_device);
            config.dispatch_mut().set_relays(osc, json);
            config.validate()?;

            let synth: Arc<dyn Synth> = match config.dispatch().midi_device() {
                Some(name) => Arc::new(MidiSynth::connect(name)?),
                None => Arc::new(NullSynth),
            };
            let session = Session::from_config(&config, instrument, synth, relay(&config)?)?;

            let (commands_tx, commands_rx) = mpsc::channel(1);
            if interactive {
                read_commands(commands_tx.clone());
            }
            let (events_tx, events_rx) = crossbeam_channel::unbounded();
            let printer = thread::spawn(move || {
                for event in events_rx {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!(err = e.to_string(), "Unable to print event"),
                    }
                }
            });

            let mut performer = Performer::new(
                session,
                Arc::new(replay::Driver::new(&file, realtime)),
                commands_rx,
                events_tx,
            );
            let stats = performer.join().await?;
            drop(commands_tx);
            printer.join().map_err(|_| "event printer panicked")?;

            eprintln!(
                "Dispatched {} events ({} synth failures, {} relay failures).",
                stats.dispatched, stats.synth_failures, stats.relay_failures
            );
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Defaults {} => {
            print!("{}", serde_yml::to_string(&Airband::default())?);
        }
    }

    Ok(())
}
