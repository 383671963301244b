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

//! One performer's pipeline: estimation, classification, trigger control and
//! dispatch, run to completion for each frame.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::config::{Airband, ConfigError};
use crate::dispatch::{DispatchStats, Dispatcher, Relay, Synth, VisualFeedback};
use crate::events::PerformanceEvent;
use crate::hands::RawFrame;
use crate::instruments::{Classifier, Instrument, InstrumentSettings, Role};
use crate::kinematics::Estimator;
use crate::trigger::TriggerRegistry;

pub struct Session {
    estimator: Estimator,
    triggers: TriggerRegistry,
    settings: InstrumentSettings,
    instrument: Instrument,
    dispatcher: Dispatcher,
    last_timestamp: Duration,
}

impl Session {
    pub fn new(
        role: Role,
        estimator: Estimator,
        triggers: TriggerRegistry,
        settings: InstrumentSettings,
        dispatcher: Dispatcher,
    ) -> Session {
        let instrument = Instrument::new(role, &settings);
        Session {
            estimator,
            triggers,
            settings,
            instrument,
            dispatcher,
            last_timestamp: Duration::ZERO,
        }
    }

    /// Builds a session from the configuration.
    pub fn from_config(
        config: &Airband,
        role: Role,
        synth: Arc<dyn Synth>,
        relay: Arc<dyn Relay>,
    ) -> Result<Session, ConfigError> {
        Ok(Session::new(
            role,
            config.estimator()?,
            config.trigger_registry()?,
            config.instrument_settings(),
            Dispatcher::new(synth, relay, config.feedback().flash()?),
        ))
    }

    /// Runs one frame through the pipeline, dispatching and returning its events.
    pub fn process(&mut self, raw: &RawFrame) -> Vec<PerformanceEvent> {
        let frame = self.estimator.estimate(raw);
        self.last_timestamp = frame.timestamp;
        let events = self.instrument.process(&frame, &mut self.triggers);
        self.dispatch(&events);
        events
    }

    /// Switches to another instrument. Anything still sounding on the old
    /// instrument is released first, then all estimator, trigger and
    /// classifier state is discarded. Returns the dispatched release events.
    pub fn switch_instrument(&mut self, role: Role) -> Vec<PerformanceEvent> {
        info!(from = %self.role(), to = %role, "Switching instrument.");
        let events = self.release_all();
        self.instrument = Instrument::new(role, &self.settings);
        events
    }

    /// Releases anything still sounding and discards all estimator, trigger
    /// and classifier state. Returns the dispatched release events.
    pub fn reset(&mut self) -> Vec<PerformanceEvent> {
        self.release_all()
    }

    fn release_all(&mut self) -> Vec<PerformanceEvent> {
        let events = self.instrument.release_all(self.last_timestamp);
        if !events.is_empty() {
            debug!(count = events.len(), "Released sounding gestures.");
        }
        self.dispatch(&events);
        self.estimator.reset();
        self.triggers.reset();
        events
    }

    fn dispatch(&mut self, events: &[PerformanceEvent]) {
        for event in events {
            self.dispatcher.dispatch(event);
        }
    }

    pub fn role(&self) -> Role {
        self.instrument.role()
    }

    pub fn feedback(&mut self) -> &mut VisualFeedback {
        self.dispatcher.feedback()
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Number of gesture sources with trigger state.
    pub fn tracked_triggers(&self) -> usize {
        self.triggers.len()
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::dispatch::mock::{MockRelay, MockSynth};
    use crate::dispatch::{NullRelay, NullSynth, TriggerKind};
    use crate::events::DrumZone;
    use crate::hands::Handedness;
    use crate::testutil::{ms, open_hand, pointing_hand, RawFrameBuilder};

    fn left_at(t: u64, x: f32, y: f32) -> RawFrame {
        RawFrameBuilder::at(ms(t))
            .hand(open_hand(Handedness::Left, x, y))
            .build()
    }

    fn session(role: Role, synth: Arc<MockSynth>, relay: Arc<MockRelay>) -> Session {
        Session::new(
            role,
            Estimator::default(),
            TriggerRegistry::default(),
            InstrumentSettings::default(),
            Dispatcher::new(synth, relay, ms(100)),
        )
    }

    #[test]
    fn test_drum_scenario_end_to_end() {
        let synth = Arc::new(MockSynth::new());
        let relay = Arc::new(MockRelay::new());
        let mut session = session(Role::Drums, synth.clone(), relay.clone());

        assert!(session.process(&left_at(0, 0.1, 0.80)).is_empty());
        assert!(session.process(&left_at(20, 0.1, 0.60)).is_empty());
        let events = session.process(&left_at(50, 0.1, 0.85));

        assert_eq!(1, events.len());
        match &events[0] {
            PerformanceEvent::Drum(hit) => assert_eq!(DrumZone::HiHat, hit.zone),
            other => panic!("unexpected event {:?}", other),
        }

        let triggers = synth.triggers();
        assert_eq!(1, triggers.len());
        assert_eq!(Role::Drums, triggers[0].role);
        assert_eq!(TriggerKind::Attack, triggers[0].kind);

        let payloads = relay.payloads();
        assert_eq!(1, payloads.len());
        assert_eq!("hihat", payloads[0].zone);
        assert_eq!(50, payloads[0].timestamp);

        assert_eq!(1, session.stats().dispatched);
        assert!(session.feedback().is_flashing(ms(60)));
        assert!(!session.feedback().is_flashing(ms(200)));
    }

    #[test]
    fn test_switch_instrument_clears_state() {
        let synth = Arc::new(MockSynth::new());
        let relay = Arc::new(MockRelay::new());
        let mut session = session(Role::Drums, synth, relay);

        session.process(&left_at(0, 0.1, 0.3));
        session.process(&left_at(30, 0.1, 0.5));
        assert!(session.tracked_triggers() > 0);

        session.switch_instrument(Role::Theremin);
        assert_eq!(Role::Theremin, session.role());
        assert_eq!(0, session.tracked_triggers());

        let frame = RawFrameBuilder::at(ms(60))
            .hand(open_hand(Handedness::Right, 0.4, 0.5))
            .build();
        let events = session.process(&frame);
        assert_eq!(1, events.len());
        assert_eq!(Role::Theremin, events[0].role());
    }

    #[test]
    fn test_reset_forgets_motion() {
        let mut session = session(
            Role::Drums,
            Arc::new(MockSynth::new()),
            Arc::new(MockRelay::new()),
        );

        session.process(&left_at(0, 0.1, 0.3));
        session.reset();
        assert_eq!(0, session.tracked_triggers());
        // Without history the next frame has no velocity.
        assert!(session.process(&left_at(30, 0.1, 0.5)).is_empty());
        assert_eq!(1, session.process(&left_at(60, 0.1, 0.7)).len());
    }

    #[test]
    fn test_switch_instrument_releases_held_keys() {
        let synth = Arc::new(MockSynth::new());
        let relay = Arc::new(MockRelay::new());
        let mut session = session(Role::Piano, synth.clone(), relay.clone());

        for (t, y) in [(0, 0.3), (30, 0.4)] {
            session.process(
                &RawFrameBuilder::at(ms(t))
                    .hand(pointing_hand(Handedness::Right, 0.5, y))
                    .build(),
            );
        }
        let kinds: Vec<TriggerKind> = synth.triggers().iter().map(|t| t.kind).collect();
        assert_eq!(vec![TriggerKind::Attack], kinds);

        let released = session.switch_instrument(Role::Drums);
        assert_eq!(1, released.len());
        assert!(released[0].is_release());
        assert_eq!(ms(30), released[0].timestamp());

        let triggers = synth.triggers();
        assert_eq!(2, triggers.len());
        assert_eq!(Role::Piano, triggers[1].role);
        assert_eq!(TriggerKind::Release, triggers[1].kind);
        assert_eq!(2, relay.payloads().len());
        assert_eq!(Role::Drums, session.role());
    }

    #[test]
    fn test_reset_silences_theremin() {
        let synth = Arc::new(MockSynth::new());
        let mut session = session(Role::Theremin, synth.clone(), Arc::new(MockRelay::new()));

        session.process(
            &RawFrameBuilder::at(ms(0))
                .hand(open_hand(Handedness::Right, 0.4, 0.5))
                .build(),
        );
        let released = session.reset();
        assert_eq!(1, released.len());
        assert!(released[0].is_release());
        assert_eq!(2, session.stats().dispatched);
        // Nothing left to release.
        assert!(session.reset().is_empty());
        assert_eq!(Role::Theremin, session.role());
    }

    #[test]
    fn test_failing_collaborators_do_not_stop_events() {
        let synth = Arc::new(MockSynth::failing());
        let relay = Arc::new(MockRelay::failing());
        let mut session = session(Role::Drums, synth, relay);

        session.process(&left_at(0, 0.1, 0.3));
        assert_eq!(1, session.process(&left_at(30, 0.1, 0.5)).len());
        let stats = session.stats();
        assert_eq!(1, stats.dispatched);
        assert_eq!(1, stats.synth_failures);
        assert_eq!(1, stats.relay_failures);
    }

    #[test]
    fn test_from_config() -> Result<(), Box<dyn Error>> {
        let config = Airband::from_yaml("instruments:\n  bass:\n    cooldown: 10ms\n")?;
        let session = Session::from_config(
            &config,
            Role::Bass,
            Arc::new(NullSynth),
            Arc::new(NullRelay),
        )?;
        assert_eq!(Role::Bass, session.role());
        Ok(())
    }
}
