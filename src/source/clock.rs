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

//! Monotonic session clocks.

use std::{sync::Arc, time::Duration};

/// A monotonic clock measuring time since the session started.
pub trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
}

/// A clock backed by [std::time::Instant].
pub struct InstantClock {
    start: std::time::Instant,
}

impl InstantClock {
    pub fn new() -> InstantClock {
        InstantClock {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        InstantClock::new()
    }
}

impl Clock for InstantClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// A clock backed by the TSC where available.
#[cfg(feature = "quanta")]
pub struct QuantaClock {
    clock: quanta::Clock,
    start: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl QuantaClock {
    pub fn new() -> QuantaClock {
        let clock = quanta::Clock::new();
        let start = clock.now();
        QuantaClock { clock, start }
    }
}

#[cfg(feature = "quanta")]
impl Default for QuantaClock {
    fn default() -> Self {
        QuantaClock::new()
    }
}

#[cfg(feature = "quanta")]
impl Clock for QuantaClock {
    fn elapsed(&self) -> Duration {
        self.clock.now().duration_since(self.start)
    }
}

/// The fastest clock this build supports.
pub fn session_clock() -> Arc<dyn Clock> {
    #[cfg(feature = "quanta")]
    {
        Arc::new(QuantaClock::new())
    }
    #[cfg(not(feature = "quanta"))]
    {
        Arc::new(InstantClock::new())
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = session_clock();
        let first = clock.elapsed();
        thread::sleep(Duration::from_millis(5));
        let second = clock.elapsed();
        assert!(second >= first + Duration::from_millis(5));
    }

    #[cfg(feature = "quanta")]
    #[test]
    fn test_quanta_clock() {
        let clock = QuantaClock::new();
        thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed() >= Duration::from_millis(4));
    }
}
