// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wall-clock sources used to resolve "now".

use std::fmt;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// A source of the current UTC time.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Each call to `now()` advances the clock by `step`, so that successive readings
/// are distinct, the way successive readings of a real clock are.
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, Duration::zero())
    }

    pub fn with_step(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, d: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += d;
    }

    pub fn peek(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += self.step;
        *current
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("current", &self.peek())
            .field("step", &self.step)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_manual_clock_steps() {
        let start = Utc.with_ymd_and_hms(2008, 1, 21, 13, 22, 42).unwrap();
        let clock = ManualClock::with_step(start, Duration::seconds(1));

        assert_eq!(start + Duration::seconds(1), clock.now());
        assert_eq!(start + Duration::seconds(2), clock.now());

        clock.advance(Duration::hours(1));
        assert_eq!(start + Duration::seconds(3602), clock.now());
    }

    #[test]
    fn test_manual_clock_without_step_is_frozen() {
        let start = Utc.with_ymd_and_hms(2008, 1, 21, 13, 22, 42).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(start, clock.now());
        assert_eq!(start, clock.now());
    }
}
