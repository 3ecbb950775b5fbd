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

//! Time-derived transaction identifiers.
//!
//! A [`Tid`] packs a UTC instant into 8 bytes: the high 32 bits count minutes since
//! `1900-01-01 00:00`, using 12 months of 31 days each, and the low 32 bits hold the
//! seconds within that minute scaled to the full `u32` range.
//! Instants are kept to the microsecond.
//! The big-endian byte form sorts the same way as the numeric form.

use std::fmt;

use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Timelike;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::CutoffError;

const EPOCH_YEAR: i32 = 1900;

const MICROS_PER_MINUTE: u64 = 60_000_000;

/// A transaction identifier, also used as a visibility boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct Tid(u64);

impl Tid {
    pub const ZERO: Tid = Tid(0);
    pub const MAX: Tid = Tid(u64::MAX);

    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Use an engine supplied 8-byte id verbatim.
    pub fn from_bytes(b: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(b))
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// The id immediately preceding this one. `ZERO` has no predecessor and is returned as is.
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Pack a calendar instant, interpreted as UTC.
    ///
    /// `second` is truncated to whole microseconds, see [`Tid::from_parts_micros`].
    pub fn from_parts(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: f64,
    ) -> Result<Self, CutoffError> {
        if !second.is_finite() || !(0.0..60.0).contains(&second) {
            return Err(CutoffError::invalid(
                format!("{year}-{month}-{day} {hour}:{minute}:{second}"),
                "seconds out of range",
            ));
        }

        // Float rounding may carry 59.99999999 up to a full minute.
        let micros = ((second * 1e6).floor() as u64).min(MICROS_PER_MINUTE - 1);

        Self::from_parts_micros(year, month, day, hour, minute, micros)
    }

    /// Pack a calendar instant, with the seconds given as microseconds within the minute.
    ///
    /// The low 32 bits are the smallest value that renders back as `micros`,
    /// so packing and [`Display`](fmt::Display) are exact inverses at microsecond precision.
    pub fn from_parts_micros(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        micros: u64,
    ) -> Result<Self, CutoffError> {
        let render = || format!("{year}-{month}-{day} {hour}:{minute} +{micros}us");

        if year < EPOCH_YEAR {
            return Err(CutoffError::invalid(render(), "year before 1900"));
        }
        if NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(CutoffError::invalid(render(), "no such date"));
        }
        if hour > 23 || minute > 59 {
            return Err(CutoffError::invalid(render(), "time of day out of range"));
        }
        if micros >= MICROS_PER_MINUTE {
            return Err(CutoffError::invalid(render(), "seconds out of range"));
        }

        let minutes = ((((year - EPOCH_YEAR) as u64 * 12 + (month as u64 - 1)) * 31
            + (day as u64 - 1))
            * 24
            + hour as u64)
            * 60
            + minute as u64;

        if minutes > u32::MAX as u64 {
            return Err(CutoffError::invalid(render(), "year too large"));
        }

        let fraction = ((micros << 32) + MICROS_PER_MINUTE - 1) / MICROS_PER_MINUTE;

        Ok(Self((minutes << 32) | fraction))
    }

    /// Pack a wall-clock instant, keeping its sub-second part to the microsecond.
    pub fn from_datetime(dt: &DateTime<Utc>) -> Result<Self, CutoffError> {
        // A leap second reports nanos >= 1e9.
        let nanos = dt.nanosecond().min(999_999_999);
        let micros = dt.second() as u64 * 1_000_000 + nanos as u64 / 1_000;

        Self::from_parts_micros(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            micros,
        )
    }

    /// Unpack into `(year, month, day, hour, minute, micros)`.
    ///
    /// `micros` counts whole microseconds within the minute, truncated, thus always below 60s.
    pub fn parts(&self) -> (i32, u32, u32, u32, u32, u64) {
        let high = (self.0 >> 32) as u32;
        let low = self.0 & 0xffff_ffff;

        let minute = high % 60;
        let v = high / 60;
        let hour = v % 24;
        let v = v / 24;
        let day = v % 31 + 1;
        let v = v / 31;
        let month = v % 12 + 1;
        let year = (v / 12) as i32 + EPOCH_YEAR;

        let micros = (low * MICROS_PER_MINUTE) >> 32;

        (year, month, day, hour, minute, micros)
    }
}

impl From<[u8; 8]> for Tid {
    fn from(b: [u8; 8]) -> Self {
        Self::from_bytes(b)
    }
}

impl fmt::Display for Tid {
    /// Renders as `YYYY-MM-DD HH:MM:SS.ffffff`, UTC.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, hour, minute, micros) = self.parts();
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            year,
            month,
            day,
            hour,
            minute,
            micros / 1_000_000,
            micros % 1_000_000
        )
    }
}
