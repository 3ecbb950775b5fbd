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

//! Turns a user supplied cutoff into a [`Tid`].

use log::debug;

use crate::errors::CutoffError;
use crate::Clock;
use crate::Tid;

/// A text cutoff this short or shorter is neither a date nor anything else we accept.
const MIN_TEXT_LEN: usize = 9;

/// What the boundary of a view was configured as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CutoffSpec {
    /// The time the view is opened.
    #[default]
    Now,

    /// The time the process started, see [`Startup`].
    Startup,

    /// An engine-native transaction id, used verbatim.
    Raw([u8; 8]),

    /// `YYYY-MM-DD[THH[:MM[:SS.ffffff]]]`, UTC.
    Text(String),
}

impl CutoffSpec {
    /// Build from a configuration setting.
    ///
    /// A missing setting means `now`. The keywords `now` and `startup` are case-insensitive.
    /// `0x` followed by exactly 16 hex digits is an engine-native id, used verbatim.
    /// Anything else is kept as text to be parsed by [`parse_cutoff`].
    pub fn from_setting(setting: Option<&str>) -> Self {
        let Some(s) = setting else {
            return CutoffSpec::Now;
        };

        if s.eq_ignore_ascii_case("now") {
            CutoffSpec::Now
        } else if s.eq_ignore_ascii_case("startup") {
            CutoffSpec::Startup
        } else if let Some(raw) = parse_raw_hex(s) {
            CutoffSpec::Raw(raw)
        } else {
            CutoffSpec::Text(s.to_string())
        }
    }

    /// Resolve into the boundary id. Called exactly once per view.
    pub fn resolve(&self, clock: &dyn Clock, startup: Startup) -> Result<Tid, CutoffError> {
        let tid = match self {
            CutoffSpec::Now => Tid::from_datetime(&clock.now())?,
            CutoffSpec::Startup => startup.tid(),
            CutoffSpec::Raw(b) => Tid::from_bytes(*b),
            CutoffSpec::Text(s) => parse_cutoff(s)?,
        };

        debug!("resolved cutoff {:?} to {} ({:?})", self, tid, tid);
        Ok(tid)
    }
}

impl From<Tid> for CutoffSpec {
    fn from(tid: Tid) -> Self {
        CutoffSpec::Raw(tid.to_bytes())
    }
}

fn parse_raw_hex(s: &str) -> Option<[u8; 8]> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;

    if hex.len() != 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u64::from_str_radix(hex, 16).ok().map(u64::to_be_bytes)
}

/// The process start time, captured once at the composition root and handed to
/// whatever resolves a `startup` cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Startup(Tid);

impl Startup {
    pub fn new(tid: Tid) -> Self {
        Self(tid)
    }

    pub fn capture(clock: &dyn Clock) -> Result<Self, CutoffError> {
        Ok(Self(Tid::from_datetime(&clock.now())?))
    }

    pub fn tid(&self) -> Tid {
        self.0
    }
}

/// Parse `YYYY-MM-DD[THH[:MM[:SS.ffffff]]]` into a [`Tid`].
///
/// A single space is accepted in place of the `T`, so the `Display` form of a [`Tid`]
/// parses back to the same id. Missing time fields are zero.
///
/// Seconds are kept to the microsecond. Further fraction digits are dropped.
pub fn parse_cutoff(text: &str) -> Result<Tid, CutoffError> {
    if text.chars().count() < MIN_TEXT_LEN {
        return Err(CutoffError::invalid(
            text,
            "too short to be a date and not a raw transaction id",
        ));
    }

    let (date, time) = text
        .split_once(|c: char| c == 'T' || c == ' ')
        .unwrap_or((text, ""));

    let date = date
        .split('-')
        .map(|x| x.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CutoffError::invalid(text, format!("bad date field: {}", e)))?;

    let [year, month, day] = date[..] else {
        return Err(CutoffError::invalid(text, "date must be YYYY-MM-DD"));
    };

    let mut hour = 0;
    let mut minute = 0;
    let mut micros = 0;

    if !time.is_empty() {
        let fields = time.split(':').collect::<Vec<_>>();
        if fields.len() > 3 {
            return Err(CutoffError::invalid(text, "more than 3 time fields"));
        }

        let int_field = |s: &str| {
            s.parse::<u32>()
                .map_err(|e| CutoffError::invalid(text, format!("bad time field {:?}: {}", s, e)))
        };

        hour = int_field(fields[0])?;
        if let Some(&m) = fields.get(1) {
            minute = int_field(m)?;
        }
        if let Some(&s) = fields.get(2) {
            micros = parse_seconds(s).ok_or_else(|| {
                CutoffError::invalid(text, format!("bad seconds field {:?}", s))
            })?;
        }
    }

    let year = i32::try_from(year).map_err(|_| CutoffError::invalid(text, "year too large"))?;

    Tid::from_parts_micros(year, month, day, hour, minute, micros)
        .map_err(|e| match e {
            CutoffError::InvalidFormat { reason, .. } => CutoffError::invalid(text, reason),
        })
}

/// Parse `SS[.ffffff...]` into microseconds, truncating past the sixth fraction digit.
fn parse_seconds(s: &str) -> Option<u64> {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));

    let all_digits = |x: &str| x.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || whole.len() > 2 || !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    let whole = whole.parse::<u64>().ok()?;

    let mut fraction_micros = 0;
    for (i, b) in fraction.bytes().take(6).enumerate() {
        fraction_micros += (b - b'0') as u64 * 10u64.pow(5 - i as u32);
    }

    Some(whole * 1_000_000 + fraction_micros)
}
