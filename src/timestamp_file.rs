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

//! A file that pins a cutoff across process restarts.

use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::info;
use tempfile::NamedTempFile;

use crate::Clock;

/// Holds a cutoff timestamp in text form.
///
/// The first process to use the file writes the current UTC time into it, every later
/// one reads that value back. Once written the file is never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFile {
    path: PathBuf,
}

impl TimestampFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the stored timestamp, creating the file with `clock.now()` if it does not exist.
    ///
    /// Creation writes a temporary file next to the target and moves it into place only
    /// if the target is still absent, so when processes race to create it they all end up
    /// with the value of the one that got there first.
    pub fn load_or_init(&self, clock: &dyn Clock) -> Result<String, io::Error> {
        match self.read() {
            Ok(stamp) => {
                debug!("reuse cutoff {} from {}", stamp, self.path.display());
                return Ok(stamp);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let stamp = clock.now().format("%Y-%m-%dT%H:%M:%S").to_string();

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{}", stamp)?;
        tmp.as_file().sync_all()?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                info!("pinned cutoff {} in {}", stamp, self.path.display());
                Ok(stamp)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} was created concurrently, reading it back", self.path.display());
                self.read()
            }
            Err(e) => Err(e.error),
        }
    }

    fn read(&self) -> Result<String, io::Error> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ManualClock;

    fn clock() -> ManualClock {
        let start = Utc.with_ymd_and_hms(2008, 1, 21, 13, 22, 42).unwrap();
        ManualClock::new(start + Duration::milliseconds(750))
    }

    #[test]
    fn test_first_use_writes_seconds() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("before");

        let f = TimestampFile::new(&path);
        assert_eq!("2008-01-21T13:22:42", f.load_or_init(&clock())?);
        assert_eq!("2008-01-21T13:22:42\n", fs::read_to_string(&path)?);
        Ok(())
    }

    #[test]
    fn test_existing_value_is_reused() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("before");

        let clock = clock();
        let first = TimestampFile::new(&path).load_or_init(&clock)?;

        clock.advance(Duration::days(3));
        let second = TimestampFile::new(&path).load_or_init(&clock)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_value_written_by_hand_is_kept_verbatim() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("before");
        fs::write(&path, "  1999-12-31T23:59:59.5 \n")?;

        let got = TimestampFile::new(&path).load_or_init(&clock())?;
        assert_eq!("1999-12-31T23:59:59.5", got);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("no-such-dir").join("before");

        assert!(TimestampFile::new(&path).load_or_init(&clock()).is_err());
        Ok(())
    }
}
