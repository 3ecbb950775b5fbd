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

//! Builds a [`BoundedView`] from configuration.
//!
//! ```json
//! { "name": "frozen", "before": "2008-01-21T13:22:42" }
//! ```
//!
//! `before` is `now`, `startup`, a date-time, or a raw id written as `0x` and 16 hex digits.
//! `before-from-file` names a file that pins
//! the cutoff across restarts instead; the two can not be combined.

use std::path::PathBuf;

use log::info;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::ConfigError;
use crate::BoundedView;
use crate::Clock;
use crate::CutoffSpec;
use crate::Startup;
use crate::StorageError;
use crate::StorageRO;
use crate::TimestampFile;

/// Opens the storage a view wraps.
///
/// It is only called after the rest of the configuration is found valid.
#[async_trait::async_trait]
pub trait OpenBase: Send {
    type Storage: StorageRO;

    async fn open(self) -> Result<Self::Storage, StorageError>;
}

/// An already opened storage.
#[derive(Debug)]
pub struct Opened<S>(pub S);

#[async_trait::async_trait]
impl<S> OpenBase for Opened<S>
where S: StorageRO + 'static
{
    type Storage = S;

    async fn open(self) -> Result<S, StorageError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BeforeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_from_file: Option<PathBuf>,
}

impl BeforeConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str(s)?;
        Ok(config)
    }

    pub fn with_before(mut self, before: impl ToString) -> Self {
        self.before = Some(before.to_string());
        self
    }

    pub fn with_before_from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.before_from_file = Some(path.into());
        self
    }

    /// Decide what the cutoff is, reading or creating the cutoff file if one is configured.
    pub fn cutoff_spec(&self, clock: &dyn Clock) -> Result<CutoffSpec, ConfigError> {
        match (&self.before, &self.before_from_file) {
            (Some(_), Some(_)) => Err(ConfigError::Conflict),
            (None, Some(path)) => {
                let stamp = TimestampFile::new(path)
                    .load_or_init(clock)
                    .map_err(|source| ConfigError::CutoffFile {
                        path: path.clone(),
                        source,
                    })?;
                Ok(CutoffSpec::Text(stamp))
            }
            (before, None) => Ok(CutoffSpec::from_setting(before.as_deref())),
        }
    }

    /// Resolve the cutoff, then open the base storage and wrap it.
    pub async fn open<O>(
        &self,
        base: O,
        clock: &dyn Clock,
        startup: Startup,
    ) -> Result<BoundedView<O::Storage>, ConfigError>
    where
        O: OpenBase,
    {
        let spec = self.cutoff_spec(clock)?;
        let before = spec.resolve(clock, startup)?;

        let base = base.open().await?;

        info!(
            "config {}: {:?} resolved to {}",
            self.name.as_deref().unwrap_or("-"),
            spec,
            before
        );

        Ok(BoundedView::new(base, before))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use chrono::Duration;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse_cutoff;
    use crate::ManualClock;
    use crate::MemoryStorage;
    use crate::Tid;

    /// Records whether the base was opened.
    struct Tracked {
        opened: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl OpenBase for Tracked {
        type Storage = MemoryStorage;

        async fn open(self) -> Result<MemoryStorage, StorageError> {
            self.opened.store(true, Ordering::Relaxed);
            Ok(MemoryStorage::new("base"))
        }
    }

    fn clock() -> ManualClock {
        let start = Utc.with_ymd_and_hms(2008, 1, 21, 13, 22, 42).unwrap();
        ManualClock::with_step(start, Duration::seconds(1))
    }

    fn startup() -> Startup {
        Startup::new(Tid::from_parts(2008, 1, 1, 0, 0, 0.0).unwrap())
    }

    #[test]
    fn test_from_json() -> anyhow::Result<()> {
        let c = BeforeConfig::from_json(
            r#"{"name": "frozen", "before-from-file": "/var/lib/app/before"}"#,
        )?;
        assert_eq!(
            BeforeConfig {
                name: Some("frozen".to_string()),
                before: None,
                before_from_file: Some(PathBuf::from("/var/lib/app/before")),
            },
            c
        );

        assert_eq!(BeforeConfig::default(), BeforeConfig::from_json("{}")?);

        let err = BeforeConfig::from_json(r#"{"after": "now"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_conflict_fails_before_opening_base() -> anyhow::Result<()> {
        let opened = Arc::new(AtomicBool::new(false));
        let config = BeforeConfig::default()
            .with_before("now")
            .with_before_from_file("x");

        let res = config
            .open(
                Tracked {
                    opened: opened.clone(),
                },
                &clock(),
                startup(),
            )
            .await;

        assert!(matches!(res, Err(ConfigError::Conflict)));
        assert!(!opened.load(Ordering::Relaxed));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_cutoff_fails_before_opening_base() -> anyhow::Result<()> {
        let opened = Arc::new(AtomicBool::new(false));
        let config = BeforeConfig::default().with_before("2008-01");

        let res = config
            .open(
                Tracked {
                    opened: opened.clone(),
                },
                &clock(),
                startup(),
            )
            .await;

        assert!(matches!(res, Err(ConfigError::Cutoff(_))));
        assert!(!opened.load(Ordering::Relaxed));
        Ok(())
    }

    #[tokio::test]
    async fn test_keywords() -> anyhow::Result<()> {
        let clock = clock();

        let view = BeforeConfig::default()
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(Tid::from_parts(2008, 1, 21, 13, 22, 43.0)?, view.before());

        let view = BeforeConfig::default()
            .with_before("NOW")
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(Tid::from_parts(2008, 1, 21, 13, 22, 44.0)?, view.before());

        let view = BeforeConfig::default()
            .with_before("startup")
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(startup().tid(), view.before());

        let view = BeforeConfig::default()
            .with_before("2008-01-21T13:22:42.5")
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(parse_cutoff("2008-01-21T13:22:42.5")?, view.before());
        assert_eq!("m before 2008-01-21 13:22:42.500000", view.name());
        Ok(())
    }

    #[tokio::test]
    async fn test_raw_boundary_setting() -> anyhow::Result<()> {
        let clock = clock();
        let config = BeforeConfig::from_json(r#"{"before": "0x0373a1b2c3d4e5f6"}"#)?;
        assert_eq!(
            CutoffSpec::Raw(0x0373_a1b2_c3d4_e5f6u64.to_be_bytes()),
            config.cutoff_spec(&clock)?
        );

        let view = config
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(
            [0x03, 0x73, 0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6],
            view.before().to_bytes()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_before_from_file_is_stable() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("before");
        let clock = clock();

        let config = BeforeConfig::default().with_before_from_file(&path);

        let first = config
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert!(path.exists());
        assert_eq!(Tid::from_parts(2008, 1, 21, 13, 22, 43.0)?, first.before());

        clock.advance(Duration::hours(5));

        let second = config
            .open(Opened(MemoryStorage::new("m")), &clock, startup())
            .await?;
        assert_eq!(first.before().to_bytes(), second.before().to_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn test_before_from_file_unreadable() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config =
            BeforeConfig::default().with_before_from_file(dir.path().join("missing").join("f"));

        let res = config
            .open(Opened(MemoryStorage::new("m")), &clock(), startup())
            .await;
        assert!(matches!(res, Err(ConfigError::CutoffFile { .. })));
        Ok(())
    }
}
