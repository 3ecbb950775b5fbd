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

//! Values returned by revision lookups.

use serde::Deserialize;
use serde::Serialize;

use crate::Tid;

/// The current revision of an object, as returned by `load()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub data: Vec<u8>,
    pub serial: Tid,
}

/// A revision found by `load_before()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBefore {
    pub data: Vec<u8>,

    /// The id of the transaction that wrote this revision.
    pub start: Tid,

    /// The id of the transaction that wrote the next revision,
    /// or `None` if this revision is still current.
    pub end: Option<Tid>,
}

/// One record of an object's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tid: Tid,
    pub user_name: String,
    pub description: String,

    /// Size of the revision's data in bytes.
    pub size: usize,
}

/// Identifies a transaction driven through the two-phase commit calls of a
/// [`Storage`](crate::Storage).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub user: String,
    pub description: String,
}

impl TransactionMeta {
    pub fn new(user: impl ToString, description: impl ToString) -> Self {
        Self {
            user: user.to_string(),
            description: description.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_serde() -> anyhow::Result<()> {
        let entry = HistoryEntry {
            tid: Tid::from_u64(3),
            user_name: "alice".to_string(),
            description: "fix".to_string(),
            size: 12,
        };

        let s = serde_json::to_string(&entry)?;
        assert_eq!(
            r#"{"tid":3,"user_name":"alice","description":"fix","size":12}"#,
            s
        );
        assert_eq!(entry, serde_json::from_str::<HistoryEntry>(&s)?);

        Ok(())
    }
}
