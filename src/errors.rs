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

use std::io;
use std::path::PathBuf;

use crate::Oid;
use crate::Tid;

/// A cutoff specification could not be turned into a [`Tid`].
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum CutoffError {
    #[error("InvalidCutoffFormat: {reason}: {input:?}")]
    InvalidFormat { input: String, reason: String },
}

impl CutoffError {
    pub(crate) fn invalid(input: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors returned while opening a view from a [`BeforeConfig`](crate::BeforeConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("ConfigurationConflict: `before` and `before-from-file` can not both be set")]
    Conflict,

    #[error(transparent)]
    Cutoff(#[from] CutoffError),

    #[error("cutoff file {path}: {source}")]
    CutoffFile { path: PathBuf, source: io::Error },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors returned by storage operations.
///
/// Errors from the underlying storage pass through a view unchanged.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// No revision of the object is visible.
    #[error("ObjectNotFound: {oid}")]
    NotFound { oid: Oid },

    #[error("ReadOnlyViolation: `{op}` on read-only storage {storage}")]
    ReadOnly { storage: String, op: &'static str },

    #[error("TransactionProtocolViolation: `{op}` on {storage}: {reason}")]
    Transaction {
        storage: String,
        op: &'static str,
        reason: String,
    },

    #[error("Unsupported: `{op}` is not supported by {storage}")]
    Unsupported { storage: String, op: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, StorageError::ReadOnly { .. })
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, StorageError::Transaction { .. })
    }
}

/// Errors that can occur when seeding revisions into an in-memory storage.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum InsertError {
    /// Transaction ids must be strictly increasing across the whole storage.
    #[error("NonIncremental: current={current:?} > last={last:?} does not hold")]
    NonIncremental { last: Tid, current: Tid },
}
