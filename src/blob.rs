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

use std::fs::File;
use std::path::PathBuf;

use crate::Oid;
use crate::StorageError;
use crate::Tid;

/// Access to blobs, large payloads kept outside of the revision data.
///
/// A storage that keeps blobs exposes this through
/// [`StorageRO::as_blob_storage()`](crate::StorageRO::as_blob_storage).
#[async_trait::async_trait]
pub trait BlobStorage: Send + Sync {
    /// Path of the committed blob file of a revision.
    async fn load_blob(&self, oid: Oid, serial: Tid) -> Result<PathBuf, StorageError>;

    /// A directory in which uncommitted blob files can be created.
    fn temporary_directory(&self) -> Result<PathBuf, StorageError>;

    async fn open_committed_blob_file(&self, oid: Oid, serial: Tid) -> Result<File, StorageError>;
}
