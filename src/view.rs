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

//! A read-only view of a storage as it was before a given transaction id.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::info;
use log::warn;

use crate::errors::CutoffError;
use crate::BlobStorage;
use crate::Clock;
use crate::CutoffSpec;
use crate::HistoryEntry;
use crate::LoadBefore;
use crate::Loaded;
use crate::Oid;
use crate::Startup;
use crate::Storage;
use crate::StorageError;
use crate::StorageRO;
use crate::Tid;
use crate::TransactionMeta;

/// Whether the wrapped storage stores blobs, probed once when the view is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobSupport {
    Supported,
    Unsupported,
}

/// Wraps a storage and hides every revision written at or after `before`.
///
/// The view is read-only: every write operation fails, and the two-phase commit
/// protocol can not be started. `before` is fixed when the view is built; the view
/// holds no other state, so it adds no synchronization of its own.
///
/// # Examples
///
/// ```
/// use before_storage::BoundedView;
/// use before_storage::MemoryStorage;
/// use before_storage::Oid;
/// use before_storage::StorageRO;
/// use before_storage::Tid;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let storage = MemoryStorage::new("mem");
///     storage.append(Oid::new(1), Tid::from_u64(1), b"old".to_vec())?;
///     storage.append(Oid::new(1), Tid::from_u64(9), b"new".to_vec())?;
///
///     let view = BoundedView::new(storage, Tid::from_u64(5));
///     assert_eq!(b"old".to_vec(), view.load(Oid::new(1)).await?.data);
///     assert_eq!(Tid::from_u64(4), view.last_transaction());
///
///     Ok(())
/// }
/// ```
pub struct BoundedView<S> {
    base: S,

    /// Revisions with a tid greater or equal than this are invisible.
    before: Tid,

    blob: BlobSupport,
}

impl<S> BoundedView<S>
where S: StorageRO
{
    pub fn new(base: S, before: Tid) -> Self {
        let blob = if base.as_blob_storage().is_some() {
            BlobSupport::Supported
        } else {
            BlobSupport::Unsupported
        };

        info!(
            "open view of {} before {} ({:?}), blob: {:?}",
            base.name(),
            before,
            before,
            blob
        );

        Self { base, before, blob }
    }

    /// Resolve `spec` and build a view with it.
    pub fn open(
        base: S,
        spec: &CutoffSpec,
        clock: &dyn Clock,
        startup: Startup,
    ) -> Result<Self, CutoffError> {
        let before = spec.resolve(clock, startup)?;
        Ok(Self::new(base, before))
    }

    pub fn before(&self) -> Tid {
        self.before
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn blob_support(&self) -> BlobSupport {
        self.blob
    }

    fn read_only(&self, op: &'static str) -> StorageError {
        warn!("{}: rejected `{}`: storage is read-only", self.name(), op);
        StorageError::ReadOnly {
            storage: self.name(),
            op,
        }
    }

    fn no_transaction(&self, op: &'static str, txn: &TransactionMeta) -> StorageError {
        warn!("{}: rejected `{}` of {:?}: storage is read-only", self.name(), op, txn);
        StorageError::Transaction {
            storage: self.name(),
            op,
            reason: format!("{:?} can not be committed to a read-only storage", txn),
        }
    }

    fn base_blobs(&self, op: &'static str) -> Result<&dyn BlobStorage, StorageError> {
        let blobs = match self.blob {
            BlobSupport::Supported => self.base.as_blob_storage(),
            BlobSupport::Unsupported => None,
        };

        blobs.ok_or_else(|| StorageError::Unsupported {
            storage: self.name(),
            op,
        })
    }
}

impl<S> fmt::Debug for BoundedView<S>
where S: StorageRO
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<BoundedView: {}>", self.name())
    }
}

#[async_trait::async_trait]
impl<S> StorageRO for BoundedView<S>
where S: StorageRO
{
    fn name(&self) -> String {
        format!("{} before {}", self.base.name(), self.before)
    }

    fn size(&self) -> u64 {
        self.base.size()
    }

    fn sort_key(&self) -> String {
        self.base.sort_key()
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    /// The id right before the boundary, whether or not a transaction committed there.
    fn last_transaction(&self) -> Tid {
        self.before.prev()
    }

    async fn load(&self, oid: Oid) -> Result<Loaded, StorageError> {
        let got = self.base.load_before(oid, self.before).await?;
        let Some(got) = got else {
            return Err(StorageError::NotFound { oid });
        };

        Ok(Loaded {
            data: got.data,
            serial: got.start,
        })
    }

    async fn last_tid(&self, oid: Oid) -> Result<Tid, StorageError> {
        let loaded = self.load(oid).await?;
        Ok(loaded.serial)
    }

    async fn load_before(&self, oid: Oid, tid: Tid) -> Result<Option<LoadBefore>, StorageError> {
        let tid = tid.min(self.before);

        let got = self.base.load_before(oid, tid).await?;
        let Some(mut got) = got else {
            return Ok(None);
        };

        // The next revision is hidden, thus this one is still current.
        if got.end.is_some_and(|end| end >= self.before) {
            got.end = None;
        }

        Ok(Some(got))
    }

    async fn load_serial(&self, oid: Oid, serial: Tid) -> Result<Vec<u8>, StorageError> {
        if serial >= self.before {
            return Err(StorageError::NotFound { oid });
        }
        self.base.load_serial(oid, serial).await
    }

    /// The base storage limits the number of records before we can filter out hidden ones.
    /// Ask for twice as many each round until enough are visible or the base has no more.
    async fn history(&self, oid: Oid, size: usize) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut s = size;

        loop {
            let base_history = self.base.history(oid, s).await?;
            let exhausted = base_history.len() < s;

            let mut visible = base_history
                .into_iter()
                .filter(|e| e.tid < self.before)
                .collect::<Vec<_>>();

            debug!(
                "history of {} before {}: asked base for {}, {} visible, exhausted: {}",
                oid,
                self.before,
                s,
                visible.len(),
                exhausted
            );

            if exhausted || visible.len() >= size {
                visible.truncate(size);
                return Ok(visible);
            }

            s = s.saturating_mul(2);
        }
    }

    fn register_db(&self, _db: &str) {}

    async fn close(&self) -> Result<(), StorageError> {
        self.base.close().await
    }

    fn as_blob_storage(&self) -> Option<&dyn BlobStorage> {
        match self.blob {
            BlobSupport::Supported => Some(self),
            BlobSupport::Unsupported => None,
        }
    }
}

#[async_trait::async_trait]
impl<S> Storage for BoundedView<S>
where S: StorageRO
{
    async fn new_oid(&self) -> Result<Oid, StorageError> {
        Err(self.read_only("new_oid"))
    }

    async fn pack(&self, _pack_time: Tid) -> Result<(), StorageError> {
        Err(self.read_only("pack"))
    }

    async fn store(
        &self,
        _oid: Oid,
        _prev_serial: Option<Tid>,
        _data: Vec<u8>,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        Err(self.no_transaction("store", txn))
    }

    async fn store_blob(
        &self,
        _oid: Oid,
        _prev_serial: Option<Tid>,
        _data: Vec<u8>,
        _blob_path: &Path,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        Err(self.no_transaction("store_blob", txn))
    }

    async fn tpc_begin(&self, _txn: &TransactionMeta) -> Result<(), StorageError> {
        Err(self.read_only("tpc_begin"))
    }

    async fn tpc_vote(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        Err(self.no_transaction("tpc_vote", txn))
    }

    async fn tpc_finish(&self, txn: &TransactionMeta) -> Result<Tid, StorageError> {
        Err(self.no_transaction("tpc_finish", txn))
    }

    async fn tpc_abort(&self, _txn: &TransactionMeta) -> Result<(), StorageError> {
        Ok(())
    }

    fn tpc_transaction(&self) -> Option<TransactionMeta> {
        None
    }
}

/// Blob payloads are not bounded, only the revisions that point to them are.
#[async_trait::async_trait]
impl<S> BlobStorage for BoundedView<S>
where S: StorageRO
{
    async fn load_blob(&self, oid: Oid, serial: Tid) -> Result<PathBuf, StorageError> {
        self.base_blobs("load_blob")?.load_blob(oid, serial).await
    }

    fn temporary_directory(&self) -> Result<PathBuf, StorageError> {
        self.base_blobs("temporary_directory")?.temporary_directory()
    }

    async fn open_committed_blob_file(&self, oid: Oid, serial: Tid) -> Result<File, StorageError> {
        self.base_blobs("open_committed_blob_file")?
            .open_committed_blob_file(oid, serial)
            .await
    }
}
