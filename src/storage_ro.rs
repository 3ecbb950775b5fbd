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

//! Defines the read-only storage interface.
//!
//! The [`StorageRO`] trait provides the read operations of a multi-version object
//! storage: loading the current revision of an object, loading the revision that was
//! current before a given transaction, loading an exact revision, and listing history.
//! This trait is designed to be thread-safe and can be used in concurrent contexts.

use std::sync::Arc;

use crate::BlobStorage;
use crate::HistoryEntry;
use crate::LoadBefore;
use crate::Loaded;
use crate::Oid;
use crate::StorageError;
use crate::Tid;

/// Provides read access to a multi-version object storage.
///
/// Every revision of an object is addressed by the [`Oid`] of the object and the
/// [`Tid`] of the transaction that wrote it. Tids are strictly increasing in commit order.
///
/// # Examples
///
/// ```rust,no_run
/// use before_storage::MemoryStorage;
/// use before_storage::Oid;
/// use before_storage::StorageRO;
/// use before_storage::Tid;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let storage = MemoryStorage::new("main");
///     storage.append(Oid::new(1), Tid::from_u64(5), b"v1".to_vec())?;
///
///     let loaded = storage.load(Oid::new(1)).await?;
///     assert_eq!(Tid::from_u64(5), loaded.serial);
///
///     let history = storage.history(Oid::new(1), 10).await?;
///     assert_eq!(1, history.len());
///
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait StorageRO: Send + Sync {
    /// A human readable name.
    fn name(&self) -> String;

    /// Approximate size of the stored data in bytes.
    fn size(&self) -> u64;

    /// A key used to order storages when several take part in one transaction.
    fn sort_key(&self) -> String;

    /// Number of objects.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_read_only(&self) -> bool;

    /// Id of the last committed transaction.
    fn last_transaction(&self) -> Tid;

    /// Load the current revision of an object.
    ///
    /// Returns `StorageError::NotFound` if the object has no revision.
    async fn load(&self, oid: Oid) -> Result<Loaded, StorageError>;

    /// Tid of the current revision of an object.
    async fn last_tid(&self, oid: Oid) -> Result<Tid, StorageError> {
        let loaded = self.load(oid).await?;
        Ok(loaded.serial)
    }

    /// Load the most recent revision written strictly before `tid`.
    ///
    /// Returns `Ok(None)` if there is no such revision.
    async fn load_before(&self, oid: Oid, tid: Tid) -> Result<Option<LoadBefore>, StorageError>;

    /// Load the revision written by transaction `serial`.
    async fn load_serial(&self, oid: Oid, serial: Tid) -> Result<Vec<u8>, StorageError>;

    /// Return at most `size` history records, most recent first.
    async fn history(&self, oid: Oid, size: usize) -> Result<Vec<HistoryEntry>, StorageError>;

    /// Tell the storage about the database that uses it.
    fn register_db(&self, db: &str);

    async fn close(&self) -> Result<(), StorageError>;

    /// Returns the blob interface if this storage stores blobs.
    fn as_blob_storage(&self) -> Option<&dyn BlobStorage> {
        None
    }
}

#[async_trait::async_trait]
impl<T> StorageRO for Arc<T>
where T: StorageRO + ?Sized
{
    fn name(&self) -> String {
        (**self).name()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn sort_key(&self) -> String {
        (**self).sort_key()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }

    fn last_transaction(&self) -> Tid {
        (**self).last_transaction()
    }

    async fn load(&self, oid: Oid) -> Result<Loaded, StorageError> {
        (**self).load(oid).await
    }

    async fn last_tid(&self, oid: Oid) -> Result<Tid, StorageError> {
        (**self).last_tid(oid).await
    }

    async fn load_before(&self, oid: Oid, tid: Tid) -> Result<Option<LoadBefore>, StorageError> {
        (**self).load_before(oid, tid).await
    }

    async fn load_serial(&self, oid: Oid, serial: Tid) -> Result<Vec<u8>, StorageError> {
        (**self).load_serial(oid, serial).await
    }

    async fn history(&self, oid: Oid, size: usize) -> Result<Vec<HistoryEntry>, StorageError> {
        (**self).history(oid, size).await
    }

    fn register_db(&self, db: &str) {
        (**self).register_db(db)
    }

    async fn close(&self) -> Result<(), StorageError> {
        (**self).close().await
    }

    fn as_blob_storage(&self) -> Option<&dyn BlobStorage> {
        (**self).as_blob_storage()
    }
}
