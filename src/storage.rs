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

//! Defines the read-write storage interface.
//!
//! The [`Storage`] trait extends [`StorageRO`] with object id allocation, packing and
//! the two-phase commit protocol used to write new revisions:
//! `tpc_begin`, then any number of `store`/`store_blob`, then `tpc_vote` and `tpc_finish`,
//! or `tpc_abort` at any point.

use std::path::Path;
use std::sync::Arc;

use crate::Oid;
use crate::StorageError;
use crate::StorageRO;
use crate::Tid;
use crate::TransactionMeta;

#[async_trait::async_trait]
pub trait Storage: StorageRO {
    /// Allocate a new object id.
    async fn new_oid(&self) -> Result<Oid, StorageError>;

    /// Remove revisions that are not current as of `pack_time`.
    async fn pack(&self, pack_time: Tid) -> Result<(), StorageError>;

    /// Stage a new revision of `oid` in the transaction.
    ///
    /// `prev_serial` is the serial the new revision was based on, `None` for a new object.
    async fn store(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError>;

    /// Stage a new revision of `oid` along with the blob file at `blob_path`.
    async fn store_blob(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        blob_path: &Path,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError>;

    async fn tpc_begin(&self, txn: &TransactionMeta) -> Result<(), StorageError>;

    async fn tpc_vote(&self, txn: &TransactionMeta) -> Result<(), StorageError>;

    /// Commit the transaction and return its tid.
    async fn tpc_finish(&self, txn: &TransactionMeta) -> Result<Tid, StorageError>;

    async fn tpc_abort(&self, txn: &TransactionMeta) -> Result<(), StorageError>;

    /// The transaction currently being committed, if any.
    fn tpc_transaction(&self) -> Option<TransactionMeta>;
}

#[async_trait::async_trait]
impl<T> Storage for Arc<T>
where T: Storage + ?Sized
{
    async fn new_oid(&self) -> Result<Oid, StorageError> {
        (**self).new_oid().await
    }

    async fn pack(&self, pack_time: Tid) -> Result<(), StorageError> {
        (**self).pack(pack_time).await
    }

    async fn store(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        (**self).store(oid, prev_serial, data, txn).await
    }

    async fn store_blob(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        blob_path: &Path,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        (**self)
            .store_blob(oid, prev_serial, data, blob_path, txn)
            .await
    }

    async fn tpc_begin(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        (**self).tpc_begin(txn).await
    }

    async fn tpc_vote(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        (**self).tpc_vote(txn).await
    }

    async fn tpc_finish(&self, txn: &TransactionMeta) -> Result<Tid, StorageError> {
        (**self).tpc_finish(txn).await
    }

    async fn tpc_abort(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        (**self).tpc_abort(txn).await
    }

    fn tpc_transaction(&self) -> Option<TransactionMeta> {
        (**self).tpc_transaction()
    }
}
