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

//! Provides a simple in-memory multi-version storage.
//!
//! The [`MemoryStorage`] struct implements [`Storage`] and [`BlobStorage`] by keeping every
//! revision in memory in a [`BTreeMap`]. It's primarily intended for testing and
//! demonstration purposes.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::ops::Bound;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use log::debug;
use log::warn;

use crate::errors::InsertError;
use crate::BlobStorage;
use crate::Clock;
use crate::HistoryEntry;
use crate::LoadBefore;
use crate::Loaded;
use crate::Oid;
use crate::Storage;
use crate::StorageError;
use crate::StorageRO;
use crate::SystemClock;
use crate::Tid;
use crate::TransactionMeta;

/// A multi-version object storage kept in memory.
///
/// Besides the storage interface it counts calls to `history()` and to every write
/// operation, so tests can observe how a wrapper drives it.
///
/// # Examples
///
/// ```
/// use before_storage::MemoryStorage;
/// use before_storage::Oid;
/// use before_storage::StorageRO;
/// use before_storage::Tid;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let storage = MemoryStorage::new("mem");
///     storage.append(Oid::new(1), Tid::from_u64(1), b"a".to_vec())?;
///     storage.append(Oid::new(1), Tid::from_u64(2), b"b".to_vec())?;
///
///     let before = storage.load_before(Oid::new(1), Tid::from_u64(2)).await?.unwrap();
///     assert_eq!(b"a".to_vec(), before.data);
///     assert_eq!(Some(Tid::from_u64(2)), before.end);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MemoryStorage {
    name: String,
    blob_dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    history_calls: AtomicUsize,
    write_calls: AtomicUsize,
    closed: AtomicBool,
}

#[derive(Debug, Clone)]
struct Revision {
    data: Vec<u8>,
    user_name: String,
    description: String,
}

#[derive(Debug)]
struct Staged {
    oid: Oid,
    data: Vec<u8>,
    blob: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keep the most recent revision of an object first.
    revisions: BTreeMap<(Oid, Reverse<Tid>), Revision>,

    last_tid: Tid,
    last_oid: Oid,

    txn: Option<TransactionMeta>,
    staged: Vec<Staged>,
}

impl Inner {
    fn current(&self, oid: Oid) -> Option<(Tid, &Revision)> {
        let ((k, Reverse(tid)), rev) = self.revisions.range((oid, Reverse(Tid::MAX))..).next()?;
        (*k == oid).then_some((*tid, rev))
    }

    fn insert(&mut self, oid: Oid, tid: Tid, rev: Revision) {
        self.revisions.insert((oid, Reverse(tid)), rev);
        self.last_tid = tid;
        self.last_oid = self.last_oid.max(oid);
    }
}

impl MemoryStorage {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            blob_dir: None,
            clock: Arc::new(SystemClock),
            inner: Mutex::new(Inner::default()),
            history_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Derive commit ids from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Keep committed blobs under `dir`. Without it the storage has no blob support.
    pub fn with_blob_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.blob_dir = Some(dir.into());
        self
    }

    /// Add a committed revision directly, bypassing the commit protocol.
    ///
    /// `tid` must be greater than every tid already in the storage.
    pub fn append(&self, oid: Oid, tid: Tid, data: Vec<u8>) -> Result<(), InsertError> {
        let mut inner = self.inner();

        if tid <= inner.last_tid {
            return Err(InsertError::NonIncremental {
                last: inner.last_tid,
                current: tid,
            });
        }

        let rev = Revision {
            data,
            user_name: String::new(),
            description: String::new(),
        };
        inner.insert(oid, tid, rev);
        Ok(())
    }

    /// Number of `history()` calls served so far.
    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::Relaxed)
    }

    /// Number of write operations attempted so far.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count_write(&self) {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn blob_dir(&self, op: &'static str) -> Result<&Path, StorageError> {
        self.blob_dir
            .as_deref()
            .ok_or_else(|| StorageError::Unsupported {
                storage: self.name.clone(),
                op,
            })
    }

    fn blob_path(dir: &Path, oid: Oid, serial: Tid) -> PathBuf {
        dir.join(format!("{:016x}", oid.as_u64()))
            .join(format!("{:016x}.blob", serial.as_u64()))
    }

    /// Copy a staged blob to where `load_blob(oid, serial)` finds it.
    fn commit_blob(&self, src: &Path, oid: Oid, serial: Tid) -> Result<PathBuf, StorageError> {
        let dst = Self::blob_path(self.blob_dir("tpc_finish")?, oid, serial);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, &dst)?;
        Ok(dst)
    }

    fn check_txn(
        &self,
        inner: &Inner,
        txn: &TransactionMeta,
        op: &'static str,
    ) -> Result<(), StorageError> {
        if inner.txn.as_ref() == Some(txn) {
            Ok(())
        } else {
            Err(StorageError::Transaction {
                storage: self.name.clone(),
                op,
                reason: format!("{:?} is not the current transaction", txn),
            })
        }
    }

    fn check_serial(
        &self,
        inner: &Inner,
        oid: Oid,
        prev_serial: Option<Tid>,
        op: &'static str,
    ) -> Result<(), StorageError> {
        let current = inner.current(oid).map(|(tid, _)| tid);
        if current == prev_serial {
            Ok(())
        } else {
            Err(StorageError::Transaction {
                storage: self.name.clone(),
                op,
                reason: format!(
                    "conflict on {}: based on {:?}, current is {:?}",
                    oid, prev_serial, current
                ),
            })
        }
    }

    fn stage(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        blob: Option<PathBuf>,
        txn: &TransactionMeta,
        op: &'static str,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner();
        self.check_txn(&inner, txn, op)?;
        self.check_serial(&inner, oid, prev_serial, op)?;

        inner.staged.push(Staged { oid, data, blob });
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageRO for MemoryStorage {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> u64 {
        let inner = self.inner();
        inner.revisions.values().map(|r| r.data.len() as u64).sum()
    }

    fn sort_key(&self) -> String {
        self.name.clone()
    }

    fn len(&self) -> usize {
        let inner = self.inner();

        let mut n = 0;
        let mut prev = None;
        for (oid, _) in inner.revisions.keys() {
            if prev != Some(*oid) {
                n += 1;
                prev = Some(*oid);
            }
        }
        n
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn last_transaction(&self) -> Tid {
        self.inner().last_tid
    }

    async fn load(&self, oid: Oid) -> Result<Loaded, StorageError> {
        let inner = self.inner();
        let (serial, rev) = inner.current(oid).ok_or(StorageError::NotFound { oid })?;

        Ok(Loaded {
            data: rev.data.clone(),
            serial,
        })
    }

    async fn load_before(&self, oid: Oid, tid: Tid) -> Result<Option<LoadBefore>, StorageError> {
        let inner = self.inner();

        // Keys after (oid, Reverse(tid)) are the revisions of `oid` older than `tid`, newest first.
        let older = inner
            .revisions
            .range((Bound::Excluded((oid, Reverse(tid))), Bound::Unbounded))
            .next();

        let Some(((k, Reverse(start)), rev)) = older else {
            return Ok(None);
        };
        if *k != oid {
            return Ok(None);
        }

        let end = inner
            .revisions
            .range(..(oid, Reverse(*start)))
            .next_back()
            .filter(|((k, _), _)| *k == oid)
            .map(|((_, Reverse(t)), _)| *t);

        Ok(Some(LoadBefore {
            data: rev.data.clone(),
            start: *start,
            end,
        }))
    }

    async fn load_serial(&self, oid: Oid, serial: Tid) -> Result<Vec<u8>, StorageError> {
        let inner = self.inner();
        let rev = inner
            .revisions
            .get(&(oid, Reverse(serial)))
            .ok_or(StorageError::NotFound { oid })?;
        Ok(rev.data.clone())
    }

    async fn history(&self, oid: Oid, size: usize) -> Result<Vec<HistoryEntry>, StorageError> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);

        let inner = self.inner();
        let entries = inner
            .revisions
            .range((oid, Reverse(Tid::MAX))..)
            .take_while(|((k, _), _)| *k == oid)
            .take(size)
            .map(|((_, Reverse(tid)), rev)| HistoryEntry {
                tid: *tid,
                user_name: rev.user_name.clone(),
                description: rev.description.clone(),
                size: rev.data.len(),
            })
            .collect();

        Ok(entries)
    }

    fn register_db(&self, db: &str) {
        debug!("{}: registered db {}", self.name, db);
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn as_blob_storage(&self) -> Option<&dyn BlobStorage> {
        if self.blob_dir.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn new_oid(&self) -> Result<Oid, StorageError> {
        self.count_write();

        let mut inner = self.inner();
        inner.last_oid = Oid::new(inner.last_oid.as_u64() + 1);
        Ok(inner.last_oid)
    }

    async fn pack(&self, pack_time: Tid) -> Result<(), StorageError> {
        self.count_write();

        let mut inner = self.inner();

        // For every object keep the newest revision older than `pack_time`, drop the rest.
        let mut kept = None;
        let mut removing = Vec::new();
        for (oid, Reverse(tid)) in inner.revisions.keys() {
            if *tid >= pack_time {
                continue;
            }
            if kept == Some(*oid) {
                removing.push((*oid, Reverse(*tid)));
            } else {
                kept = Some(*oid);
            }
        }

        debug!("{}: pack before {} removes {} revisions", self.name, pack_time, removing.len());

        for k in removing {
            inner.revisions.remove(&k);
        }
        Ok(())
    }

    async fn store(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        self.count_write();
        self.stage(oid, prev_serial, data, None, txn, "store")
    }

    async fn store_blob(
        &self,
        oid: Oid,
        prev_serial: Option<Tid>,
        data: Vec<u8>,
        blob_path: &Path,
        txn: &TransactionMeta,
    ) -> Result<(), StorageError> {
        self.count_write();
        self.blob_dir("store_blob")?;
        self.stage(
            oid,
            prev_serial,
            data,
            Some(blob_path.to_path_buf()),
            txn,
            "store_blob",
        )
    }

    async fn tpc_begin(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        self.count_write();

        let mut inner = self.inner();
        match &inner.txn {
            Some(current) if current == txn => return Ok(()),
            Some(current) => {
                return Err(StorageError::Transaction {
                    storage: self.name.clone(),
                    op: "tpc_begin",
                    reason: format!("{:?} is already in progress", current),
                });
            }
            None => {}
        }

        inner.txn = Some(txn.clone());
        inner.staged.clear();
        Ok(())
    }

    async fn tpc_vote(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        self.count_write();

        let inner = self.inner();
        self.check_txn(&inner, txn, "tpc_vote")
    }

    async fn tpc_finish(&self, txn: &TransactionMeta) -> Result<Tid, StorageError> {
        self.count_write();

        let mut inner = self.inner();
        self.check_txn(&inner, txn, "tpc_finish")?;

        let next = inner.last_tid.next();
        let tid = Tid::from_datetime(&self.clock.now()).map_or(next, |now| now.max(next));

        // The transaction ends here whether or not it commits.
        let staged = std::mem::take(&mut inner.staged);
        inner.txn = None;

        // Nothing becomes visible until every blob is in place.
        let mut copied = Vec::new();
        for s in &staged {
            let Some(src) = &s.blob else {
                continue;
            };

            match self.commit_blob(src, s.oid, tid) {
                Ok(dst) => copied.push(dst),
                Err(e) => {
                    warn!("{}: failed to commit blob of {}: {}", self.name, s.oid, e);
                    for dst in &copied {
                        let _ = fs::remove_file(dst);
                    }
                    return Err(e);
                }
            }
        }

        for s in staged {
            let rev = Revision {
                data: s.data,
                user_name: txn.user.clone(),
                description: txn.description.clone(),
            };
            inner.insert(s.oid, tid, rev);
        }

        // The tid is taken even if nothing was stored.
        inner.last_tid = tid;

        debug!("{}: committed {:?} as {}", self.name, txn, tid);
        Ok(tid)
    }

    async fn tpc_abort(&self, txn: &TransactionMeta) -> Result<(), StorageError> {
        let mut inner = self.inner();
        if inner.txn.as_ref() == Some(txn) {
            inner.txn = None;
            inner.staged.clear();
        }
        Ok(())
    }

    fn tpc_transaction(&self) -> Option<TransactionMeta> {
        self.inner().txn.clone()
    }
}

#[async_trait::async_trait]
impl BlobStorage for MemoryStorage {
    async fn load_blob(&self, oid: Oid, serial: Tid) -> Result<PathBuf, StorageError> {
        let path = Self::blob_path(self.blob_dir("load_blob")?, oid, serial);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StorageError::NotFound { oid })
        }
    }

    fn temporary_directory(&self) -> Result<PathBuf, StorageError> {
        Ok(self.blob_dir("temporary_directory")?.join("tmp"))
    }

    async fn open_committed_blob_file(&self, oid: Oid, serial: Tid) -> Result<File, StorageError> {
        let path = self.load_blob(oid, serial).await?;
        Ok(File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ManualClock;

    fn oid(v: u64) -> Oid {
        Oid::new(v)
    }

    fn tid(v: u64) -> Tid {
        Tid::from_u64(v)
    }

    fn seeded() -> MemoryStorage {
        let s = MemoryStorage::new("mem");
        s.append(oid(1), tid(1), b"a1".to_vec()).unwrap();
        s.append(oid(2), tid(2), b"b2".to_vec()).unwrap();
        s.append(oid(1), tid(3), b"a3".to_vec()).unwrap();
        s.append(oid(1), tid(5), b"a5".to_vec()).unwrap();
        s
    }

    #[test]
    fn test_append_non_incremental() {
        let s = seeded();
        let err = s.append(oid(3), tid(5), vec![]).unwrap_err();
        assert_eq!(
            InsertError::NonIncremental {
                last: tid(5),
                current: tid(5)
            },
            err
        );
    }

    #[tokio::test]
    async fn test_load_current() -> anyhow::Result<()> {
        let s = seeded();

        let got = s.load(oid(1)).await?;
        assert_eq!(
            Loaded {
                data: b"a5".to_vec(),
                serial: tid(5)
            },
            got
        );
        assert_eq!(tid(2), s.last_tid(oid(2)).await?);

        let err = s.load(oid(9)).await.unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_before() -> anyhow::Result<()> {
        let s = seeded();

        let got = s.load_before(oid(1), tid(5)).await?;
        assert_eq!(
            Some(LoadBefore {
                data: b"a3".to_vec(),
                start: tid(3),
                end: Some(tid(5)),
            }),
            got
        );

        let got = s.load_before(oid(1), tid(4)).await?;
        assert_eq!(Some(tid(3)), got.map(|x| x.start));

        let got = s.load_before(oid(1), tid(100)).await?;
        assert_eq!(
            Some(LoadBefore {
                data: b"a5".to_vec(),
                start: tid(5),
                end: None,
            }),
            got
        );

        assert_eq!(None, s.load_before(oid(1), tid(1)).await?);
        assert_eq!(None, s.load_before(oid(2), tid(2)).await?);
        assert_eq!(None, s.load_before(oid(9), tid(100)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_serial() -> anyhow::Result<()> {
        let s = seeded();
        assert_eq!(b"a3".to_vec(), s.load_serial(oid(1), tid(3)).await?);
        assert!(s.load_serial(oid(1), tid(2)).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_history_newest_first() -> anyhow::Result<()> {
        let s = seeded();

        let tids = |h: Vec<HistoryEntry>| h.into_iter().map(|e| e.tid).collect::<Vec<_>>();

        assert_eq!(vec![tid(5), tid(3), tid(1)], tids(s.history(oid(1), 10).await?));
        assert_eq!(vec![tid(5), tid(3)], tids(s.history(oid(1), 2).await?));
        assert_eq!(Vec::<Tid>::new(), tids(s.history(oid(1), 0).await?));
        assert_eq!(vec![tid(2)], tids(s.history(oid(2), 10).await?));
        assert_eq!(4, s.history_calls());
        Ok(())
    }

    #[test]
    fn test_size_len_last_transaction() {
        let s = seeded();
        assert_eq!(8, s.size());
        assert_eq!(2, s.len());
        assert!(!s.is_empty());
        assert_eq!(tid(5), s.last_transaction());
        assert!(MemoryStorage::new("x").is_empty());
    }

    #[tokio::test]
    async fn test_commit() -> anyhow::Result<()> {
        let s = seeded();
        let txn = TransactionMeta::new("alice", "edit");

        let new = s.new_oid().await?;
        assert_eq!(oid(3), new);

        s.tpc_begin(&txn).await?;
        assert_eq!(Some(txn.clone()), s.tpc_transaction());

        s.store(oid(1), Some(tid(5)), b"a6".to_vec(), &txn).await?;
        s.store(new, None, b"c".to_vec(), &txn).await?;
        s.tpc_vote(&txn).await?;
        let committed = s.tpc_finish(&txn).await?;

        assert!(committed > tid(5));
        assert_eq!(None, s.tpc_transaction());
        assert_eq!(committed, s.last_transaction());
        assert_eq!(committed, s.load(new).await?.serial);

        let h = s.history(oid(1), 1).await?;
        assert_eq!("alice", h[0].user_name);
        assert_eq!("edit", h[0].description);
        assert_eq!(6, s.write_calls());
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_tid_follows_clock() -> anyhow::Result<()> {
        let at = Utc.with_ymd_and_hms(2008, 1, 21, 13, 22, 42).unwrap();
        let s = MemoryStorage::new("mem").with_clock(Arc::new(ManualClock::new(at)));
        let txn = TransactionMeta::new("alice", "edit");

        s.tpc_begin(&txn).await?;
        s.store(oid(1), None, b"a".to_vec(), &txn).await?;
        let committed = s.tpc_finish(&txn).await?;
        assert_eq!(Tid::from_datetime(&at)?, committed);

        // A clock that does not move still yields increasing ids.
        s.tpc_begin(&txn).await?;
        let again = s.tpc_finish(&txn).await?;
        assert_eq!(committed.next(), again);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_blob_commit_leaves_nothing_behind() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let s = MemoryStorage::new("blobs").with_blob_dir(dir.path().join("blobs"));
        s.append(oid(1), tid(5), b"a5".to_vec())?;

        let src = dir.path().join("upload");
        fs::write(&src, b"blob body")?;

        let txn = TransactionMeta::new("alice", "upload");
        s.tpc_begin(&txn).await?;
        s.store_blob(oid(1), Some(tid(5)), b"a6".to_vec(), &src, &txn).await?;
        s.store(oid(2), None, b"b".to_vec(), &txn).await?;
        s.store_blob(oid(3), None, b"c".to_vec(), &dir.path().join("missing"), &txn)
            .await?;
        s.tpc_vote(&txn).await?;

        assert!(s.tpc_finish(&txn).await.is_err());

        assert_eq!(None, s.tpc_transaction());
        assert_eq!(tid(5), s.last_transaction());
        assert_eq!(
            Loaded {
                data: b"a5".to_vec(),
                serial: tid(5)
            },
            s.load(oid(1)).await?
        );
        assert!(s.load(oid(2)).await.unwrap_err().is_not_found());
        let oid1_blobs = dir.path().join("blobs").join(format!("{:016x}", 1));
        assert!(oid1_blobs.read_dir()?.next().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_conflict_and_wrong_transaction() -> anyhow::Result<()> {
        let s = seeded();
        let txn = TransactionMeta::new("alice", "edit");
        let other = TransactionMeta::new("bob", "edit");

        let err = s.store(oid(1), Some(tid(5)), vec![], &txn).await.unwrap_err();
        assert!(err.is_transaction());

        s.tpc_begin(&txn).await?;
        assert!(s.tpc_begin(&other).await.unwrap_err().is_transaction());

        let err = s.store(oid(1), Some(tid(3)), vec![], &txn).await.unwrap_err();
        assert!(err.is_transaction());

        s.tpc_abort(&txn).await?;
        assert_eq!(None, s.tpc_transaction());
        assert_eq!(tid(5), s.last_transaction());
        Ok(())
    }

    #[tokio::test]
    async fn test_pack() -> anyhow::Result<()> {
        let s = seeded();
        s.pack(tid(4)).await?;

        // a3 is current at tid 4 and a5 is newer, a1 is gone.
        assert!(s.load_serial(oid(1), tid(1)).await.is_err());
        assert_eq!(b"a3".to_vec(), s.load_serial(oid(1), tid(3)).await?);
        assert_eq!(b"a5".to_vec(), s.load_serial(oid(1), tid(5)).await?);
        assert_eq!(b"b2".to_vec(), s.load_serial(oid(2), tid(2)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_blobs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let s = MemoryStorage::new("blobs").with_blob_dir(dir.path().join("blobs"));
        assert!(s.as_blob_storage().is_some());
        assert!(MemoryStorage::new("plain").as_blob_storage().is_none());

        let src = dir.path().join("upload");
        fs::write(&src, b"blob body")?;

        let txn = TransactionMeta::new("alice", "upload");
        s.tpc_begin(&txn).await?;
        s.store_blob(oid(1), None, b"meta".to_vec(), &src, &txn).await?;
        s.tpc_vote(&txn).await?;
        let committed = s.tpc_finish(&txn).await?;

        let path = s.load_blob(oid(1), committed).await?;
        assert_eq!(b"blob body".to_vec(), fs::read(path)?);

        let mut f = s.open_committed_blob_file(oid(1), committed).await?;
        let mut body = String::new();
        std::io::Read::read_to_string(&mut f, &mut body)?;
        assert_eq!("blob body", body);

        assert!(s.load_blob(oid(2), committed).await.unwrap_err().is_not_found());
        assert_eq!(dir.path().join("blobs").join("tmp"), s.temporary_directory()?);

        let plain = MemoryStorage::new("plain");
        let err = plain.temporary_directory().unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_close() -> anyhow::Result<()> {
        let s = seeded();
        assert!(!s.is_closed());
        s.close().await?;
        assert!(s.is_closed());
        Ok(())
    }
}
