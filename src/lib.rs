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

//! # Before Storage
//!
//! A read-only view of a multi-version object storage as it was at some point in time.
//!
//! Every revision in the underlying storage is written by a transaction whose id, a [`Tid`],
//! is derived from the commit time. A [`BoundedView`] wraps such a storage together with a
//! cutoff tid and behaves as if no transaction at or after the cutoff ever committed:
//! loads return the last revision before the cutoff, history omits later records, and every
//! write is rejected.
//!
//! ## Core Components
//!
//! - [`StorageRO`]: Read operations of a multi-version storage
//! - [`Storage`]: Write operations and the two-phase commit protocol, extending [`StorageRO`]
//! - [`BoundedView`]: The time-bounded read-only view
//! - [`CutoffSpec`]: What the cutoff was configured as, resolved once into a [`Tid`]
//! - [`BeforeConfig`]: Opens a view from configuration
//!
//! ## Usage Example
//!
//! ```rust
//! use before_storage::BoundedView;
//! use before_storage::CutoffSpec;
//! use before_storage::MemoryStorage;
//! use before_storage::Oid;
//! use before_storage::Startup;
//! use before_storage::StorageRO;
//! use before_storage::SystemClock;
//! use before_storage::Tid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let startup = Startup::capture(&SystemClock)?;
//!
//!     let storage = MemoryStorage::new("main");
//!     storage.append(Oid::new(1), Tid::from_parts(2008, 1, 1, 0, 0, 0.0)?, b"v1".to_vec())?;
//!     storage.append(Oid::new(1), Tid::from_parts(2009, 1, 1, 0, 0, 0.0)?, b"v2".to_vec())?;
//!
//!     let spec = CutoffSpec::Text("2008-06-01T12:00".to_string());
//!     let view = BoundedView::open(storage, &spec, &SystemClock, startup)?;
//!
//!     let loaded = view.load(Oid::new(1)).await?;
//!     assert_eq!(b"v1".to_vec(), loaded.data);
//!
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod clock;
pub mod config;
pub mod cutoff;
pub mod errors;
pub mod impls;
pub mod oid;
pub mod revision;
pub mod storage;
pub mod storage_ro;
pub mod tid;
pub mod timestamp_file;
pub mod view;


pub use crate::blob::BlobStorage;
pub use crate::clock::Clock;
pub use crate::clock::ManualClock;
pub use crate::clock::SystemClock;
pub use crate::config::BeforeConfig;
pub use crate::config::OpenBase;
pub use crate::config::Opened;
pub use crate::cutoff::parse_cutoff;
pub use crate::cutoff::CutoffSpec;
pub use crate::cutoff::Startup;
pub use crate::errors::ConfigError;
pub use crate::errors::CutoffError;
pub use crate::errors::InsertError;
pub use crate::errors::StorageError;
pub use crate::impls::memory::MemoryStorage;
pub use crate::oid::Oid;
pub use crate::revision::HistoryEntry;
pub use crate::revision::LoadBefore;
pub use crate::revision::Loaded;
pub use crate::revision::TransactionMeta;
pub use crate::storage::Storage;
pub use crate::storage_ro::StorageRO;
pub use crate::tid::Tid;
pub use crate::timestamp_file::TimestampFile;
pub use crate::view::BlobSupport;
pub use crate::view::BoundedView;
