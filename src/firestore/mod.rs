//! Cloud Firestore client seam
//!
//! - `native.rs` → the [`NativeFirestore`] trait and its dynamic members
//! - `query.rs` → [`QueryMeta`], the target of every action
//! - `snapshot.rs` → document/query snapshots and their action payloads
//! - `listener.rs` → [`ListenerRegistration`] and snapshot callbacks
//! - `memory.rs` → [`MemoryFirestore`], an in-process client

pub mod listener;
pub mod memory;
pub mod native;
pub mod query;
pub mod snapshot;

pub use listener::{ListenerRegistration, SnapshotCallback};
pub use memory::MemoryFirestore;
pub use native::{NativeFirestore, NativeFuture, NativeMember, NativeMethod, SetOptions};
pub use query::{Direction, OrderBy, QueryMeta, WhereClause, WhereOp};
pub use snapshot::{DocumentSnapshot, QuerySnapshot, Snapshot, SnapshotMetadata};
