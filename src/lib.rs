//! redux-firestore
//!
//! Binds a Firestore client to a dispatch function. The extended instance
//! exposes action methods (`get`, `set`, `deleteRef`, `setListener`, ...)
//! that call Firestore and report each step as a state-update action, next
//! to the client's own methods and the internal state (config and active
//! listeners).
//!
//! # Example
//! ```
//! # async fn example() -> Result<(), redux_firestore::ReduxFirestoreError> {
//! use redux_firestore::{
//!     create_firestore_instance, dispatch_fn, get_firestore, ConfigOverrides, FirebaseHandle,
//!     MemoryFirestore,
//! };
//! use serde_json::json;
//!
//! let firebase = FirebaseHandle::with_firestore(MemoryFirestore::new());
//! let dispatch = dispatch_fn(|action| println!("{}", action.action_type));
//! create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);
//!
//! let firestore = get_firestore()?;
//! firestore.call("set", vec![json!("cities/SF"), json!({ "name": "San Francisco" })]).await?;
//! firestore.call("onSnapshot", vec![json!("cities")]).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod actions;
pub mod app;
pub mod binder;
pub mod config;
pub mod constants;
pub mod error;
pub mod firestore;
pub mod instance;
pub mod internals;
pub mod logging;
pub mod util;

pub use action::{dispatch_fn, Action, ActionType, Dispatch};
pub use actions::{action_fn, ActionDefinition, ActionSet};
pub use app::{FirebaseHandle, WeakFirebaseHandle, DEFAULT_APP_NAME};
pub use binder::{Alias, BoundMethod, HelperMap, MethodFuture, NativeBinding, SkipReason, SkippedMethod};
pub use config::{Config, ConfigOverrides};
pub use constants::METHODS_TO_ADD_FROM_FIRESTORE;
pub use error::{ErrorPayload, FirestoreError, ReduxFirestoreError};
pub use firestore::{MemoryFirestore, NativeFirestore, NativeMember, NativeMethod, QueryMeta, Snapshot};
pub use instance::{
    create_firestore_instance, get_firestore, ExtendedFirestore, FirestoreInstanceBuilder, Helpers, Member,
};
pub use internals::{Internals, ListenerEntry, ListenerRegistry};
