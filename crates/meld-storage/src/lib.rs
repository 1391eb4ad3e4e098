//! # meld-storage
//!
//! Store interfaces consumed by the account reconciliation core.
//!
//! Two stores with deliberately different shapes:
//!
//! - [`RemoteStore`]: async key-value map shared across devices. May be
//!   unreachable at any time; callers treat failure as "record absent"
//!   and keep going.
//! - [`LocalStore`]: synchronous key-value map scoped to one device. No
//!   cross-device visibility, assumed always reachable.
//!
//! The crate also ships in-memory reference implementations used by tests
//! and by embedders that want a scratch backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod keys;
pub mod memory;
pub mod traits;

pub use errors::StorageError;
pub use keys::{account_key, profile_key, session_key, CURRENT_CHIP_KEY};
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use traits::{LocalStore, RemoteStore};
