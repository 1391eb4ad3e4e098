//! # meld-account
//!
//! The account/session reconciliation core for MELD pendants.
//!
//! A chip touch arrives as nothing but a UID string. This crate decides,
//! deterministically and on any device, whether that touch creates a new
//! cryptographic identity, resurrects an existing one on a new device,
//! or refreshes the identity this device already holds. It reconciles
//! the shared remote record against the device-private local profile,
//! gates release behind an optional PIN and a fingerprint-bound session,
//! and collapses concurrent duplicate touches into one execution.
//!
//! Offline-first: the remote store may vanish at any time and every
//! operation still succeeds on local data alone.
//!
//! ```no_run
//! use std::sync::Arc;
//! use meld_account::{AccountConfig, ChipAccountService};
//! use meld_storage::{MemoryLocalStore, MemoryRemoteStore};
//!
//! # async fn demo() -> Result<(), meld_account::AccountError> {
//! let service = ChipAccountService::new(
//!     Arc::new(MemoryRemoteStore::new()),
//!     Arc::new(MemoryLocalStore::new()),
//!     AccountConfig::default(),
//! );
//!
//! let outcome = service.reconcile("04:AA:BB:CC").await?;
//! assert!(outcome.is_new_account);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod dedup;
pub mod errors;
pub mod fingerprint;
mod service;
pub mod types;

pub use config::AccountConfig;
pub use errors::AccountError;
pub use fingerprint::DeviceTraits;
pub use service::ChipAccountService;
pub use types::{
    DeviceSession, GateDecision, GateReason, LocalProfile, MomentEvent, MomentKind, Preferences,
    ProfilePatch, ReconciliationOutcome, RemoteAccountRecord, UsageStats,
};
