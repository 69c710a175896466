//! Wallet core: key management, output scanning, and the sync engine.
//!
//! The crate is storage- and transport-agnostic: blocks come in through the
//! [`daemon::DaemonSource`] trait, recognized enotes and chain bookmarks go
//! out through the [`store::WalletStore`] trait. The sync engine itself is a
//! cooperative iterator — the caller drives [`sync::SyncSession::next_batch`]
//! and decides how to schedule it.

pub mod daemon;
pub mod error;
pub mod keys;
pub mod scanner;
pub mod store;
pub mod sync;

pub use error::WalletError;
pub use keys::{WalletKeys, WalletType};
