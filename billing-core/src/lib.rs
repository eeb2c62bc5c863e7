//! Billing ledger engine for patient invoicing
//!
//! Provides the core billing capabilities of the clinic platform:
//! - Bill aggregate with always-reconciled financial totals
//! - Append-only payment ledger with overpayment rejection
//! - Derived lifecycle status (pending, partial, paid, overdue, cancelled)
//! - Unique daily bill numbers from an atomic per-day counter
//! - Revenue statistics, period summaries, outstanding and collection reports
//! - Pluggable repository boundary with an in-memory implementation
//!
//! The write path is safe under concurrent callers: payment application and
//! bill updates persist through a compare-and-swap on a version counter, and
//! bill-number generation never races because the sequence is owned by the
//! store.

pub mod error;
pub mod memory;
pub mod models;
pub mod payment;
pub mod reporting;
pub mod repository;
pub mod sequence;
pub mod service;

pub use error::*;
pub use memory::*;
pub use models::*;
pub use payment::*;
pub use reporting::*;
pub use repository::*;
pub use sequence::*;
pub use service::*;
