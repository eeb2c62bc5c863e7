//! Persistence boundary for bill aggregates.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::models::{Bill, BillFilter, Page, PageRequest};

/// Storage contract for bill aggregates.
///
/// Implementations must make [`store`](Self::store) a compare-and-swap on the
/// bill's version counter and [`next_bill_sequence`](Self::next_bill_sequence)
/// an atomic increment, so that concurrent payment applications and
/// concurrent bill-number generations serialize correctly without any
/// cooperation from callers.
#[async_trait]
pub trait BillRepository: Send + Sync {
    /// Persist a freshly created bill. Fails with `Conflict` when the id or
    /// bill number is already taken.
    async fn insert(&self, bill: Bill) -> BillingResult<Bill>;

    /// Fetch a bill by id.
    async fn get(&self, id: Uuid) -> BillingResult<Option<Bill>>;

    /// Fetch one page of bills matching the filter.
    async fn find(&self, filter: &BillFilter, page: &PageRequest) -> BillingResult<Page<Bill>>;

    /// Fetch every bill matching the filter, in insertion order. Used by the
    /// reporting engine; malformed stored records are skipped and logged, not
    /// surfaced as errors.
    async fn list_matching(&self, filter: &BillFilter) -> BillingResult<Vec<Bill>>;

    /// Persist a mutated bill if and only if the stored version still equals
    /// `expected_version`. Fails with `Conflict` on a version mismatch and
    /// `NotFound` when the bill no longer exists. Returns the bill as
    /// persisted, with its new version.
    async fn store(&self, bill: Bill, expected_version: i64) -> BillingResult<Bill>;

    /// Delete a bill. Fails with `Conflict` when the bill has any payment
    /// history.
    async fn remove(&self, id: Uuid) -> BillingResult<()>;

    /// Atomically increment and return the bill-number sequence for the given
    /// calendar day. The first call on a day returns 1.
    async fn next_bill_sequence(&self, date: NaiveDate) -> BillingResult<u32>;
}
