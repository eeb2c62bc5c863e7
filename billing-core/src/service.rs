//! Billing service facade.
//!
//! Stable programmatic surface consumed by the transport layer: bill
//! creation with a minted bill number, lookup and listing, caller updates,
//! cancellation, deletion, and payment recording. All validation happens
//! before any mutation is persisted.

use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::{
    Bill, BillFilter, BillUpdate, NewBill, Page, PageRequest, Payment, PaymentRequest,
};
use crate::payment::PaymentProcessor;
use crate::repository::BillRepository;
use crate::sequence::BillNumberGenerator;

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Application service owning the write path for bill aggregates.
pub struct BillingService {
    repository: Arc<dyn BillRepository>,
    numbers: BillNumberGenerator,
    payments: PaymentProcessor,
}

impl BillingService {
    pub fn new(repository: Arc<dyn BillRepository>) -> Self {
        Self {
            numbers: BillNumberGenerator::new(Arc::clone(&repository)),
            payments: PaymentProcessor::new(Arc::clone(&repository)),
            repository,
        }
    }

    /// Create a bill: validate the input, mint the next bill number for the
    /// server-local calendar day, compute the initial financial state and
    /// persist.
    pub async fn create_bill(&self, new_bill: NewBill) -> BillingResult<Bill> {
        new_bill.validate()?;
        let today = Local::now().date_naive();
        let bill_number = self.numbers.generate(today).await?;
        let bill = Bill::create(bill_number, new_bill)?;
        let stored = self.repository.insert(bill).await?;
        info!(
            bill_id = %stored.id(),
            bill_number = %stored.bill_number(),
            total = %stored.total(),
            "bill created"
        );
        Ok(stored)
    }

    pub async fn get_bill(&self, id: Uuid) -> BillingResult<Bill> {
        self.repository
            .get(id)
            .await?
            .ok_or(BillingError::NotFound(id))
    }

    pub async fn list_bills(
        &self,
        filter: &BillFilter,
        page: &PageRequest,
    ) -> BillingResult<Page<Bill>> {
        self.repository.find(filter, page).await
    }

    /// Apply a caller update to an existing bill and persist it.
    pub async fn update_bill(&self, id: Uuid, update: BillUpdate) -> BillingResult<Bill> {
        let updated = self
            .mutate(id, |bill| bill.apply_update(update.clone(), Utc::now()))
            .await?;
        info!(bill_id = %id, total = %updated.total(), "bill updated");
        Ok(updated)
    }

    /// Administratively cancel a bill. Terminal; recompute never leaves this
    /// state and further payments are rejected.
    pub async fn cancel_bill(&self, id: Uuid, cancelled_by: Uuid) -> BillingResult<Bill> {
        let cancelled = self
            .mutate(id, |bill| bill.cancel(cancelled_by, Utc::now()))
            .await?;
        info!(bill_id = %id, bill_number = %cancelled.bill_number(), "bill cancelled");
        Ok(cancelled)
    }

    /// Delete a bill. Only bills without payment history may be deleted.
    pub async fn delete_bill(&self, id: Uuid) -> BillingResult<()> {
        self.repository.remove(id).await?;
        info!(bill_id = %id, "bill deleted");
        Ok(())
    }

    /// Record a payment against a bill.
    pub async fn record_payment(
        &self,
        id: Uuid,
        request: PaymentRequest,
    ) -> BillingResult<Bill> {
        self.payments.apply(id, request).await
    }

    /// The payment ledger of a bill, oldest first.
    pub async fn bill_payments(&self, id: Uuid) -> BillingResult<Vec<Payment>> {
        Ok(self.get_bill(id).await?.payments().to_vec())
    }

    /// Load-mutate-store with a bounded retry on write conflicts. Errors from
    /// the mutation itself are surfaced immediately, never retried.
    async fn mutate(
        &self,
        id: Uuid,
        mut op: impl FnMut(&mut Bill) -> BillingResult<()>,
    ) -> BillingResult<Bill> {
        let mut last_conflict = None;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut bill = self
                .repository
                .get(id)
                .await?
                .ok_or(BillingError::NotFound(id))?;
            let expected_version = bill.version();
            op(&mut bill)?;
            match self.repository.store(bill, expected_version).await {
                Ok(updated) => return Ok(updated),
                Err(err) if err.is_retryable() && attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(bill_id = %id, attempt, "write conflict, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_conflict
            .unwrap_or_else(|| BillingError::conflict("write retries exhausted")))
    }
}
