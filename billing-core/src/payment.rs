//! Payment application.
//!
//! Applying a payment is the operation most exposed to races: two concurrent
//! partial payments must not both validate against a stale balance. The
//! processor loads the bill, validates and appends on a local copy, then
//! persists with a compare-and-swap on the version counter, retrying a
//! bounded number of times on conflict. Nothing observable is mutated unless
//! the persist succeeds.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::{Bill, Payment, PaymentRequest};
use crate::repository::BillRepository;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Applies payments to bills atomically with respect to concurrent writers.
pub struct PaymentProcessor {
    repository: Arc<dyn BillRepository>,
    max_attempts: u32,
}

impl PaymentProcessor {
    pub fn new(repository: Arc<dyn BillRepository>) -> Self {
        Self {
            repository,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Apply a payment to the bill and return the updated aggregate.
    pub async fn apply(&self, bill_id: Uuid, request: PaymentRequest) -> BillingResult<Bill> {
        let mut last_conflict = None;
        for attempt in 1..=self.max_attempts {
            let mut bill = self
                .repository
                .get(bill_id)
                .await?
                .ok_or(BillingError::NotFound(bill_id))?;
            let expected_version = bill.version();

            let now = Utc::now();
            let payment = Payment {
                amount: request.amount,
                method: request.method,
                transaction_ref: request.transaction_ref.clone(),
                notes: request.notes.clone(),
                paid_at: now,
                applied_by: request.applied_by,
            };
            bill.record_payment(payment, now)?;

            match self.repository.store(bill, expected_version).await {
                Ok(updated) => {
                    info!(
                        bill_id = %bill_id,
                        bill_number = %updated.bill_number(),
                        amount = %request.amount,
                        method = %request.method,
                        balance = %updated.balance(),
                        status = %updated.status(),
                        "payment applied"
                    );
                    return Ok(updated);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    debug!(
                        bill_id = %bill_id,
                        attempt,
                        "concurrent write detected, retrying payment application"
                    );
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            BillingError::conflict("payment application retries exhausted")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBillRepository;
    use crate::models::{BillLineItem, BillStatus, NewBill, PaymentMethod};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn seeded_bill(repository: &Arc<InMemoryBillRepository>, total: Decimal) -> Bill {
        let new = NewBill::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .with_items(vec![BillLineItem::priced("Consultation", 1, total).unwrap()])
        .with_due_date(Utc::now() + Duration::days(1));
        let bill = Bill::create("BILL-20260829-001", new).unwrap();
        repository.insert(bill.clone()).await.unwrap()
    }

    fn request(amount: Decimal) -> PaymentRequest {
        PaymentRequest::new(amount, PaymentMethod::Upi, Uuid::new_v4())
    }

    #[tokio::test]
    async fn full_payment_settles_and_persists() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let bill = seeded_bill(&repository, dec!(1050)).await;
        let processor = PaymentProcessor::new(repository.clone());

        let updated = processor
            .apply(bill.id(), request(dec!(1050)).with_transaction_ref("TXN-1"))
            .await
            .unwrap();
        assert_eq!(updated.paid_amount(), dec!(1050));
        assert_eq!(updated.balance(), dec!(0));
        assert_eq!(updated.status(), BillStatus::Paid);
        assert_eq!(updated.payments().len(), 1);
        assert_eq!(updated.payments()[0].transaction_ref.as_deref(), Some("TXN-1"));

        // The stored copy reflects the payment.
        let stored = repository.get(bill.id()).await.unwrap().unwrap();
        assert_eq!(stored.balance(), dec!(0));
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn partial_then_overpayment_is_rejected_with_remaining_balance() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let bill = seeded_bill(&repository, dec!(1050)).await;
        let processor = PaymentProcessor::new(repository.clone());

        let updated = processor.apply(bill.id(), request(dec!(500))).await.unwrap();
        assert_eq!(updated.status(), BillStatus::Partial);
        assert_eq!(updated.balance(), dec!(550));

        let err = processor
            .apply(bill.id(), request(dec!(600)))
            .await
            .unwrap_err();
        match err {
            BillingError::Overpayment { attempted, balance } => {
                assert_eq!(attempted, dec!(600));
                assert_eq!(balance, dec!(550));
            }
            other => panic!("expected Overpayment, got {other:?}"),
        }

        // Failed application left no trace in the ledger.
        let stored = repository.get(bill.id()).await.unwrap().unwrap();
        assert_eq!(stored.payments().len(), 1);
        assert_eq!(stored.paid_amount(), dec!(500));
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let bill = seeded_bill(&repository, dec!(100)).await;
        let processor = PaymentProcessor::new(repository.clone());

        let err = processor.apply(bill.id(), request(dec!(0))).await.unwrap_err();
        assert!(matches!(err, BillingError::Validation { field, .. } if field == "amount"));
    }

    #[tokio::test]
    async fn unknown_bill_is_not_found() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let processor = PaymentProcessor::new(repository);
        let err = processor
            .apply(Uuid::new_v4(), request(dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_partial_payments_never_exceed_total() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let bill = seeded_bill(&repository, dec!(1000)).await;
        let processor =
            Arc::new(PaymentProcessor::new(repository.clone()).with_max_attempts(8));

        // Four writers race; each pays a quarter of the total.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let processor = Arc::clone(&processor);
            let id = bill.id();
            handles.push(tokio::spawn(async move {
                processor.apply(id, request(dec!(250))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repository.get(bill.id()).await.unwrap().unwrap();
        assert_eq!(stored.paid_amount(), dec!(1000));
        assert_eq!(stored.balance(), dec!(0));
        assert_eq!(stored.status(), BillStatus::Paid);
        assert_eq!(stored.payments().len(), 4);
    }
}
