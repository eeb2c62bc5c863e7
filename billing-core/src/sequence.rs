//! Daily bill number generation.
//!
//! Bill numbers follow `BILL-YYYYMMDD-NNN`: a date prefix plus a per-day
//! sequence starting at 001. The sequence comes from an atomically
//! incremented counter owned by the repository, so concurrent generations on
//! the same day can never collide. Past 999 the sequence field simply widens
//! to four or more digits instead of truncating.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{BillingError, BillingResult};
use crate::repository::BillRepository;

/// Prefix shared by every bill number.
pub const BILL_NUMBER_PREFIX: &str = "BILL";

/// Upper bound on the per-day sequence. Generation fails fast beyond this
/// rather than minting unbounded identifiers.
pub const MAX_DAILY_SEQUENCE: u32 = 999_999;

/// Format a bill number from its date and sequence parts. The sequence is
/// zero-padded to three digits and widens as needed.
pub fn format_bill_number(date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{}-{:03}",
        BILL_NUMBER_PREFIX,
        date.format("%Y%m%d"),
        sequence
    )
}

/// Mints unique bill numbers against the repository's daily counter.
pub struct BillNumberGenerator {
    repository: Arc<dyn BillRepository>,
}

impl BillNumberGenerator {
    pub fn new(repository: Arc<dyn BillRepository>) -> Self {
        Self { repository }
    }

    /// Mint the next bill number for the given calendar day.
    pub async fn generate(&self, date: NaiveDate) -> BillingResult<String> {
        let sequence = self.repository.next_bill_sequence(date).await?;
        if sequence > MAX_DAILY_SEQUENCE {
            return Err(BillingError::IdentifierExhausted(date));
        }
        let bill_number = format_bill_number(date, sequence);
        debug!(%bill_number, "minted bill number");
        Ok(bill_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBillRepository;
    use crate::models::{Bill, BillFilter, Page, PageRequest};
    use async_trait::async_trait;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_with_three_digit_padding() {
        assert_eq!(
            format_bill_number(day(2026, 8, 29), 1),
            "BILL-20260829-001"
        );
        assert_eq!(
            format_bill_number(day(2026, 8, 29), 45),
            "BILL-20260829-045"
        );
    }

    #[test]
    fn sequence_widens_past_three_digits() {
        assert_eq!(
            format_bill_number(day(2026, 8, 29), 1000),
            "BILL-20260829-1000"
        );
        assert_eq!(
            format_bill_number(day(2026, 8, 29), 12345),
            "BILL-20260829-12345"
        );
    }

    #[tokio::test]
    async fn generates_consecutive_numbers_per_day() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let generator = BillNumberGenerator::new(repository);
        let today = day(2026, 8, 29);

        assert_eq!(generator.generate(today).await.unwrap(), "BILL-20260829-001");
        assert_eq!(generator.generate(today).await.unwrap(), "BILL-20260829-002");
        // A different day starts its own sequence.
        assert_eq!(
            generator.generate(day(2026, 8, 30)).await.unwrap(),
            "BILL-20260830-001"
        );
    }

    /// Repository stub whose counter is already past the daily cap.
    struct ExhaustedCounter;

    #[async_trait]
    impl BillRepository for ExhaustedCounter {
        async fn insert(&self, _bill: Bill) -> BillingResult<Bill> {
            unimplemented!("not used by this test")
        }
        async fn get(&self, _id: Uuid) -> BillingResult<Option<Bill>> {
            unimplemented!("not used by this test")
        }
        async fn find(
            &self,
            _filter: &BillFilter,
            _page: &PageRequest,
        ) -> BillingResult<Page<Bill>> {
            unimplemented!("not used by this test")
        }
        async fn list_matching(&self, _filter: &BillFilter) -> BillingResult<Vec<Bill>> {
            unimplemented!("not used by this test")
        }
        async fn store(&self, _bill: Bill, _expected_version: i64) -> BillingResult<Bill> {
            unimplemented!("not used by this test")
        }
        async fn remove(&self, _id: Uuid) -> BillingResult<()> {
            unimplemented!("not used by this test")
        }
        async fn next_bill_sequence(&self, _date: NaiveDate) -> BillingResult<u32> {
            Ok(MAX_DAILY_SEQUENCE + 1)
        }
    }

    #[tokio::test]
    async fn exhausted_sequence_fails_fast() {
        let generator = BillNumberGenerator::new(Arc::new(ExhaustedCounter));
        let err = generator.generate(day(2026, 8, 29)).await.unwrap_err();
        assert!(matches!(err, BillingError::IdentifierExhausted(_)));
    }
}
