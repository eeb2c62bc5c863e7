//! In-memory bill repository.
//!
//! Backs the test suite and configuration-selected in-process deployments.
//! Writes go through the same compare-and-swap contract as the persistent
//! store, so concurrency behavior is identical; it is never an implicit
//! fallback inside business logic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::models::{Bill, BillFilter, BillSort, Page, PageRequest, SortOrder};
use crate::repository::BillRepository;

struct Stored {
    insertion: u64,
    bill: Bill,
}

/// Thread-safe in-process store of bill aggregates.
#[derive(Default)]
pub struct InMemoryBillRepository {
    bills: RwLock<HashMap<Uuid, Stored>>,
    counters: DashMap<NaiveDate, u32>,
    insertions: RwLock<u64>,
}

impl InMemoryBillRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sort_bills(bills: &mut [Bill], sort: BillSort, order: SortOrder) {
        bills.sort_by(|a, b| {
            let ordering = match sort {
                BillSort::CreatedAt => a.created_at().cmp(&b.created_at()),
                BillSort::BillDate => a.bill_date().cmp(&b.bill_date()),
                BillSort::DueDate => a.due_date().cmp(&b.due_date()),
                BillSort::BillNumber => a.bill_number().cmp(b.bill_number()),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

#[async_trait]
impl BillRepository for InMemoryBillRepository {
    async fn insert(&self, bill: Bill) -> BillingResult<Bill> {
        let mut bills = self.bills.write();
        if bills.contains_key(&bill.id()) {
            return Err(BillingError::conflict(format!(
                "bill {} already exists",
                bill.id()
            )));
        }
        if bills
            .values()
            .any(|stored| stored.bill.bill_number() == bill.bill_number())
        {
            return Err(BillingError::conflict(format!(
                "bill number {} already exists",
                bill.bill_number()
            )));
        }

        let mut insertions = self.insertions.write();
        *insertions += 1;
        let stored = Stored {
            insertion: *insertions,
            bill: bill.clone(),
        };
        bills.insert(bill.id(), stored);
        debug!(bill_id = %bill.id(), "bill inserted");
        Ok(bill)
    }

    async fn get(&self, id: Uuid) -> BillingResult<Option<Bill>> {
        Ok(self.bills.read().get(&id).map(|stored| stored.bill.clone()))
    }

    async fn find(&self, filter: &BillFilter, page: &PageRequest) -> BillingResult<Page<Bill>> {
        let bills = self.bills.read();
        let mut matching: Vec<Bill> = bills
            .values()
            .filter(|stored| filter.matches(&stored.bill))
            .map(|stored| stored.bill.clone())
            .collect();
        Self::sort_bills(&mut matching, page.sort, page.order);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn list_matching(&self, filter: &BillFilter) -> BillingResult<Vec<Bill>> {
        let bills = self.bills.read();
        let mut matching: Vec<&Stored> = bills
            .values()
            .filter(|stored| filter.matches(&stored.bill))
            .collect();
        matching.sort_by_key(|stored| stored.insertion);
        Ok(matching.into_iter().map(|stored| stored.bill.clone()).collect())
    }

    async fn store(&self, mut bill: Bill, expected_version: i64) -> BillingResult<Bill> {
        let mut bills = self.bills.write();
        let stored = bills
            .get_mut(&bill.id())
            .ok_or(BillingError::NotFound(bill.id()))?;
        if stored.bill.version() != expected_version {
            return Err(BillingError::conflict(format!(
                "bill {} was modified concurrently (stored version {}, expected {})",
                bill.id(),
                stored.bill.version(),
                expected_version
            )));
        }
        bill.mark_persisted(expected_version + 1, Utc::now());
        stored.bill = bill.clone();
        Ok(bill)
    }

    async fn remove(&self, id: Uuid) -> BillingResult<()> {
        let mut bills = self.bills.write();
        let stored = bills.get(&id).ok_or(BillingError::NotFound(id))?;
        if stored.bill.paid_amount() > Decimal::ZERO {
            return Err(BillingError::conflict(
                "cannot delete a bill with payment history",
            ));
        }
        bills.remove(&id);
        Ok(())
    }

    async fn next_bill_sequence(&self, date: NaiveDate) -> BillingResult<u32> {
        let mut counter = self.counters.entry(date).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillLineItem, BillStatus, NewBill};
    use crate::sequence::BillNumberGenerator;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn sample_bill(bill_number: &str, rate: Decimal) -> Bill {
        let new = NewBill::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .with_items(vec![BillLineItem::priced("Consultation", 1, rate).unwrap()]);
        Bill::create(bill_number, new).unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let repository = InMemoryBillRepository::new();
        let bill = sample_bill("BILL-20260829-001", dec!(500));
        let id = bill.id();
        repository.insert(bill).await.unwrap();

        let fetched = repository.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.bill_number(), "BILL-20260829-001");
        assert!(repository.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_bill_number_is_rejected() {
        let repository = InMemoryBillRepository::new();
        repository
            .insert(sample_bill("BILL-20260829-001", dec!(500)))
            .await
            .unwrap();
        let err = repository
            .insert(sample_bill("BILL-20260829-001", dec!(700)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_paginates() {
        let repository = InMemoryBillRepository::new();
        for i in 1..=5u32 {
            let mut bill = sample_bill(&format!("BILL-20260829-{:03}", i), dec!(100));
            // Spread due dates so ordering is observable.
            let update = crate::models::BillUpdate::new(Uuid::new_v4())
                .with_due_date(Utc::now() + Duration::days(i64::from(i)));
            bill.apply_update(update, Utc::now()).unwrap();
            repository.insert(bill).await.unwrap();
        }

        let page = repository
            .find(
                &BillFilter::new().with_status(BillStatus::Pending),
                &PageRequest::new(1, 2).sorted_by(BillSort::DueDate, SortOrder::Asc),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages(), 3);
        assert!(page.items[0].due_date() <= page.items[1].due_date());

        let page = repository
            .find(
                &BillFilter::new().with_search("BILL-20260829-004"),
                &PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn store_enforces_version_compare_and_swap() {
        let repository = InMemoryBillRepository::new();
        let bill = sample_bill("BILL-20260829-001", dec!(500));
        repository.insert(bill.clone()).await.unwrap();

        let updated = repository.store(bill.clone(), 0).await.unwrap();
        assert_eq!(updated.version(), 1);

        // A writer still holding version 0 must lose.
        let err = repository.store(bill, 0).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn remove_refuses_bills_with_payments() {
        let repository = InMemoryBillRepository::new();
        let mut bill = sample_bill("BILL-20260829-001", dec!(500));
        let id = bill.id();
        bill.record_payment(
            crate::models::Payment {
                amount: dec!(100),
                method: crate::models::PaymentMethod::Cash,
                transaction_ref: None,
                notes: None,
                paid_at: Utc::now(),
                applied_by: Uuid::new_v4(),
            },
            Utc::now(),
        )
        .unwrap();
        repository.insert(bill).await.unwrap();

        let err = repository.remove(id).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict(_)));

        // Still present afterwards.
        assert!(repository.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_generation_yields_distinct_numbers() {
        let repository = Arc::new(InMemoryBillRepository::new());
        let generator = Arc::new(BillNumberGenerator::new(repository));
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let generator = Arc::clone(&generator);
            handles.push(tokio::spawn(async move {
                generator.generate(today).await.unwrap()
            }));
        }

        let mut numbers = HashSet::new();
        for handle in handles {
            numbers.insert(handle.await.unwrap());
        }
        assert_eq!(numbers.len(), 50);
        assert!(numbers.contains("BILL-20260829-001"));
        assert!(numbers.contains("BILL-20260829-050"));
    }
}
