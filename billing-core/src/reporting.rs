//! Read-side reporting over the bill set.
//!
//! Every operation here is a pure aggregation across repository queries and
//! never mutates a bill. Reports tolerate one write's worth of staleness;
//! they read whatever the repository currently holds.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::BillingResult;
use crate::models::{Bill, BillFilter, BillSort, BillStatus, Page, PageRequest, PaymentMethod, SortOrder};
use crate::repository::BillRepository;

/// Calendar bucket size for period summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

/// Aggregate totals and per-status counts over a bill set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillingStats {
    pub total_bills: u64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_balance: Decimal,
    pub pending_bills: u64,
    pub partial_bills: u64,
    pub paid_bills: u64,
    pub overdue_bills: u64,
}

impl BillingStats {
    fn absorb(&mut self, bill: &Bill) {
        self.total_bills += 1;
        self.total_amount += bill.total();
        self.total_paid += bill.paid_amount();
        self.total_balance += bill.balance();
        match bill.status() {
            BillStatus::Pending => self.pending_bills += 1,
            BillStatus::Partial => self.partial_bills += 1,
            BillStatus::Paid => self.paid_bills += 1,
            BillStatus::Overdue => self.overdue_bills += 1,
            BillStatus::Cancelled => {}
        }
    }
}

/// One calendar bucket of a period summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period_key: String,
    pub total_bills: u64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_balance: Decimal,
    pub avg_bill_amount: Decimal,
}

/// Month-over-month dashboard view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub overall: BillingStats,
    pub this_month: BillingStats,
    pub last_month: BillingStats,
    /// Percentage growth of billed revenue versus last month.
    pub revenue_growth: Decimal,
    /// Percentage growth of bill count versus last month.
    pub bills_growth: Decimal,
}

/// Restriction on the flattened payment ledger for collection reports.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    /// Inclusive lower bound on the payment date.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the payment date.
    pub to: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

impl CollectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }
}

/// One row of a collection report: the money taken on one day through one
/// payment method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRow {
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub total_amount: Decimal,
    pub count: u64,
}

/// Growth convention used by the dashboard: percentage change against the
/// previous value, defined as 0 when there is no previous value to compare
/// against.
pub fn growth_percent(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    ((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(2)
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("first of a valid month is a valid timestamp");
    Utc.from_utc_datetime(&date)
}

fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Month => date.with_day(1).unwrap_or(date),
        Granularity::Year => date.with_day(1).and_then(|d| d.with_month(1)).unwrap_or(date),
    }
}

fn period_key(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => start.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = start.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Year => start.format("%Y").to_string(),
    }
}

#[derive(Default)]
struct Bucket {
    bills: u64,
    amount: Decimal,
    paid: Decimal,
    balance: Decimal,
}

/// Reporting engine over the bill repository.
pub struct BillingReports {
    repository: Arc<dyn BillRepository>,
}

impl BillingReports {
    pub fn new(repository: Arc<dyn BillRepository>) -> Self {
        Self { repository }
    }

    /// Single-pass totals and status counts over the matching bills.
    pub async fn billing_stats(&self, filter: &BillFilter) -> BillingResult<BillingStats> {
        let bills = self.repository.list_matching(filter).await?;
        let mut stats = BillingStats::default();
        for bill in &bills {
            stats.absorb(bill);
        }
        Ok(stats)
    }

    /// Overall, this-month and last-month stats plus month-over-month growth.
    pub async fn dashboard_stats(&self) -> BillingResult<DashboardStats> {
        let now = Utc::now();
        let this_month_start = month_start(now.year(), now.month());
        let (prev_year, prev_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        let last_month_start = month_start(prev_year, prev_month);

        let overall = self.billing_stats(&BillFilter::new()).await?;
        let this_month = self
            .billing_stats(&BillFilter::new().with_from_date(this_month_start))
            .await?;
        let last_month = self
            .billing_stats(
                &BillFilter::new()
                    .with_from_date(last_month_start)
                    .with_to_date(this_month_start - Duration::milliseconds(1)),
            )
            .await?;

        let revenue_growth = growth_percent(this_month.total_amount, last_month.total_amount);
        let bills_growth = growth_percent(
            Decimal::from(this_month.total_bills),
            Decimal::from(last_month.total_bills),
        );
        Ok(DashboardStats {
            overall,
            this_month,
            last_month,
            revenue_growth,
            bills_growth,
        })
    }

    /// Bills bucketed by `bill_date` truncated to the requested granularity,
    /// chronologically ascending.
    pub async fn period_summary(
        &self,
        filter: &BillFilter,
        granularity: Granularity,
    ) -> BillingResult<Vec<PeriodSummary>> {
        let bills = self.repository.list_matching(filter).await?;
        let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
        for bill in &bills {
            let start = bucket_start(bill.bill_date().date_naive(), granularity);
            let bucket = buckets.entry(start).or_default();
            bucket.bills += 1;
            bucket.amount += bill.total();
            bucket.paid += bill.paid_amount();
            bucket.balance += bill.balance();
        }

        Ok(buckets
            .into_iter()
            .map(|(start, bucket)| PeriodSummary {
                period_key: period_key(start, granularity),
                total_bills: bucket.bills,
                total_amount: bucket.amount,
                total_paid: bucket.paid,
                total_balance: bucket.balance,
                avg_bill_amount: (bucket.amount / Decimal::from(bucket.bills)).round_dp(2),
            })
            .collect())
    }

    /// Bills still carrying a balance, soonest due first. With `overdue_only`
    /// the result is limited to bills already past their due date.
    pub async fn outstanding(
        &self,
        filter: &BillFilter,
        overdue_only: bool,
        page: &PageRequest,
    ) -> BillingResult<Page<Bill>> {
        let mut filter = filter.clone();
        filter.outstanding_only = true;
        if overdue_only {
            filter.due_before = Some(Utc::now());
        }
        let page = page.clone().sorted_by(BillSort::DueDate, SortOrder::Asc);
        self.repository.find(&filter, &page).await
    }

    /// Collections across the matching bills: every payment flattened out of
    /// its bill, grouped by the payment's own date and method.
    pub async fn collections(
        &self,
        bills: &BillFilter,
        payments: &CollectionFilter,
    ) -> BillingResult<Vec<CollectionRow>> {
        let matching = self.repository.list_matching(bills).await?;
        let mut groups: BTreeMap<(NaiveDate, PaymentMethod), (Decimal, u64)> = BTreeMap::new();
        for bill in &matching {
            for payment in bill.payments() {
                if let Some(from) = payments.from {
                    if payment.paid_at < from {
                        continue;
                    }
                }
                if let Some(to) = payments.to {
                    if payment.paid_at > to {
                        continue;
                    }
                }
                if let Some(method) = payments.method {
                    if payment.method != method {
                        continue;
                    }
                }
                let entry = groups
                    .entry((payment.paid_at.date_naive(), payment.method))
                    .or_insert((Decimal::ZERO, 0));
                entry.0 += payment.amount;
                entry.1 += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((date, method), (total_amount, count))| CollectionRow {
                date,
                method,
                total_amount,
                count,
            })
            .collect())
    }
}
