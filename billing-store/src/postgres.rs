//! PostgreSQL bill repository.
//!
//! Bills are stored document-style: the full aggregate serialized into a
//! JSONB `doc` column, alongside plain columns for every indexed or filtered
//! field. Writes are a compare-and-swap on the `version` column; the daily
//! bill-number sequence is an upserted counter row, so generation is a single
//! atomic statement.

use async_trait::async_trait;
use billing_core::{
    Bill, BillFilter, BillRepository, BillSort, BillingError, BillingResult, Page, PageRequest,
    SortOrder,
};
use chrono::{NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::connection::DatabasePool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS bills (
        id UUID PRIMARY KEY,
        bill_number TEXT NOT NULL,
        patient_id UUID NOT NULL,
        doctor_id UUID NOT NULL,
        visit_id UUID NOT NULL,
        status TEXT NOT NULL,
        bill_date TIMESTAMPTZ NOT NULL,
        due_date TIMESTAMPTZ NOT NULL,
        paid_amount NUMERIC NOT NULL,
        balance NUMERIC NOT NULL,
        notes TEXT,
        version BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        doc JSONB NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS bills_bill_number_idx ON bills (bill_number)",
    "CREATE INDEX IF NOT EXISTS bills_patient_id_idx ON bills (patient_id)",
    "CREATE INDEX IF NOT EXISTS bills_doctor_id_idx ON bills (doctor_id)",
    "CREATE INDEX IF NOT EXISTS bills_visit_id_idx ON bills (visit_id)",
    "CREATE INDEX IF NOT EXISTS bills_status_idx ON bills (status)",
    "CREATE INDEX IF NOT EXISTS bills_bill_date_idx ON bills (bill_date)",
    "CREATE INDEX IF NOT EXISTS bills_due_date_idx ON bills (due_date)",
    "CREATE TABLE IF NOT EXISTS bill_counters (
        day DATE PRIMARY KEY,
        seq INTEGER NOT NULL
    )",
];

/// Bill repository backed by PostgreSQL.
pub struct PgBillRepository {
    pool: DatabasePool,
}

impl PgBillRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create the billing tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> BillingResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(self.pool.pool())
                .await
                .map_err(|e| BillingError::Database(format!("schema setup failed: {}", e)))?;
        }
        debug!("billing schema ensured");
        Ok(())
    }

    fn decode_row(row: &PgRow) -> BillingResult<Bill> {
        let doc: serde_json::Value = row
            .try_get("doc")
            .map_err(|e| BillingError::Database(format!("missing doc column: {}", e)))?;
        serde_json::from_value(doc)
            .map_err(|e| BillingError::Database(format!("stored bill failed to decode: {}", e)))
    }

    /// Decode a result set, dropping rows that no longer decode. Reports must
    /// degrade gracefully instead of aborting on one malformed record.
    fn decode_rows_lossy(rows: Vec<PgRow>) -> Vec<Bill> {
        let mut bills = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::decode_row(row) {
                Ok(bill) => bills.push(bill),
                Err(e) => {
                    let id: Option<Uuid> = row.try_get("id").ok();
                    warn!(bill_id = ?id, "skipping malformed stored bill: {}", e);
                }
            }
        }
        bills
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BillFilter) {
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(patient_id) = filter.patient_id {
            builder.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(doctor_id) = filter.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(visit_id) = filter.visit_id {
            builder.push(" AND visit_id = ").push_bind(visit_id);
        }
        if let Some(from) = filter.from_date {
            builder.push(" AND bill_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to_date {
            builder.push(" AND bill_date <= ").push_bind(to);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (bill_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR notes ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if filter.outstanding_only {
            builder.push(" AND balance > 0");
        }
        if let Some(due_before) = filter.due_before {
            builder.push(" AND due_date < ").push_bind(due_before);
        }
    }

    fn sort_column(sort: BillSort) -> &'static str {
        match sort {
            BillSort::CreatedAt => "created_at",
            BillSort::BillDate => "bill_date",
            BillSort::DueDate => "due_date",
            BillSort::BillNumber => "bill_number",
        }
    }

    fn sort_direction(order: SortOrder) -> &'static str {
        match order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        }
    }

    async fn exists(&self, id: Uuid) -> BillingResult<bool> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl BillRepository for PgBillRepository {
    async fn insert(&self, bill: Bill) -> BillingResult<Bill> {
        let doc = serde_json::to_value(&bill)
            .map_err(|e| BillingError::Database(format!("bill failed to encode: {}", e)))?;

        sqlx::query(
            "INSERT INTO bills (id, bill_number, patient_id, doctor_id, visit_id, status, \
             bill_date, due_date, paid_amount, balance, notes, version, created_at, updated_at, doc) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(bill.id())
        .bind(bill.bill_number())
        .bind(bill.patient_id())
        .bind(bill.doctor_id())
        .bind(bill.visit_id())
        .bind(bill.status().as_str())
        .bind(bill.bill_date())
        .bind(bill.due_date())
        .bind(bill.paid_amount())
        .bind(bill.balance())
        .bind(bill.notes())
        .bind(bill.version())
        .bind(bill.created_at())
        .bind(bill.updated_at())
        .bind(doc)
        .execute(self.pool.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => BillingError::Conflict(
                format!("bill {} already exists", bill.bill_number()),
            ),
            _ => {
                error!("bill insert failed: {}", e);
                BillingError::Database(e.to_string())
            }
        })?;

        debug!(bill_id = %bill.id(), "bill inserted");
        Ok(bill)
    }

    async fn get(&self, id: Uuid) -> BillingResult<Option<Bill>> {
        let row = sqlx::query("SELECT id, doc FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;
        row.map(|row| Self::decode_row(&row)).transpose()
    }

    async fn find(&self, filter: &BillFilter, page: &PageRequest) -> BillingResult<Page<Bill>> {
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bills WHERE 1=1");
        Self::push_filter(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, doc FROM bills WHERE 1=1");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY ")
            .push(Self::sort_column(page.sort))
            .push(Self::sort_direction(page.order))
            .push(" LIMIT ")
            .push_bind(i64::from(page.page_size()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = builder
            .build()
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;

        Ok(Page::new(
            Self::decode_rows_lossy(rows),
            total as u64,
            page,
        ))
    }

    async fn list_matching(&self, filter: &BillFilter) -> BillingResult<Vec<Bill>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, doc FROM bills WHERE 1=1");
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at ASC");

        let rows = builder
            .build()
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;
        Ok(Self::decode_rows_lossy(rows))
    }

    async fn store(&self, mut bill: Bill, expected_version: i64) -> BillingResult<Bill> {
        bill.mark_persisted(expected_version + 1, Utc::now());
        let doc = serde_json::to_value(&bill)
            .map_err(|e| BillingError::Database(format!("bill failed to encode: {}", e)))?;

        let result = sqlx::query(
            "UPDATE bills SET status = $1, bill_date = $2, due_date = $3, paid_amount = $4, \
             balance = $5, notes = $6, version = $7, updated_at = $8, doc = $9 \
             WHERE id = $10 AND version = $11",
        )
        .bind(bill.status().as_str())
        .bind(bill.bill_date())
        .bind(bill.due_date())
        .bind(bill.paid_amount())
        .bind(bill.balance())
        .bind(bill.notes())
        .bind(bill.version())
        .bind(bill.updated_at())
        .bind(doc)
        .bind(bill.id())
        .bind(expected_version)
        .execute(self.pool.pool())
        .await
        .map_err(|e| BillingError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            if self.exists(bill.id()).await? {
                return Err(BillingError::conflict(format!(
                    "bill {} was modified concurrently",
                    bill.id()
                )));
            }
            return Err(BillingError::NotFound(bill.id()));
        }
        Ok(bill)
    }

    async fn remove(&self, id: Uuid) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM bills WHERE id = $1 AND paid_amount = 0")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| BillingError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(BillingError::conflict(
                    "cannot delete a bill with payment history",
                ));
            }
            return Err(BillingError::NotFound(id));
        }
        Ok(())
    }

    async fn next_bill_sequence(&self, date: NaiveDate) -> BillingResult<u32> {
        let seq: i32 = sqlx::query_scalar(
            "INSERT INTO bill_counters (day, seq) VALUES ($1, 1) \
             ON CONFLICT (day) DO UPDATE SET seq = bill_counters.seq + 1 \
             RETURNING seq",
        )
        .bind(date)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| BillingError::Database(e.to_string()))?;

        u32::try_from(seq)
            .map_err(|_| BillingError::Database(format!("counter overflow for {}", date)))
    }
}
