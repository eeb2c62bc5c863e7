//! Domain model for the billing ledger.
//!
//! The [`Bill`] aggregate owns every derived financial field. Callers supply
//! line items and tax/discount adjustments; subtotal, total, paid amount,
//! balance and status are always recomputed, never trusted from the outside.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// Maximum length of a line item description, in characters.
pub const MAX_ITEM_DESCRIPTION_LEN: usize = 200;
/// Maximum length of the notes attached to a single payment.
pub const MAX_PAYMENT_NOTES_LEN: usize = 500;
/// Maximum length of the free-form notes on a bill.
pub const MAX_BILL_NOTES_LEN: usize = 1000;
/// Days until a bill falls due when the caller does not supply a due date.
pub const DEFAULT_DUE_DAYS: i64 = 15;

/// How a payment was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Netbanking,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Upi => "upi",
            Self::Netbanking => "netbanking",
            Self::Cheque => "cheque",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bill lifecycle status, derived from the payment state and the due date.
///
/// `Cancelled` is terminal and only entered through [`Bill::cancel`]; the
/// recompute step never overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single charge line on a bill.
///
/// The caller-supplied amount must equal `quantity * unit_rate`; this is
/// checked at construction and again when a bill accepts the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_rate: Decimal,
    pub amount: Decimal,
}

impl BillLineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_rate: Decimal,
        amount: Decimal,
    ) -> BillingResult<Self> {
        let item = Self {
            description: description.into(),
            quantity,
            unit_rate,
            amount,
        };
        item.validate()?;
        Ok(item)
    }

    /// Build a line item with the amount computed from quantity and rate.
    pub fn priced(
        description: impl Into<String>,
        quantity: u32,
        unit_rate: Decimal,
    ) -> BillingResult<Self> {
        let amount = Decimal::from(quantity) * unit_rate;
        Self::new(description, quantity, unit_rate, amount)
    }

    pub(crate) fn validate(&self) -> BillingResult<()> {
        if self.description.trim().is_empty() {
            return Err(BillingError::validation(
                "items.description",
                "line item description must not be empty",
            ));
        }
        if self.description.chars().count() > MAX_ITEM_DESCRIPTION_LEN {
            return Err(BillingError::validation(
                "items.description",
                format!(
                    "line item description exceeds {} characters",
                    MAX_ITEM_DESCRIPTION_LEN
                ),
            ));
        }
        if self.quantity < 1 {
            return Err(BillingError::validation(
                "items.quantity",
                "line item quantity must be at least 1",
            ));
        }
        if self.unit_rate < Decimal::ZERO {
            return Err(BillingError::validation(
                "items.unit_rate",
                "line item rate must not be negative",
            ));
        }
        if self.amount != Decimal::from(self.quantity) * self.unit_rate {
            return Err(BillingError::validation(
                "items.amount",
                format!(
                    "line item amount {} does not match quantity {} x rate {}",
                    self.amount, self.quantity, self.unit_rate
                ),
            ));
        }
        Ok(())
    }
}

fn validate_items(items: &[BillLineItem]) -> BillingResult<()> {
    if items.is_empty() {
        return Err(BillingError::validation(
            "items",
            "a bill requires at least one line item",
        ));
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}

fn validate_notes(
    notes: Option<&str>,
    field: &'static str,
    max_len: usize,
) -> BillingResult<()> {
    if let Some(text) = notes {
        if text.chars().count() > max_len {
            return Err(BillingError::validation(
                field,
                format!("notes exceed {} characters", max_len),
            ));
        }
    }
    Ok(())
}

fn validate_adjustment(value: Decimal, field: &'static str) -> BillingResult<()> {
    if value < Decimal::ZERO {
        return Err(BillingError::validation(
            field,
            "adjustment must not be negative",
        ));
    }
    Ok(())
}

/// One settled payment against a bill. Payments are append-only: once
/// recorded they are never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub applied_by: Uuid,
}

/// Caller input for applying a payment to a bill.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub applied_by: Uuid,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, method: PaymentMethod, applied_by: Uuid) -> Self {
        Self {
            amount,
            method,
            transaction_ref: None,
            notes: None,
            applied_by,
        }
    }

    pub fn with_transaction_ref(mut self, transaction_ref: impl Into<String>) -> Self {
        self.transaction_ref = Some(transaction_ref.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Caller input for creating a bill.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_id: Uuid,
    pub bill_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub items: Vec<BillLineItem>,
    pub tax: Decimal,
    pub discount: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

impl NewBill {
    pub fn new(patient_id: Uuid, doctor_id: Uuid, visit_id: Uuid, created_by: Uuid) -> Self {
        Self {
            patient_id,
            doctor_id,
            visit_id,
            bill_date: None,
            due_date: None,
            items: Vec::new(),
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            notes: None,
            created_by,
        }
    }

    pub fn with_items(mut self, items: Vec<BillLineItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_bill_date(mut self, bill_date: DateTime<Utc>) -> Self {
        self.bill_date = Some(bill_date);
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Validate everything that does not depend on a minted bill number.
    pub fn validate(&self) -> BillingResult<()> {
        validate_items(&self.items)?;
        validate_adjustment(self.tax, "tax")?;
        validate_adjustment(self.discount, "discount")?;
        validate_notes(self.notes.as_deref(), "notes", MAX_BILL_NOTES_LEN)?;
        if let (Some(bill_date), Some(due_date)) = (self.bill_date, self.due_date) {
            if due_date < bill_date {
                return Err(BillingError::validation(
                    "due_date",
                    "due date must not precede the bill date",
                ));
            }
        }
        Ok(())
    }
}

/// Caller-editable fields of an existing bill.
///
/// Recompute-owned fields (`bill_number`, `paid_amount`, `balance`, `status`,
/// `payments`) are deliberately absent: an update request cannot express
/// touching them.
#[derive(Debug, Clone)]
pub struct BillUpdate {
    pub bill_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub items: Option<Vec<BillLineItem>>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub updated_by: Uuid,
}

impl BillUpdate {
    pub fn new(updated_by: Uuid) -> Self {
        Self {
            bill_date: None,
            due_date: None,
            items: None,
            tax: None,
            discount: None,
            notes: None,
            updated_by,
        }
    }

    pub fn with_bill_date(mut self, bill_date: DateTime<Utc>) -> Self {
        self.bill_date = Some(bill_date);
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_items(mut self, items: Vec<BillLineItem>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = Some(tax);
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn touches_financials(&self) -> bool {
        self.items.is_some() || self.tax.is_some() || self.discount.is_some()
    }
}

/// Status derivation. `Partial` takes precedence over `Overdue`: a bill with
/// any payment on record stays `partial` even past its due date.
fn derive_status(
    balance: Decimal,
    paid_amount: Decimal,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> BillStatus {
    if balance <= Decimal::ZERO {
        BillStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        BillStatus::Partial
    } else if now > due_date {
        BillStatus::Overdue
    } else {
        BillStatus::Pending
    }
}

/// The bill aggregate: line items, adjustments, an append-only payment
/// ledger, and the derived financial fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    id: Uuid,
    bill_number: String,
    patient_id: Uuid,
    doctor_id: Uuid,
    visit_id: Uuid,
    bill_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    items: Vec<BillLineItem>,
    subtotal: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    paid_amount: Decimal,
    balance: Decimal,
    status: BillStatus,
    payments: Vec<Payment>,
    notes: Option<String>,
    created_by: Uuid,
    updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl Bill {
    /// Construct a bill from validated caller input and a minted bill number.
    ///
    /// Recompute runs once with no payments on record, so a freshly created
    /// bill starts `pending` (or `overdue` when the due date already passed).
    pub fn create(bill_number: impl Into<String>, new: NewBill) -> BillingResult<Self> {
        new.validate()?;
        let now = Utc::now();
        let bill_date = new.bill_date.unwrap_or(now);
        let due_date = new
            .due_date
            .unwrap_or(bill_date + Duration::days(DEFAULT_DUE_DAYS));
        if due_date < bill_date {
            return Err(BillingError::validation(
                "due_date",
                "due date must not precede the bill date",
            ));
        }

        let mut bill = Self {
            id: Uuid::new_v4(),
            bill_number: bill_number.into(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            visit_id: new.visit_id,
            bill_date,
            due_date,
            items: new.items,
            subtotal: Decimal::ZERO,
            tax: new.tax,
            discount: new.discount,
            total: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            balance: Decimal::ZERO,
            status: BillStatus::Pending,
            payments: Vec::new(),
            notes: new.notes,
            created_by: new.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        bill.recompute_at(now);
        Ok(bill)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bill_number(&self) -> &str {
        &self.bill_number
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }

    pub fn visit_id(&self) -> Uuid {
        self.visit_id
    }

    pub fn bill_date(&self) -> DateTime<Utc> {
        self.bill_date
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn items(&self) -> &[BillLineItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn paid_amount(&self) -> Decimal {
        self.paid_amount
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn status(&self) -> BillStatus {
        self.status
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> Uuid {
        self.created_by
    }

    pub fn updated_by(&self) -> Option<Uuid> {
        self.updated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Version counter compared on write by repositories.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Rederive every computed field from the items, adjustments and payment
    /// ledger. Pure in its inputs and idempotent: running it twice with the
    /// same `now` changes nothing the second time.
    pub fn recompute_at(&mut self, now: DateTime<Utc>) {
        self.subtotal = self.items.iter().map(|item| item.amount).sum();
        self.total = (self.subtotal + self.tax - self.discount).max(Decimal::ZERO);
        self.paid_amount = self.payments.iter().map(|payment| payment.amount).sum();
        self.balance = self.total - self.paid_amount;
        if self.status != BillStatus::Cancelled {
            self.status = derive_status(self.balance, self.paid_amount, self.due_date, now);
        }
    }

    /// Append a payment to the ledger and rederive the financial fields.
    ///
    /// Rejects overpayment outright rather than clamping: a payment may settle
    /// at most the exact remaining balance.
    pub fn record_payment(&mut self, payment: Payment, now: DateTime<Utc>) -> BillingResult<()> {
        if self.status == BillStatus::Cancelled {
            return Err(BillingError::conflict(
                "cannot record a payment on a cancelled bill",
            ));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(BillingError::validation(
                "amount",
                "payment amount must be greater than zero",
            ));
        }
        validate_notes(
            payment.notes.as_deref(),
            "payment.notes",
            MAX_PAYMENT_NOTES_LEN,
        )?;
        if payment.amount > self.balance {
            return Err(BillingError::Overpayment {
                attempted: payment.amount,
                balance: self.balance,
            });
        }

        self.updated_by = Some(payment.applied_by);
        self.updated_at = now;
        self.payments.push(payment);
        self.recompute_at(now);
        Ok(())
    }

    /// Apply a caller update. Item, tax and discount edits are frozen once a
    /// payment exists, so the total can never drop below the paid amount.
    pub fn apply_update(&mut self, update: BillUpdate, now: DateTime<Utc>) -> BillingResult<()> {
        if self.status == BillStatus::Cancelled {
            return Err(BillingError::conflict("cannot edit a cancelled bill"));
        }
        if update.touches_financials() && !self.payments.is_empty() {
            return Err(BillingError::conflict(
                "items, tax and discount are frozen once a payment exists",
            ));
        }

        // Validate the full candidate state before mutating anything.
        if let Some(items) = &update.items {
            validate_items(items)?;
        }
        if let Some(tax) = update.tax {
            validate_adjustment(tax, "tax")?;
        }
        if let Some(discount) = update.discount {
            validate_adjustment(discount, "discount")?;
        }
        validate_notes(update.notes.as_deref(), "notes", MAX_BILL_NOTES_LEN)?;
        let bill_date = update.bill_date.unwrap_or(self.bill_date);
        let due_date = update.due_date.unwrap_or(self.due_date);
        if due_date < bill_date {
            return Err(BillingError::validation(
                "due_date",
                "due date must not precede the bill date",
            ));
        }

        self.bill_date = bill_date;
        self.due_date = due_date;
        if let Some(items) = update.items {
            self.items = items;
        }
        if let Some(tax) = update.tax {
            self.tax = tax;
        }
        if let Some(discount) = update.discount {
            self.discount = discount;
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        self.updated_by = Some(update.updated_by);
        self.updated_at = now;
        self.recompute_at(now);
        Ok(())
    }

    /// One-way transition into the terminal `cancelled` state. Settled bills
    /// cannot be cancelled.
    pub fn cancel(&mut self, cancelled_by: Uuid, now: DateTime<Utc>) -> BillingResult<()> {
        match self.status {
            BillStatus::Cancelled => Err(BillingError::conflict("bill is already cancelled")),
            BillStatus::Paid => Err(BillingError::conflict("a settled bill cannot be cancelled")),
            _ => {
                self.status = BillStatus::Cancelled;
                self.updated_by = Some(cancelled_by);
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Repository bookkeeping: record the version and timestamp assigned by
    /// the store on a successful write.
    pub fn mark_persisted(&mut self, version: i64, updated_at: DateTime<Utc>) {
        self.version = version;
        self.updated_at = updated_at;
    }
}

/// Typed query filter over bills. Every field is an explicit optional; absent
/// fields do not constrain the result set.
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub visit_id: Option<Uuid>,
    /// Inclusive lower bound on the bill date.
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the bill date.
    pub to_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring match over bill number and notes.
    pub search: Option<String>,
    /// Restrict to bills with a positive balance.
    pub outstanding_only: bool,
    /// Restrict to bills due strictly before this instant.
    pub due_before: Option<DateTime<Utc>>,
}

impl BillFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: BillStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn with_doctor(mut self, doctor_id: Uuid) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    pub fn with_visit(mut self, visit_id: Uuid) -> Self {
        self.visit_id = Some(visit_id);
        self
    }

    pub fn with_from_date(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn with_to_date(mut self, to: DateTime<Utc>) -> Self {
        self.to_date = Some(to);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn outstanding(mut self) -> Self {
        self.outstanding_only = true;
        self
    }

    pub fn with_due_before(mut self, due_before: DateTime<Utc>) -> Self {
        self.due_before = Some(due_before);
        self
    }

    /// Predicate form of the filter, used by the in-memory repository.
    pub fn matches(&self, bill: &Bill) -> bool {
        if let Some(status) = self.status {
            if bill.status() != status {
                return false;
            }
        }
        if let Some(patient_id) = self.patient_id {
            if bill.patient_id() != patient_id {
                return false;
            }
        }
        if let Some(doctor_id) = self.doctor_id {
            if bill.doctor_id() != doctor_id {
                return false;
            }
        }
        if let Some(visit_id) = self.visit_id {
            if bill.visit_id() != visit_id {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if bill.bill_date() < from {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if bill.bill_date() > to {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_number = bill.bill_number().to_lowercase().contains(&needle);
            let in_notes = bill
                .notes()
                .map(|notes| notes.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_number && !in_notes {
                return false;
            }
        }
        if self.outstanding_only && bill.balance() <= Decimal::ZERO {
            return false;
        }
        if let Some(due_before) = self.due_before {
            if bill.due_date() >= due_before {
                return false;
            }
        }
        true
    }
}

/// Sort key for bill listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillSort {
    #[default]
    CreatedAt,
    BillDate,
    DueDate,
    BillNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Standard pagination parameters for list operations.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: BillSort,
    pub order: SortOrder,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            sort: BillSort::default(),
            order: SortOrder::default(),
        }
    }

    pub fn sorted_by(mut self, sort: BillSort, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    /// Page number, clamped to a minimum of 1.
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size, clamped between 1 and [`Self::MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        ((self.total + u64::from(self.page_size) - 1) / u64::from(self.page_size)) as u32
    }
}
