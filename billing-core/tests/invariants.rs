//! Property tests for the bill aggregate's financial invariants.
//!
//! For any sequence of edits and payment applications, accepted or rejected,
//! the derived fields must always reconcile:
//! subtotal = Σ item amounts, total = max(0, subtotal + tax - discount),
//! paid = Σ ledger amounts, balance = total - paid, and paid never exceeds
//! total.

use billing_core::{
    Bill, BillLineItem, BillUpdate, NewBill, Payment, PaymentMethod,
};
use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Money amounts in paise/cents to keep arithmetic exact.
fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[derive(Debug, Clone)]
enum Op {
    Pay(i64),
    SetTax(i64),
    SetDiscount(i64),
    ReplaceItems(Vec<(u32, i64)>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..200_000).prop_map(Op::Pay),
        (0i64..50_000).prop_map(Op::SetTax),
        (0i64..50_000).prop_map(Op::SetDiscount),
        prop::collection::vec(((1u32..5), (0i64..100_000)), 1..4).prop_map(Op::ReplaceItems),
    ]
}

fn assert_reconciled(bill: &Bill) {
    let subtotal: Decimal = bill.items().iter().map(|item| item.amount).sum();
    assert_eq!(bill.subtotal(), subtotal, "subtotal must equal item sum");

    let total = (subtotal + bill.tax() - bill.discount()).max(Decimal::ZERO);
    assert_eq!(bill.total(), total, "total must be clamped subtotal+tax-discount");

    let paid: Decimal = bill.payments().iter().map(|payment| payment.amount).sum();
    assert_eq!(bill.paid_amount(), paid, "paid amount must equal ledger sum");

    assert_eq!(bill.balance(), total - paid, "balance must equal total-paid");
    assert!(paid <= total, "paid amount must never exceed total");
}

proptest! {
    #[test]
    fn invariants_hold_across_arbitrary_op_sequences(
        ops in prop::collection::vec(op_strategy(), 1..25),
        rate_cents in 10_000i64..100_000,
    ) {
        let now = Utc::now();
        let new = NewBill::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .with_items(vec![
            BillLineItem::priced("Consultation", 1, money(rate_cents)).unwrap(),
        ])
        .with_due_date(now + Duration::days(7));
        let mut bill = Bill::create("BILL-20260829-001", new).unwrap();
        assert_reconciled(&bill);

        for op in ops {
            // Rejected operations surface errors; either way the aggregate
            // must stay reconciled.
            let _ = match op {
                Op::Pay(cents) => bill.record_payment(
                    Payment {
                        amount: money(cents),
                        method: PaymentMethod::Cash,
                        transaction_ref: None,
                        notes: None,
                        paid_at: now,
                        applied_by: Uuid::new_v4(),
                    },
                    now,
                ),
                Op::SetTax(cents) => bill.apply_update(
                    BillUpdate::new(Uuid::new_v4()).with_tax(money(cents)),
                    now,
                ),
                Op::SetDiscount(cents) => bill.apply_update(
                    BillUpdate::new(Uuid::new_v4()).with_discount(money(cents)),
                    now,
                ),
                Op::ReplaceItems(specs) => {
                    let items: Vec<BillLineItem> = specs
                        .into_iter()
                        .map(|(quantity, rate)| {
                            BillLineItem::priced("Service", quantity, money(rate)).unwrap()
                        })
                        .collect();
                    bill.apply_update(
                        BillUpdate::new(Uuid::new_v4()).with_items(items),
                        now,
                    )
                }
            };
            assert_reconciled(&bill);
        }
    }

    #[test]
    fn status_derivation_is_deterministic(
        rate_cents in 10_000i64..100_000,
        pay_cents in 1i64..100_000,
        due_offset_days in -30i64..30,
    ) {
        let now = Utc::now();
        let due = now + Duration::days(due_offset_days);
        let new = NewBill::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .with_items(vec![
            BillLineItem::priced("Consultation", 1, money(rate_cents)).unwrap(),
        ])
        .with_bill_date(now - Duration::days(60))
        .with_due_date(due);
        let mut bill = Bill::create("BILL-20260829-001", new).unwrap();
        let _ = bill.record_payment(
            Payment {
                amount: money(pay_cents),
                method: PaymentMethod::Card,
                transaction_ref: None,
                notes: None,
                paid_at: now,
                applied_by: Uuid::new_v4(),
            },
            now,
        );

        bill.recompute_at(now);
        let first = bill.status();
        bill.recompute_at(now);
        assert_eq!(bill.status(), first);
    }
}
