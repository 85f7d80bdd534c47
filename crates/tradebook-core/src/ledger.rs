//! # Ledger Rules
//!
//! Pure arithmetic behind both ledgers. The database layer persists the
//! results; everything here is deterministic and I/O free so it can be
//! property-tested.
//!
//! ## Party Ledger Replay
//! ```text
//! entries (seq order)        running balance
//! ───────────────────        ───────────────
//! opening  DEBIT   1000  ──►  1000
//! sale     DEBIT   5000  ──►  6000
//! payment  CREDIT  2000  ──►  4000
//! cancel   CREDIT  3000  ──►  1000   ◄── must equal Party.current_balance
//! ```

use std::collections::BTreeMap;

use crate::documents::PaymentStatus;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{BalanceReconciliation, PartyEntryType, PartyLedgerEntry};

// =============================================================================
// Party Ledger Arithmetic
// =============================================================================

/// Rejects amounts a party ledger entry may not carry.
///
/// Workflows skip zero amounts before calling the ledger; reaching this
/// with a non-positive amount means the caller skipped that check.
pub fn ensure_entry_amount(amount: Money) -> CoreResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(CoreError::ZeroAmountEntry {
            amount_cents: amount.cents(),
        })
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

/// Balance after applying one entry.
#[inline]
pub fn apply_entry(balance: Money, entry_type: PartyEntryType, amount: Money) -> CoreResult<Money> {
    balance
        .checked_add(entry_type.signed(amount))
        .ok_or_else(|| overflow("party balance"))
}

/// Running balance after each entry, starting from zero.
pub fn replay_running_balances<I>(entries: I) -> CoreResult<Vec<Money>>
where
    I: IntoIterator<Item = (PartyEntryType, Money)>,
{
    let mut balance = Money::zero();
    entries
        .into_iter()
        .map(|(entry_type, amount)| {
            balance = apply_entry(balance, entry_type, amount)?;
            Ok(balance)
        })
        .collect()
}

/// Compares a cached balance and stored snapshots against a fresh replay.
///
/// `entries` must be in `seq` order.
pub fn reconcile(cached: Money, entries: &[PartyLedgerEntry]) -> CoreResult<BalanceReconciliation> {
    let replayed = replay_running_balances(
        entries
            .iter()
            .map(|e| (e.entry_type, Money::from_cents(e.amount_cents))),
    )?;

    let mismatched_snapshots = entries
        .iter()
        .zip(&replayed)
        .filter(|(entry, expected)| entry.running_balance_cents != expected.cents())
        .count() as i64;

    Ok(BalanceReconciliation {
        cached_cents: cached.cents(),
        replayed_cents: replayed.last().copied().unwrap_or_default().cents(),
        mismatched_snapshots,
    })
}

// =============================================================================
// Document Totals
// =============================================================================

/// `unit_price × quantity − line_discount`.
///
/// Fails with [`ValidationError::Overflow`] instead of wrapping.
pub fn line_total(unit_price: Money, quantity: i64, line_discount: Money) -> CoreResult<Money> {
    unit_price
        .checked_multiply_quantity(quantity)
        .and_then(|gross| gross.checked_sub(line_discount))
        .ok_or_else(|| overflow("line total"))
}

/// Σ of amounts, failing on overflow.
pub fn checked_sum<I>(field: &str, amounts: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    amounts
        .into_iter()
        .try_fold(Money::zero(), |total, amount| total.checked_add(amount))
        .ok_or_else(|| overflow(field))
}

/// Totals of a sale, derived once at creation and amended by payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub net: Money,
    pub paid: Money,
    pub balance: Money,
    pub payment_status: PaymentStatus,
}

impl SaleTotals {
    /// `net = subtotal − discount + tax`, `balance = net − paid`.
    pub fn compute<I>(line_totals: I, discount: Money, tax: Money, paid: Money) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal = checked_sum("subtotal", line_totals)?;
        let net = subtotal
            .checked_sub(discount)
            .and_then(|net| net.checked_add(tax))
            .ok_or_else(|| overflow("net total"))?;
        Ok(SaleTotals {
            subtotal,
            discount,
            tax,
            net,
            paid,
            balance: net - paid,
            payment_status: PaymentStatus::derive(net, paid),
        })
    }
}

/// Paid/balance/status of a document after its paid amount changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub paid: Money,
    pub balance: Money,
    pub payment_status: PaymentStatus,
}

impl Settlement {
    pub fn new(total: Money, paid: Money) -> Self {
        Settlement {
            paid,
            balance: total - paid,
            payment_status: PaymentStatus::derive(total, paid),
        }
    }
}

// =============================================================================
// Stock Demand
// =============================================================================

/// Sums requested quantities per (product, variant).
///
/// Two lines for the same key must be checked against on-hand stock
/// together, otherwise each passes alone and the pair oversells.
pub fn aggregate_demand<'a, I>(lines: I) -> BTreeMap<(String, Option<String>), i64>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>, i64)>,
{
    let mut demand = BTreeMap::new();
    for (product_id, variant_id, quantity) in lines {
        *demand
            .entry((product_id.to_string(), variant_id.map(str::to_string)))
            .or_insert(0) += quantity;
    }
    demand
}

// =============================================================================
// Returns
// =============================================================================

/// Each line's share of the sale's net total, in line order.
///
/// The document discount and tax are spread over the lines in proportion
/// to their line totals (by quantity when every line total is zero).
/// Shares are cut from the cumulative weight, so they always add up to
/// exactly `net`.
///
/// ```text
/// lines  $20 + $10 = $30, discount $5, net $25
/// shares prorate(20/30) = $16.67, prorate(30/30) − $16.67 = $8.33
/// ```
pub fn net_line_shares(net: Money, lines: &[(Money, i64)]) -> Vec<Money> {
    let by_value = lines.iter().any(|(total, _)| total.is_positive());
    let weights: Vec<i64> = lines
        .iter()
        .map(|(total, quantity)| if by_value { total.cents() } else { *quantity })
        .collect();
    let whole: i64 = weights.iter().sum();

    let mut cumulative = 0;
    let mut allotted = Money::zero();
    weights
        .iter()
        .map(|weight| {
            cumulative += weight;
            let upto = net.prorate(cumulative, whole);
            let share = upto - allotted;
            allotted = upto;
            share
        })
        .collect()
}

/// Value credited for returning `returning` units of a sale line.
///
/// `line_share` is the line's part of the sale's net total (see
/// [`net_line_shares`]). Prorates the cumulative returned quantity and
/// subtracts what earlier returns were already credited, so returning a
/// line piecemeal credits exactly its share once everything is back.
pub fn return_value(line_share: Money, quantity: i64, already_returned: i64, returning: i64) -> Money {
    line_share.prorate(already_returned + returning, quantity)
        - line_share.prorate(already_returned, quantity)
}

/// Amount of the sale DEBIT that cancellation still has to credit back.
///
/// Sales returns already credited part of the sale; never below zero.
pub fn cancellation_credit(sale_debit: Money, returned_value: Money) -> Money {
    let remaining = sale_debit - returned_value;
    if remaining.is_negative() {
        Money::zero()
    } else {
        remaining
    }
}

/// At-sale payment that cancellation hands back, net of refunds already
/// issued through sales returns. Never below zero.
pub fn cancellation_refund(at_sale_paid: Money, refunded: Money) -> Money {
    let remaining = at_sale_paid - refunded;
    if remaining.is_negative() {
        Money::zero()
    } else {
        remaining
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntrySource;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry(seq: i64, entry_type: PartyEntryType, amount: i64, running: i64) -> PartyLedgerEntry {
        PartyLedgerEntry {
            seq,
            id: format!("e-{seq}"),
            party_id: "p".to_string(),
            payment_id: None,
            transaction_id: None,
            entry_date: Utc::now(),
            description: "test".to_string(),
            entry_type,
            amount_cents: amount,
            running_balance_cents: running,
            source: EntrySource::Payment,
            actor_id: "u".to_string(),
        }
    }

    #[test]
    fn test_ensure_entry_amount() {
        assert!(ensure_entry_amount(Money::from_cents(1)).is_ok());
        assert!(matches!(
            ensure_entry_amount(Money::zero()),
            Err(CoreError::ZeroAmountEntry { amount_cents: 0 })
        ));
        assert!(ensure_entry_amount(Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_sale_totals_scenario() {
        // 5 × $10.00, paid $20.00
        let totals = SaleTotals::compute(
            [line_total(Money::from_cents(1000), 5, Money::zero()).unwrap()],
            Money::zero(),
            Money::zero(),
            Money::from_cents(2000),
        )
        .unwrap();
        assert_eq!(totals.net.cents(), 5000);
        assert_eq!(totals.balance.cents(), 3000);
        assert_eq!(totals.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_sale_totals_with_discount_and_tax() {
        let totals = SaleTotals::compute(
            [Money::from_cents(4000), Money::from_cents(1000)],
            Money::from_cents(500),
            Money::from_cents(250),
            Money::zero(),
        )
        .unwrap();
        assert_eq!(totals.subtotal.cents(), 5000);
        assert_eq!(totals.net.cents(), 4750);
        assert_eq!(totals.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let err = line_total(Money::from_cents(i64::MAX / 2), 3, Money::zero()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Overflow { .. })
        ));

        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert!(SaleTotals::compute([half, half], Money::zero(), Money::zero(), Money::zero()).is_err());
        assert!(apply_entry(Money::from_cents(i64::MAX), PartyEntryType::Debit, Money::from_cents(1)).is_err());
    }

    #[test]
    fn test_aggregate_demand_sums_same_key() {
        let demand = aggregate_demand([("p1", None, 2), ("p1", None, 3), ("p1", Some("v1"), 1)]);
        assert_eq!(demand[&("p1".to_string(), None)], 5);
        assert_eq!(demand[&("p1".to_string(), Some("v1".to_string()))], 1);
    }

    #[test]
    fn test_return_value_piecemeal_sums_to_line_total() {
        let line = Money::from_cents(1000);
        let first = return_value(line, 3, 0, 1);
        let second = return_value(line, 3, 1, 1);
        let third = return_value(line, 3, 2, 1);
        assert_eq!(first.cents(), 333);
        assert_eq!(second.cents(), 334);
        assert_eq!((first + second + third).cents(), 1000);
    }

    #[test]
    fn test_net_line_shares_spread_discount_and_tax() {
        // $20 + $10, discount $5 → net $25
        let shares = net_line_shares(
            Money::from_cents(2500),
            &[(Money::from_cents(2000), 2), (Money::from_cents(1000), 1)],
        );
        assert_eq!(shares, vec![Money::from_cents(1667), Money::from_cents(833)]);

        // tax only, net above subtotal
        let shares = net_line_shares(Money::from_cents(1100), &[(Money::from_cents(1000), 4)]);
        assert_eq!(shares, vec![Money::from_cents(1100)]);
    }

    #[test]
    fn test_net_line_shares_free_lines_split_by_quantity() {
        let shares = net_line_shares(
            Money::from_cents(90),
            &[(Money::zero(), 1), (Money::zero(), 2)],
        );
        assert_eq!(shares, vec![Money::from_cents(30), Money::from_cents(60)]);
    }

    #[test]
    fn test_cancellation_amounts_floor_at_zero() {
        assert_eq!(
            cancellation_credit(Money::from_cents(5000), Money::from_cents(2000)).cents(),
            3000
        );
        assert!(cancellation_credit(Money::from_cents(100), Money::from_cents(300)).is_zero());
        assert!(cancellation_refund(Money::from_cents(100), Money::from_cents(300)).is_zero());
    }

    #[test]
    fn test_reconcile_detects_drifted_snapshot() {
        let entries = vec![
            entry(1, PartyEntryType::Debit, 5000, 5000),
            entry(2, PartyEntryType::Credit, 2000, 2500),
        ];
        let report = reconcile(Money::from_cents(3000), &entries).unwrap();
        assert_eq!(report.replayed_cents, 3000);
        assert_eq!(report.mismatched_snapshots, 1);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_reconcile_empty_ledger() {
        let report = reconcile(Money::zero(), &[]).unwrap();
        assert!(report.is_consistent());
    }

    fn entry_type_strategy() -> impl Strategy<Value = PartyEntryType> {
        prop_oneof![Just(PartyEntryType::Debit), Just(PartyEntryType::Credit)]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// The final running balance equals the signed sum of all entries.
        #[test]
        fn replay_matches_signed_sum(
            entries in prop::collection::vec((entry_type_strategy(), 1i64..1_000_000i64), 0..50)
        ) {
            let entries: Vec<(PartyEntryType, Money)> = entries
                .into_iter()
                .map(|(t, a)| (t, Money::from_cents(a)))
                .collect();
            let running = replay_running_balances(entries.clone()).unwrap();
            let signed_sum: Money = entries.iter().map(|(t, a)| t.signed(*a)).sum();
            prop_assert_eq!(running.last().copied().unwrap_or_default(), signed_sum);
        }

        /// Appending an entry and its inverse leaves the balance unchanged.
        #[test]
        fn inverse_entry_cancels(
            start in -1_000_000i64..1_000_000i64,
            entry_type in entry_type_strategy(),
            amount in 1i64..1_000_000i64,
        ) {
            let start = Money::from_cents(start);
            let amount = Money::from_cents(amount);
            let after = apply_entry(start, entry_type, amount).unwrap();
            prop_assert_eq!(apply_entry(after, entry_type.inverse(), amount).unwrap(), start);
        }

        /// Exactly one payment status holds and it agrees with the balance.
        #[test]
        fn payment_status_agrees_with_balance(net in 0i64..1_000_000i64, paid in 0i64..1_000_000i64) {
            let settlement = Settlement::new(Money::from_cents(net), Money::from_cents(paid));
            match settlement.payment_status {
                PaymentStatus::Paid => prop_assert!(!settlement.balance.is_positive()),
                PaymentStatus::Partial => {
                    prop_assert!(settlement.balance.is_positive());
                    prop_assert!(paid > 0);
                }
                PaymentStatus::Unpaid => prop_assert_eq!(paid, 0),
            }
        }

        /// Returning a line in any split credits exactly the line total.
        #[test]
        fn piecemeal_returns_sum_to_line_total(
            line_total in 0i64..10_000_000i64,
            splits in prop::collection::vec(1i64..20i64, 1..8),
        ) {
            let quantity: i64 = splits.iter().sum();
            let line_total = Money::from_cents(line_total);
            let mut returned = 0;
            let mut credited = Money::zero();
            for returning in splits {
                credited += return_value(line_total, quantity, returned, returning);
                returned += returning;
            }
            prop_assert_eq!(credited, line_total);
        }

        /// Returning every unit of every line credits exactly the net total,
        /// whatever document discount and tax were applied.
        #[test]
        fn full_return_credits_net(
            lines in prop::collection::vec((0i64..100_000i64, 1i64..10i64), 1..6),
            discount_pct in 0i64..100i64,
            tax in 0i64..50_000i64,
        ) {
            let lines: Vec<(Money, i64)> = lines
                .into_iter()
                .map(|(total, quantity)| (Money::from_cents(total), quantity))
                .collect();
            let subtotal: Money = lines.iter().map(|(total, _)| *total).sum();
            let discount = subtotal.prorate(discount_pct, 100);
            let net = subtotal - discount + Money::from_cents(tax);

            let shares = net_line_shares(net, &lines);
            let credited: Money = shares
                .iter()
                .zip(&lines)
                .map(|(share, (_, quantity))| {
                    (0..*quantity)
                        .map(|returned| return_value(*share, *quantity, returned, 1))
                        .sum::<Money>()
                })
                .sum();
            prop_assert_eq!(credited, net);
        }
    }
}
