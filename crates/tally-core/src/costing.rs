//! # Costing Module
//!
//! The two pure calculations behind the inventory recorder and the sale
//! builder: weighted-average purchase cost and sale totals.
//!
//! Both are deterministic cent arithmetic; the database layer calls them
//! inside its transactions and persists whatever they return.

use crate::money::{Money, TaxRate};

// =============================================================================
// Weighted-Average Cost
// =============================================================================

/// Recomputes a product's purchase cost after receiving a batch.
///
/// ## Formula
/// ```text
/// new_avg = (stock * purchase_price + quantity * unit_price)
///           / (stock + quantity)
/// ```
/// rounded half-up to the cent, once, after the division.
///
/// Degenerate case: if the resulting total quantity is not positive the
/// incoming unit price is taken directly.
///
/// ## Example
/// ```rust
/// use tally_core::costing::weighted_average_cost;
/// use tally_core::money::Money;
///
/// // 10 on hand at $5.00, receiving 10 at $7.00 -> $6.00
/// let avg = weighted_average_cost(10, Money::from_cents(500), 10, Money::from_cents(700));
/// assert_eq!(avg.cents(), 600);
/// ```
///
/// ## Note on drift
/// Repeated averaging rounds each step; `purchase_price * stock` can
/// drift a few cents from the exact ledger sum over many receipts. That
/// drift is accepted, not reconciled.
pub fn weighted_average_cost(
    stock: i64,
    purchase_price: Money,
    quantity: i64,
    unit_price: Money,
) -> Money {
    let total_quantity = stock + quantity;
    if total_quantity <= 0 {
        return unit_price;
    }

    // i128 keeps stock * price exact for any realistic inventory value.
    let current_value = stock as i128 * purchase_price.cents() as i128;
    let incoming_value = quantity as i128 * unit_price.cents() as i128;
    let average = (current_value + incoming_value + total_quantity as i128 / 2)
        / total_quantity as i128;

    Money::from_cents(average as i64)
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Subtotal, tax and grand total of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes sale totals from line totals.
///
/// `tax = apply_tax ? subtotal * rate : 0`, `total = subtotal + tax`.
/// The tax rate comes from the caller (settings are read outside the
/// transaction), never from ambient state.
///
/// ## Example
/// ```rust
/// use tally_core::costing::sale_totals;
/// use tally_core::money::{Money, TaxRate};
///
/// // 2 x $10.00 + 1 x $5.00 at 15% tax
/// let totals = sale_totals(
///     &[Money::from_cents(2000), Money::from_cents(500)],
///     TaxRate::from_bps(1500),
///     true,
/// );
/// assert_eq!(totals.subtotal.cents(), 2500);
/// assert_eq!(totals.tax.cents(), 375);
/// assert_eq!(totals.total.cents(), 2875);
/// ```
pub fn sale_totals(line_totals: &[Money], tax_rate: TaxRate, apply_tax: bool) -> SaleTotals {
    let subtotal = line_totals
        .iter()
        .fold(Money::zero(), |acc, line| acc + *line);

    let tax = if apply_tax {
        subtotal.calculate_tax(tax_rate)
    } else {
        Money::zero()
    };

    SaleTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
