/*
[INPUT]:  Line items, tax, and currency edited by the cashier
[OUTPUT]: Cart totals and the minor-unit payload for the reader display
[POS]:    Domain layer - cart model
[UPDATE]: When cart fields or display conversion rules change
*/

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use terminal_pos_adapter::{DisplayCart, DisplayLineItem, ReaderDisplay};

use crate::error::{Result, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub unit_amount: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(description: impl Into<String>, unit_amount: Decimal, quantity: u32) -> Self {
        Self {
            description: description.into(),
            unit_amount,
            quantity,
        }
    }

    pub fn subtotal(&self) -> Result<Decimal> {
        self.unit_amount
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                WorkflowError::validation(format!(
                    "subtotal for '{}' is out of range",
                    self.description
                ))
            })
    }
}

/// Shopping cart. The total is always derived from the items and tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    line_items: Vec<LineItem>,
    tax_amount: Decimal,
    currency: String,
}

impl Cart {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            line_items: Vec::new(),
            tax_amount: Decimal::ZERO,
            currency: currency.into().trim().to_ascii_lowercase(),
        }
    }

    pub fn with_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn with_tax(mut self, tax_amount: Decimal) -> Self {
        self.tax_amount = tax_amount;
        self
    }

    pub fn push_item(&mut self, item: LineItem) {
        self.line_items.push(item);
    }

    pub fn remove_item(&mut self, index: usize) -> Option<LineItem> {
        (index < self.line_items.len()).then(|| self.line_items.remove(index))
    }

    pub fn set_tax_amount(&mut self, tax_amount: Decimal) {
        self.tax_amount = tax_amount;
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.currency = currency.into().trim().to_ascii_lowercase();
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Σ unit_amount × quantity + tax
    pub fn total_amount(&self) -> Result<Decimal> {
        self.line_items
            .iter()
            .try_fold(self.tax_amount, |total, item| {
                total
                    .checked_add(item.subtotal()?)
                    .ok_or_else(|| WorkflowError::validation("cart total is out of range"))
            })
    }

    pub fn total_minor_units(&self) -> Result<i64> {
        to_minor_units(self.total_amount()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.is_empty() {
            return Err(WorkflowError::validation("currency is required"));
        }
        if self.line_items.is_empty() {
            return Err(WorkflowError::validation("cart has no line items"));
        }
        for item in &self.line_items {
            if item.quantity == 0 {
                return Err(WorkflowError::validation(format!(
                    "quantity for '{}' must be at least 1",
                    item.description
                )));
            }
            if item.unit_amount.is_sign_negative() {
                return Err(WorkflowError::validation(format!(
                    "amount for '{}' must not be negative",
                    item.description
                )));
            }
        }
        if self.tax_amount.is_sign_negative() {
            return Err(WorkflowError::validation("tax amount must not be negative"));
        }
        self.total_minor_units()?;
        Ok(())
    }

    /// Cart payload for the reader screen, every amount in minor units
    pub fn to_reader_display(&self) -> Result<ReaderDisplay> {
        let line_items = self
            .line_items
            .iter()
            .map(|item| {
                Ok(DisplayLineItem {
                    description: item.description.clone(),
                    amount: to_minor_units(item.unit_amount)?,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ReaderDisplay::cart(DisplayCart {
            line_items,
            tax: to_minor_units(self.tax_amount)?,
            total: self.total_minor_units()?,
            currency: self.currency.clone(),
        }))
    }
}

/// Major units to minor units (×100), rounding half away from zero
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| WorkflowError::validation(format!("amount {amount} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn widget_cart() -> Cart {
        Cart::new("usd")
            .with_item(LineItem::new("Widget", dec!(10.00), 2))
            .with_tax(dec!(1.00))
    }

    #[rstest]
    #[case::single_item(&[(dec!(10.00), 2)], dec!(1.00), dec!(21.00))]
    #[case::no_tax(&[(dec!(3.99), 1), (dec!(0.01), 7)], dec!(0), dec!(4.06))]
    #[case::fractional_cents(&[(dec!(0.333), 3)], dec!(0.001), dec!(1.000))]
    #[case::many_items(&[(dec!(1.25), 4), (dec!(19.99), 1), (dec!(0), 9)], dec!(2.10), dec!(27.09))]
    #[case::free_items(&[(dec!(0), 1)], dec!(0), dec!(0))]
    fn test_total_is_items_plus_tax(
        #[case] items: &[(Decimal, u32)],
        #[case] tax: Decimal,
        #[case] expected: Decimal,
    ) {
        let cart = items
            .iter()
            .fold(Cart::new("usd").with_tax(tax), |cart, &(amount, quantity)| {
                cart.with_item(LineItem::new("Item", amount, quantity))
            });

        let summed = items
            .iter()
            .map(|&(amount, quantity)| amount * Decimal::from(quantity))
            .sum::<Decimal>()
            + tax;
        assert_eq!(cart.total_amount().expect("total"), expected);
        assert_eq!(summed, expected);
        assert_eq!(
            cart.total_minor_units().expect("minor units"),
            to_minor_units(expected).expect("minor units")
        );
    }

    #[test]
    fn test_overflowing_cart_is_rejected() {
        let cart = Cart::new("usd").with_item(LineItem::new("Big", Decimal::MAX, 2));

        assert!(cart.line_items()[0].subtotal().unwrap_err().is_validation());
        assert!(cart.total_amount().unwrap_err().is_validation());
        assert!(cart.total_minor_units().unwrap_err().is_validation());
        assert!(cart.validate().unwrap_err().is_validation());
        assert!(cart.to_reader_display().is_err());
    }

    #[test]
    fn test_total_too_large_for_minor_units_is_rejected() {
        let cart = Cart::new("usd").with_item(LineItem::new("Big", Decimal::from(i64::MAX), 1));

        assert!(cart.total_amount().is_ok());
        assert!(cart.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_total_follows_edits() {
        let mut cart = widget_cart();
        cart.push_item(LineItem::new("Cable", dec!(2.50), 3));
        assert_eq!(cart.total_amount().expect("total"), dec!(28.50));

        cart.set_tax_amount(dec!(0));
        assert_eq!(cart.total_amount().expect("total"), dec!(27.50));

        let removed = cart.remove_item(0).expect("removed");
        assert_eq!(removed.description, "Widget");
        assert_eq!(cart.total_amount().expect("total"), dec!(7.50));
        assert!(cart.remove_item(5).is_none());
    }

    #[test]
    fn test_display_amounts_are_minor_units() {
        let display = widget_cart().to_reader_display().expect("display");
        assert_eq!(display.kind, "cart");
        assert_eq!(display.cart.total, 2100);
        assert_eq!(display.cart.tax, 100);
        assert_eq!(display.cart.line_items[0].amount, 1000);
        assert_eq!(display.cart.line_items[0].quantity, 2);
        assert_eq!(display.cart.currency, "usd");
    }

    #[test]
    fn test_minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(0.005)).expect("round"), 1);
        assert_eq!(to_minor_units(dec!(19.994)).expect("round"), 1999);
        assert_eq!(to_minor_units(dec!(-0.015)).expect("round"), -2);
    }

    #[test]
    fn test_currency_is_normalized() {
        let cart = Cart::new(" CAD ");
        assert_eq!(cart.currency(), "cad");
    }

    #[test]
    fn test_validation_rejects_bad_carts() {
        assert!(Cart::new("usd").validate().unwrap_err().is_validation());
        assert!(
            Cart::new("")
                .with_item(LineItem::new("Widget", dec!(1), 1))
                .validate()
                .unwrap_err()
                .is_validation()
        );
        assert!(
            Cart::new("usd")
                .with_item(LineItem::new("Widget", dec!(1), 0))
                .validate()
                .unwrap_err()
                .is_validation()
        );
        assert!(
            Cart::new("usd")
                .with_item(LineItem::new("Widget", dec!(-1), 1))
                .validate()
                .unwrap_err()
                .is_validation()
        );
        assert!(widget_cart().validate().is_ok());
    }
}
