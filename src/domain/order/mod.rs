//! Order draft: the price and size inputs of the order form, and their
//! conversion to chain amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::MarketPrecision;
use crate::error::OrderError;
use crate::input::DecimalInput;
use crate::shared::{to_chain_amount, to_chain_price, ChainAmount, Side};

// ─── ScaledOrder ─────────────────────────────────────────────────────────────

/// Chain amounts for a committed order draft.
///
/// | Side | amount_in (gives) | amount_out (receives) |
/// |------|-------------------|-----------------------|
/// | Bid  | quote_amount      | base_amount           |
/// | Ask  | base_amount       | quote_amount          |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaledOrder {
    pub side: Side,
    pub price: ChainAmount,
    pub base_amount: ChainAmount,
    pub quote_amount: ChainAmount,
    pub amount_in: ChainAmount,
    pub amount_out: ChainAmount,
}

// ─── OrderDraft ──────────────────────────────────────────────────────────────

/// Price and size inputs of one market's order form.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    market: MarketPrecision,
    pub price: DecimalInput,
    pub size: DecimalInput,
}

impl OrderDraft {
    pub fn new(market: MarketPrecision) -> Self {
        let price = market.price_input();
        let size = market.size_input();
        Self { market, price, size }
    }

    pub fn market(&self) -> &MarketPrecision {
        &self.market
    }

    pub fn is_committed(&self) -> bool {
        self.price.committed().is_some() && self.size.committed().is_some()
    }

    /// Convert the committed price and size into chain amounts.
    ///
    /// ```text
    /// base_amount  = size          at base_precision
    /// quote_amount = price * size  at quote_precision (truncated)
    /// ```
    pub fn scale(&self, side: Side) -> Result<ScaledOrder, OrderError> {
        let price_text = self
            .price
            .committed()
            .ok_or(OrderError::Uncommitted { field: "price" })?;
        let size_text = self
            .size
            .committed()
            .ok_or(OrderError::Uncommitted { field: "size" })?;
        let price_value = self
            .price
            .committed_decimal()
            .ok_or_else(|| OrderError::Overflow {
                context: "price beyond Decimal range".to_string(),
            })?;
        let size_value = self
            .size
            .committed_decimal()
            .ok_or_else(|| OrderError::Overflow {
                context: "size beyond Decimal range".to_string(),
            })?;

        let notional: Decimal =
            price_value
                .checked_mul(size_value)
                .ok_or_else(|| OrderError::Overflow {
                    context: "price * size".to_string(),
                })?;

        let price = to_chain_price(price_text, &self.market);
        let base_amount = to_chain_amount(size_text, self.market.base_precision);
        let quote_amount = to_chain_amount(&notional.to_string(), self.market.quote_precision);

        if base_amount.is_zero() {
            return Err(OrderError::ZeroAmount { field: "base" });
        }
        if quote_amount.is_zero() {
            return Err(OrderError::ZeroAmount { field: "quote" });
        }

        let (amount_in, amount_out) = match side {
            Side::Bid => (quote_amount, base_amount),
            Side::Ask => (base_amount, quote_amount),
        };

        Ok(ScaledOrder {
            side,
            price,
            base_amount,
            quote_amount,
            amount_in,
            amount_out,
        })
    }

    pub fn reset(&mut self) {
        self.price.reset();
        self.size.reset();
    }
}
