//! Market precision: how many decimals each side of a market carries on
//! chain and which steps its price and size inputs snap to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::input::DecimalInput;

// ─── MarketPrecision ─────────────────────────────────────────────────────────

/// Per-market precision configuration.
///
/// `tick_size` and `lot_size` serialize as strings so JSON config files keep
/// them exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrecision {
    /// Chain decimals of the base asset.
    pub base_precision: u8,
    /// Chain decimals of the quote asset.
    pub quote_precision: u8,
    /// Chain decimals of a price.
    pub price_precision: u8,
    /// Price step.
    pub tick_size: Decimal,
    /// Size step.
    pub lot_size: Decimal,
}

impl MarketPrecision {
    /// Check the steps are positive and expressible at chain precision.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_step(self.tick_size, self.price_precision)?;
        validate_step(self.lot_size, self.base_precision)?;
        Ok(())
    }

    /// Display decimals of the price input: the digits the tick size needs.
    pub fn price_decimals(&self) -> u32 {
        self.tick_size.normalize().scale()
    }

    /// Display decimals of the size input: the digits the lot size needs.
    pub fn size_decimals(&self) -> u32 {
        self.lot_size.normalize().scale()
    }

    /// A fresh price input snapping to `tick_size`.
    pub fn price_input(&self) -> DecimalInput {
        DecimalInput::new(self.tick_size, self.price_decimals())
    }

    /// A fresh size input snapping to `lot_size`.
    pub fn size_input(&self) -> DecimalInput {
        DecimalInput::new(self.lot_size, self.size_decimals())
    }
}

fn validate_step(step: Decimal, precision: u8) -> Result<(), ConfigError> {
    if step <= Decimal::ZERO {
        return Err(ConfigError::NonPositiveStep {
            step: step.to_string(),
        });
    }
    if step.normalize().scale() > precision as u32 {
        return Err(ConfigError::StepPrecision {
            step: step.to_string(),
            decimals: precision,
        });
    }
    Ok(())
}
