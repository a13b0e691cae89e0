//! Decimal input field state. The app owns it, the SDK provides the update
//! logic.
//!
//! A [`DecimalInput`] lets the user type through intermediate text (`"12."`,
//! `""`, `"."`) while editing and normalizes to a step-aligned value on
//! commit. Only committed values are handed to the amount codec.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::shared::step::{
    limit_fraction_digits, snap_text_to_step, snap_to_decimals, step_text, TextSnap,
};
use crate::shared::{to_chain_amount, ChainAmount};

/// Whether the field is being typed into or holds a normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    #[default]
    Editing,
    Committed,
}

/// Interactive state of one decimal input field (price, size, ...).
///
/// The app owns instances of this type (e.g. inside a UI signal) and forwards
/// change and blur events to it.
#[derive(Debug, Clone)]
pub struct DecimalInput {
    step: Decimal,
    decimals: u32,
    state: InputState,
    raw: String,
}

impl DecimalInput {
    /// A new, empty field in the `Editing` state.
    ///
    /// `step` must be positive and expressible with `decimals` digits.
    pub fn new(step: Decimal, decimals: u32) -> Self {
        Self {
            step,
            decimals,
            state: InputState::Editing,
            raw: String::new(),
        }
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    /// Smallest value the field commits to: one step at `decimals`.
    pub fn min_value(&self) -> Decimal {
        snap_to_decimals(self.step, self.decimals)
    }

    /// Store the user's text verbatim and enter `Editing`.
    pub fn on_change(&mut self, raw: &str) {
        self.raw = raw.to_string();
        self.state = InputState::Editing;
    }

    /// Normalize the current text and enter `Committed`.
    ///
    /// Empty text, a bare `"."`, non-numeric text and anything below one step
    /// commit to exactly one step; everything else is snapped to the nearest
    /// step. The committed value is never zero and always carries exactly
    /// `decimals` fractional digits.
    ///
    /// Snapping is done on integer units, so every typed digit counts however
    /// long the number is. Numbers beyond 256 bits commit to the largest step
    /// multiple.
    pub fn on_commit(&mut self) -> &str {
        let value = self.normalize();
        tracing::debug!("Committed '{}' as {}", self.raw, value);
        self.raw = value;
        self.state = InputState::Committed;
        &self.raw
    }

    /// Current field text: the raw text while editing, the normalized value
    /// once committed.
    pub fn value(&self) -> &str {
        &self.raw
    }

    /// Text to render in the field. While editing, fractional digits beyond
    /// `decimals` are truncated for display only; commit still rounds from
    /// the full text.
    pub fn display_value(&self) -> String {
        match self.state {
            InputState::Editing => limit_fraction_digits(&self.raw, self.decimals),
            InputState::Committed => self.raw.clone(),
        }
    }

    /// The committed string, `None` while editing.
    pub fn committed(&self) -> Option<&str> {
        match self.state {
            InputState::Committed => Some(&self.raw),
            InputState::Editing => None,
        }
    }

    /// The committed value as a `Decimal`. `None` while editing, or if the
    /// value is beyond `Decimal`'s range. Digits past its 28-digit mantissa
    /// are rounded; use [`committed`](Self::committed) for the exact text.
    pub fn committed_decimal(&self) -> Option<Decimal> {
        self.committed()
            .and_then(|value| Decimal::from_str(value).ok())
    }

    /// Chain amount of the committed value; `None` while editing.
    pub fn to_chain_amount(&self, precision: u8) -> Option<ChainAmount> {
        self.committed()
            .map(|value| to_chain_amount(value, precision))
    }

    /// Whether the user left the field empty. Check this before committing:
    /// a committed field is never empty.
    pub fn is_empty(&self) -> bool {
        let trimmed = self.raw.trim();
        trimmed.is_empty() || trimmed == "."
    }

    pub fn reset(&mut self) {
        self.raw.clear();
        self.state = InputState::Editing;
    }

    fn normalize(&self) -> String {
        let min = step_text(self.step, self.decimals);
        if self.is_empty() {
            return min;
        }

        match snap_text_to_step(&self.raw, self.step, self.decimals) {
            TextSnap::Snapped(value) => value,
            TextSnap::BelowStep => {
                tracing::debug!("Input '{}' below one step {}", self.raw, self.step);
                min
            }
            TextSnap::NotNumeric => {
                tracing::debug!("Non-numeric input '{}'", self.raw);
                min
            }
        }
    }
}
