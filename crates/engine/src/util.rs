//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so every entity converts the same way.

use uuid::Uuid;

use crate::{EngineError, MoneyCents, Period, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|raw| parse_uuid(raw, label)).transpose()
}

/// Rebuild a period from the `year`/`month` columns.
pub(crate) fn model_period(year: i32, month: i32) -> ResultEngine<Period> {
    let month = u32::try_from(month)
        .map_err(|_| EngineError::InvalidPeriod(format!("invalid stored month {month}")))?;
    Period::new(year, month)
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Largest single amount the ledger accepts: one trillion, in cents.
pub(crate) const MAX_AMOUNT: MoneyCents = MoneyCents::new(100_000_000_000_000);

/// Amounts are unsigned in the ledger; the kind carries the direction.
pub(crate) fn ensure_positive_amount(amount: MoneyCents) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be > 0, got {amount}"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be <= {MAX_AMOUNT}, got {amount}"
        )));
    }
    Ok(())
}
