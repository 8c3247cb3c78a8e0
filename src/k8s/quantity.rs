//! Kubernetes quantity parsing
//!
//! `k8s-openapi` carries quantities as opaque strings. Values coming from user
//! traits are validated here before they are placed on a workload, so a typo
//! such as `"512MB"` fails the apply instead of the later cluster write.

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const BINARY_SUFFIXES: &[&str] = &["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: &[&str] = &["m", "", "k", "M", "G", "T", "P", "E"];

/// Parse a quantity string (e.g., "500m", "1Gi", "1e3") into a [`Quantity`]
///
/// `field` names the trait field for error messages. Negative quantities are
/// rejected because every quantity a trait can carry is a size or a limit.
pub fn parse_quantity(field: &str, raw: &str) -> Result<Quantity> {
    let s = raw.trim();
    let invalid = |reason: &str| Error::InvalidQuantity {
        field: field.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if s.is_empty() {
        return Err(invalid("empty quantity string"));
    }

    let unsigned = match s.as_bytes()[0] {
        b'-' => return Err(invalid("quantity must not be negative")),
        b'+' => &s[1..],
        _ => s,
    };

    // Find where the number ends and the suffix begins
    let num_end = unsigned
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(unsigned.len());

    let (number, suffix) = unsigned.split_at(num_end);
    validate_number(number).map_err(|reason| invalid(reason))?;
    validate_suffix(suffix).map_err(|reason| invalid(&reason))?;

    Ok(Quantity(s.to_string()))
}

fn validate_number(number: &str) -> std::result::Result<(), &'static str> {
    if number.is_empty() || number == "." {
        return Err("missing numeric value");
    }
    if number.matches('.').count() > 1 {
        return Err("more than one decimal point");
    }
    Ok(())
}

fn validate_suffix(suffix: &str) -> std::result::Result<(), String> {
    if BINARY_SUFFIXES.contains(&suffix) || DECIMAL_SUFFIXES.contains(&suffix) {
        return Ok(());
    }

    // Decimal exponent form: e<signed integer> / E<signed integer>
    if let Some(exponent) = suffix.strip_prefix(['e', 'E']) {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(());
        }
    }

    Err(format!("unknown suffix: {}", suffix))
}
