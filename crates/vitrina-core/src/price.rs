//! Price parsing and display formatting.
//!
//! Backend prices are locale-ambiguous strings. The storefront follows the
//! Latin-American convention throughout: `.` groups thousands and `,` marks
//! decimals. That means a dotted string is never read as a decimal:
//! `"19.000"` is nineteen thousand and `"19.99"` is `1999`. Numeric inputs
//! are taken as-is.
//!
//! Display strings are integer-rounded, dot-grouped and prefixed with the
//! currency code, e.g. `"COP 19.000"`. Formatting always re-parses its input,
//! so `format(format(x)) == format(x)`.

use thiserror::Error;

use crate::products::PriceValue;

/// Currency code used when none is configured.
pub const DEFAULT_CURRENCY_CODE: &str = "COP";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceParseError {
    #[error("price is empty")]
    Empty,

    #[error("price \"{raw}\" is not a number")]
    Invalid { raw: String },

    #[error("price \"{raw}\" is not a finite number")]
    NonFinite { raw: String },
}

/// Parses and formats prices for one display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceNormalizer {
    currency_code: String,
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_CODE)
    }
}

impl PriceNormalizer {
    #[must_use]
    pub fn new(currency_code: &str) -> Self {
        Self {
            currency_code: currency_code.trim().to_uppercase(),
        }
    }

    #[must_use]
    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    /// Parses a price into its canonical numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`PriceParseError`] when the value cannot be interpreted.
    /// Rendering code should use [`Self::parse_or_zero`] instead.
    pub fn parse(&self, input: &PriceValue) -> Result<f64, PriceParseError> {
        match input {
            PriceValue::Numeric(n) if n.is_finite() => Ok(*n),
            PriceValue::Numeric(n) => Err(PriceParseError::NonFinite { raw: n.to_string() }),
            PriceValue::Raw(raw) => parse_price_str(raw),
        }
    }

    /// Parses a price, substituting `0` (and logging a warning) for absent
    /// or unparseable input.
    #[must_use]
    pub fn parse_or_zero(&self, input: Option<&PriceValue>) -> f64 {
        let Some(input) = input else {
            return 0.0;
        };
        self.parse(input).unwrap_or_else(|e| {
            tracing::warn!(price = ?input, error = %e, "unparseable price, using 0");
            0.0
        })
    }

    /// Formats a price for display. Absent input renders as zero.
    #[must_use]
    pub fn format(&self, input: Option<&PriceValue>) -> String {
        self.format_amount(self.parse_or_zero(input))
    }

    /// Formats an already-canonical amount for display.
    #[must_use]
    pub fn format_amount(&self, amount: f64) -> String {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let rounded = amount.round();
        let sign = if rounded < 0.0 { "-" } else { "" };
        let digits = format!("{:.0}", rounded.abs());
        format!("{} {sign}{}", self.currency_code, group_thousands(&digits))
    }
}

/// Parses a source-formatted price string.
///
/// Steps, in order:
/// 1. strip currency tokens (letters, `$`) and whitespace at either end;
/// 2. drop every `.` (thousands separator);
/// 3. if the last `,` sits within the final three characters it is a decimal
///    comma, otherwise every `,` is a thousands separator;
/// 4. parse what remains as a float.
///
/// # Errors
///
/// Returns [`PriceParseError`] when nothing numeric remains.
pub fn parse_price_str(raw: &str) -> Result<f64, PriceParseError> {
    let stripped =
        raw.trim_matches(|c: char| c.is_alphabetic() || c == '$' || c.is_whitespace());
    if stripped.is_empty() {
        return Err(PriceParseError::Empty);
    }

    // Internal spaces (including NBSP) show up as group separators too.
    let compact: String = stripped
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect();

    let normalized = match compact.rfind(',') {
        Some(pos) if compact.len() - pos - 1 <= 2 => {
            let (int_part, frac_part) = compact.split_at(pos);
            format!("{}.{}", int_part.replace(',', ""), &frac_part[1..])
        }
        Some(_) => compact.replace(',', ""),
        None => compact,
    };

    let value = normalized
        .parse::<f64>()
        .map_err(|_| PriceParseError::Invalid {
            raw: raw.to_owned(),
        })?;
    if !value.is_finite() {
        return Err(PriceParseError::NonFinite {
            raw: raw.to_owned(),
        });
    }
    Ok(value)
}

/// Inserts `.` between every group of three digits, counting from the right.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
