//! USD ↔ local currency conversion
//!
//! Pure functions over an optional rate. An unknown rate, or an amount that is
//! not a finite non-negative number, always converts to `0`.

use crate::format::format_number;

/// USD amounts listed in the conversion table
pub const TABLE_AMOUNTS: [u32; 10] = [1, 5, 10, 20, 50, 100, 200, 500, 1000, 5000];

/// How the swap action treats the two converter fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapMode {
    /// Each field keeps its unit: the USD field receives the local amount valued in
    /// USD and the local field receives the USD amount valued in local currency
    #[default]
    Unit,
    /// The local amount becomes the new USD principal and the local field is
    /// recomputed from it, as the browser widget does
    Legacy,
}

/// One row of the conversion table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub usd: u32,
    pub local: f64,
}

impl TableRow {
    /// `$1,000`
    pub fn usd_display(&self) -> String {
        format!("${}", format_number(f64::from(self.usd), 0))
    }

    /// `L 24,700.00`
    pub fn local_display(&self) -> String {
        format!("L {}", format_number(self.local, 2))
    }
}

/// Converter bound to the current rate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Converter {
    rate: Option<f64>,
}

impl Converter {
    /// Creates a converter; a non-positive or non-finite rate counts as unknown
    pub fn new(rate: Option<f64>) -> Self {
        Self {
            rate: rate.filter(|r| r.is_finite() && *r > 0.0),
        }
    }

    /// Whether conversion is possible at all
    pub fn is_available(&self) -> bool {
        self.rate.is_some()
    }

    /// Local currency for `amount` USD
    pub fn usd_to_local(&self, amount: f64) -> f64 {
        match (self.rate, valid_amount(amount)) {
            (Some(rate), Some(amount)) => amount * rate,
            _ => 0.0,
        }
    }

    /// USD for `amount` local currency
    pub fn local_to_usd(&self, amount: f64) -> f64 {
        match (self.rate, valid_amount(amount)) {
            (Some(rate), Some(amount)) => amount / rate,
            _ => 0.0,
        }
    }

    /// New text for the local field after the USD field changed
    ///
    /// Returns `None` when the rate is unknown (leave the field alone), an empty
    /// string when the input is not a positive amount.
    pub fn usd_input_changed(&self, usd_text: &str) -> Option<String> {
        self.rate?;
        let amount = parse_amount(usd_text);
        if amount > 0.0 {
            Some(format_number(self.usd_to_local(amount), 2))
        } else {
            Some(String::new())
        }
    }

    /// New text for the USD field after the local field changed
    pub fn local_input_changed(&self, local_text: &str) -> Option<String> {
        self.rate?;
        let amount = parse_amount(local_text);
        if amount > 0.0 {
            Some(format_number(self.local_to_usd(amount), 2))
        } else {
            Some(String::new())
        }
    }

    /// New `(usd, local)` field texts after a swap
    ///
    /// Returns `None` when the rate is unknown or neither field holds a positive amount.
    pub fn swap(&self, usd_text: &str, local_text: &str, mode: SwapMode) -> Option<(String, String)> {
        self.rate?;
        let usd = parse_amount(usd_text);
        let local = parse_amount(local_text);
        if usd <= 0.0 && local <= 0.0 {
            return None;
        }

        let swapped = match mode {
            SwapMode::Unit => (self.local_to_usd(local), self.usd_to_local(usd)),
            SwapMode::Legacy => (valid_amount(local).unwrap_or(0.0), self.usd_to_local(local)),
        };
        Some((format_number(swapped.0, 2), format_number(swapped.1, 2)))
    }

    /// The fixed USD ladder converted at the current rate; empty when the rate is unknown
    pub fn conversion_table(&self) -> Vec<TableRow> {
        if !self.is_available() {
            return Vec::new();
        }
        TABLE_AMOUNTS
            .iter()
            .map(|&usd| TableRow {
                usd,
                local: self.usd_to_local(f64::from(usd)),
            })
            .collect()
    }
}

fn valid_amount(amount: f64) -> Option<f64> {
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Reads an amount typed by the user
///
/// Thousands separators are ignored and the longest numeric prefix is used, so
/// `"1,250.5 USD"` reads as `1250.5`. Text without a leading number reads as `0`.
pub fn parse_amount(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|&c| c != ',').collect();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }
    cleaned[..end].parse().unwrap_or(0.0)
}
