//! Derived metrics and message rendering
//!
//! Everything here is pure. Derived metrics are computed on raw values; the
//! `format_*` helpers apply the display rounding.
//!
//! ## Rounding
//!
//! All display rounding is round-half-away-from-zero on the decimal-scaled
//! value (`f64::round`). Percentages keep 4 decimals, money keeps 2, prices
//! keep 5.

use std::time::Duration;

use num_format::{Locale, ToFormattedString};

use crate::detector::supply_delta;
use crate::types::{Alert, Snapshot};

pub const PERCENT_DECIMALS: u32 = 4;
pub const MONEY_DECIMALS: u32 = 2;
pub const PRICE_DECIMALS: u32 = 5;

/// Rounds `value` to `decimals` places, ties away from zero
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Share of `max_supply` already issued, in percent
pub fn percent_of_max(supply: u64, max_supply: u64) -> f64 {
    if max_supply == 0 {
        return 0.0;
    }
    100.0 * supply as f64 / max_supply as f64
}

/// Computes the derived metrics for a supply change
pub fn build_alert(
    supply: u64,
    previous_supply: u64,
    price: f64,
    max_supply: u64,
    elapsed: Option<Duration>,
) -> Alert {
    let delta = supply_delta(supply, previous_supply);
    Alert {
        supply,
        previous_supply,
        price,
        delta,
        percent_of_max: percent_of_max(supply, max_supply),
        market_cap: supply as f64 * price,
        cap_growth: delta as f64 * price,
        elapsed,
    }
}

/// Computes the figures shown by the on-demand report
pub fn build_snapshot(supply: u64, price: f64, max_supply: u64) -> Snapshot {
    Snapshot {
        supply,
        price,
        percent_of_max: percent_of_max(supply, max_supply),
        market_cap: supply as f64 * price,
    }
}

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Signed change with separators: `+1,000`, `-1,000`
pub fn format_delta(delta: i64) -> String {
    let magnitude = delta.unsigned_abs().to_formatted_string(&Locale::en);
    match delta.signum() {
        1 => format!("+{magnitude}"),
        -1 => format!("-{magnitude}"),
        _ => magnitude,
    }
}

pub fn format_percent(value: f64) -> String {
    format!(
        "{:.*}",
        PERCENT_DECIMALS as usize,
        round_to(value, PERCENT_DECIMALS)
    )
}

/// Monetary amount with separators and currency, e.g. `$1,234.50` or
/// `-$5.00`; non-USD currencies are suffixed (`1,234.50 EUR`)
pub fn format_money(value: f64, currency: &str) -> String {
    with_currency(value, MONEY_DECIMALS, currency)
}

/// Unit price with five decimals, e.g. `$0.01000`
pub fn format_price(value: f64, currency: &str) -> String {
    with_currency(value, PRICE_DECIMALS, currency)
}

fn with_currency(value: f64, decimals: u32, currency: &str) -> String {
    let rounded = round_to(value, decimals);
    let sign = if rounded < 0.0 { "-" } else { "" };
    let body = grouped_fixed(rounded.abs(), decimals);
    if currency.eq_ignore_ascii_case("USD") {
        format!("{sign}${body}")
    } else {
        format!("{sign}{body} {currency}")
    }
}

/// Fixed-point rendering of a non-negative, already rounded value with
/// thousands separators on the integer part
fn grouped_fixed(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value);
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut out = match whole.parse::<u64>() {
        Ok(n) => n.to_formatted_string(&Locale::en),
        Err(_) => whole.to_string(),
    };
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `1h 2m 3s`, `2m 3s` or `3s`; `—` when there is no previous change
pub fn format_elapsed(elapsed: Option<Duration>) -> String {
    let Some(elapsed) = elapsed else {
        return "—".to_string();
    };
    let total = elapsed.as_secs();
    let (hours, mins, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Alert text sent to the notification channel
pub fn render_alert(alert: &Alert, symbol: &str, currency: &str) -> String {
    format!(
        "📢 {symbol} supply update\n\
         🟢 Issued: {supply} tokens ({delta})\n\
         {percent}% of max supply\n\
         💲 Price: {price}\n\
         🏦 Market cap: {cap}\n\
         💰 Cap growth: {growth}\n\
         ⏱️ Since last change: {elapsed}",
        supply = format_count(alert.supply),
        delta = format_delta(alert.delta),
        percent = format_percent(alert.percent_of_max),
        price = format_price(alert.price, currency),
        cap = format_money(alert.market_cap, currency),
        growth = format_money(alert.cap_growth, currency),
        elapsed = format_elapsed(alert.elapsed),
    )
}

/// Reply to the on-demand report command
pub fn render_report(snapshot: &Snapshot, symbol: &str, currency: &str) -> String {
    format!(
        "📊 {symbol} report\n\
         Issued: {supply} tokens\n\
         {percent}% of max supply\n\
         💲 Price: {price}\n\
         🏦 Market cap: {cap}",
        supply = format_count(snapshot.supply),
        percent = format_percent(snapshot.percent_of_max),
        price = format_price(snapshot.price, currency),
        cap = format_money(snapshot.market_cap, currency),
    )
}
