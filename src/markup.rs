//! Chat-markup helpers: HTML escaping, unit formatting, and the hard
//! message-size paginator.

use anyhow::{bail, Result};

use crate::registry::SATS_PER_XEC;

/// Platform ceiling for one message.
pub const MSG_CEILING: usize = 4096;

/// Budgeted overhead per line break when joining lines into a message.
pub const LINE_BREAK_OVERHEAD: usize = 2;

/// Escapes the three markup-reserved characters. Applied to every
/// user-controlled substring before insertion into a message.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inserts thousands separators into a non-negative integer.
fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders satoshis as XEC with thousands separators, dropping the
/// fractional part when it is zero.
pub fn format_xec(sats: i64) -> String {
    let sats = sats.max(0) as u128;
    let whole = sats / SATS_PER_XEC as u128;
    let frac = sats % SATS_PER_XEC as u128;
    if frac == 0 {
        group_thousands(whole)
    } else {
        format!("{}.{:02}", group_thousands(whole), frac)
    }
}

/// Fiat value of a satoshi amount at the given XEC price.
pub fn format_fiat(sats: i64, usd_per_xec: f64) -> String {
    let usd = (sats.max(0) as f64 / SATS_PER_XEC as f64) * usd_per_xec;
    if usd >= 1.0 {
        format!("${:.2}", usd)
    } else {
        format!("${:.5}", usd)
    }
}

/// Decimalizes a token atom count with the genesis decimal count, trimming
/// trailing zeros.
pub fn decimalize(atoms: u128, decimals: u32) -> String {
    if decimals == 0 {
        return group_thousands(atoms);
    }
    let scale = 10u128.pow(decimals);
    let whole = atoms / scale;
    let frac = atoms % scale;
    if frac == 0 {
        return group_thousands(whole);
    }
    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", group_thousands(whole), trimmed)
}

/// Splits lines into message batches, each at most [`MSG_CEILING`] chars
/// budgeting [`LINE_BREAK_OVERHEAD`] per line. A single line above the
/// ceiling is a contract violation and errors out rather than truncating.
pub fn paginate(lines: &[String]) -> Result<Vec<String>> {
    let mut batches = Vec::new();
    let mut batch: Vec<&str> = Vec::new();
    let mut budget = 0usize;
    for line in lines {
        let cost = line.chars().count() + LINE_BREAK_OVERHEAD;
        if cost > MSG_CEILING {
            bail!(
                "single line of {} chars exceeds the {MSG_CEILING} char message ceiling",
                line.chars().count()
            );
        }
        if budget + cost > MSG_CEILING && !batch.is_empty() {
            batches.push(batch.join("\n"));
            batch = Vec::new();
            budget = 0;
        }
        budget += cost;
        batch.push(line);
    }
    if !batch.is_empty() {
        batches.push(batch.join("\n"));
    }
    Ok(batches)
}
