use std::collections::BTreeMap;

use time::{macros::format_description, OffsetDateTime};
use tracing::error;

use crate::error::AppError;

/// Log an error and hand it back, for use in `map_err`.
pub fn handle_error(err: AppError) -> AppError {
    error!(error = %err, "operation failed");
    err
}

fn parse_query(params: &str) -> BTreeMap<String, String> {
    let params = params.strip_prefix('?').unwrap_or(params);
    serde_urlencoded::from_str::<Vec<(String, String)>>(params)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

fn stringify_url(pathname: &str, query: &BTreeMap<String, String>) -> String {
    if query.is_empty() {
        return pathname.to_string();
    }
    let encoded = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{pathname}?{encoded}")
}

/// Set `key` in the query string `params` and render it onto `pathname`.
/// A `None` value drops the key. Keys come out sorted.
pub fn form_url_query(params: &str, key: &str, value: Option<&str>, pathname: &str) -> String {
    let mut query = parse_query(params);
    match value {
        Some(v) => {
            query.insert(key.to_string(), v.to_string());
        }
        None => {
            query.remove(key);
        }
    }
    stringify_url(pathname, &query)
}

pub fn remove_keys_from_query(params: &str, keys_to_remove: &[&str], pathname: &str) -> String {
    let mut query = parse_query(params);
    for key in keys_to_remove {
        query.remove(*key);
    }
    stringify_url(pathname, &query)
}

/// Longest leading numeric prefix of `input`, read like JavaScript's
/// `parseFloat`: `"10 USD"` is 10, `"free"` is NaN.
fn parse_leading_float(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

/// Rounds a plain decimal string (no exponent) half-up to two fraction
/// digits, returning the integer and fraction parts.
fn round_to_cents(plain: &str) -> (String, String) {
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain, ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .collect();
    let round_up = frac_part.as_bytes().get(2).is_some_and(|d| *d >= b'5');

    if round_up {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - 2;
    let whole = String::from_utf8_lossy(&digits[..split]).into_owned();
    let cents = String::from_utf8_lossy(&digits[split..]).into_owned();
    (whole, cents)
}

/// en-US USD rendering, e.g. `$1,234.50`.
pub fn format_price(price: &str) -> String {
    let amount = parse_leading_float(price);
    if amount.is_nan() {
        return "$NaN".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    if amount.is_infinite() {
        return format!("{sign}$∞");
    }

    // `Display` gives the shortest round-trip digits without an exponent.
    let (whole, cents) = round_to_cents(&amount.abs().to_string());
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if whole == "0" && cents == "00" { "" } else { sign };
    format!("{sign}${grouped}.{cents}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDateTime {
    pub date_time: String,
    pub date_only: String,
    pub time_only: String,
}

pub fn format_date_time(value: OffsetDateTime) -> FormattedDateTime {
    let date_time = format_description!(
        "[weekday repr:short], [month repr:short] [day padding:none], [hour repr:12 padding:none]:[minute] [period]"
    );
    let date_only = format_description!(
        "[weekday repr:short], [month repr:short] [day padding:none], [year]"
    );
    let time_only = format_description!("[hour repr:12 padding:none]:[minute] [period]");

    FormattedDateTime {
        date_time: value.format(date_time).unwrap_or_default(),
        date_only: value.format(date_only).unwrap_or_default(),
        time_only: value.format(time_only).unwrap_or_default(),
    }
}
