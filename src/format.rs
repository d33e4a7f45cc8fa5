//! Formatting of values for display.
//!
//! `format_value` is also what the table engine matches search and filter
//! terms against, so what is searched is always what is shown.

use chrono::{NaiveDateTime, NaiveTime};
use ratatui::style::Color;

use crate::table::Value;

/// Fraction digits shown for plain numbers
const DEFAULT_MAX_DECIMALS: usize = 3;

pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => group_digits(*n, DEFAULT_MAX_DECIMALS, true),
        Value::Text(s) => s.clone(),
        Value::Date(d) => format_iso(d),
    }
}

/// `2024-01-15` for midnight, `2024-01-15 14:30:00` otherwise.
pub fn format_iso(date: &NaiveDateTime) -> String {
    if date.time() == NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Number with thousands separators and exactly `decimals` fraction digits.
pub fn format_number(value: f64, decimals: usize) -> String {
    group_digits(value, decimals, false)
}

pub fn format_percentage(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

fn group_digits(value: f64, decimals: usize, trim_zeros: bool) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = if trim_zeros {
        frac_part.trim_end_matches('0')
    } else {
        frac_part
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }

    let is_zero = out.chars().all(|c| matches!(c, '0' | '.' | ','));
    if value < 0.0 && !is_zero {
        format!("-{out}")
    } else {
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    Short,
    Long,
    Time,
    DateTime,
}

pub fn format_date(date: &NaiveDateTime, style: DateStyle) -> String {
    let pattern = match style {
        DateStyle::Short => "%b %-d, %Y",
        DateStyle::Long => "%A, %B %-d, %Y",
        DateStyle::Time => "%I:%M:%S %p",
        DateStyle::DateTime => "%b %-d, %Y, %I:%M %p",
    };
    date.format(pattern).to_string()
}

/// `42s ago`, `5m ago`, `3h ago` or `2d ago`. Times in the future count as now.
pub fn format_time_ago(then: &NaiveDateTime, now: &NaiveDateTime) -> String {
    let seconds = (*now - *then).num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86400),
    }
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let rest = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {rest}s")
    } else if minutes > 0 {
        format!("{minutes}m {rest}s")
    } else {
        format!("{rest}s")
    }
}

/// Cut `text` to at most `max_chars` characters followed by `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exp = 0;
    let mut threshold: u64 = 1024;
    while exp < UNITS.len() - 1 && bytes >= threshold {
        exp += 1;
        threshold = threshold.saturating_mul(1024);
    }
    let scaled = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{scaled:.2}");
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rounded, UNITS[exp])
}

/// Label and color of a status or severity badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub color: Color,
}

impl Badge {
    fn new(label: &str, color: Color) -> Self {
        Badge {
            label: label.to_string(),
            color,
        }
    }
}

pub fn format_status(status: &str) -> Badge {
    match status.trim().to_lowercase().as_str() {
        "active" => Badge::new("Active", Color::Red),
        "en-route" | "en route" => Badge::new("En Route", Color::Yellow),
        "resolved" => Badge::new("Resolved", Color::Green),
        "pending" => Badge::new("Pending", Color::Blue),
        "cancelled" => Badge::new("Cancelled", Color::Gray),
        "available" => Badge::new("Available", Color::Green),
        "on call" | "on-call" => Badge::new("On Call", Color::Yellow),
        "maintenance" => Badge::new("Maintenance", Color::Yellow),
        "deployed" => Badge::new("Deployed", Color::Red),
        "in use" | "in-use" => Badge::new("In Use", Color::Red),
        _ => Badge::new(status, Color::Gray),
    }
}

pub fn format_severity(severity: &str) -> Badge {
    match severity.trim().to_lowercase().as_str() {
        "high" => Badge::new("High", Color::Red),
        "medium" => Badge::new("Medium", Color::Yellow),
        "low" => Badge::new("Low", Color::Green),
        _ => Badge::new(severity, Color::Gray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn value_coercion() {
        assert_eq!(format_value(&Value::Null), "");
        assert_eq!(format_value(&Value::Bool(true)), "Yes");
        assert_eq!(format_value(&Value::Bool(false)), "No");
        assert_eq!(format_value(&Value::Number(1234567.891)), "1,234,567.891");
        assert_eq!(format_value(&Value::Number(1234.5)), "1,234.5");
        assert_eq!(format_value(&Value::Number(0.12345)), "0.123");
        assert_eq!(format_value(&Value::Number(-42.0)), "-42");
        assert_eq!(format_value(&Value::Number(-0.0001)), "0");
        assert_eq!(format_value(&Value::Date(at(0, 0, 0))), "2024-01-15");
        let afternoon = Value::Date(at(14, 30, 0));
        assert_eq!(format_value(&afternoon), "2024-01-15 14:30:00");
    }

    #[test]
    fn fixed_numbers() {
        assert_eq!(format_number(1000.0, 0), "1,000");
        assert_eq!(format_number(999.5, 2), "999.50");
        assert_eq!(format_number(-1234.0, 1), "-1,234.0");
        assert_eq!(format_number(f64::NAN, 1), "NaN");
        assert_eq!(format_percentage(0.256, 1), "25.6%");
    }

    #[test]
    fn dates() {
        let d = at(14, 30, 5);
        assert_eq!(format_date(&d, DateStyle::Short), "Jan 15, 2024");
        assert_eq!(format_date(&d, DateStyle::Long), "Monday, January 15, 2024");
        assert_eq!(format_date(&d, DateStyle::Time), "02:30:05 PM");
        let both = format_date(&d, DateStyle::DateTime);
        assert_eq!(both, "Jan 15, 2024, 02:30 PM");
    }

    #[test]
    fn relative_times() {
        let now = at(14, 30, 0);
        assert_eq!(format_time_ago(&at(14, 29, 15), &now), "45s ago");
        assert_eq!(format_time_ago(&at(14, 12, 0), &now), "18m ago");
        assert_eq!(format_time_ago(&at(9, 0, 0), &now), "5h ago");
        assert_eq!(format_time_ago(&at(15, 0, 0), &now), "0s ago");
        assert_eq!(format_duration(3725), "1h 2m 5s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(7), "7s");
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("Evacuation in progress", 11), "Evacuation...");
        assert_eq!(truncate_text("ääääää", 3), "äää...");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
    }

    #[test]
    fn badges() {
        assert_eq!(
            format_status("EN-ROUTE"),
            Badge::new("En Route", Color::Yellow)
        );
        assert_eq!(format_status("Closed"), Badge::new("Closed", Color::Gray));
        assert_eq!(format_severity("high").color, Color::Red);
    }

    #[test]
    fn resource_badges() {
        assert_eq!(format_status("available").color, Color::Green);
        assert_eq!(format_status("On Call").color, Color::Yellow);
        assert_eq!(format_status(" Deployed ").label, "Deployed");
        assert_eq!(format_status("IN USE").color, Color::Red);
    }
}
