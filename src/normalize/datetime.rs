//! Date, datetime and time parsing for a broad set of natural and
//! partial formats (German and English month names, dotted German
//! dates, ISO forms, bare years).

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn month_number(name: &str) -> Option<u32> {
    // German names first, then the English ones that differ.
    let month = match name.to_lowercase().as_str() {
        "januar" | "jan" | "january" => 1,
        "februar" | "feb" | "february" => 2,
        "märz" | "mär" | "mar" | "march" => 3,
        "april" | "apr" => 4,
        "mai" | "may" => 5,
        "juni" | "jun" | "june" => 6,
        "juli" | "jul" | "july" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "oktober" | "okt" | "oct" | "october" => 10,
        "november" | "nov" => 11,
        "dezember" | "dez" | "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

fn checked_date(year: i32, month: u32, day: u32) -> Option<String> {
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

fn expand_two_digit_year(year: i32) -> i32 {
    if year < 50 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Parse a date string into ISO `YYYY-MM-DD`. Returns `None` when the
/// input is not recognizable as a date.
pub fn parse_date(input: &str) -> Option<String> {
    static DOTTED: OnceLock<Regex> = OnceLock::new();
    static DOTTED_SHORT: OnceLock<Regex> = OnceLock::new();
    static SLASHED: OnceLock<Regex> = OnceLock::new();
    static DASHED: OnceLock<Regex> = OnceLock::new();
    static DAY_MONTH_NAME: OnceLock<Regex> = OnceLock::new();
    static MONTH_NAME_DAY: OnceLock<Regex> = OnceLock::new();

    let val = input.trim();

    // Already ISO date
    if let Ok(date) = NaiveDate::parse_from_str(val, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    // ISO datetime: keep the date part
    if val.as_bytes().get(10) == Some(&b'T') {
        if let Some(prefix) = val.get(..10) {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    // DD.MM.YYYY
    let re = DOTTED.get_or_init(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());
    if let Some(caps) = re.captures(val) {
        return checked_date(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    // DD.MM.YY
    let re = DOTTED_SHORT.get_or_init(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{2})$").unwrap());
    if let Some(caps) = re.captures(val) {
        let year = expand_two_digit_year(caps[3].parse().ok()?);
        return checked_date(year, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    // DD/MM/YYYY
    let re = SLASHED.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
    if let Some(caps) = re.captures(val) {
        return checked_date(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    // DD-MM-YYYY
    let re = DASHED.get_or_init(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").unwrap());
    if let Some(caps) = re.captures(val) {
        return checked_date(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    // "15. September 2026" / "15 Sep 2026"
    let re = DAY_MONTH_NAME.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})\.?\s*([a-zäöü]+)\s+(\d{4})$").unwrap()
    });
    if let Some(caps) = re.captures(val) {
        let month = month_number(&caps[2])?;
        return checked_date(caps[3].parse().ok()?, month, caps[1].parse().ok()?);
    }

    // "September 15, 2026"
    let re = MONTH_NAME_DAY.get_or_init(|| {
        Regex::new(r"(?i)^([a-zäöü]+)\s+(\d{1,2}),?\s*(\d{4})$").unwrap()
    });
    if let Some(caps) = re.captures(val) {
        let month = month_number(&caps[1])?;
        return checked_date(caps[3].parse().ok()?, month, caps[2].parse().ok()?);
    }

    None
}

/// Parse a datetime string into ISO `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_datetime(input: &str) -> Option<String> {
    static ISO_DT: OnceLock<Regex> = OnceLock::new();
    static GERMAN_DT: OnceLock<Regex> = OnceLock::new();

    let val = input.trim();

    // ISO datetime, with or without seconds
    let re = ISO_DT.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2})(:\d{2})?").unwrap()
    });
    if let Some(caps) = re.captures(val) {
        let seconds = caps.get(2).map(|m| m.as_str().to_string());
        return Some(format!("{}{}", &caps[1], seconds.unwrap_or_else(|| ":00".into())));
    }

    // "15.03.2025 14:30" / "15.03.2025 14:30:00"
    let re = GERMAN_DT.get_or_init(|| {
        Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})\s+(\d{1,2}):(\d{2})(?::(\d{2}))?$").unwrap()
    });
    if let Some(caps) = re.captures(val) {
        let date = checked_date(
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        )?;
        let hour: u32 = caps[4].parse().ok()?;
        let minute: u32 = caps[5].parse().ok()?;
        let second: u32 = caps.get(6).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if hour <= 23 && minute <= 59 && second <= 59 {
            return Some(format!("{date}T{hour:02}:{minute:02}:{second:02}"));
        }
        return None;
    }

    // Date only: midnight
    parse_date(val).map(|date| format!("{date}T00:00:00"))
}

/// Parse a time string into `HH:MM:SS`.
pub fn parse_time(input: &str) -> Option<String> {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    static UHR: OnceLock<Regex> = OnceLock::new();

    let val = input.trim();

    // HH:MM or HH:MM:SS
    let re = CLOCK.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").unwrap());
    if let Some(caps) = re.captures(val) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let second: u32 = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if hour <= 23 && minute <= 59 && second <= 59 {
            return Some(format!("{hour:02}:{minute:02}:{second:02}"));
        }
        return None;
    }

    // German: "14 Uhr 30" / "14 Uhr"
    let re = UHR.get_or_init(|| Regex::new(r"^(\d{1,2})\s*[Uu]hr\s*(\d{2})?$").unwrap());
    if let Some(caps) = re.captures(val) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if hour <= 23 && minute <= 59 {
            return Some(format!("{hour:02}:{minute:02}:00"));
        }
    }

    None
}
