//! Time identifiers: `$ctime`, `$asctime` and `$duration`.
//!
//! `$asctime` format strings are built from these tokens (longest match
//! wins, anything else is copied literally):
//!
//! | Token  | Output                  | Token | Output                |
//! |--------|-------------------------|-------|-----------------------|
//! | `yyyy` | 2024                    | `yy`  | 24                    |
//! | `mmmm` | January                 | `mmm` | Jan                   |
//! | `mm`   | 01                      | `m`   | 1                     |
//! | `dddd` | Monday                  | `ddd` | Mon                   |
//! | `dd`   | 05                      | `d`   | 5                     |
//! | `HH`   | 00–23                   | `H`   | 0–23                  |
//! | `hh`   | 01–12                   | `h`   | 1–12                  |
//! | `nn`   | minutes, 2 digits       | `n`   | minutes               |
//! | `ss`   | seconds, 2 digits       | `s`   | seconds               |
//! | `TT`   | AM / PM                 | `tt`  | am / pm               |

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

pub const DEFAULT_FORMAT: &str = "ddd mmm dd HH:nn:ss yyyy";

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

const TOKENS: [&str; 20] = [
    "yyyy", "yy", "mmmm", "mmm", "mm", "m", "dddd", "ddd", "dd", "d", "HH", "H", "hh", "h", "nn",
    "n", "ss", "s", "TT", "tt",
];

/// `$ctime`: seconds since the Unix epoch.
pub fn ctime() -> String {
    Utc::now().timestamp().to_string()
}

/// `$asctime(secs[,format])` in local time.
pub fn asctime(secs: i64, format: Option<&str>) -> Option<String> {
    format_epoch(&Local, secs, format.unwrap_or(DEFAULT_FORMAT))
}

/// Render epoch `secs` in time zone `tz`.  `None` if out of range.
pub fn format_epoch<Tz: TimeZone>(tz: &Tz, secs: i64, format: &str) -> Option<String> {
    let t = tz.timestamp_opt(secs, 0).single()?;
    Some(format_time(&t, format))
}

pub fn format_time<Tz: TimeZone>(t: &DateTime<Tz>, format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;
    while let Some(c) = rest.chars().next() {
        match TOKENS.iter().find(|tok| rest.starts_with(**tok)) {
            Some(tok) => {
                out.push_str(&render_token(t, tok));
                rest = &rest[tok.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

fn render_token<Tz: TimeZone>(t: &DateTime<Tz>, token: &str) -> String {
    let month = MONTHS[t.month0() as usize];
    let weekday = WEEKDAYS[t.weekday().num_days_from_monday() as usize];
    let (pm, hour12) = t.hour12();
    match token {
        "yyyy" => format!("{:04}", t.year()),
        "yy" => format!("{:02}", t.year().rem_euclid(100)),
        "mmmm" => month.to_owned(),
        "mmm" => month[..3].to_owned(),
        "mm" => format!("{:02}", t.month()),
        "m" => t.month().to_string(),
        "dddd" => weekday.to_owned(),
        "ddd" => weekday[..3].to_owned(),
        "dd" => format!("{:02}", t.day()),
        "d" => t.day().to_string(),
        "HH" => format!("{:02}", t.hour()),
        "H" => t.hour().to_string(),
        "hh" => format!("{:02}", hour12),
        "h" => hour12.to_string(),
        "nn" => format!("{:02}", t.minute()),
        "n" => t.minute().to_string(),
        "ss" => format!("{:02}", t.second()),
        "s" => t.second().to_string(),
        "TT" => String::from(if pm { "PM" } else { "AM" }),
        _ => String::from(if pm { "pm" } else { "am" }),
    }
}

/// `$duration(secs)`: `1wk 2days 3hrs 4mins 5secs`, zero parts omitted.
pub fn duration(secs: i64) -> String {
    const UNITS: [(i64, &str, &str); 5] = [
        (604_800, "wk", "wks"),
        (86_400, "day", "days"),
        (3_600, "hr", "hrs"),
        (60, "min", "mins"),
        (1, "sec", "secs"),
    ];
    let mut left = secs.unsigned_abs();
    let mut parts = Vec::new();
    for (size, one, many) in UNITS {
        let n = left / size as u64;
        left %= size as u64;
        if n > 0 {
            parts.push(format!("{n}{}", if n == 1 { one } else { many }));
        }
    }
    if parts.is_empty() {
        return "0secs".to_owned();
    }
    let text = parts.join(" ");
    if secs < 0 {
        format!("-{text}")
    } else {
        text
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-05 14:07:09 UTC, a Tuesday.
    const T: i64 = 1_709_647_629;

    #[test]
    fn default_format_in_utc() {
        assert_eq!(
            format_epoch(&Utc, T, DEFAULT_FORMAT).as_deref(),
            Some("Tue Mar 05 14:07:09 2024")
        );
    }

    #[test]
    fn every_token() {
        let f = |fmt: &str| format_epoch(&Utc, T, fmt).unwrap_or_default();
        assert_eq!(f("yyyy yy"), "2024 24");
        assert_eq!(f("mmmm mmm mm m"), "March Mar 03 3");
        assert_eq!(f("dddd ddd dd d"), "Tuesday Tue 05 5");
        assert_eq!(f("HH H hh h"), "14 14 02 2");
        assert_eq!(f("nn n ss s"), "07 7 09 9");
        assert_eq!(f("TT tt"), "PM pm");
    }

    #[test]
    fn literals_pass_through() {
        assert_eq!(format_epoch(&Utc, T, "[HH:nn] @ yyyy!").as_deref(), Some("[14:07] @ 2024!"));
    }

    #[test]
    fn ctime_is_numeric() {
        assert!(ctime().parse::<i64>().is_ok());
    }

    #[test]
    fn durations() {
        assert_eq!(duration(0), "0secs");
        assert_eq!(duration(1), "1sec");
        assert_eq!(duration(3600), "1hr");
        assert_eq!(duration(3_661), "1hr 1min 1sec");
        assert_eq!(duration(694_925), "1wk 1day 1hr 2mins 5secs");
        assert_eq!(duration(-120), "-2mins");
    }
}
