use chrono::{NaiveDate, NaiveDateTime};
use std::{fs, io, path::Path};

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Create the parent directory of `path`, if it has one.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

// Helpers to parse fields with quirks.

/// Whether a raw field is one of the spellings of "no value" found in measure extracts.
pub fn is_missing(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("na")
}

/// Parse a count, accepting integer-valued floats (`3.0`) as written by dataframe tools.
///
/// `Ok(None)` means the field was missing, `Err(())` that it was not a non-negative integer.
pub fn parse_count(s: &str) -> Result<Option<u64>, ()> {
    if is_missing(s) {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<u64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0. && v == v.floor() && v <= u64::MAX as f64 => {
            Ok(Some(v as u64))
        }
        _ => Err(()),
    }
}

/// Parse a ratio. NaN and infinities (a ratio over a zero denominator) are treated as missing.
pub fn parse_ratio(s: &str) -> Result<Option<f64>, ()> {
    if is_missing(s) {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if !v.is_finite() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(()),
    }
}

/// Parse the `date` column. The time part, if present, must be midnight.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    let datetime = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()?;
    if datetime.time() != chrono::NaiveTime::from_hms_opt(0, 0, 0)? {
        return None;
    }
    Some(datetime.date())
}

pub fn header(header: &str) {
    let len = header.len();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}
