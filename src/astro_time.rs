// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Conversions between calendar-local instants and the continuous day count
//! since the J2000.0 epoch (2000-01-01T12:00:00 UTC) used by all solver
//! routines, plus the UTC/local serialization helpers for the storage and
//! display boundaries.

use canonical_error::{CanonicalError, invalid_argument_error,
                      failed_precondition_error};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime,
             NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

/// Unix timestamp (milliseconds) of the J2000.0 epoch.
const J2000_UNIX_MS: i64 = 946_728_000_000;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Returns the signed number of days (fractional) between the J2000.0 epoch
/// and `time`. This is the time axis shared by all solver calls.
pub fn days_since_j2000(time: &DateTime<Utc>) -> f64 {
    (time.timestamp_millis() - J2000_UNIX_MS) as f64 / MS_PER_DAY
}

/// Inverse of `days_since_j2000()`. Round-tripping reproduces the original
/// instant to millisecond precision. Values beyond chrono's representable
/// range are clamped.
pub fn datetime_from_days(days: f64) -> DateTime<Utc> {
    let ms = J2000_UNIX_MS as f64 + days * MS_PER_DAY;
    if ms >= i64::MAX as f64 {
        return DateTime::<Utc>::MAX_UTC;
    }
    if ms <= i64::MIN as f64 {
        return DateTime::<Utc>::MIN_UTC;
    }
    match DateTime::from_timestamp_millis(ms.round() as i64) {
        Some(dt) => dt,
        None => {
            if ms < 0.0 { DateTime::<Utc>::MIN_UTC }
            else { DateTime::<Utc>::MAX_UTC }
        },
    }
}

/// As `days_since_j2000()`, for an instant that arrived without zone
/// information. The instant is treated as UTC by convention; most callers
/// intend a named zone, so the fallback is logged.
pub fn days_since_j2000_naive(time: &NaiveDateTime) -> f64 {
    warn!("Zone-less instant {}; treating as UTC", time);
    days_since_j2000(&time.and_utc())
}

/// Parses an IANA zone name, e.g. "America/Chicago".
pub fn parse_zone(zone: &str) -> Result<Tz, CanonicalError> {
    zone.parse::<Tz>().map_err(|_| invalid_argument_error(
        format!("Unknown IANA zone {:?}", zone).as_str()))
}

/// Resolves a wall-clock local instant (date "YYYY-MM-DD", time "HH:MM" or
/// "HH:MM:SS", IANA zone name) to an instant with an unambiguous UTC offset.
/// An instant falling in a DST gap is an error; an ambiguous instant (clocks
/// rolled back) resolves to the earlier of the two offsets.
pub fn resolve_local(date: &str, time: &str, zone: &str)
                     -> Result<DateTime<Tz>, CanonicalError> {
    let tz = parse_zone(zone)?;
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| invalid_argument_error(
            format!("Bad date {:?}: {}", date, e).as_str()))?;
    // The language-model boundary sometimes supplies seconds; accept both.
    let t = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|e| invalid_argument_error(
            format!("Bad time {:?}: {}", time, e).as_str()))?;
    match tz.from_local_datetime(&d.and_time(t)) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        chrono::LocalResult::Ambiguous(dt, _) => {
            warn!("Ambiguous local instant {} {} in {}; using earlier offset",
                  date, time, zone);
            Ok(dt)
        },
        chrono::LocalResult::None =>
            Err(failed_precondition_error(
                format!("Local instant {} {} does not exist in {}",
                        date, time, zone).as_str())),
    }
}

/// Formats an instant for the storage/comparison boundary: UTC ISO-8601 with
/// second precision and a literal Z suffix. Lexical ordering of these strings
/// matches chronological ordering.
pub fn format_utc_iso(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parses a string produced by `format_utc_iso()` (or any RFC3339 instant).
pub fn parse_utc_iso(s: &str) -> Result<DateTime<Utc>, CanonicalError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid_argument_error(
            format!("Bad UTC instant {:?}: {}", s, e).as_str()))
}

/// Converts a wall-clock local instant directly to the boundary UTC string.
pub fn local_to_utc_iso(date: &str, time: &str, zone: &str)
                        -> Result<String, CanonicalError> {
    let local = resolve_local(date, time, zone)?;
    Ok(format_utc_iso(&local.with_timezone(&Utc)))
}

/// Converts a boundary UTC string to local display text,
/// "YYYY-MM-DD HH:MM:SS" with no offset (the zone is implied by context).
/// Display conversion happens only here, never inside the solvers.
pub fn utc_iso_to_local(iso: &str, zone: &str) -> Result<String, CanonicalError> {
    let tz = parse_zone(zone)?;
    let utc = parse_utc_iso(iso)?;
    Ok(utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Returns the zone's standard (non-DST) UTC offset for `year`, found by
/// sampling the 15th of each month at local noon and taking the smallest
/// offset. DST is always ahead of standard time.
pub fn standard_utc_offset(zone: &str, year: i32)
                           -> Result<FixedOffset, CanonicalError> {
    let tz = parse_zone(zone)?;
    let mut smallest: Option<FixedOffset> = None;
    for month in 1..=12 {
        let naive = match NaiveDate::from_ymd_opt(year, month, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0)) {
            Some(n) => n,
            None => continue,
        };
        let offset = match tz.from_local_datetime(&naive).earliest() {
            Some(dt) => dt.offset().fix(),
            None => continue,
        };
        match smallest {
            Some(o) if o.local_minus_utc() <= offset.local_minus_utc() => (),
            _ => smallest = Some(offset),
        }
    }
    smallest.ok_or_else(|| invalid_argument_error(
        format!("No resolvable offset for zone {:?} in {}",
                zone, year).as_str()))
}

/// Builds a wall-clock instant pinned to the zone's standard offset, so a
/// periodic sampling series (one point per day/month at the same local hour)
/// is unaffected by seasonal clock shifts.
pub fn with_standard_offset(year: i32, month: u32, day: u32, hour: u32,
                            zone: &str)
                            -> Result<DateTime<FixedOffset>, CanonicalError> {
    let offset = standard_utc_offset(zone, year)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| invalid_argument_error(
            format!("Bad calendar values {}-{}-{} {}:00",
                    year, month, day, hour).as_str()))?;
    offset.from_local_datetime(&naive).single()
        .ok_or_else(|| invalid_argument_error("Unrepresentable local instant"))
}

/// Returns the UTC instant of local midnight beginning the calendar day that
/// contains `instant` in its own zone. This is the anchor for rise/set
/// searches. Zones that skip midnight on a DST transition fall forward to the
/// first representable hour.
pub fn local_day_start_utc<Z: TimeZone>(instant: &DateTime<Z>) -> DateTime<Utc> {
    let date = instant.date_naive();
    let zone = instant.timezone();
    for hour in 0..4 {
        if let Some(naive) = date.and_hms_opt(hour, 0, 0) {
            if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
                return dt.with_timezone(&Utc);
            }
        }
    }
    // Unreachable for real zones; fall back to 24h before the instant.
    instant.with_timezone(&Utc) - Duration::days(1)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Timelike;

    use super::*;

    // RUST_LOG=debug surfaces the fallback logging these tests tickle.
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_j2000_epoch_is_zero() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(days_since_j2000(&epoch), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_day_count_round_trip() {
        let t = resolve_local("2024-03-15", "21:00", "America/Chicago")
            .unwrap().with_timezone(&Utc);
        let days = days_since_j2000(&t);
        assert_eq!(datetime_from_days(days), t);

        // Sub-second precision survives the round trip.
        let t = t.with_nanosecond(250_000_000).unwrap();
        let back = datetime_from_days(days_since_j2000(&t));
        assert!((back - t).num_milliseconds().abs() < 2);
    }

    #[test]
    fn test_local_to_utc_iso() {
        // CST is UTC-6.
        assert_eq!(
            local_to_utc_iso("2025-12-04", "22:00", "America/Chicago").unwrap(),
            "2025-12-05T04:00:00Z");
        // Same wall clock during DST is UTC-5.
        assert_eq!(
            local_to_utc_iso("2025-07-04", "22:00", "America/Chicago").unwrap(),
            "2025-07-05T03:00:00Z");
        // Seconds in the time string are tolerated.
        assert_eq!(
            local_to_utc_iso("2025-12-04", "22:00:00", "America/Chicago").unwrap(),
            "2025-12-05T04:00:00Z");
    }

    #[test]
    fn test_bad_inputs_rejected() {
        assert!(resolve_local("2025-12-04", "22:00", "Mars/Olympus").is_err());
        assert!(resolve_local("12/04/2025", "22:00", "America/Chicago").is_err());
        assert!(resolve_local("2025-12-04", "10pm", "America/Chicago").is_err());
        // 02:30 does not exist on the spring-forward date.
        assert!(resolve_local("2025-03-09", "02:30", "America/Chicago").is_err());
    }

    #[test]
    fn test_utc_iso_to_local() {
        assert_eq!(
            utc_iso_to_local("2024-03-16T03:00:00Z", "America/Chicago").unwrap(),
            "2024-03-15 22:00:00");
    }

    #[test]
    fn test_standard_offset_ignores_dst() {
        let offset = standard_utc_offset("America/Chicago", 2025).unwrap();
        assert_eq!(offset.local_minus_utc(), -6 * 3600);

        // A July instant still carries the standard (winter) offset.
        let d = with_standard_offset(2025, 7, 15, 21, "America/Chicago").unwrap();
        assert_eq!(d.offset().local_minus_utc(), -6 * 3600);
        assert_eq!(d.hour(), 21);
    }

    #[test]
    fn test_local_day_start() {
        let instant = resolve_local("2024-03-15", "21:00", "America/Chicago")
            .unwrap();
        // Midnight CDT on 2024-03-15 is 05:00 UTC.
        assert_eq!(format_utc_iso(&local_day_start_utc(&instant)),
                   "2024-03-15T05:00:00Z");
    }

    #[test]
    fn test_naive_fallback_treated_as_utc() {
        init_logging();
        let naive = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
            .and_hms_opt(12, 0, 0).unwrap();
        assert_abs_diff_eq!(days_since_j2000_naive(&naive), 0.0, epsilon = 1e-9);
    }
}
