// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Solar twilight transitions and lunar illumination for a night. These are
//! contextual helpers for display, not part of core visibility filtering.

use astro::angle::anglr_sepr;
use astro::coords::{asc_frm_ecl, dec_frm_ecl};
use astro::{ecliptic, lunar, sun};
use canonical_error::CanonicalError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::debug;
use serde::Serialize;

use crate::astro_time::{self, datetime_from_days, days_since_j2000};
use crate::horizon::{self, julian_day_from_days, ObserverSite};
use crate::riseset::{search_crossing, CrossingDirection};

/// Geometric solar altitude at sunrise/sunset: 16 arcmin of semidiameter
/// plus 34 arcmin of refraction.
pub const SUNRISE_SUNSET_ALT: f64 = -50.0 / 60.0;
pub const CIVIL_TWILIGHT_ALT: f64 = -6.0;
pub const NAUTICAL_TWILIGHT_ALT: f64 = -12.0;
pub const ASTRONOMICAL_TWILIGHT_ALT: f64 = -18.0;

const KM_PER_AU: f64 = 1.495_978_707e8;

/// Twilight transition instants for one night, UTC. The evening entries
/// follow the anchor day's local noon; the morning entries follow their
/// evening counterparts. Any entry can be absent (polar day/night) without
/// affecting the others. Conversion to a display zone is a separate step
/// (`astro_time::utc_iso_to_local`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NightTwilight {
    pub sunset: Option<DateTime<Utc>>,
    pub sunrise: Option<DateTime<Utc>>,
    pub civil_evening: Option<DateTime<Utc>>,
    pub civil_morning: Option<DateTime<Utc>>,
    pub nautical_evening: Option<DateTime<Utc>>,
    pub nautical_morning: Option<DateTime<Utc>>,
    pub astronomical_evening: Option<DateTime<Utc>>,
    pub astronomical_morning: Option<DateTime<Utc>>,
}

/// `NightTwilight` rendered for display in one zone,
/// "YYYY-MM-DD HH:MM:SS" with the offset implied by context.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NightTwilightLocal {
    pub sunset: Option<String>,
    pub sunrise: Option<String>,
    pub civil_evening: Option<String>,
    pub civil_morning: Option<String>,
    pub nautical_evening: Option<String>,
    pub nautical_morning: Option<String>,
    pub astronomical_evening: Option<String>,
    pub astronomical_morning: Option<String>,
}

impl NightTwilight {
    /// Converts every found instant to local display text in the given
    /// IANA zone. Absent events stay absent.
    pub fn in_zone(&self, zone: &str)
                   -> Result<NightTwilightLocal, CanonicalError> {
        let tz = astro_time::parse_zone(zone)?;
        let local = |t: &Option<DateTime<Utc>>| {
            t.as_ref().map(|t| t.with_timezone(&tz)
                           .format("%Y-%m-%d %H:%M:%S").to_string())
        };
        Ok(NightTwilightLocal {
            sunset: local(&self.sunset),
            sunrise: local(&self.sunrise),
            civil_evening: local(&self.civil_evening),
            civil_morning: local(&self.civil_morning),
            nautical_evening: local(&self.nautical_evening),
            nautical_morning: local(&self.nautical_morning),
            astronomical_evening: local(&self.astronomical_evening),
            astronomical_morning: local(&self.astronomical_morning),
        })
    }
}

/// Returns the Sun's equatorial position of date (ra, dec in degrees) at
/// the given days-since-J2000 instant.
pub fn sun_equatorial(t_days: f64) -> (f64, f64) {
    let jd = julian_day_from_days(t_days);
    let (ecl, _rad_vec) = sun::geocent_ecl_pos(jd);
    let oblq = ecliptic::mn_oblq_IAU(jd);
    (asc_frm_ecl(ecl.long, ecl.lat, oblq).to_degrees(),
     dec_frm_ecl(ecl.long, ecl.lat, oblq).to_degrees())
}

/// Geometric altitude of the Sun's center, degrees.
pub fn sun_altitude(site: &ObserverSite, t_days: f64) -> f64 {
    let (ra, dec) = sun_equatorial(t_days);
    let (alt, _az, _ha) =
        horizon::geometric_alt_az(ra, dec, site, &datetime_from_days(t_days));
    alt
}

/// Computes the night's solar events for the calendar day containing `day`
/// in its own zone. Anchoring the search at local noon avoids the
/// day-boundary ambiguity a midnight anchor would have: the whole night
/// lies in the forward search window.
pub fn twilight_times<Z: TimeZone>(site: &ObserverSite, day: &DateTime<Z>)
                                   -> NightTwilight {
    let noon_days = days_since_j2000(&local_noon(day));

    let solve = |threshold: f64, label: &str| {
        let f = |t: f64| sun_altitude(site, t) - threshold;
        let evening =
            search_crossing(&f, noon_days, 1.0, CrossingDirection::Setting);
        let morning = search_crossing(&f, evening.unwrap_or(noon_days), 1.0,
                                      CrossingDirection::Rising);
        if evening.is_none() || morning.is_none() {
            debug!("No {} crossing at lat {} for this day",
                   label, site.latitude);
        }
        (evening.map(datetime_from_days), morning.map(datetime_from_days))
    };

    let mut night = NightTwilight::default();
    (night.sunset, night.sunrise) = solve(SUNRISE_SUNSET_ALT, "sunrise/sunset");
    (night.civil_evening, night.civil_morning) =
        solve(CIVIL_TWILIGHT_ALT, "civil twilight");
    (night.nautical_evening, night.nautical_morning) =
        solve(NAUTICAL_TWILIGHT_ALT, "nautical twilight");
    (night.astronomical_evening, night.astronomical_morning) =
        solve(ASTRONOMICAL_TWILIGHT_ALT, "astronomical twilight");
    night
}

fn local_noon<Z: TimeZone>(day: &DateTime<Z>) -> DateTime<Utc> {
    let date = day.date_naive();
    let zone = day.timezone();
    if let Some(naive) = date.and_hms_opt(12, 0, 0) {
        if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
            return dt.with_timezone(&Utc);
        }
    }
    day.with_timezone(&Utc)
}

/// Fraction of the lunar disk illuminated at `time`, as a percentage.
/// The phase angle comes from the geocentric Sun and Moon positions and
/// distances; k = (1 + cos(phase)) / 2.
pub fn moon_illuminated_fraction(time: &DateTime<Utc>) -> f64 {
    let jd = julian_day_from_days(days_since_j2000(time));
    let (sun_ecl, sun_au) = sun::geocent_ecl_pos(jd);
    let (moon_ecl, moon_km) = lunar::geocent_ecl_pos(jd);

    let elongation = anglr_sepr(sun_ecl.long, sun_ecl.lat,
                                moon_ecl.long, moon_ecl.lat);
    let sun_km = sun_au * KM_PER_AU;
    let phase_angle = (sun_km * elongation.sin())
        .atan2(moon_km - sun_km * elongation.cos());

    50.0 * (1.0 + phase_angle.cos())
}

/// One point of a lunar illumination series.
#[derive(Clone, Debug, Serialize)]
pub struct MoonSample {
    pub time: String,  // Local instant with its fixed offset, RFC3339.
    pub illuminated_percent: f64,
}

/// Samples lunar illumination across a year at a fixed local hour, every
/// four days. The samples use the zone's standard (non-DST) offset so the
/// series keeps the same wall-clock hour all year.
pub fn moon_illumination_series(year: i32, zone: &str, sample_hour: u32)
                                -> Result<Vec<MoonSample>, CanonicalError> {
    let start = astro_time::with_standard_offset(year, 1, 1, sample_hour, zone)?;
    let mut samples = Vec::new();
    for day in (0i64..366).step_by(4) {
        let t = start + Duration::days(day);
        samples.push(MoonSample {
            time: t.to_rfc3339(),
            illuminated_percent:
                moon_illuminated_fraction(&t.with_timezone(&Utc)),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::astro_time::resolve_local;

    #[test]
    fn test_sun_declination_at_equinox_and_solstice() {
        let equinox = Utc.with_ymd_and_hms(2024, 3, 20, 3, 6, 0).unwrap();
        let (_ra, dec) = sun_equatorial(days_since_j2000(&equinox));
        assert_abs_diff_eq!(dec, 0.0, epsilon = 0.5);

        let solstice = Utc.with_ymd_and_hms(2024, 6, 20, 21, 0, 0).unwrap();
        let (_ra, dec) = sun_equatorial(days_since_j2000(&solstice));
        assert_abs_diff_eq!(dec, 23.44, epsilon = 0.3);
    }

    #[test]
    fn test_twilight_sequence_mid_latitude() {
        let site = ObserverSite::new(38.71, -94.71);
        let day = resolve_local("2024-03-15", "21:00", "America/Chicago")
            .unwrap();
        let night = twilight_times(&site, &day);

        let seq = [
            night.sunset.expect("sunset"),
            night.civil_evening.expect("civil evening"),
            night.nautical_evening.expect("nautical evening"),
            night.astronomical_evening.expect("astronomical evening"),
            night.astronomical_morning.expect("astronomical morning"),
            night.nautical_morning.expect("nautical morning"),
            night.civil_morning.expect("civil morning"),
            night.sunrise.expect("sunrise"),
        ];
        for pair in seq.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }

        // Mid-March sunset in eastern Kansas is roughly 19:25 CDT (00:25 UTC).
        let sunset = night.sunset.unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 16, 0, 25, 0).unwrap();
        assert!((sunset - expected).num_minutes().abs() < 20,
                "sunset {}", sunset);
    }

    #[test]
    fn test_twilight_in_zone() {
        let site = ObserverSite::new(38.71, -94.71);
        let day = resolve_local("2024-03-15", "21:00", "America/Chicago")
            .unwrap();
        let night = twilight_times(&site, &day);
        let local = night.in_zone("America/Chicago").unwrap();

        // Sunset lands in the anchor day's local evening.
        let sunset = local.sunset.unwrap();
        assert!(sunset.starts_with("2024-03-15 19:"), "{}", sunset);
        // Morning events land on the following local date.
        let sunrise = local.sunrise.unwrap();
        assert!(sunrise.starts_with("2024-03-16 0"), "{}", sunrise);

        assert!(night.in_zone("Mars/Olympus").is_err());

        // Absent events stay absent.
        let polar = NightTwilight::default().in_zone("Europe/Oslo").unwrap();
        assert_eq!(polar, NightTwilightLocal::default());
    }

    #[test]
    fn test_polar_day_yields_no_crossings() {
        // Tromso at midsummer: the Sun never sets; every entry is None and
        // nothing errors.
        let site = ObserverSite::new(69.65, 18.96);
        let day = resolve_local("2024-06-21", "12:00", "Europe/Oslo").unwrap();
        let night = twilight_times(&site, &day);
        assert_eq!(night, NightTwilight::default());
    }

    #[test]
    fn test_moon_phase_extremes() {
        // Full moon 2024-01-25 ~17:54 UTC.
        let full = Utc.with_ymd_and_hms(2024, 1, 25, 17, 54, 0).unwrap();
        assert!(moon_illuminated_fraction(&full) > 98.0);

        // New moon 2024-01-11 ~11:57 UTC.
        let new = Utc.with_ymd_and_hms(2024, 1, 11, 11, 57, 0).unwrap();
        assert!(moon_illuminated_fraction(&new) < 2.0);

        // First quarter 2024-01-18 ~03:53 UTC: about half.
        let quarter = Utc.with_ymd_and_hms(2024, 1, 18, 3, 53, 0).unwrap();
        assert_abs_diff_eq!(moon_illuminated_fraction(&quarter), 50.0,
                            epsilon = 5.0);
    }

    #[test]
    fn test_moon_series_bounds() {
        let samples =
            moon_illumination_series(2024, "America/Chicago", 21).unwrap();
        assert_eq!(samples.len(), 92);
        for s in &samples {
            assert!(s.illuminated_percent >= 0.0
                    && s.illuminated_percent <= 100.0);
            // Standard offset all year.
            assert!(s.time.ends_with("-06:00"), "{}", s.time);
        }
    }
}
