// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Topocentric horizon coordinates (altitude, azimuth) and air mass for a
//! fixed-sky J2000 position, an observer site, and an instant.

use std::f64::consts::PI;

use astro::angle::limit_to_two_PI;
use astro::coords::{alt_frm_eq, az_frm_eq};
use astro::time::{julian_day, mn_sidr, CalType, Date};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Observer geography. Longitude is east-positive; elevation defaults to sea
/// level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverSite {
    pub latitude: f64,   // Degrees, [-90, 90].
    pub longitude: f64,  // Degrees, [-180, 180], east positive.
    pub elevation: f64,  // Meters above sea level.
}

impl ObserverSite {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        ObserverSite { latitude, longitude, elevation: 0.0 }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }
}

/// One observer-relative fix of a fixed-sky position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub altitude: f64,          // Apparent altitude, degrees. May be negative.
    pub azimuth: f64,           // Degrees, [0, 360), clockwise from north.
    pub air_mass: Option<f64>,  // None iff altitude <= 0.
    pub visible: bool,
}

/// Numeric stand-in for an undefined air mass, for storage layers that
/// cannot represent null. Comparisons against real air-mass values (>= 1,
/// rarely above ~40) sort it last.
pub const AIRMASS_UNDEFINED: f64 = 1.0e7;

/// Returns the Greenwich mean sidereal time at `time`, in radians.
pub fn greenwich_mean_sidereal_time(time: &DateTime<Utc>) -> f64 {
    let date = Date {
        year: time.date_naive().year() as i16,
        month: time.date_naive().month() as u8,
        decimal_day: time.date_naive().day() as f64,
        cal_type: CalType::Gregorian,
    };
    let jd = julian_day(&date);

    let utc_hours = (time.time().num_seconds_from_midnight() as f64
                     + time.time().nanosecond() as f64 * 1e-9) / 3600.0;
    let gmst_hours =
        mn_sidr(jd).to_degrees() / 15.0 + utc_hours * 1.00273790935;

    limit_to_two_PI((gmst_hours * 15.0).to_radians())
}

/// Returns (alt, az, ha): geometric (unrefracted) altitude and azimuth in
/// degrees, azimuth clockwise from north, and the hour angle in radians in
/// [-PI, PI).
pub fn geometric_alt_az(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
                        time: &DateTime<Utc>) -> (f64, f64, f64) {
    let gmst = greenwich_mean_sidereal_time(time);
    let hour_angle = gmst + site.longitude.to_radians() - ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let lat = site.latitude.to_radians();

    // az_frm_eq() measures azimuth from the south; rotate to north-clockwise.
    let az = limit_to_two_PI(az_frm_eq(hour_angle, dec, lat) + PI);
    let mut ha = limit_to_two_PI(hour_angle);
    if ha >= PI {
        ha -= 2.0 * PI;
    }

    (alt_frm_eq(hour_angle, dec, lat).to_degrees(), az.to_degrees(), ha)
}

/// Atmospheric refraction at the given true altitude (degrees), in
/// arcminutes. Saemundsson 1986; adequate to the ~0.1 degree level for
/// standard conditions.
pub fn refraction_arcmin(true_alt_deg: f64) -> f64 {
    if true_alt_deg < -2.0 {
        return 0.0;
    }
    let arg = true_alt_deg + 10.3 / (true_alt_deg + 5.11);
    (1.02 / arg.to_radians().tan()).max(0.0)
}

/// As `geometric_alt_az()`, but the altitude is apparent (refracted).
pub fn alt_az(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
              time: &DateTime<Utc>) -> (f64, f64, f64) {
    let (alt, az, ha) = geometric_alt_az(ra_deg, dec_deg, site, time);
    (alt + refraction_arcmin(alt) / 60.0, az, ha)
}

/// Relative optical path length through the atmosphere. Undefined at or
/// below the horizon. The plain secant suffices above 20 degrees; below
/// that the Kasten-Young 1989 approximation is markedly more accurate.
pub fn air_mass(alt_deg: f64) -> Option<f64> {
    if alt_deg <= 0.0 {
        return None;
    }
    let cos_zenith = (90.0 - alt_deg).to_radians().cos();
    if alt_deg >= 20.0 {
        Some(1.0 / cos_zenith)
    } else {
        Some(1.0 / (cos_zenith + 0.50572 * (alt_deg + 6.07995).powf(-1.6364)))
    }
}

/// Computes the observer-relative fix of a J2000 position at an instant.
/// Pure function; suitable for one call per catalog row per request.
pub fn observe(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
               time: &DateTime<Utc>) -> SkyPosition {
    let (altitude, azimuth, _ha) = alt_az(ra_deg, dec_deg, site, time);
    let air_mass = air_mass(altitude);
    SkyPosition { altitude, azimuth, visible: air_mass.is_some(), air_mass }
}

/// Converts days-since-J2000 to the Julian day number used by the astro
/// crate's sun/moon routines.
pub fn julian_day_from_days(days: f64) -> f64 {
    days + 2_451_545.0
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use astro::angle::{deg_frm_dms, deg_frm_hms};
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::astro_time;

    #[test]
    fn test_alt_az_mizar() {
        let mizar_ra = deg_frm_hms(13, 23, 55.5);
        let mizar_dec = deg_frm_dms(54, 55, 31.3);

        let time = FixedOffset::west_opt(8 * 3600).unwrap()
            .with_ymd_and_hms(2024, 3, 7, 23, 56, 0).unwrap()
            .with_timezone(&Utc);
        let site = ObserverSite::new(37.0, -122.0);

        let (alt, az, ha) = geometric_alt_az(mizar_ra, mizar_dec, &site, &time);

        // Expected values obtained from SkySafari.
        assert_abs_diff_eq!(alt, deg_frm_dms(58, 52, 14.3), epsilon = 0.1);
        assert_abs_diff_eq!(az, deg_frm_dms(42, 59, 36.7), epsilon = 0.1);
        assert_abs_diff_eq!(ha, -deg_frm_hms(2, 29, 50.9).to_radians(),
                            epsilon = 0.002);
    }

    #[test]
    fn test_observe_andromeda_from_kansas() {
        // M31 region on a March evening from eastern Kansas.
        let time = crate::astro_time::resolve_local(
            "2024-03-15", "21:00", "America/Chicago").unwrap()
            .with_timezone(&Utc);
        let site = ObserverSite::new(38.71, -94.71);

        let pos = observe(10.68, 41.27, &site, &time);
        assert!(pos.altitude > 30.0 && pos.altitude < 60.0,
                "altitude {}", pos.altitude);
        assert!(pos.azimuth >= 0.0 && pos.azimuth < 360.0);
        assert!(pos.visible);
        let am = pos.air_mass.unwrap();
        assert!(am >= 1.0 && am <= 2.0, "air mass {}", am);
    }

    #[test]
    fn test_refraction_magnitude() {
        // ~34 arcmin at the horizon, a few arcmin at 10 degrees, negligible
        // high up.
        assert_abs_diff_eq!(refraction_arcmin(0.0), 34.5, epsilon = 6.0);
        assert_abs_diff_eq!(refraction_arcmin(10.0), 5.4, epsilon = 1.0);
        assert!(refraction_arcmin(60.0) < 1.0);
        assert_eq!(refraction_arcmin(-10.0), 0.0);
    }

    #[test]
    fn test_air_mass() {
        assert_abs_diff_eq!(air_mass(90.0).unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(air_mass(30.0).unwrap(), 2.0, epsilon = 0.001);
        // Kasten-Young regime.
        assert_abs_diff_eq!(air_mass(10.0).unwrap(), 5.59, epsilon = 0.05);
        assert_abs_diff_eq!(air_mass(1.0).unwrap(), 24.4, epsilon = 2.0);
        // Undefined at and below the horizon.
        assert_eq!(air_mass(0.0), None);
        assert_eq!(air_mass(-5.0), None);
        // The storage sentinel sorts after any real air mass.
        assert!(AIRMASS_UNDEFINED > air_mass(0.001).unwrap());
    }

    #[test]
    fn test_continuity_across_secant_boundary() {
        let below = air_mass(19.999).unwrap();
        let above = air_mass(20.001).unwrap();
        assert_abs_diff_eq!(below, above, epsilon = 0.01);
    }

    #[test]
    fn test_julian_day_epoch() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let days = astro_time::days_since_j2000(&epoch);
        assert_abs_diff_eq!(julian_day_from_days(days), 2_451_545.0,
                            epsilon = 1e-6);
    }
}
