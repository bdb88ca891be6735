// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Finds the rise, meridian transit, and set events of a fixed-sky position
//! that belong to a given observer calendar day, and classifies objects that
//! never cross the horizon as circumpolar or never-visible.
//!
//! The search window is anchored at local midnight of the target day. A
//! naive forward search can legitimately return an event on the following
//! day; events are accepted only inside the day's window, with a backward
//! search fallback to recover an event that began before midnight.

use std::collections::HashMap;
use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use log::warn;

use crate::astro_time::{datetime_from_days, days_since_j2000};
use crate::horizon::{self, ObserverSite};

/// Sidereal days per solar day.
pub const SIDEREAL_RATE: f64 = 1.00273790935;

/// Coarse sampling step for the crossing search. A fixed star's altitude
/// changes by at most ~2.5 degrees over this span, so no horizon crossing
/// can be skipped.
const SEARCH_STEP_DAYS: f64 = 10.0 / 1440.0;

/// Bisection iterations after a bracketing interval is found. 30 halvings of
/// a 10 minute interval locate the event well below 1 millisecond.
const BISECTION_ITERATIONS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingDirection {
    /// The function passes from negative to non-negative.
    Rising,
    /// The function passes from positive to non-positive.
    Setting,
}

/// The day's horizon events for one target. `rise` and `set` are present
/// together for an ordinary object; otherwise exactly one of `circumpolar`
/// or `never_visible` is set. `transit` may independently be absent when the
/// meridian crossing falls outside the search window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiseTransitSet {
    pub rise: Option<DateTime<Utc>>,
    pub transit: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    pub circumpolar: bool,
    pub never_visible: bool,
}

impl RiseTransitSet {
    fn not_visible() -> Self {
        RiseTransitSet { rise: None, transit: None, set: None,
                         circumpolar: false, never_visible: true }
    }
}

/// Searches forward from `start_days` (days since J2000) for the first
/// zero crossing of `f` in the given direction, sampling coarsely and then
/// bisecting. Returns the crossing time, or None if no crossing occurs
/// within `limit_days`.
pub fn search_crossing<F>(f: &F, start_days: f64, limit_days: f64,
                          direction: CrossingDirection) -> Option<f64>
where F: Fn(f64) -> f64 {
    let end = start_days + limit_days;
    let mut t0 = start_days;
    let mut f0 = f(t0);
    while t0 < end {
        let t1 = (t0 + SEARCH_STEP_DAYS).min(end);
        let f1 = f(t1);
        let bracketed = match direction {
            CrossingDirection::Rising => f0 < 0.0 && f1 >= 0.0,
            CrossingDirection::Setting => f0 > 0.0 && f1 <= 0.0,
        };
        if bracketed {
            let (mut lo, mut hi) = (t0, t1);
            for _ in 0..BISECTION_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                let crossed = match direction {
                    CrossingDirection::Rising => f(mid) >= 0.0,
                    CrossingDirection::Setting => f(mid) <= 0.0,
                };
                if crossed { hi = mid } else { lo = mid }
            }
            return Some(0.5 * (lo + hi));
        }
        t0 = t1;
        f0 = f1;
    }
    None
}

/// WGS84 Earth radius at the given latitude, meters.
fn earth_radius_wgs84(lat_deg: f64) -> f64 {
    const A: f64 = 6_378_137.0;       // Equatorial radius.
    const B: f64 = 6_356_752.314245;  // Polar radius.
    let phi = lat_deg.to_radians();
    let (sin, cos) = (phi.sin(), phi.cos());
    let numerator = (A * A * cos).powi(2) + (B * B * sin).powi(2);
    let denominator = (A * cos).powi(2) + (B * sin).powi(2);
    (numerator / denominator).sqrt()
}

/// Dip of the apparent horizon below the geometric horizon for an elevated
/// observer, degrees.
fn horizon_dip_deg(site: &ObserverSite) -> f64 {
    if site.elevation.abs() < 1e-5 {
        return 0.0;
    }
    let r = earth_radius_wgs84(site.latitude);
    let ratio = (r / (r + site.elevation.abs())).clamp(-1.0, 1.0);
    let dip = ratio.acos().to_degrees();
    if site.elevation > 0.0 { dip } else { -dip }
}

/// Geometric altitude at which an object's center appears on the observer's
/// horizon: 34 arcmin of standard refraction, plus the horizon dip from the
/// observer's elevation.
pub fn horizon_crossing_altitude(site: &ObserverSite) -> f64 {
    -34.0 / 60.0 - horizon_dip_deg(site)
}

fn star_altitude(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
                 t_days: f64) -> f64 {
    let (alt, _az, _ha) = horizon::geometric_alt_az(
        ra_deg, dec_deg, site, &datetime_from_days(t_days));
    alt
}

/// Returns the first meridian crossing (hour angle zero) at or after
/// `start_days`, in days since J2000. Computed from the current hour angle
/// and the sidereal rate, then refined.
pub fn transit_after(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
                     start_days: f64) -> f64 {
    let hour_angle = |t: f64| {
        horizon::geometric_alt_az(ra_deg, dec_deg, site,
                                  &datetime_from_days(t)).2
    };
    let ha0 = hour_angle(start_days);
    let to_meridian = if ha0 <= 0.0 { -ha0 } else { 2.0 * PI - ha0 };
    let mut t = start_days + to_meridian / (2.0 * PI) / SIDEREAL_RATE;
    for _ in 0..3 {
        t -= hour_angle(t) / (2.0 * PI) / SIDEREAL_RATE;
    }
    t
}

/// Accepts a found event only if it lies within `[day_start, day_start +
/// window_days)`. A forward search that strayed outside the window triggers
/// a backward-anchored retry from one day before the anchor, recovering an
/// event that began before midnight but still belongs to the target day.
fn accept_in_window<F>(candidate: Option<f64>, f: &F, day_start: f64,
                       window_days: f64, direction: CrossingDirection)
                       -> Option<f64>
where F: Fn(f64) -> f64 {
    let in_window =
        |t: &f64| *t >= day_start && *t < day_start + window_days;
    match candidate {
        Some(t) if in_window(&t) => Some(t),
        Some(_) => {
            search_crossing(f, day_start - 1.0, 2.0, direction)
                .filter(in_window)
        },
        None => None,
    }
}

/// Finds the rise, transit, and set of a J2000 position for the calendar
/// day beginning at `day_start` (local midnight, already UTC-resolved).
///
/// Rise is accepted within one day of the anchor; set and transit within
/// two days, since a set that chains a late same-day rise legitimately
/// falls after the following midnight. When rise or set is missing, the
/// altitude at transit decides circumpolar versus never-visible; that check
/// is authoritative, since a missing event can also mean the search window
/// missed one.
pub fn rise_transit_set(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
                        day_start: &DateTime<Utc>) -> RiseTransitSet {
    if !ra_deg.is_finite() || !dec_deg.is_finite() {
        warn!("Non-finite coordinates ra={} dec={}; target marked not visible",
              ra_deg, dec_deg);
        return RiseTransitSet::not_visible();
    }

    let d0 = days_since_j2000(day_start);
    let crossing_alt = horizon_crossing_altitude(site);
    let alt = |t: f64| star_altitude(ra_deg, dec_deg, site, t) - crossing_alt;

    let rise_cand = search_crossing(&alt, d0, 1.0, CrossingDirection::Rising);
    let rise = accept_in_window(rise_cand, &alt, d0, 1.0,
                                CrossingDirection::Rising);

    let set_anchor = rise.unwrap_or(d0);
    let set_cand = search_crossing(&alt, set_anchor, 2.0,
                                   CrossingDirection::Setting);
    let set = accept_in_window(set_cand, &alt, d0, 2.0,
                               CrossingDirection::Setting);

    let transit_days = transit_after(ra_deg, dec_deg, site, rise.unwrap_or(d0));
    let transit = if transit_days >= d0 && transit_days < d0 + 2.0 {
        Some(transit_days)
    } else {
        None
    };

    let mut circumpolar = false;
    let mut never_visible = false;
    if rise.is_none() || set.is_none() {
        match transit {
            Some(t) => {
                let transit_alt = star_altitude(ra_deg, dec_deg, site, t);
                let apparent =
                    transit_alt + horizon::refraction_arcmin(transit_alt) / 60.0;
                if apparent > 0.0 {
                    circumpolar = true;
                } else {
                    never_visible = true;
                }
            },
            None => never_visible = true,
        }
    }

    RiseTransitSet {
        rise: rise.map(datetime_from_days),
        transit: transit.map(datetime_from_days),
        set: set.map(datetime_from_days),
        circumpolar,
        never_visible,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    ra: u64,
    dec: u64,
    lat: u64,
    lon: u64,
    elev: u64,
    day_start_ms: i64,
}

/// Memo cache for day-granularity rise/transit/set results, keyed by the
/// exact input value tuple. The inputs are immutable values and the search
/// is pure, so entries never need invalidation. Useful for callers that
/// revisit the same (target, site, day), e.g. charting.
#[derive(Debug, Default)]
pub struct RiseSetCache {
    entries: HashMap<CacheKey, RiseTransitSet>,
}

impl RiseSetCache {
    pub fn new() -> Self {
        RiseSetCache { entries: HashMap::new() }
    }

    pub fn rise_transit_set(&mut self, ra_deg: f64, dec_deg: f64,
                            site: &ObserverSite, day_start: &DateTime<Utc>)
                            -> RiseTransitSet {
        let key = CacheKey {
            ra: ra_deg.to_bits(),
            dec: dec_deg.to_bits(),
            lat: site.latitude.to_bits(),
            lon: site.longitude.to_bits(),
            elev: site.elevation.to_bits(),
            day_start_ms: day_start.timestamp_millis(),
        };
        self.entries.entry(key)
            .or_insert_with(|| rise_transit_set(ra_deg, dec_deg, site,
                                                day_start))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
