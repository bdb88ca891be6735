// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! The bulk localization pass: flattens every catalog target with its
//! observer-relative geometry for one (site, instant) request, and exposes
//! the field-addressable query surface an externally generated filter
//! predicate selects against.

use canonical_error::{CanonicalError, invalid_argument_error};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::astro_time::{format_utc_iso, local_day_start_utc};
use crate::catalog::{CelestialTarget, ObjectClass, ObjectType};
use crate::horizon::{self, ObserverSite, AIRMASS_UNDEFINED};
use crate::riseset;

/// A catalog target flattened with its localized geometry. Computed fresh
/// per request; never reused across (site, instant) pairs. Time fields are
/// UTC ISO-8601 with a literal Z so lexical string ordering matches
/// chronological ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalizedDso {
    pub dso_id: String,
    pub catalog: String,
    pub name: String,
    pub ra_dd: f64,
    pub dec_dd: f64,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub class: ObjectClass,
    pub vis_mag: f64,
    pub maj_axis: f64,  // Arcminutes.
    pub min_axis: f64,  // Arcminutes.
    pub size: String,
    pub constellation: String,
    pub constellation_abbr: String,

    pub altitude: Option<f64>,  // Apparent, degrees.
    pub azimuth: Option<f64>,   // Degrees clockwise from north.
    pub air_mass: Option<f64>,  // None when altitude is absent or <= 0.
    pub visible: bool,
    pub rise_time: Option<String>,
    pub transit_time: Option<String>,
    pub set_time: Option<String>,
    pub circumpolar: bool,
    pub never_visible: bool,
}

/// The exact field names a filter predicate may reference.
pub const QUERY_FIELDS: [&str; 19] = [
    "dso_id", "catalog", "name", "ra_dd", "dec_dd", "type", "class",
    "vis_mag", "maj_axis", "min_axis", "size", "constellation",
    "constellation_abbr", "altitude", "azimuth", "air_mass",
    "rise_time", "transit_time", "set_time",
];

/// A field's value as seen by a predicate. Absent geometry is `Null`, which
/// any comparison treats as non-matching.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
}

impl LocalizedDso {
    fn from_target(target: &CelestialTarget) -> Self {
        LocalizedDso {
            dso_id: target.id.clone(),
            catalog: target.catalog.clone(),
            name: target.name.clone(),
            ra_dd: target.ra_deg,
            dec_dd: target.dec_deg,
            object_type: target.object_type,
            class: target.class,
            vis_mag: target.vis_mag,
            maj_axis: target.maj_axis_arcmin,
            min_axis: target.min_axis_arcmin,
            size: target.size.clone(),
            constellation: target.constellation.clone(),
            constellation_abbr: target.constellation_abbr.clone(),
            altitude: None,
            azimuth: None,
            air_mass: None,
            visible: false,
            rise_time: None,
            transit_time: None,
            set_time: None,
            circumpolar: false,
            never_visible: false,
        }
    }

    /// Looks up one of `QUERY_FIELDS` by name. An unknown name is an error
    /// (a predicate referencing it was built against the wrong schema).
    pub fn field(&self, name: &str) -> Result<FieldValue, CanonicalError> {
        let text = |s: &str| Ok(FieldValue::Text(s.to_string()));
        let number = |n: f64| Ok(FieldValue::Number(n));
        let opt_number = |n: Option<f64>| {
            Ok(n.map_or(FieldValue::Null, FieldValue::Number))
        };
        let opt_text = |s: &Option<String>| {
            Ok(s.as_ref().map_or(FieldValue::Null,
                                 |s| FieldValue::Text(s.clone())))
        };
        match name {
            "dso_id" => text(&self.dso_id),
            "catalog" => text(&self.catalog),
            "name" => text(&self.name),
            "ra_dd" => number(self.ra_dd),
            "dec_dd" => number(self.dec_dd),
            "type" => text(self.object_type.abbr()),
            "class" => text(self.class.abbr()),
            "vis_mag" => number(self.vis_mag),
            "maj_axis" => number(self.maj_axis),
            "min_axis" => number(self.min_axis),
            "size" => text(&self.size),
            "constellation" => text(&self.constellation),
            "constellation_abbr" => text(&self.constellation_abbr),
            "altitude" => opt_number(self.altitude),
            "azimuth" => opt_number(self.azimuth),
            "air_mass" => opt_number(self.air_mass),
            "rise_time" => opt_text(&self.rise_time),
            "transit_time" => opt_text(&self.transit_time),
            "set_time" => opt_text(&self.set_time),
            _ => Err(invalid_argument_error(
                format!("Unknown query field {:?}", name).as_str())),
        }
    }

    /// Air mass as a plain number, for storage layers that cannot represent
    /// null. An undefined air mass maps to `AIRMASS_UNDEFINED`, which sorts
    /// after every real value.
    pub fn air_mass_for_storage(&self) -> f64 {
        self.air_mass.unwrap_or(AIRMASS_UNDEFINED)
    }
}

/// An opaque caller-supplied filter over `LocalizedDso` records. Produced
/// by an external interpretation collaborator; this crate never inspects
/// its structure, only applies it.
pub trait FilterPredicate: Send + Sync {
    fn matches(&self, dso: &LocalizedDso) -> Result<bool, CanonicalError>;
}

impl<F> FilterPredicate for F
where F: Fn(&LocalizedDso) -> Result<bool, CanonicalError> + Send + Sync {
    fn matches(&self, dso: &LocalizedDso) -> Result<bool, CanonicalError> {
        self(dso)
    }
}

/// Localizes every target for the given site and instant. Either being
/// absent is not an error: the static attributes are still returned and
/// every geometry field stays `None`. The pass is parallel across targets;
/// result order matches catalog order.
pub fn localize_catalog<Z: TimeZone>(targets: &[CelestialTarget],
                                     site: Option<&ObserverSite>,
                                     instant: Option<&DateTime<Z>>)
                                     -> Vec<LocalizedDso> {
    let geometry = match (site, instant) {
        (Some(site), Some(instant)) => {
            Some((*site, instant.with_timezone(&Utc),
                  local_day_start_utc(instant)))
        },
        _ => None,
    };
    targets.par_iter()
        .map(|target| localize_one(target, &geometry))
        .collect()
}

fn localize_one(target: &CelestialTarget,
                geometry: &Option<(ObserverSite, DateTime<Utc>, DateTime<Utc>)>)
                -> LocalizedDso {
    let mut dso = LocalizedDso::from_target(target);
    let (site, utc, day_start) = match geometry {
        Some(g) => g,
        None => return dso,
    };

    let pos = horizon::observe(target.ra_deg, target.dec_deg, site, utc);
    dso.altitude = Some(pos.altitude);
    dso.azimuth = Some(pos.azimuth);
    dso.air_mass = pos.air_mass;
    dso.visible = pos.visible;

    let events =
        riseset::rise_transit_set(target.ra_deg, target.dec_deg, site,
                                  day_start);
    dso.rise_time = events.rise.as_ref().map(format_utc_iso);
    dso.transit_time = events.transit.as_ref().map(format_utc_iso);
    dso.set_time = events.set.as_ref().map(format_utc_iso);
    dso.circumpolar = events.circumpolar;
    dso.never_visible = events.never_visible;
    dso
}

/// Applies a filter predicate to a localized batch. A predicate failure on
/// any record fails the whole request; there is no partial result.
pub fn query_localized(localized: &[LocalizedDso],
                       predicate: &dyn FilterPredicate)
                       -> Result<Vec<LocalizedDso>, CanonicalError> {
    let mut selected = Vec::new();
    for dso in localized {
        if predicate.matches(dso)? {
            selected.push(dso.clone());
        }
    }
    Ok(selected)
}

/// One point of a night-long altitude track, for charting.
#[derive(Clone, Debug, Serialize)]
pub struct AltitudePoint {
    pub time: String,  // Local instant with its fixed offset, RFC3339.
    pub hour: u32,     // Hours from the series start.
    pub altitude: f64,
    pub azimuth: f64,
    pub air_mass: Option<f64>,
}

/// Samples a target's apparent position hourly from `start`, for plotting
/// its track across a night.
pub fn altitude_series(ra_deg: f64, dec_deg: f64, site: &ObserverSite,
                       start: &DateTime<FixedOffset>, hours: u32)
                       -> Vec<AltitudePoint> {
    (0..hours).map(|hour| {
        let t = *start + Duration::hours(hour as i64);
        let pos = horizon::observe(ra_deg, dec_deg, site,
                                   &t.with_timezone(&Utc));
        AltitudePoint {
            time: t.to_rfc3339(),
            hour,
            altitude: pos.altitude,
            azimuth: pos.azimuth,
            air_mass: pos.air_mass,
        }
    }).collect()
}
