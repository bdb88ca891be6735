// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Session defaults and per-request observer context. Defaults are merged
//! into a request exactly once, up front, producing a fully resolved value
//! that the solver and query layers take by reference. Nothing downstream
//! consults defaults again.

use canonical_error::CanonicalError;
use chrono::DateTime;
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::astro_time;
use crate::horizon::ObserverSite;

/// Per-session fallback values for everything a request may omit. Immutable
/// once constructed; threaded explicitly to the request layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub location: String,
    pub latitude: f64,   // Degrees, north positive.
    pub longitude: f64,  // Degrees, east positive.
    pub date: String,    // "YYYY-MM-DD" in `zone`.
    pub time: String,    // "HH:MM" in `zone`.
    pub zone: String,    // IANA zone name.
    pub telescope: String,
    pub camera: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        SessionDefaults {
            location: "Stilwell, KS".to_string(),
            latitude: 38.7076,
            longitude: -94.7073,
            date: "2025-12-25".to_string(),
            time: "21:00".to_string(),
            zone: "America/Chicago".to_string(),
            telescope: "Astrophysics 130EDF F6.3".to_string(),
            camera: "ZWO ASI 2600MC Pro".to_string(),
        }
    }
}

impl SessionDefaults {
    /// Replaces the default observing date/time, typically with "now" in the
    /// default zone at session start.
    pub fn at(mut self, date: &str, time: &str) -> Self {
        self.date = date.to_string();
        self.time = time.to_string();
        self
    }
}

/// What a single request actually specified. Every field optional; an
/// external interpreter fills in whatever the request text carried.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObserverContext {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub zone: Option<String>,
}

impl ObserverContext {
    /// Merges in session defaults. Explicit values always win; latitude and
    /// longitude are taken pairwise, since one coordinate without the other
    /// is meaningless.
    pub fn resolved(&self, defaults: &SessionDefaults) -> ResolvedContext {
        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            (None, None) => (defaults.latitude, defaults.longitude),
            _ => {
                warn!("Partial coordinates in request (lat {:?}, lon {:?}); \
                       using defaults", self.latitude, self.longitude);
                (defaults.latitude, defaults.longitude)
            },
        };
        ResolvedContext {
            location: self.location.clone()
                .unwrap_or_else(|| defaults.location.clone()),
            site: ObserverSite::new(latitude, longitude),
            date: self.date.clone().unwrap_or_else(|| defaults.date.clone()),
            time: self.time.clone().unwrap_or_else(|| defaults.time.clone()),
            zone: self.zone.clone().unwrap_or_else(|| defaults.zone.clone()),
        }
    }
}

/// A request context with no holes. Produced once by
/// `ObserverContext::resolved()`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedContext {
    pub location: String,
    pub site: ObserverSite,
    pub date: String,
    pub time: String,
    pub zone: String,
}

impl ResolvedContext {
    /// The observing instant, as a zone-aware local time. Fails on a bad
    /// date/time/zone combination (including DST-gap instants).
    pub fn instant(&self) -> Result<DateTime<Tz>, CanonicalError> {
        astro_time::resolve_local(&self.date, &self.time, &self.zone)
    }
}
