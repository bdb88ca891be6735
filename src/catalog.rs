// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Static deep-sky catalog data model and the read-only interface a storage
//! collaborator implements. Targets are fixed-sky J2000 positions; nothing
//! here depends on an observer or an instant.

use std::collections::HashMap;

use canonical_error::{CanonicalError, invalid_argument_error};
use serde::{Deserialize, Serialize};

/// Coarse classification, matching the catalog database's class column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Galaxy,
    Nebula,
    Cluster,
    DoubleStar,
    Other,
}

impl ObjectClass {
    /// The database abbreviation for this class.
    pub fn abbr(&self) -> &'static str {
        match self {
            ObjectClass::Galaxy => "Gal",
            ObjectClass::Nebula => "Neb",
            ObjectClass::Cluster => "Cls",
            ObjectClass::DoubleStar => "DS",
            ObjectClass::Other => "OTH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectClass::Galaxy => "Galaxy",
            ObjectClass::Nebula => "Nebula",
            ObjectClass::Cluster => "Cluster",
            ObjectClass::DoubleStar => "Double Star",
            ObjectClass::Other => "Other",
        }
    }

    pub fn from_abbr(abbr: &str) -> Result<Self, CanonicalError> {
        match abbr {
            "Gal" => Ok(ObjectClass::Galaxy),
            "Neb" => Ok(ObjectClass::Nebula),
            "Cls" => Ok(ObjectClass::Cluster),
            "DS" => Ok(ObjectClass::DoubleStar),
            "OTH" => Ok(ObjectClass::Other),
            _ => Err(invalid_argument_error(
                format!("Unknown object class {:?}", abbr).as_str())),
        }
    }
}

/// Finer classification, matching the catalog database's type column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    OpenCluster,
    GlobularCluster,
    PlanetaryNebula,
    EmissionNebula,
    ReflectionNebula,
    ClusterWithNebulosity,
    DarkNebula,
    SupernovaRemnant,
    Galaxy,
    Other,
}

impl ObjectType {
    /// The database abbreviation for this type.
    pub fn abbr(&self) -> &'static str {
        match self {
            ObjectType::OpenCluster => "OC",
            ObjectType::GlobularCluster => "GC",
            ObjectType::PlanetaryNebula => "PN",
            ObjectType::EmissionNebula => "HII",
            ObjectType::ReflectionNebula => "RN",
            ObjectType::ClusterWithNebulosity => "C+N",
            ObjectType::DarkNebula => "DN",
            ObjectType::SupernovaRemnant => "SNR",
            ObjectType::Galaxy => "Gx",
            ObjectType::Other => "OTH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectType::OpenCluster => "Open Cluster",
            ObjectType::GlobularCluster => "Globular Cluster",
            ObjectType::PlanetaryNebula => "Planetary Nebula",
            ObjectType::EmissionNebula => "Emission Nebula",
            ObjectType::ReflectionNebula => "Reflection Nebula",
            ObjectType::ClusterWithNebulosity => "Cluster with Nebulosity",
            ObjectType::DarkNebula => "Dark Nebula",
            ObjectType::SupernovaRemnant => "Supernova Remnant",
            ObjectType::Galaxy => "Galaxy",
            ObjectType::Other => "Other",
        }
    }

    pub fn from_abbr(abbr: &str) -> Result<Self, CanonicalError> {
        match abbr {
            "OC" => Ok(ObjectType::OpenCluster),
            "GC" => Ok(ObjectType::GlobularCluster),
            "PN" => Ok(ObjectType::PlanetaryNebula),
            "HII" => Ok(ObjectType::EmissionNebula),
            "RN" => Ok(ObjectType::ReflectionNebula),
            "C+N" => Ok(ObjectType::ClusterWithNebulosity),
            "DN" => Ok(ObjectType::DarkNebula),
            "SNR" => Ok(ObjectType::SupernovaRemnant),
            "Gx" => Ok(ObjectType::Galaxy),
            "OTH" => Ok(ObjectType::Other),
            _ => Err(invalid_argument_error(
                format!("Unknown object type {:?}", abbr).as_str())),
        }
    }

    /// The coarse class this type belongs to.
    pub fn broad_class(&self) -> ObjectClass {
        match self {
            ObjectType::OpenCluster
            | ObjectType::GlobularCluster
            | ObjectType::ClusterWithNebulosity => ObjectClass::Cluster,
            ObjectType::PlanetaryNebula
            | ObjectType::EmissionNebula
            | ObjectType::ReflectionNebula
            | ObjectType::DarkNebula
            | ObjectType::SupernovaRemnant => ObjectClass::Nebula,
            ObjectType::Galaxy => ObjectClass::Galaxy,
            ObjectType::Other => ObjectClass::Other,
        }
    }
}

/// One catalog row. Created when the catalog loads and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialTarget {
    pub id: String,       // Unique within the catalog, e.g. "M31".
    pub catalog: String,  // Primary designation with prefix, e.g. "M 31".
    pub name: String,     // Display name, e.g. "Andromeda Galaxy".
    pub ra_deg: f64,      // J2000 right ascension, decimal degrees [0, 360).
    pub dec_deg: f64,     // J2000 declination, decimal degrees [-90, 90].
    pub class: ObjectClass,
    pub object_type: ObjectType,
    pub constellation: String,
    pub constellation_abbr: String,  // Standard 3-letter form.
    pub vis_mag: f64,
    pub maj_axis_arcmin: f64,
    pub min_axis_arcmin: f64,
    pub size: String,  // Textual size, e.g. "178x63". Arcminutes.
}

impl CelestialTarget {
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.id.is_empty() {
            return Err(invalid_argument_error("Target id must be non-empty"));
        }
        if !(0.0..360.0).contains(&self.ra_deg) {
            return Err(invalid_argument_error(
                format!("Target {} RA {} outside [0, 360)",
                        self.id, self.ra_deg).as_str()));
        }
        if !(-90.0..=90.0).contains(&self.dec_deg) {
            return Err(invalid_argument_error(
                format!("Target {} Dec {} outside [-90, 90]",
                        self.id, self.dec_deg).as_str()));
        }
        Ok(())
    }
}

/// Read-only view of a loaded catalog. The storage layer behind an
/// implementation (files, database, network) is outside this crate.
pub trait TargetCatalog {
    fn targets(&self) -> &[CelestialTarget];

    fn get(&self, id: &str) -> Option<&CelestialTarget>;

    fn len(&self) -> usize {
        self.targets().len()
    }

    fn is_empty(&self) -> bool {
        self.targets().is_empty()
    }
}

/// Vec-backed catalog with an id index. Suitable for embedding and tests.
pub struct MemoryCatalog {
    targets: Vec<CelestialTarget>,
    by_id: HashMap<String, usize>,
}

impl MemoryCatalog {
    /// Validates every row and rejects duplicate ids.
    pub fn new(targets: Vec<CelestialTarget>) -> Result<Self, CanonicalError> {
        let mut by_id = HashMap::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            target.validate()?;
            if by_id.insert(target.id.clone(), index).is_some() {
                return Err(invalid_argument_error(
                    format!("Duplicate target id {:?}", target.id).as_str()));
            }
        }
        Ok(MemoryCatalog { targets, by_id })
    }
}

impl TargetCatalog for MemoryCatalog {
    fn targets(&self) -> &[CelestialTarget] {
        &self.targets
    }

    fn get(&self, id: &str) -> Option<&CelestialTarget> {
        self.by_id.get(id).map(|&index| &self.targets[index])
    }
}

#[cfg(test)]
pub(crate) fn test_target(id: &str, ra_deg: f64, dec_deg: f64)
                          -> CelestialTarget {
    CelestialTarget {
        id: id.to_string(),
        catalog: id.to_string(),
        name: id.to_string(),
        ra_deg,
        dec_deg,
        class: ObjectClass::Galaxy,
        object_type: ObjectType::Galaxy,
        constellation: "Andromeda".to_string(),
        constellation_abbr: "And".to_string(),
        vis_mag: 3.4,
        maj_axis_arcmin: 178.0,
        min_axis_arcmin: 63.0,
        size: "178x63".to_string(),
    }
}
