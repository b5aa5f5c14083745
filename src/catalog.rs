//! Static registry of the selectable target characters.
//!
//! Presets are grouped by category and identified by a (category, id)
//! pair; each entry carries a display name and the web path its image is
//! served from. The registry is immutable and built once at first access.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::SwapError;

#[derive(Debug, Clone, Serialize)]
pub struct PresetEntry {
    pub path: &'static str,
    pub name: &'static str,
}

pub type Catalog = BTreeMap<&'static str, BTreeMap<&'static str, PresetEntry>>;

static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    let mut male = BTreeMap::new();
    male.insert(
        "soldier",
        PresetEntry {
            path: "/static/roles/male/soldier.jpg",
            name: "Soldier",
        },
    );
    male.insert(
        "doctor",
        PresetEntry {
            path: "/static/roles/male/doctor.png",
            name: "Doctor",
        },
    );
    male.insert(
        "teacher",
        PresetEntry {
            path: "/static/roles/male/teacher.jpg",
            name: "Teacher",
        },
    );

    let mut female = BTreeMap::new();
    female.insert(
        "nurse",
        PresetEntry {
            path: "/static/roles/female/nurse.jpg",
            name: "Nurse",
        },
    );
    female.insert(
        "doctor",
        PresetEntry {
            path: "/static/roles/female/doctor.jpg",
            name: "Doctor",
        },
    );
    female.insert(
        "teacher",
        PresetEntry {
            path: "/static/roles/female/teacher.jpeg",
            name: "Teacher",
        },
    );

    let mut catalog = BTreeMap::new();
    catalog.insert("male", male);
    catalog.insert("female", female);
    catalog
});

/// The whole registry, for `/api/roles`.
pub fn all() -> &'static Catalog {
    &CATALOG
}

/// Resolve a (category, id) pair to the preset image's file-system path.
/// Fails with `UnknownPreset` before any image work happens.
pub fn resolve(gender: &str, role: &str, asset_root: &Path) -> Result<PathBuf, SwapError> {
    let entry = CATALOG
        .get(gender)
        .and_then(|roles| roles.get(role))
        .ok_or_else(|| SwapError::UnknownPreset {
            gender: gender.to_string(),
            role: role.to_string(),
        })?;

    Ok(asset_root.join(entry.path.trim_start_matches('/')))
}
