//! Version-tagged layout table of the result format.
//!
//! Each revision lists its per-method value slots in on-disk order together with the name
//! the slot carried in that revision and the current [`Method`] it maps onto. Readers walk
//! the slots of the file's revision and store values by the current method, so a renamed
//! method never needs its own business logic. The remaining fields say which body sections a
//! revision stores and where, and the reader takes every branch from them. Mapping only goes
//! from old positions to current semantics; the writer always emits [`CURRENT_VERSION`].

use crate::core::models::method::Method;

pub const CURRENT_VERSION: i32 = 3;

/// One per-method block in a given revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSlot {
    /// Field name used by the revision that introduced this position.
    pub legacy_name: &'static str,
    pub method: Method,
}

impl MethodSlot {
    /// Whether the slot's on-disk name differs from the current method name.
    pub fn is_renamed(&self) -> bool {
        self.legacy_name != current_name(self.method)
    }
}

/// Where a revision stores the tortuosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TortuosityField {
    /// Right after the method flags, ahead of every permeability block.
    Leading,
    /// After the outlet pores, followed by the corrected Darcy value. Either may be missing.
    Trailing,
}

/// How much of each per-method permeability block a revision stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermeabilityLayout {
    /// Raw Darcy only; everything else is derived from the tortuosity.
    Raw,
    /// Raw and corrected Darcy; milli-Darcy values are derived.
    RawCorrected,
    /// Raw and corrected values in both Darcy and milli-Darcy.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRevision {
    pub version: i32,
    pub method_slots: &'static [MethodSlot],
    /// Per-method flags are stored (absent in the Darcy-only first revision).
    pub method_flags: bool,
    pub tortuosity: TortuosityField,
    pub permeability: PermeabilityLayout,
    pub kozeny_carman: bool,
    /// Each method carries its own pressure field; otherwise used methods share one.
    pub per_method_pressures: bool,
    pub timestamp: bool,
}

const fn slot(legacy_name: &'static str, method: Method) -> MethodSlot {
    MethodSlot {
        legacy_name,
        method,
    }
}

const V1_SLOTS: &[MethodSlot] = &[slot("darcy", Method::Darcy)];

const V2_SLOTS: &[MethodSlot] = &[
    slot("darcy", Method::Darcy),
    slot("lattice-boltzmann", Method::LatticeBoltzmann),
    slot("forchheimer", Method::NavierStokes),
];

const V3_SLOTS: &[MethodSlot] = &[
    slot("darcy", Method::Darcy),
    slot("lattice-boltzmann", Method::LatticeBoltzmann),
    slot("navier-stokes", Method::NavierStokes),
];

pub const REVISIONS: &[FormatRevision] = &[
    FormatRevision {
        version: 1,
        method_slots: V1_SLOTS,
        method_flags: false,
        tortuosity: TortuosityField::Trailing,
        permeability: PermeabilityLayout::Raw,
        kozeny_carman: false,
        per_method_pressures: false,
        timestamp: false,
    },
    FormatRevision {
        version: 2,
        method_slots: V2_SLOTS,
        method_flags: true,
        tortuosity: TortuosityField::Leading,
        permeability: PermeabilityLayout::RawCorrected,
        kozeny_carman: false,
        per_method_pressures: false,
        timestamp: false,
    },
    FormatRevision {
        version: CURRENT_VERSION,
        method_slots: V3_SLOTS,
        method_flags: true,
        tortuosity: TortuosityField::Leading,
        permeability: PermeabilityLayout::Full,
        kozeny_carman: true,
        per_method_pressures: true,
        timestamp: true,
    },
];

pub fn revision(version: i32) -> Option<&'static FormatRevision> {
    REVISIONS.iter().find(|r| r.version == version)
}

pub fn current() -> &'static FormatRevision {
    &REVISIONS[REVISIONS.len() - 1]
}

pub fn supported_versions() -> impl Iterator<Item = i32> {
    REVISIONS.iter().map(|r| r.version)
}

/// Comma-separated list of the readable versions, for diagnostics.
pub fn supported_versions_label() -> String {
    supported_versions()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn current_name(method: Method) -> &'static str {
    V3_SLOTS
        .iter()
        .find(|s| s.method == method)
        .map_or("", |s| s.legacy_name)
}
