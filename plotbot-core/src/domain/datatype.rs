//! Data-type keys and the static per-type schema table.
//!
//! `DataTypeKey` is the closed set of data types the cache knows about. The
//! one place a string becomes a key is `FromStr`; everything downstream
//! matches on the enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of one singleton data-type instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataTypeKey {
    #[serde(rename = "mag_RTN_4sa")]
    MagRtn4sa,
    #[serde(rename = "mag_RTN")]
    MagRtn,
    #[serde(rename = "mag_SC_4sa")]
    MagSc4sa,
    #[serde(rename = "mag_SC")]
    MagSc,
    #[serde(rename = "spi_sf00_l3_mom")]
    ProtonMoments,
    #[serde(rename = "spi_af00_L3_mom")]
    AlphaMoments,
    #[serde(rename = "spe_sf0_pad")]
    ElectronPad,
    #[serde(rename = "sf00_fits")]
    ProtonFits,
    #[serde(rename = "sf01_fits")]
    AlphaFits,
    #[serde(rename = "ham")]
    Hammerhead,
    #[serde(rename = "psp_orbit_data")]
    Orbit,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown data type '{0}'")]
pub struct UnknownDataType(pub String);

impl DataTypeKey {
    pub const ALL: [DataTypeKey; 11] = [
        DataTypeKey::MagRtn4sa,
        DataTypeKey::MagRtn,
        DataTypeKey::MagSc4sa,
        DataTypeKey::MagSc,
        DataTypeKey::ProtonMoments,
        DataTypeKey::AlphaMoments,
        DataTypeKey::ElectronPad,
        DataTypeKey::ProtonFits,
        DataTypeKey::AlphaFits,
        DataTypeKey::Hammerhead,
        DataTypeKey::Orbit,
    ];

    pub fn as_str(&self) -> &'static str {
        self.spec().key
    }

    /// Static schema for this data type.
    pub fn spec(&self) -> &'static DataTypeSpec {
        match self {
            DataTypeKey::MagRtn4sa => &MAG_RTN_4SA,
            DataTypeKey::MagRtn => &MAG_RTN,
            DataTypeKey::MagSc4sa => &MAG_SC_4SA,
            DataTypeKey::MagSc => &MAG_SC,
            DataTypeKey::ProtonMoments => &PROTON_MOMENTS,
            DataTypeKey::AlphaMoments => &ALPHA_MOMENTS,
            DataTypeKey::ElectronPad => &ELECTRON_PAD,
            DataTypeKey::ProtonFits => &PROTON_FITS,
            DataTypeKey::AlphaFits => &ALPHA_FITS,
            DataTypeKey::Hammerhead => &HAMMERHEAD,
            DataTypeKey::Orbit => &ORBIT,
        }
    }

    /// Resolve a snapshot class name back to its key.
    pub fn from_class_name(class_name: &str) -> Option<DataTypeKey> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.spec().class_name == class_name)
    }
}

impl FromStr for DataTypeKey {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownDataType(s.to_string()))
    }
}

impl fmt::Display for DataTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the upstream files for a data type are bounded in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageGranularity {
    /// One file per UTC day.
    Daily,
    /// One file per 6-hour block (full-cadence magnetometer).
    SixHourly,
    /// A single file spanning the mission.
    Unbounded,
}

/// One named field with its row width (1 = scalar, 3 = vector, N = spectrum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub width: usize,
}

/// Which scalar components stack, in order, into a combined vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSpec {
    pub combined: &'static str,
    pub components: &'static [&'static str],
}

/// Static description of one data type.
#[derive(Debug)]
pub struct DataTypeSpec {
    pub key: &'static str,
    /// Name recorded in snapshot segment metadata.
    pub class_name: &'static str,
    /// Typical sample spacing, used by synthetic sources and diagnostics.
    pub nominal_cadence_secs: f64,
    pub granularity: CoverageGranularity,
    pub fields: &'static [FieldSpec],
    pub vectors: &'static [VectorSpec],
}

impl DataTypeSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// The recombination entry `name` is the combined field of, if any.
    pub fn vector_for_combined(&self, name: &str) -> Option<&VectorSpec> {
        self.vectors.iter().find(|v| v.combined == name)
    }
}

const fn scalar(name: &'static str) -> FieldSpec {
    FieldSpec { name, width: 1 }
}

const fn vector(name: &'static str) -> FieldSpec {
    FieldSpec { name, width: 3 }
}

const fn spectrum(name: &'static str, width: usize) -> FieldSpec {
    FieldSpec { name, width }
}

// ── Magnetometer ────────────────────────────────────────────────────

const MAG_RTN_FIELDS: &[FieldSpec] = &[
    vector("all"),
    scalar("br"),
    scalar("bt"),
    scalar("bn"),
    scalar("bmag"),
    scalar("pmag"),
];
const MAG_RTN_VECTORS: &[VectorSpec] = &[VectorSpec {
    combined: "all",
    components: &["br", "bt", "bn"],
}];

const MAG_SC_FIELDS: &[FieldSpec] = &[
    vector("all"),
    scalar("bx"),
    scalar("by"),
    scalar("bz"),
    scalar("bmag"),
    scalar("pmag"),
];
const MAG_SC_VECTORS: &[VectorSpec] = &[VectorSpec {
    combined: "all",
    components: &["bx", "by", "bz"],
}];

static MAG_RTN_4SA: DataTypeSpec = DataTypeSpec {
    key: "mag_RTN_4sa",
    class_name: "mag_rtn_4sa_class",
    nominal_cadence_secs: 0.874,
    granularity: CoverageGranularity::Daily,
    fields: MAG_RTN_FIELDS,
    vectors: MAG_RTN_VECTORS,
};

static MAG_RTN: DataTypeSpec = DataTypeSpec {
    key: "mag_RTN",
    class_name: "mag_rtn_class",
    nominal_cadence_secs: 0.0034,
    granularity: CoverageGranularity::SixHourly,
    fields: MAG_RTN_FIELDS,
    vectors: MAG_RTN_VECTORS,
};

static MAG_SC_4SA: DataTypeSpec = DataTypeSpec {
    key: "mag_SC_4sa",
    class_name: "mag_sc_4sa_class",
    nominal_cadence_secs: 0.874,
    granularity: CoverageGranularity::Daily,
    fields: MAG_SC_FIELDS,
    vectors: MAG_SC_VECTORS,
};

static MAG_SC: DataTypeSpec = DataTypeSpec {
    key: "mag_SC",
    class_name: "mag_sc_class",
    nominal_cadence_secs: 0.0034,
    granularity: CoverageGranularity::SixHourly,
    fields: MAG_SC_FIELDS,
    vectors: MAG_SC_VECTORS,
};

// ── SPAN moments ────────────────────────────────────────────────────

static PROTON_MOMENTS: DataTypeSpec = DataTypeSpec {
    key: "spi_sf00_l3_mom",
    class_name: "proton_class",
    nominal_cadence_secs: 6.99,
    granularity: CoverageGranularity::Daily,
    fields: &[
        vector("velocity"),
        scalar("vr"),
        scalar("vt"),
        scalar("vn"),
        scalar("density"),
        scalar("temperature"),
        scalar("t_par"),
        scalar("t_perp"),
        scalar("anisotropy"),
        scalar("v_sw"),
        spectrum("energy_flux", 32),
        spectrum("theta_flux", 8),
        spectrum("phi_flux", 8),
    ],
    vectors: &[VectorSpec {
        combined: "velocity",
        components: &["vr", "vt", "vn"],
    }],
};

static ALPHA_MOMENTS: DataTypeSpec = DataTypeSpec {
    key: "spi_af00_L3_mom",
    class_name: "alpha_class",
    nominal_cadence_secs: 6.99,
    granularity: CoverageGranularity::Daily,
    fields: &[
        vector("velocity"),
        scalar("vr"),
        scalar("vt"),
        scalar("vn"),
        scalar("density"),
        scalar("temperature"),
    ],
    vectors: &[VectorSpec {
        combined: "velocity",
        components: &["vr", "vt", "vn"],
    }],
};

static ELECTRON_PAD: DataTypeSpec = DataTypeSpec {
    key: "spe_sf0_pad",
    class_name: "epad_strahl_class",
    nominal_cadence_secs: 13.98,
    granularity: CoverageGranularity::Daily,
    fields: &[spectrum("strahl", 12), scalar("centroids")],
    vectors: &[],
};

// ── Bi-Maxwellian fits and detections ───────────────────────────────

static PROTON_FITS: DataTypeSpec = DataTypeSpec {
    key: "sf00_fits",
    class_name: "proton_fits_class",
    nominal_cadence_secs: 6.99,
    granularity: CoverageGranularity::Daily,
    fields: &[
        scalar("np1"),
        scalar("np2"),
        vector("vp1"),
        scalar("vp1_r"),
        scalar("vp1_t"),
        scalar("vp1_n"),
        scalar("tperp1"),
        scalar("tpar1"),
        scalar("tperp2"),
        scalar("tpar2"),
        scalar("trat1"),
        scalar("qz_p"),
        scalar("chi_p"),
    ],
    vectors: &[VectorSpec {
        combined: "vp1",
        components: &["vp1_r", "vp1_t", "vp1_n"],
    }],
};

static ALPHA_FITS: DataTypeSpec = DataTypeSpec {
    key: "sf01_fits",
    class_name: "alpha_fits_class",
    nominal_cadence_secs: 6.99,
    granularity: CoverageGranularity::Daily,
    fields: &[
        scalar("na"),
        vector("va"),
        scalar("va_r"),
        scalar("va_t"),
        scalar("va_n"),
        scalar("tperp_a"),
        scalar("tpar_a"),
        scalar("trat_a"),
        scalar("chi_a"),
    ],
    vectors: &[VectorSpec {
        combined: "va",
        components: &["va_r", "va_t", "va_n"],
    }],
};

static HAMMERHEAD: DataTypeSpec = DataTypeSpec {
    key: "ham",
    class_name: "ham_class",
    nominal_cadence_secs: 60.0,
    granularity: CoverageGranularity::Daily,
    fields: &[
        scalar("hamogram_30s"),
        scalar("hamogram_2m"),
        scalar("n_ham"),
        scalar("n_core"),
        scalar("trat_ham"),
        scalar("trat_core"),
        scalar("ham_core_drift"),
    ],
    vectors: &[],
};

static ORBIT: DataTypeSpec = DataTypeSpec {
    key: "psp_orbit_data",
    class_name: "orbit_class",
    nominal_cadence_secs: 3600.0,
    granularity: CoverageGranularity::Unbounded,
    fields: &[
        scalar("r_sun"),
        scalar("carrington_lon"),
        scalar("carrington_lat"),
        scalar("orbital_speed"),
    ],
    vectors: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_roundtrips_through_its_string() {
        for key in DataTypeKey::ALL {
            assert_eq!(key.as_str().parse::<DataTypeKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "mag_rtn_4sa".parse::<DataTypeKey>().unwrap_err();
        assert_eq!(err, UnknownDataType("mag_rtn_4sa".into()));
    }

    #[test]
    fn serde_uses_the_wire_names() {
        let json = serde_json::to_string(&DataTypeKey::ProtonMoments).unwrap();
        assert_eq!(json, "\"spi_sf00_l3_mom\"");
    }

    #[test]
    fn vector_components_are_declared_scalar_fields() {
        for key in DataTypeKey::ALL {
            let spec = key.spec();
            for v in spec.vectors {
                let combined = spec.field(v.combined).expect("combined field declared");
                assert_eq!(combined.width, v.components.len());
                for c in v.components {
                    assert_eq!(spec.field(c).map(|f| f.width), Some(1), "{key}.{c}");
                }
            }
        }
    }

    #[test]
    fn class_names_are_unique_and_resolvable() {
        for key in DataTypeKey::ALL {
            assert_eq!(DataTypeKey::from_class_name(key.spec().class_name), Some(key));
        }
    }
}
