//! YAML schema for `ska-data-product.yaml`, in emitted field order.
//!
//! `serde_yml` preserves struct declaration order rather than alphabetizing,
//! which is what lets this mirror spec's "keys in insertion order"
//! requirement directly through `#[derive(Serialize)]`.

use serde::Serialize;

pub const INTERFACE: &str = "http://schema.skao.int/ska-data-product-meta/0.1";
pub const CONFIG_IMAGE: &str = "artefact.skao.int/ska-pst/ska-pst";
pub const CONFIG_VERSION: &str = "0.1.3";

#[derive(Debug, Clone, Serialize)]
pub struct MetadataDocument {
    pub interface: String,
    pub execution_block: String,
    pub context: Context,
    pub config: Config,
    pub files: Vec<FileEntry>,
    pub obscore: ObsCore,
}

#[derive(Debug, Clone, Serialize)]
pub struct Context {
    pub observer: String,
    pub intent: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub image: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub description: String,
    pub path: String,
    pub size: u64,
    pub status: String,
}

impl FileEntry {
    #[must_use]
    pub fn done(description: &str, path: &str, size: u64) -> Self {
        Self {
            description: description.to_string(),
            path: path.to_string(),
            size,
            status: "done".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObsCore {
    pub dataproduct_type: String,
    pub dataproduct_subtype: String,
    pub calib_level: u32,
    pub obs_id: String,
    pub access_estsize: i64,
    pub target_name: String,
    pub s_ra: f64,
    pub s_dec: f64,
    pub t_min: f64,
    pub t_max: f64,
    pub t_resolution: f64,
    pub t_exptime: f64,
    pub facility_name: String,
    pub instrument_name: String,
    pub pol_xel: u32,
    pub pol_states: String,
    pub em_xel: u32,
    pub em_unit: String,
    pub em_min: f64,
    pub em_max: f64,
    pub em_res_power: String,
    pub em_resolution: f64,
    pub o_ucd: String,
}
