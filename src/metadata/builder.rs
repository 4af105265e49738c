//! `MetadataBuilder`: aggregates per-scan headers into `ska-data-product.yaml`.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::core::errors::{Result, SendError};
use crate::model::{Header, HeaderReader};
use crate::scan::ScanView;

use super::schema::{Config, Context, FileEntry, MetadataDocument, ObsCore, CONFIG_IMAGE, CONFIG_VERSION, INTERFACE};

const UTC_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";
/// Reference epoch for the Modified Julian Date conversion: JD(2000-01-01) = 2451544.5.
const J2000_JD: f64 = 2_451_544.5;
const MJD_OFFSET: f64 = 2_400_000.5;

/// Builds and writes the YAML metadata document for a completed scan.
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Build the metadata document for `scan_view`'s data files.
    ///
    /// Precondition: the scan must be complete with no unprocessed files
    /// remaining (callers enforce this — see Orchestrator/Processor). Fails
    /// with `MetadataPrecondition` if there are no data files at all.
    pub fn build(eb_id: &str, scan_view: &ScanView) -> Result<MetadataDocument> {
        let data_files = scan_view.data_files();
        let weights_files = scan_view.weights_files();

        if data_files.is_empty() || weights_files.is_empty() {
            return Err(SendError::MetadataPrecondition {
                scan: scan_view.full_path(),
                details: "scan has no data or weights files".to_string(),
            });
        }

        let first = &data_files[0];
        let header = HeaderReader::read(&first.absolute_path)?;

        let total_data_size: u64 = data_files.iter().map(|f| f.size).sum();
        let total_weights_size: u64 = weights_files.iter().map(|f| f.size).sum();

        let files = vec![
            FileEntry::done("Channelised voltage data raw files", "data", total_data_size),
            FileEntry::done("Channelised weights raw files", "weights", total_weights_size),
        ];

        let context = Context {
            observer: header.get("OBSERVER").unwrap_or_default().to_string(),
            intent: format!(
                "Tied-array beam observation of {}",
                header.get("SOURCE").unwrap_or_default()
            ),
            notes: String::new(),
        };

        let config = Config {
            image: CONFIG_IMAGE.to_string(),
            version: CONFIG_VERSION.to_string(),
        };

        let obscore = build_obscore(&first.absolute_path, &header, data_files, total_data_size)?;

        Ok(MetadataDocument {
            interface: INTERFACE.to_string(),
            execution_block: eb_id.to_string(),
            context,
            config,
            files,
            obscore,
        })
    }

    /// Serialize `doc` to YAML and atomically write it to
    /// `<scan>/ska-data-product.yaml`: write to a sibling `.tmp` path, then
    /// rename into place, so a concurrent reader never observes a partial
    /// file.
    pub fn write(scan_root: &Path, doc: &MetadataDocument) -> Result<()> {
        let final_path = scan_root.join(crate::scan::scan::DATA_PRODUCT_FILE);
        let tmp_path = scan_root.join(format!("{}.tmp", crate::scan::scan::DATA_PRODUCT_FILE));

        let yaml = serde_yml::to_string(doc)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| SendError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| SendError::io(&final_path, e))?;
        Ok(())
    }
}

fn build_obscore(
    path: &Path,
    header: &Header,
    data_files: &[crate::model::ScanFile],
    total_data_size: u64,
) -> Result<ObsCore> {
    let scan_id = header.require(path, "SCAN_ID")?.to_string();
    let source = header.require(path, "SOURCE")?.to_string();
    let utc_start = header.require(path, "UTC_START")?.to_string();
    let tsamp: f64 = header.require_parsed(path, "TSAMP")?;
    let npol: u32 = header.require_parsed(path, "NPOL")?;
    let nchan: u32 = header.require_parsed(path, "NCHAN")?;
    let freq: f64 = header.require_parsed(path, "FREQ")?;
    let bw: f64 = header.require_parsed(path, "BW")?;
    let stt_crd1 = header.require(path, "STT_CRD1")?;
    let stt_crd2 = header.require(path, "STT_CRD2")?;
    let telescope = header.require(path, "TELESCOPE")?;

    let s_ra = parse_sexagesimal(stt_crd1).ok_or_else(|| SendError::HeaderParse {
        path: path.to_path_buf(),
        details: format!("STT_CRD1 value {stt_crd1:?} is not a valid sexagesimal angle"),
    })?;
    let s_dec = parse_sexagesimal(stt_crd2).ok_or_else(|| SendError::HeaderParse {
        path: path.to_path_buf(),
        details: format!("STT_CRD2 value {stt_crd2:?} is not a valid sexagesimal angle"),
    })?;

    let t_min = utc_to_mjd(path, &utc_start)?;
    // Preserves the reference implementation's literal formula: one sample
    // period past t_min, not the observation's actual length.
    let t_max = t_min + (tsamp * 1e-6) / 86400.0;

    // access_estsize excludes each data file's own header bytes from the total.
    let mut header_bytes_total = 0u64;
    for f in data_files {
        let h = HeaderReader::read(&f.absolute_path)?;
        let hdr_size: u64 = h.require_parsed(&f.absolute_path, "HDR_SIZE")?;
        header_bytes_total += hdr_size;
    }
    let access_estsize = total_data_size as i64 - header_bytes_total as i64;

    let instrument_name = telescope.to_uppercase().replacen("SKA", "SKA-", 1);

    Ok(ObsCore {
        dataproduct_type: "timeseries".to_string(),
        dataproduct_subtype: "voltages".to_string(),
        calib_level: 0,
        obs_id: scan_id,
        access_estsize,
        target_name: source,
        s_ra,
        s_dec,
        t_min,
        t_max,
        t_resolution: tsamp * 1e-6,
        t_exptime: tsamp,
        facility_name: "SKA-Observatory".to_string(),
        instrument_name,
        pol_xel: npol,
        pol_states: "null".to_string(),
        em_xel: nchan,
        em_unit: "Hz".to_string(),
        em_min: (freq - bw / 2.0) * 1e6,
        em_max: (freq + bw / 2.0) * 1e6,
        em_res_power: "null".to_string(),
        em_resolution: (bw / f64::from(nchan)) * 1e6,
        o_ucd: "null".to_string(),
    })
}

/// Convert a `UTC_START`-formatted timestamp to Modified Julian Date:
/// `jd = 2451544.5 + (utc - J2000) / 86400; mjd = jd - 2400000.5`.
fn utc_to_mjd(path: &Path, utc: &str) -> Result<f64> {
    let parsed = NaiveDateTime::parse_from_str(utc, UTC_FORMAT).map_err(|e| SendError::HeaderParse {
        path: path.to_path_buf(),
        details: format!("UTC_START value {utc:?} does not match {UTC_FORMAT}: {e}"),
    })?;
    let epoch = NaiveDateTime::parse_from_str("2000-01-01-00:00:00", UTC_FORMAT).unwrap();
    let seconds_since_2000 = (parsed - epoch).num_milliseconds() as f64 / 1000.0;
    let jd = J2000_JD + seconds_since_2000 / 86400.0;
    Ok(jd - MJD_OFFSET)
}

/// Parse a sexagesimal `[sign]D:M:S[.fff]` angle (also accepting a bare
/// decimal number) into its decimal value. `D` is in whatever unit the
/// caller treats the whole value as (hours for right ascension, degrees for
/// declination) — this function is unit-agnostic arithmetic only.
fn parse_sexagesimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if !raw.contains(':') {
        return raw.parse().ok();
    }

    let negative = raw.starts_with('-');
    let trimmed = raw.trim_start_matches(['+', '-']);
    let parts: Vec<&str> = trimmed.splitn(3, ':').collect();
    if parts.is_empty() {
        return None;
    }

    let degrees: f64 = parts.first()?.parse().ok()?;
    let minutes: f64 = parts.get(1).map(|s| s.parse()).transpose().ok()?.unwrap_or(0.0);
    let seconds: f64 = parts.get(2).map(|s| s.parse()).transpose().ok()?.unwrap_or(0.0);

    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    Some(if negative { -magnitude } else { magnitude })
}
