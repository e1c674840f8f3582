// SPDX-License-Identifier: AGPL-3.0-only

//! Scan records: JSON serialization of per-case sampling results.
//!
//! `production_flow_scan` accumulates one record per case and writes the
//! full report to a timestamped JSON file, machine-readable for downstream
//! comparison across runs.

use serde::{Deserialize, Serialize};

/// Result of sampling one case of the scan matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct CaseRecord {
    pub label: String,
    pub lattice_length: usize,
    pub m_sq: f64,
    pub lambda: f64,
    pub n_samples: usize,
    pub acceptance_rate: f64,
    pub ess_per_sample: f64,
    pub mean_log_weight: f64,
    pub var_log_weight: f64,
    pub susceptibility: f64,
    pub susceptibility_err: f64,
    pub correlation_length: f64,
    pub energy_density: f64,
    pub tau_int_phi_sq: f64,
}

/// Full scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// ISO-8601 UTC timestamp of the run.
    pub timestamp: String,
    /// One record per case, in scan order.
    pub cases: Vec<CaseRecord>,
}

impl ScanReport {
    /// Empty report stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timestamp: now_iso8601(),
            cases: Vec::new(),
        }
    }

    /// Append a case record.
    pub fn add_case(&mut self, record: CaseRecord) {
        self.cases.push(record);
    }

    /// Write `flow_scan_<timestamp>.json` under `dir`, creating it if
    /// needed. Returns the path written.
    ///
    /// # Errors
    ///
    /// I/O errors from directory creation or writing; serialization
    /// failures surface as `io::Error` of kind `Other`.
    pub fn save_json(&self, dir: &str) -> std::io::Result<String> {
        std::fs::create_dir_all(dir)?;
        let path = format!("{dir}/flow_scan_{}.json", self.timestamp);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

impl Default for ScanReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Current UTC time as `YYYY-MM-DDTHH-MM-SSZ`, from the system clock.
///
/// Civil-date conversion follows the days-from-epoch algorithm; no
/// timezone handling beyond UTC.
#[must_use]
pub fn now_iso8601() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let day_secs = secs % 86_400;
    let (hour, minute, second) = (day_secs / 3600, (day_secs % 3600) / 60, day_secs % 60);

    // Civil date from days since 1970-01-01 (Howard Hinnant's algorithm).
    let days = (secs / 86_400) as i64;
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!("{year:04}-{month:02}-{day:02}T{hour:02}-{minute:02}-{second:02}Z")
}
