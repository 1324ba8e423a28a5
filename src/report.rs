//! Structured run report for downstream tool consumption.
//!
//! Optional JSON companion to the text summary, carrying the same counts
//! together with the inputs they were taken from.

use serde::Serialize;
use std::path::Path;

use crate::reporter::{
    GenotypeBundle, QcSummary, SummaryConfig, SummaryError, log_written, prepare_summary, stage,
};
use crate::summary::{CheckpointCounts, QcCheckpoint, QcCounts, RemovalStat};

/// Complete report of a summary run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Tool version
    pub version: String,
    /// Timestamp of run (ISO 8601)
    pub timestamp: String,

    pub inputs: InputInfo,
    pub output: String,

    pub checkpoints: Vec<CheckpointInfo>,
    pub variant_qc_removed: u64,
    pub sample_qc_removed: u64,
    pub total_removed: TotalRemoved,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub initial: FilesetInfo,
    pub variant_filtered: FilesetInfo,
    pub sample_filtered: FilesetInfo,
    #[serde(rename = "final")]
    pub final_qc: FilesetInfo,
    pub indel_variants: String,
    pub strand_mismatch_variants: String,
    pub unmapped_variants: String,
    pub samples_to_remove: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilesetInfo {
    pub fam: String,
    pub bim: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointInfo {
    pub checkpoint: QcCheckpoint,
    #[serde(flatten)]
    pub counts: CheckpointCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalRemoved {
    pub samples: RemovalStat,
    pub variants: RemovalStat,
}

impl From<&GenotypeBundle> for FilesetInfo {
    fn from(bundle: &GenotypeBundle) -> Self {
        FilesetInfo {
            fam: display(&bundle.sample_manifest),
            bim: display(&bundle.variant_manifest),
        }
    }
}

impl RunReport {
    pub fn new(config: &SummaryConfig, counts: &QcCounts) -> Self {
        let now = time::OffsetDateTime::now_utc();
        let timestamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            inputs: InputInfo {
                initial: FilesetInfo::from(&config.initial),
                variant_filtered: FilesetInfo::from(&config.variant_filtered),
                sample_filtered: FilesetInfo::from(&config.sample_filtered),
                final_qc: FilesetInfo::from(&config.final_qc),
                indel_variants: display(&config.indel_variants),
                strand_mismatch_variants: display(&config.strand_mismatch_variants),
                unmapped_variants: display(&config.unmapped_variants),
                samples_to_remove: display(&config.samples_to_remove),
            },
            output: display(&config.output),
            checkpoints: QcCheckpoint::ALL
                .into_iter()
                .map(|checkpoint| CheckpointInfo {
                    checkpoint,
                    counts: counts.checkpoint(checkpoint),
                })
                .collect(),
            variant_qc_removed: counts.variants_removed_in_variant_qc,
            sample_qc_removed: counts.samples_removed_in_sample_qc,
            total_removed: TotalRemoved {
                samples: counts.total_samples_removed(),
                variants: counts.total_variants_removed(),
            },
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, SummaryError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!("{json}\n"))
    }

    /// Write the report as JSON to `path`, replacing it atomically.
    pub fn write(&self, path: &Path) -> Result<(), SummaryError> {
        stage(path, self.to_json()?.as_bytes())?.commit()?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

/// Writes the text summary and, when `report_path` is given, the JSON run
/// report.
///
/// Both files are fully staged before either is renamed into place, so a
/// report that cannot be written leaves no new summary behind.
pub fn generate_with_report(
    config: &SummaryConfig,
    report_path: Option<&Path>,
) -> Result<QcSummary, SummaryError> {
    let summary = prepare_summary(config)?;

    let staged_report = match report_path {
        Some(path) => {
            let json = RunReport::new(config, &summary.counts).to_json()?;
            Some((path, stage(path, json.as_bytes())?))
        }
        None => None,
    };
    let staged_summary = stage(&config.output, summary.text.as_bytes())?;

    if let Some((path, staged)) = staged_report {
        staged.commit()?;
        tracing::info!("Wrote run report to {}", path.display());
    }
    staged_summary.commit()?;
    log_written(config, &summary);

    Ok(summary)
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
