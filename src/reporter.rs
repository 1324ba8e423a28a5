use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

use crate::{
    count::{self, CountError},
    summary::{CheckpointCounts, QcCounts, render_summary},
};

/// Sample and variant manifests of one PLINK fileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeBundle {
    /// FAM-like file, one line per sample.
    pub sample_manifest: PathBuf,
    /// BIM-like file, one line per variant.
    pub variant_manifest: PathBuf,
}

impl GenotypeBundle {
    pub fn new(sample_manifest: impl Into<PathBuf>, variant_manifest: impl Into<PathBuf>) -> Self {
        Self {
            sample_manifest: sample_manifest.into(),
            variant_manifest: variant_manifest.into(),
        }
    }

    /// Resolves `<prefix>.fam` and `<prefix>.bim`.
    ///
    /// A prefix that already names one of the fileset members (`data.bed`,
    /// `data.bim`, `data.fam`) is reduced to its stem first.
    pub fn from_prefix<P: AsRef<Path>>(prefix: P) -> Self {
        let prefix = prefix.as_ref();
        let stem = if prefix
            .extension()
            .is_some_and(|e| e == "bed" || e == "bim" || e == "fam")
        {
            prefix.with_extension("")
        } else {
            prefix.to_path_buf()
        };

        Self {
            sample_manifest: with_suffix(&stem, "fam"),
            variant_manifest: with_suffix(&stem, "bim"),
        }
    }

    fn counts(&self) -> Result<CheckpointCounts, SummaryError> {
        Ok(CheckpointCounts {
            samples: count::count_samples(&self.sample_manifest)?,
            variants: count::count_variants(&self.variant_manifest)?,
        })
    }
}

// `with_extension` would swallow dotted prefixes such as `cohort.v2`.
fn with_suffix(stem: &Path, extension: &str) -> PathBuf {
    let mut raw = stem.as_os_str().to_os_string();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

/// Every path one summary run reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    pub initial: GenotypeBundle,
    pub variant_filtered: GenotypeBundle,
    pub sample_filtered: GenotypeBundle,
    /// Fileset after the HWE filter.
    pub final_qc: GenotypeBundle,
    pub indel_variants: PathBuf,
    pub strand_mismatch_variants: PathBuf,
    pub unmapped_variants: PathBuf,
    pub samples_to_remove: PathBuf,
    pub output: PathBuf,
}

impl SummaryConfig {
    pub fn variant_removal_lists(&self) -> [&Path; 3] {
        [
            self.indel_variants.as_path(),
            self.strand_mismatch_variants.as_path(),
            self.unmapped_variants.as_path(),
        ]
    }
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("missing input file {}: {source}", path.display())]
    MissingInputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize run report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<CountError> for SummaryError {
    fn from(err: CountError) -> Self {
        match err {
            CountError::MissingInputFile { path, source } => {
                SummaryError::MissingInputFile { path, source }
            }
            CountError::Read { path, source } => SummaryError::Read { path, source },
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct QcSummary {
    pub counts: QcCounts,
    pub text: String,
}

/// Counts every input named by `config`. Nothing is written.
pub fn collect_counts(config: &SummaryConfig) -> Result<QcCounts, SummaryError> {
    let counts = QcCounts {
        initial: config.initial.counts()?,
        post_variant_qc: config.variant_filtered.counts()?,
        post_sample_qc: config.sample_filtered.counts()?,
        final_qc: config.final_qc.counts()?,
        variants_removed_in_variant_qc: count::count_variants_to_remove(
            config.variant_removal_lists(),
        )?,
        samples_removed_in_sample_qc: count::count_lines(&config.samples_to_remove)?,
    };
    Ok(counts)
}

/// Counts all inputs and renders the summary without writing anything.
pub fn prepare_summary(config: &SummaryConfig) -> Result<QcSummary, SummaryError> {
    let counts = collect_counts(config)?;

    for violation in counts.monotonicity_violations() {
        tracing::warn!("{violation}");
    }

    let text = render_summary(&counts);
    Ok(QcSummary { counts, text })
}

/// Counts all inputs, renders the summary and writes it to `config.output`.
///
/// Inputs are fully counted before the output is touched, and the output is
/// replaced atomically, so a failure never leaves a partial report.
pub fn generate_summary(config: &SummaryConfig) -> Result<QcSummary, SummaryError> {
    let summary = prepare_summary(config)?;
    stage(&config.output, summary.text.as_bytes())?.commit()?;
    log_written(config, &summary);
    Ok(summary)
}

pub(crate) fn log_written(config: &SummaryConfig, summary: &QcSummary) {
    tracing::info!(
        output = %config.output.display(),
        samples = summary.counts.final_qc.samples,
        variants = summary.counts.final_qc.variants,
        "wrote QC summary"
    );
}

/// Fully written temporary sibling of an output path, not yet renamed into
/// place. Dropping it removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    /// Renames the staged file over its target.
    pub fn commit(self) -> Result<(), SummaryError> {
        let target = self.target;
        self.tmp
            .persist(&target)
            .map_err(|e| SummaryError::WriteFailure {
                path: target.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

/// Writes `contents` to a temporary file next to `path`.
///
/// The temporary file takes the permissions of an existing `path`, or the
/// umask-filtered default of a newly created file otherwise.
pub fn stage(path: &Path, contents: &[u8]) -> Result<StagedFile, SummaryError> {
    let failure = |source: io::Error| SummaryError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let existing = fs::metadata(path).ok();
    if existing.as_ref().is_some_and(|meta| meta.is_dir()) {
        return Err(failure(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path is a directory",
        )));
    }

    let mut tmp = temp_builder().tempfile_in(parent).map_err(failure)?;
    if let Some(meta) = existing {
        // fchmod is not filtered by the umask, unlike the create mode.
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(failure)?;
    }
    tmp.write_all(contents).map_err(failure)?;
    tmp.as_file().sync_all().map_err(failure)?;

    Ok(StagedFile {
        tmp,
        target: path.to_path_buf(),
    })
}

#[cfg(unix)]
fn temp_builder() -> Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = Builder::new();
    // Same create mode as File::create; the kernel applies the umask.
    builder.permissions(fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_builder() -> Builder<'static, 'static> {
    Builder::new()
}
