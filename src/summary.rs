//! Checkpoint counts, derived removal statistics and the text summary.

use std::fmt::{self, Write as _};

use serde::Serialize;

/// Stage of the QC pipeline at which a fileset was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QcCheckpoint {
    Initial,
    PostVariantQc,
    PostSampleQc,
    Final,
}

impl QcCheckpoint {
    /// Checkpoints in pipeline order.
    pub const ALL: [QcCheckpoint; 4] = [
        QcCheckpoint::Initial,
        QcCheckpoint::PostVariantQc,
        QcCheckpoint::PostSampleQc,
        QcCheckpoint::Final,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QcCheckpoint::Initial => "initial",
            QcCheckpoint::PostVariantQc => "post-variant-QC",
            QcCheckpoint::PostSampleQc => "post-sample-QC",
            QcCheckpoint::Final => "final",
        }
    }

    pub fn previous(self) -> Option<QcCheckpoint> {
        match self {
            QcCheckpoint::Initial => None,
            QcCheckpoint::PostVariantQc => Some(QcCheckpoint::Initial),
            QcCheckpoint::PostSampleQc => Some(QcCheckpoint::PostVariantQc),
            QcCheckpoint::Final => Some(QcCheckpoint::PostSampleQc),
        }
    }
}

impl fmt::Display for QcCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointCounts {
    pub samples: u64,
    pub variants: u64,
}

/// Every count gathered for one summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QcCounts {
    pub initial: CheckpointCounts,
    pub post_variant_qc: CheckpointCounts,
    pub post_sample_qc: CheckpointCounts,
    #[serde(rename = "final")]
    pub final_qc: CheckpointCounts,
    /// Records across the indel, strand-mismatch and unmapped removal lists.
    pub variants_removed_in_variant_qc: u64,
    /// Records in the sample removal list.
    pub samples_removed_in_sample_qc: u64,
}

/// Which entity grew between two consecutive checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Samples,
    Variants,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Samples => f.write_str("samples"),
            Entity::Variants => f.write_str("variants"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonotonicityViolation {
    pub checkpoint: QcCheckpoint,
    pub entity: Entity,
    pub previous: u64,
    pub current: u64,
}

impl fmt::Display for MonotonicityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} count grew from {} to {} at the {} checkpoint",
            self.entity, self.previous, self.current, self.checkpoint
        )
    }
}

impl QcCounts {
    pub fn checkpoint(&self, checkpoint: QcCheckpoint) -> CheckpointCounts {
        match checkpoint {
            QcCheckpoint::Initial => self.initial,
            QcCheckpoint::PostVariantQc => self.post_variant_qc,
            QcCheckpoint::PostSampleQc => self.post_sample_qc,
            QcCheckpoint::Final => self.final_qc,
        }
    }

    pub fn total_samples_removed(&self) -> RemovalStat {
        RemovalStat::between(self.initial.samples, self.final_qc.samples)
    }

    pub fn total_variants_removed(&self) -> RemovalStat {
        RemovalStat::between(self.initial.variants, self.final_qc.variants)
    }

    /// Checkpoints where a count exceeds the one before it.
    ///
    /// Filtering stages only ever drop records, so any entry here points at
    /// mismatched inputs rather than a real pipeline outcome.
    pub fn monotonicity_violations(&self) -> Vec<MonotonicityViolation> {
        let mut violations = Vec::new();
        for checkpoint in QcCheckpoint::ALL {
            let Some(previous) = checkpoint.previous() else {
                continue;
            };
            let before = self.checkpoint(previous);
            let after = self.checkpoint(checkpoint);
            if after.samples > before.samples {
                violations.push(MonotonicityViolation {
                    checkpoint,
                    entity: Entity::Samples,
                    previous: before.samples,
                    current: after.samples,
                });
            }
            if after.variants > before.variants {
                violations.push(MonotonicityViolation {
                    checkpoint,
                    entity: Entity::Variants,
                    previous: before.variants,
                    current: after.variants,
                });
            }
        }
        violations
    }
}

/// Records removed between two checkpoints, with the share of the starting
/// count they represent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RemovalStat {
    /// Signed so that a count that grew renders as a negative removal.
    pub count: i64,
    /// `None` when the starting count is zero.
    pub percentage: Option<f64>,
}

impl RemovalStat {
    pub fn between(initial: u64, remaining: u64) -> Self {
        let count = initial as i64 - remaining as i64;
        let percentage = if initial == 0 {
            None
        } else {
            Some(count as f64 / initial as f64 * 100.0)
        };
        Self { count, percentage }
    }
}

impl fmt::Display for RemovalStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage {
            Some(pct) => write!(f, "{} ({:.2}%)", self.count, pct),
            None => write!(f, "{} (N/A)", self.count),
        }
    }
}

/// Renders the fixed-layout text summary.
pub fn render_summary(counts: &QcCounts) -> String {
    let mut out = String::with_capacity(512);
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, counts);
    out
}

fn write_summary(out: &mut String, c: &QcCounts) -> fmt::Result {
    writeln!(out, "QC Summary Statistics")?;
    writeln!(out, "===================")?;
    writeln!(out)?;
    writeln!(out, "Initial QC:")?;
    writeln!(out, "- Initial samples: {}", c.initial.samples)?;
    writeln!(out, "- Initial variants: {}", c.initial.variants)?;
    writeln!(out)?;
    writeln!(out, "Variant QC:")?;
    writeln!(out, "- Variants removed: {}", c.variants_removed_in_variant_qc)?;
    writeln!(out, "- Remaining variants: {}", c.post_variant_qc.variants)?;
    writeln!(out, "- Remaining samples: {}", c.post_variant_qc.samples)?;
    writeln!(out)?;
    writeln!(out, "Sample QC:")?;
    writeln!(out, "- Samples removed: {}", c.samples_removed_in_sample_qc)?;
    writeln!(out, "- Remaining samples: {}", c.post_sample_qc.samples)?;
    writeln!(out, "- Remaining variants: {}", c.post_sample_qc.variants)?;
    writeln!(out)?;
    writeln!(out, "Final QC (after HWE filter):")?;
    writeln!(out, "- Final samples: {}", c.final_qc.samples)?;
    writeln!(out, "- Final variants: {}", c.final_qc.variants)?;
    writeln!(out)?;
    writeln!(out, "Total Removed:")?;
    writeln!(out, "- Samples: {}", c.total_samples_removed())?;
    writeln!(out, "- Variants: {}", c.total_variants_removed())?;
    Ok(())
}
