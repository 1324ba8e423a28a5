#![doc = include_str!("../README.md")]

pub mod cli;
pub mod count;
pub mod report;
pub mod reporter;
pub mod summary;

pub use count::{count_lines, count_samples, count_variants, count_variants_to_remove};
pub use report::{RunReport, generate_with_report};
pub use reporter::{
    GenotypeBundle, QcSummary, StagedFile, SummaryConfig, SummaryError, collect_counts,
    generate_summary, prepare_summary, stage,
};
pub use summary::{CheckpointCounts, QcCheckpoint, QcCounts, RemovalStat, render_summary};
