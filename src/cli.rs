use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{GenotypeBundle, QcSummary, SummaryConfig, report::generate_with_report};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Summarize sample and variant counts across genotype QC stages",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    initial: InitialFileset,

    #[command(flatten)]
    variant_filtered: VariantFilteredFileset,

    #[command(flatten)]
    sample_filtered: SampleFilteredFileset,

    #[command(flatten)]
    final_qc: FinalFileset,

    /// Indel variants removed during variant QC (one per line)
    #[arg(long, value_name = "FILE")]
    indel_variants: PathBuf,

    /// Strand-mismatch variants removed during variant QC (one per line)
    #[arg(long, value_name = "FILE")]
    strand_mismatch_variants: PathBuf,

    /// Unmapped variants removed during variant QC (one per line)
    #[arg(long, value_name = "FILE")]
    unmapped_variants: PathBuf,

    /// Samples removed during sample QC (one per line)
    #[arg(long, value_name = "FILE")]
    samples_to_remove: PathBuf,

    /// Text summary output path (overwritten)
    #[arg(long, short = 'o', value_name = "OUTPUT")]
    output: PathBuf,

    /// Also write the counts as JSON to this path
    #[arg(long, value_name = "JSON")]
    json_report: Option<PathBuf>,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

// One struct per stage so clap sees distinct argument ids.
macro_rules! fileset_args {
    ($name:ident, $stage:tt, $prefix:ident, $fam:ident, $bim:ident) => {
        #[derive(Debug, Args)]
        struct $name {
            #[arg(
                long = $stage,
                value_name = "PREFIX",
                help = concat!("PLINK fileset prefix at the ", $stage, " checkpoint")
            )]
            $prefix: Option<PathBuf>,

            #[arg(
                long,
                value_name = "FAM",
                help = concat!("Explicit .fam file at the ", $stage, " checkpoint")
            )]
            $fam: Option<PathBuf>,

            #[arg(
                long,
                value_name = "BIM",
                help = concat!("Explicit .bim file at the ", $stage, " checkpoint")
            )]
            $bim: Option<PathBuf>,
        }

        impl $name {
            fn resolve(&self) -> Result<GenotypeBundle> {
                resolve_bundle($stage, &self.$prefix, &self.$fam, &self.$bim)
            }
        }
    };
}

fileset_args!(InitialFileset, "initial", initial, initial_fam, initial_bim);
fileset_args!(
    VariantFilteredFileset,
    "variant-filtered",
    variant_filtered,
    variant_filtered_fam,
    variant_filtered_bim
);
fileset_args!(
    SampleFilteredFileset,
    "sample-filtered",
    sample_filtered,
    sample_filtered_fam,
    sample_filtered_bim
);
fileset_args!(FinalFileset, "final", final_prefix, final_fam, final_bim);

fn resolve_bundle(
    stage: &str,
    prefix: &Option<PathBuf>,
    fam: &Option<PathBuf>,
    bim: &Option<PathBuf>,
) -> Result<GenotypeBundle> {
    let from_prefix = prefix.as_ref().map(GenotypeBundle::from_prefix);
    let sample_manifest = fam
        .clone()
        .or_else(|| from_prefix.as_ref().map(|b| b.sample_manifest.clone()));
    let variant_manifest = bim
        .clone()
        .or_else(|| from_prefix.as_ref().map(|b| b.variant_manifest.clone()));

    match (sample_manifest, variant_manifest) {
        (Some(fam), Some(bim)) => Ok(GenotypeBundle::new(fam, bim)),
        (None, _) => anyhow::bail!("the {stage} checkpoint needs --{stage} or --{stage}-fam"),
        (_, None) => anyhow::bail!("the {stage} checkpoint needs --{stage} or --{stage}-bim"),
    }
}

impl Cli {
    fn into_config(self) -> Result<(SummaryConfig, Option<PathBuf>)> {
        let config = SummaryConfig {
            initial: self.initial.resolve()?,
            variant_filtered: self.variant_filtered.resolve()?,
            sample_filtered: self.sample_filtered.resolve()?,
            final_qc: self.final_qc.resolve()?,
            indel_variants: self.indel_variants,
            strand_mismatch_variants: self.strand_mismatch_variants,
            unmapped_variants: self.unmapped_variants,
            samples_to_remove: self.samples_to_remove,
            output: self.output,
        };
        Ok((config, self.json_report))
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let (config, json_report) = cli.into_config()?;
    let summary = generate_with_report(&config, json_report.as_deref())
        .with_context(|| format!("failed to generate QC summary {}", config.output.display()))?;

    log_summary(&summary);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn log_summary(summary: &QcSummary) {
    let counts = &summary.counts;
    tracing::info!(
        "Removed {samples} samples and {variants} variants across QC.",
        samples = counts.total_samples_removed(),
        variants = counts.total_variants_removed(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOVAL_ARGS: [&str; 10] = [
        "--indel-variants",
        "indels.txt",
        "--strand-mismatch-variants",
        "strand.txt",
        "--unmapped-variants",
        "unmapped.txt",
        "--samples-to-remove",
        "to_remove.txt",
        "--output",
        "summary.txt",
    ];

    fn parse(stage_args: &[&str]) -> Cli {
        let mut args = vec!["qc_summary"];
        args.extend_from_slice(stage_args);
        args.extend_from_slice(&REMOVAL_ARGS);
        Cli::parse_from(args)
    }

    #[test]
    fn parses_prefixes() {
        let cli = parse(&[
            "--initial",
            "data/initial",
            "--variant-filtered",
            "data/vqc",
            "--sample-filtered",
            "data/sqc",
            "--final",
            "data/final",
        ]);
        let (config, json) = cli.into_config().unwrap();
        assert_eq!(config.initial.sample_manifest, PathBuf::from("data/initial.fam"));
        assert_eq!(config.final_qc.variant_manifest, PathBuf::from("data/final.bim"));
        assert_eq!(config.output, PathBuf::from("summary.txt"));
        assert_eq!(json, None);
    }

    #[test]
    fn explicit_files_override_prefix() {
        let cli = parse(&[
            "--initial",
            "data/initial",
            "--initial-fam",
            "other/samples.fam",
            "--variant-filtered",
            "data/vqc",
            "--sample-filtered",
            "data/sqc",
            "--final-fam",
            "f.fam",
            "--final-bim",
            "f.bim",
        ]);
        let (config, _) = cli.into_config().unwrap();
        assert_eq!(config.initial.sample_manifest, PathBuf::from("other/samples.fam"));
        assert_eq!(config.initial.variant_manifest, PathBuf::from("data/initial.bim"));
        assert_eq!(config.final_qc, GenotypeBundle::new("f.fam", "f.bim"));
    }

    #[test]
    fn missing_stage_is_reported() {
        let cli = parse(&[
            "--initial",
            "data/initial",
            "--variant-filtered",
            "data/vqc",
            "--sample-filtered-fam",
            "s.fam",
            "--final",
            "data/final",
        ]);
        let err = cli.into_config().unwrap_err();
        assert!(err.to_string().contains("sample-filtered"));
        assert!(err.to_string().contains("--sample-filtered-bim"));
    }
}
