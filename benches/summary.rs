use std::fs;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use qc_summary::{
    CheckpointCounts, GenotypeBundle, QcCounts, SummaryConfig, count_lines, generate_summary,
    render_summary,
};
use tempfile::tempdir;

const BIM_LINE: &str = "1\trs123456\t0\t1234567\tA\tG\n";

fn bench_count_lines(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.bim");
    fs::write(&path, BIM_LINE.repeat(500_000)).unwrap();

    c.bench_function("count_lines_500k_bim", |b| {
        b.iter(|| count_lines(black_box(&path)).unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let counts = QcCounts {
        initial: CheckpointCounts {
            samples: 1000,
            variants: 50_000,
        },
        final_qc: CheckpointCounts {
            samples: 880,
            variants: 47_500,
        },
        ..QcCounts::default()
    };
    c.bench_function("render_summary", |b| {
        b.iter(|| render_summary(black_box(&counts)))
    });
}

fn bench_generate(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let fileset = |name: &str, samples: usize, variants: usize| {
        let fam = dir.path().join(format!("{name}.fam"));
        let bim = dir.path().join(format!("{name}.bim"));
        fs::write(&fam, "F S 0 0 1 -9\n".repeat(samples)).unwrap();
        fs::write(&bim, BIM_LINE.repeat(variants)).unwrap();
        GenotypeBundle::new(fam, bim)
    };
    let list = |name: &str, n: usize| {
        let path = dir.path().join(name);
        fs::write(&path, "rs1\n".repeat(n)).unwrap();
        path
    };

    let config = SummaryConfig {
        initial: fileset("initial", 1000, 50_000),
        variant_filtered: fileset("vqc", 950, 49_000),
        sample_filtered: fileset("sqc", 900, 48_000),
        final_qc: fileset("final", 880, 47_500),
        indel_variants: list("indels.txt", 600),
        strand_mismatch_variants: list("strand.txt", 300),
        unmapped_variants: list("unmapped.txt", 100),
        samples_to_remove: list("to_remove.txt", 50),
        output: dir.path().join("summary.txt"),
    };

    c.bench_function("generate_summary", |b| {
        b.iter_batched(
            || config.clone(),
            |config| generate_summary(&config).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_count_lines, bench_render, bench_generate);
criterion_main!(benches);
