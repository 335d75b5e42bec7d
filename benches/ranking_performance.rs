//! Ranking Benchmarks
//!
//! Measures coverage-spectrum aggregation, suspiciousness ranking, and
//! rank queries over synthetic suites of growing size.
//!
//! Run with: cargo bench --bench ranking_performance

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use culpa::element::{Element, Granularity};
use culpa::ranking::Ranking;
use culpa::spectrum::{SbflFormula, SpectrumData, TestExecution};

/// Synthetic suite over `elements` distinct lines: every third test
/// fails, and each test touches a 32-line window of the program.
fn synthetic_executions(tests: usize, elements: u32) -> Vec<TestExecution> {
    (0..tests)
        .map(|t| {
            let start = (t as u32 * 17) % elements;
            let executed = (0..32u32)
                .map(|offset| {
                    let line = (start + offset) % elements;
                    Element::line(format!("Class{}", line / 100), "run()", line)
                })
                .collect();
            TestExecution {
                test: format!("SuiteTest#case{t}"),
                passed: t % 3 != 0,
                executed,
            }
        })
        .collect()
}

/// Benchmark spectrum aggregation for different program sizes
fn bench_spectrum_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrum_aggregation");

    for elements in [100u32, 1_000, 10_000] {
        let executions = synthetic_executions(200, elements);
        group.throughput(Throughput::Elements(elements as u64));

        group.bench_with_input(
            BenchmarkId::new("from_executions", elements),
            &executions,
            |b, executions| {
                b.iter(|| {
                    let spectrum =
                        SpectrumData::from_executions(black_box(executions), Granularity::Line);
                    black_box(spectrum);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark ranking construction for different program sizes
fn bench_ranking_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking_build");

    for elements in [100u32, 1_000, 10_000] {
        let executions = synthetic_executions(200, elements);
        let spectrum = SpectrumData::from_executions(&executions, Granularity::Line);
        group.throughput(Throughput::Elements(elements as u64));

        group.bench_with_input(
            BenchmarkId::new("build", elements),
            &spectrum,
            |b, spectrum| {
                b.iter(|| {
                    let ranking = Ranking::build(black_box(spectrum), SbflFormula::Ochiai);
                    black_box(ranking);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the four formulas over one mid-sized spectrum
fn bench_formula_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("formula_comparison");

    let executions = synthetic_executions(200, 1_000);
    let spectrum = SpectrumData::from_executions(&executions, Granularity::Line);
    let formulas = [
        (SbflFormula::Tarantula, "tarantula"),
        (SbflFormula::Ochiai, "ochiai"),
        (SbflFormula::Jaccard, "jaccard"),
        (SbflFormula::Ample, "ample"),
    ];

    for (formula, name) in formulas {
        group.bench_with_input(
            BenchmarkId::new("build", name),
            &formula,
            |b, &formula| {
                b.iter(|| {
                    let ranking = Ranking::build(black_box(&spectrum), formula);
                    black_box(ranking);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark rank queries against a built ranking
fn bench_rank_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_queries");

    let executions = synthetic_executions(200, 10_000);
    let spectrum = SpectrumData::from_executions(&executions, Granularity::Line);
    let ranking = Ranking::build(&spectrum, SbflFormula::Ochiai);
    let probe_element = ranking.at(ranking.len() / 2).unwrap().element.clone();

    group.bench_function("rank_of", |b| {
        b.iter(|| {
            let rank = ranking.rank_of(black_box(&probe_element));
            black_box(rank);
        });
    });

    group.bench_function("score_of", |b| {
        b.iter(|| {
            let score = ranking.score_of(black_box(&probe_element));
            black_box(score);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_spectrum_aggregation,
    bench_ranking_build,
    bench_formula_comparison,
    bench_rank_queries,
);

criterion_main!(benches);
