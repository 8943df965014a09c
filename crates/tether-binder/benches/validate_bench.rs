//! Benchmarks for binder validation and bulk writes.
//!
//! Run with: `cargo bench --package tether-binder --bench validate_bench`
//!
//! Measures a full binder validation pass and an all-or-nothing bean write
//! for forms of increasing width, each binding carrying a trim converter,
//! a length validator, an integer converter and a range validator.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tether_binder::converter::{StringToIntConverter, TrimConverter};
use tether_binder::validator::{RangeValidator, StringLengthValidator};
use tether_binder::{Binder, ValueField};

#[derive(Debug, Clone, Default)]
struct Sheet {
    cells: Vec<i32>,
}

fn sheet_form(width: usize) -> (Binder<Sheet>, Sheet) {
    let binder = Binder::<Sheet>::new();
    for column in 0..width {
        let field = Rc::new(ValueField::text().with_id(format!("cell-{column}")));
        binder
            .for_field(&field)
            .with_converter(TrimConverter)
            .with_validator(StringLengthValidator::between("1 to 9 digits", 1, 9))
            .with_converter(StringToIntConverter::new("Value must be a number"))
            .with_validator(RangeValidator::between("out of range", 0, 1_000_000))
            .bind(
                move |s: &Sheet| s.cells[column],
                move |s, v| s.cells[column] = v,
            )
            .expect("bind cell");
    }
    let sheet = Sheet {
        cells: (0..width as i32).collect(),
    };
    binder.read_bean(Some(&sheet)).expect("read sheet");
    (binder, sheet)
}

// ============================================================================
// Validation
// ============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("binder/validate");
    for width in [4usize, 32, 256] {
        let (binder, _) = sheet_form(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &binder, |b, binder| {
            b.iter(|| black_box(binder.validate().is_ok()));
        });
    }
    group.finish();
}

// ============================================================================
// Bulk write
// ============================================================================

fn bench_write_bean(c: &mut Criterion) {
    let mut group = c.benchmark_group("binder/write_bean");
    for width in [4usize, 32, 256] {
        let (binder, sheet) = sheet_form(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &binder, |b, binder| {
            b.iter(|| {
                let mut target = sheet.clone();
                binder.write_bean(&mut target).expect("valid sheet");
                black_box(target)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate, bench_write_bean);
criterion_main!(benches);
