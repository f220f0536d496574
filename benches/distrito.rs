use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use distrito::{
    DateRange, DistrictRegistry, FallbackGenerator, RawRecord, RecordNormalizer, SourceVariant,
};

fn month_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
    .unwrap()
}

fn bench_distrito(c: &mut Criterion) {
    let registry = DistrictRegistry::new();
    let districts = registry.all().to_vec();
    let generator = FallbackGenerator::new();
    let range = month_range();

    c.bench_function("fallback_generate_month_all_districts", |b| {
        b.iter(|| generator.generate(black_box(SourceVariant::Weather), range, &districts))
    });

    let raw: Vec<RawRecord> = SourceVariant::ALL
        .into_iter()
        .flat_map(|variant| generator.generate(variant, range, &districts))
        .collect();
    let normalizer = RecordNormalizer::new(&registry);

    c.bench_function("normalize_month_all_sources", |b| {
        b.iter(|| normalizer.normalize(black_box(&raw)))
    });
}

criterion_group!(benches, bench_distrito);
criterion_main!(benches);
