use criterion::{Criterion, criterion_group, criterion_main};
use geoanchor::source::RecordCallback;
use geoanchor::{CityIndex, CityRecord, CityRecordSource, Config, LoadFilter, Result};
use std::io::BufRead;

struct GridSource {
    records: Vec<CityRecord>,
}

impl CityRecordSource for GridSource {
    fn name(&self) -> &str {
        "GridSource"
    }

    fn parse(
        &self,
        _reader: &mut dyn BufRead,
        callback: &mut RecordCallback<'_>,
    ) -> Result<usize> {
        for record in &self.records {
            callback(record.clone())?;
        }
        Ok(self.records.len())
    }
}

/// A 40x40 grid of towns over southeast Michigan, with a sprinkling of
/// urban centers.
fn grid_source() -> GridSource {
    let mut records = Vec::new();

    for i in 0..40u32 {
        for j in 0..40u32 {
            let n = i * 40 + j;
            let population = if n % 97 == 0 { 250_000 } else { 1_000 + n as u64 };

            records.push(CityRecord {
                id: n.to_string(),
                country: "United States".to_string(),
                province_state: "MI".to_string(),
                city: format!("Town {}", n),
                population,
                latitude: 42.0 + f64::from(i) * 0.02,
                longitude: -84.0 + f64::from(j) * 0.02,
            });
        }
    }

    GridSource { records }
}

fn build_index(cache_capacity: usize) -> CityIndex {
    let mut index = CityIndex::in_memory(
        Config::default().with_cache_capacity(cache_capacity),
    )
    .unwrap();

    let mut reader: &[u8] = &[];
    index
        .load(&grid_source(), &mut reader, &LoadFilter::pass_all())
        .unwrap();
    index
}

fn bench_nearest(c: &mut Criterion) {
    // Alternate between two fingerprints against a capacity-1 cache so
    // every call takes the full miss path.
    let cold = build_index(1);
    c.bench_function("nearest_miss", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let lat = if flip { 42.31 } else { 42.52 };
            cold.nearest(lat, -83.61, false).unwrap()
        })
    });

    let warm = build_index(100);
    c.bench_function("nearest_cached", |b| {
        b.iter(|| warm.nearest(42.31, -83.61, false).unwrap())
    });
}

criterion_group!(benches, bench_nearest);
criterion_main!(benches);
