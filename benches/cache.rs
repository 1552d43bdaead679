// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Benchmarks for pivot cache parsing and building.
//!
//! The cache parts are generated in memory, no file is needed.
//!
//! ```bash
//! cargo bench --bench cache
//! ```

use criterion::{criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use std::hint::black_box;
use std::time::Duration;
use xlpivot::pivot::definition::{CacheSource, WorksheetSource};
use xlpivot::xlsx::{read_cache_definition, read_cache_records};
use xlpivot::{build_cache, Workbook};

const RECORDS: usize = 100_000;
const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

fn cache_definition() -> String {
    let mut xml = String::from(
        r#"<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cacheSource type="worksheet"><worksheetSource ref="A1:C100001" sheet="Data"/></cacheSource>
<cacheFields count="3"><cacheField name="Region"><sharedItems count="4">"#,
    );
    for region in REGIONS {
        let _ = write!(xml, r#"<s v="{region}"/>"#);
    }
    xml.push_str(
        r#"</sharedItems></cacheField><cacheField name="Day"><sharedItems/></cacheField>
<cacheField name="Amount"><sharedItems/></cacheField></cacheFields></pivotCacheDefinition>"#,
    );
    xml
}

fn cache_records() -> String {
    let mut xml = String::from(r#"<pivotCacheRecords count="100000">"#);
    for i in 0..RECORDS {
        let _ = write!(
            xml,
            r#"<r><x v="{}"/><d v="2024-01-{:02}T00:00:00"/><n v="{}.5"/></r>"#,
            i % REGIONS.len(),
            i % 28 + 1,
            i
        );
    }
    xml.push_str("</pivotCacheRecords>");
    xml
}

fn bench_cache(c: &mut Criterion) {
    let definition_xml = cache_definition();
    let records_xml = cache_records();
    let mut workbook = Workbook::new();
    workbook.add_worksheet("Data");

    let mut group = c.benchmark_group("cache");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(100));

    group.bench_function("read_records", |b| {
        b.iter(|| black_box(read_cache_records(records_xml.as_bytes()).unwrap().len()))
    });

    let mut definition = read_cache_definition(definition_xml.as_bytes()).unwrap();
    assert!(matches!(
        definition.source,
        CacheSource::Worksheet(WorksheetSource { .. })
    ));
    definition.records = Some(read_cache_records(records_xml.as_bytes()).unwrap());

    group.bench_function("build_cache", |b| {
        b.iter(|| {
            let cache = build_cache(&definition, &workbook).unwrap().unwrap();
            black_box(cache.records().map_or(0, |r| r.len()))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_cache);
criterion_main!(benches);
