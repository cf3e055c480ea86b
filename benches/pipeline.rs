//! Benchmarks for the tilegraph pipeline.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flate2::write::ZlibEncoder;

use tilegraph::{decode_layer, parse_str, DeferredImageLoader, SourceFormat};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> String {
    fs::read_to_string(fixtures_dir().join(name)).unwrap()
}

/// Ids for a `size`x`size` layer with a few flipped cells.
fn layer_ids(size: u32) -> Vec<u32> {
    (0..size * size)
        .map(|i| if i % 7 == 0 { (i % 64) | 0x8000_0000 } else { i % 64 })
        .collect()
}

// -- Parsing benchmarks --

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    let markup = load_fixture("forest.tmx");
    let json = load_fixture("forest.tmj");
    let base = fixtures_dir();

    group.bench_function("markup_map", |b| {
        b.iter(|| {
            parse_str(black_box(&markup), SourceFormat::Markup, &base, &DeferredImageLoader).unwrap()
        })
    });

    group.bench_function("json_map", |b| {
        b.iter(|| parse_str(black_box(&json), SourceFormat::Json, &base, &DeferredImageLoader).unwrap())
    });

    // Large csv layer through the whole builder
    let ids = layer_ids(128);
    let csv: Vec<String> = ids.iter().map(u32::to_string).collect();
    let large = format!(
        r#"<map width="128" height="128"><layer name="big"><data encoding="csv">{}</data></layer></map>"#,
        csv.join(",")
    );
    group.bench_function("markup_map_128x128", |b| {
        b.iter(|| {
            parse_str(black_box(&large), SourceFormat::Markup, Path::new("."), &DeferredImageLoader).unwrap()
        })
    });

    group.finish();
}

// -- Decoding benchmarks --

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");

    let ids = layer_ids(256);
    let csv = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
    let bytes: Vec<u8> = ids.iter().flat_map(|id| id.to_le_bytes()).collect();
    let plain = STANDARD.encode(&bytes);

    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&bytes).unwrap();
    let zlib = STANDARD.encode(encoder.finish().unwrap());

    group.bench_function("csv_256x256", |b| {
        b.iter(|| decode_layer(black_box(&csv), Some("csv"), None, 256, 256).unwrap())
    });

    group.bench_function("base64_256x256", |b| {
        b.iter(|| decode_layer(black_box(&plain), Some("base64"), None, 256, 256).unwrap())
    });

    group.bench_function("base64_zlib_256x256", |b| {
        b.iter(|| decode_layer(black_box(&zlib), Some("base64"), Some("zlib"), 256, 256).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_decoding);
criterion_main!(benches);
