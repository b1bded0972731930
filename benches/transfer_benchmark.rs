//! Performance benchmarks for FileFerry
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fileferry::{TransferEngine, TransferOptions};
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

/// Create a test file of the specified size
fn create_test_file(dir: &std::path::Path, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();

    let chunk_size = 64 * 1024;
    let chunk: Vec<u8> = (0..chunk_size).map(|i| (i % 256) as u8).collect();
    let mut remaining = size;

    while remaining > 0 {
        let to_write = remaining.min(chunk_size);
        file.write_all(&chunk[..to_write]).unwrap();
        remaining -= to_write;
    }

    path
}

fn transfer_options(src: &TempDir, dst: &TempDir) -> TransferOptions {
    TransferOptions {
        source_directory: src.path().display().to_string(),
        target_directory: dst.path().display().to_string(),
        ..Default::default()
    }
}

/// Empty the destination so every iteration transfers the same amount
fn clean_dir(dir: &std::path::Path) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let _ = std::fs::remove_file(entry.unwrap().path());
    }
}

fn bench_copy_small_batch(c: &mut Criterion) {
    let src_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();

    // Create 100 small files
    for i in 0..100 {
        create_test_file(src_dir.path(), &format!("file_{}.txt", i), 1024);
    }

    let engine = TransferEngine::new(transfer_options(&src_dir, &dst_dir)).unwrap();

    c.bench_function("copy_100_small_files", |b| {
        b.iter(|| {
            let _ = black_box(engine.copy_files());
            clean_dir(dst_dir.path());
        });
    });
}

fn bench_transfer_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy");

    for (label, size) in [
        ("64k", 64 * 1024),
        ("1m", 1024 * 1024),
        ("8m", 8 * 1024 * 1024),
    ] {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        create_test_file(src_dir.path(), "payload.bin", size);

        group.throughput(Throughput::Bytes(size as u64));

        let atomic = TransferEngine::new(transfer_options(&src_dir, &dst_dir)).unwrap();
        group.bench_with_input(BenchmarkId::new("atomic", label), &size, |b, _| {
            b.iter(|| {
                let _ = black_box(atomic.copy_files());
                clean_dir(dst_dir.path());
            });
        });

        let streamed = TransferEngine::new(TransferOptions {
            streaming_transfer: true,
            streaming_block_size: Some("8192".into()),
            ..transfer_options(&src_dir, &dst_dir)
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::new("streamed_8k", label), &size, |b, _| {
            b.iter(|| {
                let _ = black_box(streamed.copy_files());
                clean_dir(dst_dir.path());
            });
        });
    }

    group.finish();
}

fn bench_streaming_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_block_size");
    let size = 1024 * 1024;

    for block in [512usize, 4096, 65536] {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        create_test_file(src_dir.path(), "payload.bin", size);

        let engine = TransferEngine::new(TransferOptions {
            streaming_transfer: true,
            streaming_block_size: Some(block.to_string()),
            ..transfer_options(&src_dir, &dst_dir)
        })
        .unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, _| {
            b.iter(|| {
                let _ = black_box(engine.copy_files());
                clean_dir(dst_dir.path());
            });
        });
    }

    group.finish();
}

fn bench_lock_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_overhead");

    for (label, lock_enabled) in [("locked", true), ("unlocked", false)] {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        create_test_file(src_dir.path(), "payload.bin", 4 * 1024);

        let engine = TransferEngine::new(TransferOptions {
            lock_enabled,
            ..transfer_options(&src_dir, &dst_dir)
        })
        .unwrap();

        group.bench_function(label, |b| {
            b.iter(|| {
                let _ = black_box(engine.copy_files());
                clean_dir(dst_dir.path());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_copy_small_batch,
    bench_transfer_strategies,
    bench_streaming_block_sizes,
    bench_lock_overhead
);

criterion_main!(benches);
