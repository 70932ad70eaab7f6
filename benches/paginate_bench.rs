use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageFormat, Rgba, RgbaImage};
use rfexport::rendering::Screenshot;
use rfexport::{paginate_to_pdf, PageGeometry, Pagination, SourceRaster};
use std::io::Cursor;

fn bench_plan(c: &mut Criterion) {
    let geometry = PageGeometry::default();
    c.bench_function("plan_and_walk_slices", |b| {
        b.iter(|| {
            let plan = Pagination::new(black_box(SourceRaster { width: 1588, height: 120_000 }), geometry)
                .expect("plan");
            plan.slices().map(|s| plan.placement(&s).height).sum::<f64>()
        })
    });
}

fn bench_paginate_to_pdf(c: &mut Criterion) {
    // a ~3 page capture at 2x scale
    let img = RgbaImage::from_fn(1588, 5000, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png).expect("encode png");
    let shot = Screenshot::from_bytes(png.into_inner()).expect("capture");
    let geometry = PageGeometry::default();

    let mut group = c.benchmark_group("paginate_to_pdf");
    group.sample_size(10);
    group.bench_function("a4_three_pages", |b| {
        b.iter(|| paginate_to_pdf(black_box(&shot), &geometry, 98, "bench").expect("pdf"))
    });
    group.finish();
}

criterion_group!(benches, bench_plan, bench_paginate_to_pdf);
criterion_main!(benches);
