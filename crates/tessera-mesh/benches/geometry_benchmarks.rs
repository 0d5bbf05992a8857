use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::{Mat4, Vec2, Vec3};
use tessera_mesh::*;

fn bench_csg_subtract(c: &mut Criterion) {
    let cube = Primitive::cuboid(2.0, 2.0, 2.0).build();
    let sphere = Primitive::sphere(1.3, 24, 12).build();
    c.bench_function("csg_subtract_cube_sphere", |bencher| {
        bencher.iter(|| {
            black_box(csg::subtract(
                black_box(&cube),
                &Mat4::IDENTITY,
                black_box(&sphere),
                &Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            ))
        })
    });
}

fn bench_csg_union(c: &mut Criterion) {
    let a = Primitive::cylinder(1.0, 1.0, 2.0, 24).build();
    let b = Primitive::cuboid(1.0, 3.0, 1.0).build();
    c.bench_function("csg_union_cylinder_box", |bencher| {
        bencher.iter(|| black_box(csg::union(&a, &Mat4::IDENTITY, &b, &Mat4::IDENTITY)))
    });
}

fn bench_decimate_indexed(c: &mut Criterion) {
    let sphere = Primitive::sphere(1.0, 128, 64).build();
    let stride = stride_for_detail(sphere.triangle_count(), 0.2);
    c.bench_function("decimate_indexed_sphere", |bencher| {
        bencher.iter(|| black_box(decimate_triangles(black_box(&sphere), stride)))
    });
}

fn bench_decimate_non_indexed(c: &mut Criterion) {
    let sphere = Primitive::sphere(1.0, 128, 64).build().to_non_indexed();
    let stride = stride_for_reduction(0.5);
    c.bench_function("decimate_non_indexed_sphere", |bencher| {
        bencher.iter(|| black_box(decimate_triangles(black_box(&sphere), stride)))
    });
}

fn bench_primitive_rebuild(c: &mut Criterion) {
    let sphere = Primitive::sphere(1.0, 128, 64);
    c.bench_function("sphere_with_detail_half", |bencher| {
        bencher.iter(|| black_box(sphere.with_detail(black_box(0.5)).build()))
    });
}

fn bench_compute_normals(c: &mut Criterion) {
    let mut sphere = Primitive::sphere(1.0, 128, 64).build();
    c.bench_function("compute_vertex_normals_sphere", |bencher| {
        bencher.iter(|| sphere.compute_vertex_normals())
    });
}

fn bench_lathe(c: &mut Criterion) {
    let profile: Vec<Vec2> = (0..32)
        .map(|i| Vec2::new(1.0 + (i as f32 * 0.3).sin() * 0.2, i as f32 * 0.1))
        .collect();
    c.bench_function("lathe_64_segments", |bencher| {
        bencher.iter(|| black_box(lathe(&profile, 64, 0.0, std::f32::consts::TAU)))
    });
}

criterion_group!(
    benches,
    bench_csg_subtract,
    bench_csg_union,
    bench_decimate_indexed,
    bench_decimate_non_indexed,
    bench_primitive_rebuild,
    bench_compute_normals,
    bench_lathe,
);
criterion_main!(benches);
