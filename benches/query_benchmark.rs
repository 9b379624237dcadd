use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use shoal::{Aabb, Octree};

fn random_points(rng: &mut fastrand::Rng, count: usize, half: f32) -> Vec<Vec3> {
    (0..count)
        .map(|_| {
            Vec3::new(
                (rng.f32() * 2.0 - 1.0) * half,
                (rng.f32() * 2.0 - 1.0) * half,
                (rng.f32() * 2.0 - 1.0) * half,
            )
        })
        .collect()
}

fn bench_radius_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("radius_query");

    for &count in &[1_000usize, 5_000, 20_000] {
        let mut rng = fastrand::Rng::with_seed(count as u64);
        let points = random_points(&mut rng, count, 10.0);
        let mut tree = Octree::new(Aabb::cube(Vec3::ZERO, 10.0), 10, 0.5);
        for (i, &p) in points.iter().enumerate() {
            tree.insert(i as u32, p);
        }
        let centers = random_points(&mut rng, 64, 10.0);

        group.bench_with_input(BenchmarkId::new("octree", count), &count, |b, _| {
            let mut out = Vec::new();
            b.iter(|| {
                for &center in &centers {
                    tree.query_neighbors(black_box(center), 5.0, &mut out);
                    black_box(out.len());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("brute_force", count), &count, |b, _| {
            b.iter(|| {
                for &center in &centers {
                    let hits = points
                        .iter()
                        .filter(|p| p.distance_squared(black_box(center)) <= 25.0)
                        .count();
                    black_box(hits);
                }
            });
        });
    }

    group.finish();
}

fn bench_incremental_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_update");

    for &count in &[1_000usize, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &n| {
            let mut rng = fastrand::Rng::with_seed(7);
            let points = random_points(&mut rng, n, 10.0);
            let mut tree = Octree::new(Aabb::cube(Vec3::ZERO, 10.0), 10, 0.5);
            for (i, &p) in points.iter().enumerate() {
                tree.insert(i as u32, p);
            }
            // Small per-tick drift: most updates stay within their node.
            let drifted: Vec<Vec3> = points
                .iter()
                .map(|&p| p + Vec3::splat(rng.f32() * 0.4 - 0.2))
                .collect();
            b.iter(|| {
                for (i, &p) in drifted.iter().enumerate() {
                    tree.update_position(i as u32, black_box(p));
                }
                for (i, &p) in points.iter().enumerate() {
                    tree.update_position(i as u32, black_box(p));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_radius_query, bench_incremental_update);
criterion_main!(benches);
