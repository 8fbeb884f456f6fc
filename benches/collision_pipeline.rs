use criterion::{black_box, criterion_group, criterion_main, Criterion};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rs_physics_core::backends::{
    PhysicsBodyDefinition, PhysicsBodyState, PhysicsBodyType, PhysicsShape, PhysicsWorld, PhysicsWorldConfiguration,
    ReferenceFrame, RigidBodyWorld,
};
use rs_physics_core::broad_phase::{BroadPhase3D, SpatialHash3D, SweepAndPrune3D};
use rs_physics_core::interactions::{CollisionFilter, Gjk3D};
use rs_physics_core::models::{Aabb, BoundingSphere, OrientedBox, Quaternion};
use rs_physics_core::world::{AabbScene, CollisionWorld3D};

fn random_boxes(count: usize) -> Vec<Aabb> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .filter_map(|_| {
            let center = (
                rng.random_range(-50.0..50.0),
                rng.random_range(-50.0..50.0),
                rng.random_range(-50.0..50.0),
            );
            let half = rng.random_range(0.2..1.5);
            Aabb::from_center_half_extents(center, (half, half, half)).ok()
        })
        .collect()
}

pub fn bench_broad_phase(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let boxes = random_boxes(2_000);
    let items: Vec<u32> = (0..boxes.len() as u32).collect();
    let bounds_of = |id: &u32| boxes.get(*id as usize).copied();

    let mut group = c.benchmark_group("broad_phase");
    group.sample_size(50);
    if let Ok(hash) = SpatialHash3D::new(4.0) {
        group.bench_function("spatial_hash", |b| {
            b.iter(|| hash.find_potential_pairs(black_box(&items), &bounds_of).len())
        });
    }
    let sap = SweepAndPrune3D::new();
    group.bench_function("sweep_and_prune", |b| {
        b.iter(|| sap.find_potential_pairs(black_box(&items), &bounds_of).len())
    });
    group.finish();
}

pub fn bench_narrow_phase(c: &mut Criterion) {
    let gjk = Gjk3D::default();
    let (Ok(sphere), Ok(cube)) = (
        BoundingSphere::new((1.2, 0.3, 0.0), 0.5),
        OrientedBox::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), Quaternion::from_axis_angle((0.0, 1.0, 0.0), 0.6)),
    ) else {
        return;
    };
    c.bench_function("gjk_epa_sphere_box", |b| {
        b.iter(|| gjk.intersects_with_manifold(black_box(&sphere), black_box(&cube)))
    });
}

pub fn bench_collision_world(c: &mut Criterion) {
    let boxes = random_boxes(500);
    let items: Vec<u32> = (0..boxes.len() as u32).collect();
    let scene: AabbScene<_, fn(&u32) -> Option<CollisionFilter>> =
        AabbScene::with_default_filter(|id: &u32| boxes.get(*id as usize).copied());
    let mut world = CollisionWorld3D::new(Box::new(SweepAndPrune3D::new()));
    let events = world.update(&items, &scene).len();
    debug!("collision world bench scene starts with {} events", events);

    c.bench_function("collision_world_update_500", |b| b.iter(|| world.update(black_box(&items), &scene).len()));
}

pub fn bench_rigid_body_world(c: &mut Criterion) {
    let Ok(mut world) = RigidBodyWorld::new(PhysicsWorldConfiguration::default()) else {
        return;
    };
    for i in 0..200 {
        let position = ((i % 20) as f64 * 1.1, 1.0 + (i / 20) as f64 * 1.1, 0.0);
        let definition = PhysicsBodyState::at_rest(position, ReferenceFrame::World).and_then(|state| {
            PhysicsBodyDefinition::new(PhysicsBodyType::Dynamic, PhysicsShape::Sphere { radius: 0.5 }, 1.0, state)
        });
        if let Ok(definition) = definition {
            let _ = world.create_body(&definition);
        }
    }
    c.bench_function("rigid_body_world_step_200", |b| b.iter(|| world.step(black_box(1.0 / 60.0))));
}

criterion_group!(benches, bench_broad_phase, bench_narrow_phase, bench_collision_world, bench_rigid_body_world);
criterion_main!(benches);
