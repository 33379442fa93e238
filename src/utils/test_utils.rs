use nalgebra::{Point3, Rotation3, Unit, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::registration::transform::RigidTransform;

/// Points on a gently bent catheter, one per coil distance. Bent rather
/// than straight so covariance-based fits stay well-conditioned.
pub fn bent_catheter_points(distances: &[f64]) -> Vec<Point3<f64>> {
    distances
        .iter()
        .map(|d| {
            Point3::new(
                (d * 0.11).sin() * 18.0,
                (d * 0.07).cos() * 12.0,
                -d,
            )
        })
        .collect()
}

/// Seeded random rigid motion with a bounded rotation angle.
pub fn random_rigid(seed: u64) -> RigidTransform {
    let mut rng = StdRng::seed_from_u64(seed);
    let axis = Unit::new_normalize(Vector3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    ));
    RigidTransform {
        rotation: Rotation3::from_axis_angle(&axis, rng.random_range(-1.2..1.2)),
        translation: Vector3::new(
            rng.random_range(-50.0..50.0),
            rng.random_range(-50.0..50.0),
            rng.random_range(-50.0..50.0),
        ),
    }
}

/// Seeded point cloud spread through a tracking-volume-sized box.
pub fn random_cloud(n: usize, seed: u64) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point3::new(
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
            )
        })
        .collect()
}

/// Adds isotropic noise of the given amplitude to each point.
pub fn jitter(points: &[Point3<f64>], amplitude: f64, seed: u64) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    points
        .iter()
        .map(|p| {
            p + Vector3::new(
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
            )
        })
        .collect()
}
