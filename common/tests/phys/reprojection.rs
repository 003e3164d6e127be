use crate::utils::{random_rotation, random_vec3, seeded_rng, EPSILON};
use aperture_common::portal::{
    relative_rotation, reproject_position, reproject_rotation, PortalPose,
};
use approx::assert_relative_eq;
use rand::Rng;
use vek::*;

fn random_pair(rng: &mut impl Rng) -> (PortalPose, PortalPose) {
    (
        PortalPose::new(random_vec3(rng, 20.0), random_rotation(rng)),
        PortalPose::new(random_vec3(rng, 20.0), random_rotation(rng)),
    )
}

/// Rotations are equal up to sign.
fn same_rotation(a: Quaternion<f32>, b: Quaternion<f32>) -> bool {
    a.into_vec4().dot(b.into_vec4()).abs() > 1.0 - EPSILON
}

#[test]
fn there_and_back_again() {
    let mut rng = seeded_rng(0x5eed);
    for _ in 0..200 {
        let (a, b) = random_pair(&mut rng);
        let p = random_vec3(&mut rng, 10.0);
        let q = random_rotation(&mut rng);

        let back = reproject_position(reproject_position(p, &a, &b), &b, &a);
        assert_relative_eq!(back, p, epsilon = 1e-3);

        let back = reproject_rotation(reproject_rotation(q, &a, &b), &b, &a);
        assert!(same_rotation(back, q));
    }
}

#[test]
fn sides_swap_through_the_pair() {
    let mut rng = seeded_rng(42);
    for _ in 0..100 {
        let (a, b) = random_pair(&mut rng);
        let p = random_vec3(&mut rng, 10.0);

        // Distance in front of A becomes the same distance behind B
        let before = a.plane().distance(p);
        let after = b.plane().distance(reproject_position(p, &a, &b));
        assert_relative_eq!(before, -after, epsilon = 1e-3);

        // Going into A is coming out of B
        let delta = relative_rotation(&a, &b);
        assert_relative_eq!(delta * -a.normal(), b.normal(), epsilon = EPSILON);
        assert_relative_eq!(delta * a.up(), b.up(), epsilon = EPSILON);
        assert_relative_eq!(delta * a.right(), -b.right(), epsilon = EPSILON);
    }
}

#[test]
fn rotation_matches_direction_mapping() {
    let mut rng = seeded_rng(7);
    let (a, b) = random_pair(&mut rng);
    let q = random_rotation(&mut rng);
    let forward = q * Vec3::unit_z();

    let mapped = reproject_rotation(q, &a, &b) * Vec3::unit_z();
    let via_points = reproject_position(a.pos + forward, &a, &b) - b.pos;
    assert_relative_eq!(mapped, via_points, epsilon = EPSILON);
}
