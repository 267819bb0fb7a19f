//! Ragdoll construction, teardown and locomotion against a real physics world.
//!
//! Run with: cargo test --test courier_lifecycle_test

use nalgebra::{UnitQuaternion, Vector3};
use unstable_courier::config::CourierConfig;
use unstable_courier::game::courier::{Courier, CourierState, Joint, Segment};
use unstable_courier::game::input::{HeldKeys, Key};
use unstable_courier::game::physics::{BodyDesc, BodyShape, PhysicsWorld};
use unstable_courier::game::scene::HeadlessScene;

const DT: f32 = 1.0 / 60.0;

fn world_with_floor() -> PhysicsWorld {
    let mut physics = PhysicsWorld::new();
    physics.create_body(&BodyDesc::fixed(
        BodyShape::Ground,
        Vector3::zeros(),
        UnitQuaternion::identity(),
    ));
    physics.refresh_queries();
    physics
}

fn settle(courier: &mut Courier, physics: &mut PhysicsWorld, scene: &mut HeadlessScene, seconds: f32) {
    let frames = (seconds / DT) as usize;
    for _ in 0..frames {
        courier.apply_input(physics, HeldKeys::none(), DT, Vector3::z());
        physics.step(DT, DT, 4);
        courier.update(physics, scene);
    }
}

#[test]
fn test_repeated_resets_do_not_leak_joints() {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());

    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
    let fresh_bodies = physics.body_count();
    let fresh_joints = physics.joint_count();
    assert_eq!(fresh_joints, Joint::ALL.len());
    assert_eq!(fresh_bodies, 1 + Segment::ALL.len());

    for cycle in 0..5 {
        courier.dispose(&mut physics, &mut scene);
        assert_eq!(courier.state(), CourierState::Disposed);
        assert_eq!(physics.joint_count(), 0, "cycle {}", cycle);

        courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
        assert_eq!(physics.body_count(), fresh_bodies, "cycle {}", cycle);
        assert_eq!(physics.joint_count(), fresh_joints, "cycle {}", cycle);
        assert_eq!(courier.live_joint_count(&physics), Joint::COUNT);
        assert_eq!(courier.live_segment_count(&physics), Segment::COUNT);
        assert_eq!(scene.live_visuals(), Segment::COUNT);
    }
}

#[test]
fn test_live_counts_follow_the_physics_world() {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());
    assert_eq!(courier.live_segment_count(&physics), 0);

    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
    let foot = courier.segment_handle(Segment::LeftFoot).unwrap();
    assert!(physics.has_body(foot));

    // Removing a body takes its ankle joint with it.
    assert!(physics.remove_body(foot));
    assert!(!physics.has_body(foot));
    assert_eq!(courier.live_segment_count(&physics), Segment::COUNT - 1);
    assert_eq!(courier.live_joint_count(&physics), Joint::COUNT - 1);
}

#[test]
fn test_create_over_existing_ragdoll_replaces_it() {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());

    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(5.0, 3.0, 0.0));
    assert_eq!(physics.joint_count(), Joint::COUNT);
    assert_eq!(scene.live_visuals(), Segment::COUNT);
}

#[test]
fn test_courier_settles_grounded_and_jump_respects_cooldown() {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());
    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 2.4, 0.0));

    settle(&mut courier, &mut physics, &mut scene, 3.0);
    assert!(courier.update_grounded(&physics), "courier should rest on the floor");

    let jump = HeldKeys::from_keys(&[Key::Jump]);
    courier.apply_input(&mut physics, jump, DT, Vector3::z());
    assert_eq!(courier.jump_cooldown(), CourierConfig::default().jump_cooldown);

    // Still cooling down: holding jump again must not re-arm the timer.
    courier.apply_input(&mut physics, jump, 0.1, Vector3::z());
    assert!((courier.jump_cooldown() - 0.4).abs() < 1.0e-5);
}

/// Torso x after one airborne second with `keys` held toward `facing`.
fn drift_x(keys: HeldKeys, facing: Vector3<f32>) -> f32 {
    let mut physics = PhysicsWorld::new();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());
    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 50.0, 0.0));
    for _ in 0..60 {
        courier.apply_input(&mut physics, keys, DT, facing);
        physics.step(DT, DT, 4);
    }
    courier.position(&physics).unwrap().x
}

#[test]
fn test_movement_keys_push_along_camera_facing() {
    // Camera looking along +X and slightly down; the vertical part is ignored.
    let facing = Vector3::new(1.0, -0.3, 0.0);
    let still = drift_x(HeldKeys::none(), facing);
    let walked = drift_x(HeldKeys::from_keys(&[Key::Forward]), facing);
    let sprinted = drift_x(HeldKeys::from_keys(&[Key::Forward, Key::Sprint]), facing);
    let backed = drift_x(HeldKeys::from_keys(&[Key::Backward]), facing);

    assert!(walked - still > 0.1, "walked {} vs {}", walked, still);
    assert!(sprinted > walked);
    assert!(backed < still);
}

/// Torso z after `seconds` of hopping with `keys` held, starting from a settled pose.
fn hop_from_rest(keys: HeldKeys, seconds: f32) -> f32 {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());
    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 2.4, 0.0));
    settle(&mut courier, &mut physics, &mut scene, 3.0);

    let start = courier.position(&physics).unwrap().z;
    for _ in 0..(seconds / DT) as usize {
        courier.apply_input(&mut physics, keys, DT, Vector3::z());
        physics.step(DT, DT, 4);
        courier.update(&physics, &mut scene);
    }
    courier.position(&physics).unwrap().z - start
}

#[test]
fn test_settled_courier_makes_progress_by_hopping() {
    // A collapsed ragdoll is held by friction; it travels by steering
    // through the air between jumps.
    let forward = hop_from_rest(HeldKeys::from_keys(&[Key::Forward, Key::Jump]), 10.0);
    let backward = hop_from_rest(HeldKeys::from_keys(&[Key::Backward, Key::Jump]), 10.0);
    assert!(forward - backward > 1.0, "forward {} backward {}", forward, backward);
}

#[test]
fn test_queries_after_dispose_are_empty() {
    let mut physics = world_with_floor();
    let mut scene = HeadlessScene::new();
    let mut courier = Courier::new(CourierConfig::default());
    courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
    assert!(courier.head_position(&physics).unwrap().y > courier.position(&physics).unwrap().y);

    courier.dispose(&mut physics, &mut scene);
    assert!(courier.position(&physics).is_none());
    assert!(courier.aerial_sample(&physics).is_none());
    // Input on a disposed courier is silently ignored.
    courier.apply_input(&mut physics, HeldKeys::from_keys(&[Key::Jump]), DT, Vector3::z());
}
