//! Session lifecycle: level start, frame ticks, pause, restart and teardown.
//!
//! Run with: cargo test --test session_tick_test

use nalgebra::{UnitQuaternion, Vector3};
use unstable_courier::config::{GameConfig, ParcelConfig};
use unstable_courier::game::courier::{Joint, Segment};
use unstable_courier::game::impact_events::impact_damage_for;
use unstable_courier::game::input::HeldKeys;
use unstable_courier::game::parcel::{Parcel, ParcelEvent};
use unstable_courier::game::physics::{BodyDesc, BodyShape, ContactEvent, PhysicsWorld};
use unstable_courier::game::scene::{EffectKind, HeadlessScene};
use unstable_courier::game::{GameEvent, GameSession, SessionState};

const DT: f32 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn started_session(level: u32, seed: u64) -> (GameSession, HeadlessScene) {
    let mut scene = HeadlessScene::new();
    let mut session = GameSession::new(GameConfig::default());
    session.start_level(level, Some(seed), &mut scene);
    (session, scene)
}

/// Ground + level slabs + ragdoll segments + parcel.
fn expected_bodies(session: &GameSession) -> usize {
    1 + session.level_builder().objects().len() + Segment::COUNT + 1
}

fn idle(session: &mut GameSession, scene: &mut HeadlessScene, frames: usize) {
    for _ in 0..frames {
        session.tick(HeldKeys::none(), Vector3::z(), DT, scene);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_new_session_is_idle_and_ignores_ticks() {
    let mut scene = HeadlessScene::new();
    let mut session = GameSession::new(GameConfig::default());

    let snapshot = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.elapsed_time, 0.0);
    assert_eq!(snapshot.substeps, 0);
    assert_eq!(session.physics().body_count(), 1);
}

#[test]
fn test_start_level_builds_world() {
    let (mut session, scene) = started_session(2, 11);

    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(session.level().map(|l| l.seed), Some(11));
    assert_eq!(session.physics().body_count(), expected_bodies(&session));
    // Ragdoll joints + the parcel attachment
    assert_eq!(session.physics().joint_count(), Joint::COUNT + 1);
    assert!(session.parcel().is_some_and(|p| p.is_attached()));
    assert!(scene.live_visuals() > Segment::COUNT);

    let events = session.drain_events();
    assert_eq!(events, vec![GameEvent::LevelStarted { level: 2, seed: 11 }]);
    assert!(session.drain_events().is_empty());
}

#[test]
fn test_restart_and_next_level_do_not_leak() {
    let (mut session, mut scene) = started_session(1, 3);
    idle(&mut session, &mut scene, 30);

    let bodies = session.physics().body_count();
    let colliders = session.physics().collider_count();
    let visuals = scene.live_visuals();

    for _ in 0..3 {
        assert_eq!(session.restart(&mut scene), Some(3));
        assert_eq!(session.physics().body_count(), bodies);
        assert_eq!(session.physics().collider_count(), colliders);
        assert_eq!(session.physics().joint_count(), Joint::COUNT + 1);
        assert_eq!(scene.live_visuals(), visuals);
        assert_eq!(session.elapsed(), 0.0);
    }

    session.next_level(&mut scene);
    assert_eq!(session.level().map(|l| l.level_number), Some(2));
    assert_eq!(session.physics().body_count(), expected_bodies(&session));
    assert_eq!(session.physics().joint_count(), Joint::COUNT + 1);
}

#[test]
fn test_next_level_stops_at_max_level() {
    let mut scene = HeadlessScene::new();
    let mut config = GameConfig::default();
    config.level.max_level = 2;
    let mut session = GameSession::new(config);

    session.start_level(2, Some(1), &mut scene);
    session.next_level(&mut scene);
    assert_eq!(session.level().map(|l| l.level_number), Some(2));
}

#[test]
fn test_shutdown_releases_everything() {
    let (mut session, mut scene) = started_session(4, 8);
    idle(&mut session, &mut scene, 10);

    session.shutdown(&mut scene);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.physics().body_count(), 1);
    assert_eq!(session.physics().joint_count(), 0);
    assert_eq!(scene.live_visuals(), 0);
    assert!(session.level().is_none());
}

// ---------------------------------------------------------------------------
// Ticking
// ---------------------------------------------------------------------------

#[test]
fn test_tick_advances_time_and_substeps() {
    let (mut session, mut scene) = started_session(1, 5);

    let snapshot = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert!((snapshot.elapsed_time - DT).abs() < 1.0e-6);
    assert_eq!(snapshot.substeps, 1);
    assert!(snapshot.courier_position.is_some());
    assert_eq!(scene.camera_target(), snapshot.courier_position);

    // A long frame is capped at the configured sub-step count.
    let snapshot = session.tick(HeldKeys::none(), Vector3::z(), 1.0, &mut scene);
    assert_eq!(snapshot.substeps, session.config().physics.max_substeps);
}

#[test]
fn test_pause_freezes_simulation() {
    let (mut session, mut scene) = started_session(1, 5);
    idle(&mut session, &mut scene, 5);
    let before = session.snapshot();

    session.set_paused(true);
    assert!(session.is_paused());
    let paused = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert_eq!(paused.elapsed_time, before.elapsed_time);
    assert_eq!(paused.courier_position, before.courier_position);
    assert_eq!(paused.substeps, 0);

    session.set_paused(false);
    let resumed = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert!(resumed.elapsed_time > before.elapsed_time);
}

#[test]
fn test_invalid_dt_is_ignored() {
    let (mut session, mut scene) = started_session(1, 5);
    for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let snapshot = session.tick(HeldKeys::none(), Vector3::z(), dt, &mut scene);
        assert_eq!(snapshot.elapsed_time, 0.0);
    }
}

#[test]
fn test_score_drops_over_time() {
    let (mut session, mut scene) = started_session(1, 5);
    let fresh = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene).score;
    idle(&mut session, &mut scene, 120);
    let later = session.snapshot().score;
    assert!(later.time_bonus < fresh.time_bonus);
    assert!(later.time_bonus >= session.config().scoring.min_time_bonus);
}

#[test]
fn test_violent_drop_destroys_parcel_and_fails_level() {
    let (mut session, mut scene) = started_session(1, 5);
    // One frame first so the parcel has settled mass properties.
    idle(&mut session, &mut scene, 1);
    session.drain_events();

    let body = session.parcel().and_then(|p| p.body_handle()).unwrap();
    session
        .physics_mut()
        .apply_impulse(body, Vector3::new(0.0, -20_000.0, 0.0), None);
    let snapshot = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);

    assert_eq!(snapshot.state, SessionState::Failed);
    assert_eq!(snapshot.parcel_health, 0.0);
    assert!(!snapshot.parcel_attached);

    let events = session.drain_events();
    assert!(events.iter().any(|e| matches!(e, GameEvent::ParcelDamaged { .. })));
    assert!(events.iter().any(|e| matches!(e, GameEvent::ParcelExploded { .. })));
    assert!(scene.effects().iter().any(|(kind, _)| *kind == EffectKind::Explosion));

    // The level no longer simulates.
    let frozen = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert_eq!(frozen.elapsed_time, snapshot.elapsed_time);
}

#[test]
fn test_landing_contact_damages_parcel_without_fall_damage() {
    let mut config = GameConfig::default();
    // Only collision damage can hurt the parcel now.
    config.parcel.fall_damage_threshold = f32::MAX;
    let max_health = config.parcel.max_health;
    let mut scene = HeadlessScene::new();
    let mut session = GameSession::new(config);
    session.start_level(1, Some(5), &mut scene);
    idle(&mut session, &mut scene, 1);
    session.drain_events();

    let body = session.parcel().and_then(|p| p.body_handle()).unwrap();
    session
        .physics_mut()
        .apply_impulse(body, Vector3::new(0.0, -20_000.0, 0.0), None);

    let mut events = Vec::new();
    for _ in 0..30 {
        session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
        events.extend(session.drain_events());
        if session.state() != SessionState::Playing {
            break;
        }
    }

    let damage: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ParcelDamaged { amount, .. } => Some(*amount),
            _ => None,
        })
        .collect();
    assert!(!damage.is_empty(), "events {:?}", events);
    assert!(damage.iter().all(|&amount| amount > 0.0));
    assert!(session.parcel().unwrap().health() < max_health);
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[test]
fn test_delivery_freezes_score_and_stops_ticking() {
    let mut config = GameConfig::default();
    config.level.delivery_radius = 1000.0;
    let mut scene = HeadlessScene::new();
    let mut session = GameSession::new(config);
    session.start_level(3, Some(5), &mut scene);
    session.drain_events();

    let delivered = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert_eq!(delivered.state, SessionState::Delivered);
    assert!(delivered.score.final_score > 0);

    let events = session.drain_events();
    assert_eq!(events, vec![GameEvent::DeliveryReached { score: delivered.score }]);

    let later = session.tick(HeldKeys::none(), Vector3::z(), DT, &mut scene);
    assert_eq!(later.state, SessionState::Delivered);
    assert_eq!(later.elapsed_time, delivered.elapsed_time);
    assert_eq!(later.score, delivered.score);
    assert_eq!(later.substeps, 0);
    assert_eq!(session.snapshot().score, delivered.score);
    assert!(session.drain_events().is_empty());
}

#[test]
fn test_far_from_zone_keeps_playing() {
    let (mut session, mut scene) = started_session(3, 5);
    idle(&mut session, &mut scene, 10);
    assert_eq!(session.state(), SessionState::Playing);
    assert!(!session
        .drain_events()
        .iter()
        .any(|e| matches!(e, GameEvent::DeliveryReached { .. })));
}

// ---------------------------------------------------------------------------
// Known interaction: one hard landing can be charged as both impact and fall damage
// ---------------------------------------------------------------------------

#[test]
fn test_landing_counts_collision_and_fall_damage() {
    let config = ParcelConfig::default();
    let mut physics = PhysicsWorld::new();
    let mut scene = HeadlessScene::new();
    let floor = physics.create_body(&BodyDesc::fixed(
        BodyShape::Ground,
        Vector3::zeros(),
        UnitQuaternion::identity(),
    ));
    let mut parcel = Parcel::spawn(config.clone(), &mut physics, &mut scene, Vector3::new(0.0, 50.0, 0.0));
    let body = parcel.body_handle().unwrap();

    physics.step(DT, DT, 1);
    physics.apply_impulse(body, Vector3::new(0.0, -config.mass * 30.0, 0.0), None);
    physics.step(DT, DT, 1);

    let landing = [ContactEvent {
        body1: body,
        body2: floor,
        impact_speed: 12.0,
    }];
    for amount in impact_damage_for(&landing, body, config.impact_damage_threshold, config.impact_damage_multiplier) {
        parcel.take_damage(&mut physics, amount);
    }
    parcel.update(&mut physics);

    let damaged = parcel
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, ParcelEvent::Damaged { .. }))
        .count();
    assert_eq!(damaged, 2);
    assert!(parcel.health() < config.max_health - 20.0);
    assert!(!parcel.is_exploded());
}
