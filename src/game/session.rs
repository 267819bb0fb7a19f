//! One play session: the explicit context object that owns the world, the
//! courier, the parcel and the per-level score, and runs the frame tick.

mod tick_pipeline;

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::RigidBodyHandle;
use serde::Serialize;

use super::courier::Courier;
use super::input::HeldKeys;
use super::level_builder::LevelBuilder;
use super::level_generator::LevelData;
use super::parcel::Parcel;
use super::physics::{BodyDesc, BodyShape, PhysicsWorld};
use super::scene::SceneSink;
use super::scoring::{ScoreBreakdown, ScoringSystem};
use crate::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No level loaded
    Idle,
    Playing,
    Delivered,
    Failed,
}

/// Notifications for whoever drives the session (UI, camera shake, audio).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    LevelStarted { level: u32, seed: u64 },
    ParcelDamaged { amount: f32, health: f32 },
    ParcelDetached,
    ParcelExploded { position: Option<Vector3<f32>> },
    StuntLanded { stunts: u32 },
    DeliveryReached { score: ScoreBreakdown },
}

/// Per-tick state for UI consumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSnapshot {
    pub level: u32,
    pub state: SessionState,
    pub elapsed_time: f32,
    pub parcel_health: f32,
    pub parcel_attached: bool,
    pub courier_position: Option<Vector3<f32>>,
    pub grounded: bool,
    /// Physics sub-steps run this tick
    pub substeps: u32,
    pub score: ScoreBreakdown,
}

pub struct GameSession {
    config: GameConfig,
    physics: PhysicsWorld,
    ground: RigidBodyHandle,
    level_builder: LevelBuilder,
    level: Option<LevelData>,
    courier: Courier,
    parcel: Option<Parcel>,
    scoring: ScoringSystem,
    elapsed: f32,
    paused: bool,
    state: SessionState,
    last_substeps: u32,
    /// Score frozen at the moment of delivery
    final_score: Option<ScoreBreakdown>,
    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let mut physics = PhysicsWorld::with_settings(
            config.physics.gravity,
            config.physics.friction,
            config.physics.restitution,
        );
        let ground = physics.create_body(&BodyDesc::fixed(
            BodyShape::Ground,
            Vector3::zeros(),
            UnitQuaternion::identity(),
        ));
        physics.refresh_queries();

        Self {
            level_builder: LevelBuilder::new(config.level.delivery_radius),
            courier: Courier::new(config.courier.clone()),
            scoring: ScoringSystem::new(config.scoring.clone()),
            config,
            physics,
            ground,
            level: None,
            parcel: None,
            elapsed: 0.0,
            paused: false,
            state: SessionState::Idle,
            last_substeps: 0,
            final_score: None,
            events: Vec::new(),
        }
    }

    /// Tear down the previous level, then build level `level_number` with a
    /// fresh courier and an attached parcel. Returns the level seed.
    pub fn start_level(&mut self, level_number: u32, seed: Option<u64>, scene: &mut dyn SceneSink) -> u64 {
        self.dispose_level_objects(scene);

        let data = self
            .level_builder
            .build_level(level_number, seed, &mut self.physics, scene);

        let spawn = data.start_position + Vector3::new(0.0, self.config.courier.spawn_height, 0.0);
        self.courier.create_ragdoll(&mut self.physics, scene, spawn);

        let offset = Vector3::from(self.config.parcel.attach_offset);
        let mut parcel = Parcel::spawn(self.config.parcel.clone(), &mut self.physics, scene, spawn + offset);
        if let Some(torso) = self.courier.torso_handle() {
            parcel.attach_to_courier(&mut self.physics, torso, offset);
        }
        self.parcel = Some(parcel);

        self.scoring.reset();
        self.elapsed = 0.0;
        self.paused = false;
        self.last_substeps = 0;
        self.final_score = None;
        self.state = SessionState::Playing;

        let seed = data.seed;
        log::info!("[Session] Level {} started (seed {})", level_number, seed);
        self.events.push(GameEvent::LevelStarted { level: level_number, seed });
        self.level = Some(data);
        seed
    }

    /// Replay the current level layout from the start.
    pub fn restart(&mut self, scene: &mut dyn SceneSink) -> Option<u64> {
        let (level, seed) = self.level.as_ref().map(|l| (l.level_number, l.seed))?;
        Some(self.start_level(level, Some(seed), scene))
    }

    /// Advance to the next level (capped at the configured maximum) with a new layout.
    pub fn next_level(&mut self, scene: &mut dyn SceneSink) -> u64 {
        let next = match &self.level {
            Some(level) => (level.level_number + 1).min(self.config.level.max_level),
            None => self.config.level.start_level,
        };
        self.start_level(next, None, scene)
    }

    /// Run one frame. Nothing is simulated while paused or outside `Playing`.
    pub fn tick(&mut self, keys: HeldKeys, facing: Vector3<f32>, dt: f32, scene: &mut dyn SceneSink) -> TickSnapshot {
        self.last_substeps = 0;
        if self.state == SessionState::Playing && !self.paused && dt > 0.0 && dt.is_finite() {
            tick_pipeline::run_tick_phases(self, keys, facing, dt, scene);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            level: self.level.as_ref().map_or(0, |l| l.level_number),
            state: self.state,
            elapsed_time: self.elapsed,
            parcel_health: self.parcel.as_ref().map_or(0.0, |p| p.health()),
            parcel_attached: self.parcel.as_ref().is_some_and(|p| p.is_attached()),
            courier_position: self.courier.position(&self.physics),
            grounded: self.courier.is_grounded(),
            substeps: self.last_substeps,
            score: self.final_score.unwrap_or_else(|| self.scoring.breakdown()),
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("[Session] {}", if paused { "Paused" } else { "Resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Release every level, courier and parcel resource.
    pub fn shutdown(&mut self, scene: &mut dyn SceneSink) {
        self.dispose_level_objects(scene);
        self.level = None;
        self.state = SessionState::Idle;
        log::info!("[Session] Shut down");
    }

    // The parcel goes first: removing the torso would silently drop its joint.
    fn dispose_level_objects(&mut self, scene: &mut dyn SceneSink) {
        if let Some(mut parcel) = self.parcel.take() {
            parcel.dispose(&mut self.physics, scene);
        }
        if self.courier.is_active() {
            self.courier.dispose(&mut self.physics, scene);
        }
        self.level_builder.clear_level(&mut self.physics, scene);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn level(&self) -> Option<&LevelData> {
        self.level.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Mutable world access for tests and tooling (e.g. pushing the courier around).
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn ground(&self) -> RigidBodyHandle {
        self.ground
    }

    pub fn courier(&self) -> &Courier {
        &self.courier
    }

    pub fn parcel(&self) -> Option<&Parcel> {
        self.parcel.as_ref()
    }

    pub fn scoring(&self) -> &ScoringSystem {
        &self.scoring
    }

    pub fn level_builder(&self) -> &LevelBuilder {
        &self.level_builder
    }
}
