//! The player-controlled ragdoll courier.
//!
//! Nine rigid segments joined by ball sockets. The skeleton is a fixed
//! aggregate: [`Ragdoll::spawn`] creates every body and joint in one go and
//! [`Ragdoll::dispose`] tears them down (joints, then bodies, then visuals).
//! Locomotion works by pushing the torso around; the limbs follow through the
//! joints.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rapier3d::prelude::{ImpulseJointHandle, RigidBodyHandle};

use super::constants::courier::FOOT_PROBE_DISTANCE;
use super::constants::physics::GROUND_LEVEL;
use super::input::{HeldKeys, Key};
use super::physics::{BodyDesc, BodyShape, CollisionLayer, PhysicsWorld, PointToPoint};
use super::scene::{Pose, SceneSink, VisualDesc, VisualId, VisualShape};
use super::scoring::AerialSample;
use crate::config::CourierConfig;

/// Body segments of the courier, in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Head,
    Torso,
    LeftArm,
    RightArm,
    Hips,
    LeftLeg,
    RightLeg,
    LeftFoot,
    RightFoot,
}

/// Physical description of one segment, relative to the torso spawn point.
#[derive(Debug, Clone, Copy)]
struct SegmentSpec {
    shape: BodyShape,
    mass: f32,
    offset: Vector3<f32>,
    damping: f32,
    friction: Option<f32>,
    color: u32,
}

impl Segment {
    pub const COUNT: usize = 9;

    pub const ALL: [Segment; Segment::COUNT] = [
        Segment::Head,
        Segment::Torso,
        Segment::LeftArm,
        Segment::RightArm,
        Segment::Hips,
        Segment::LeftLeg,
        Segment::RightLeg,
        Segment::LeftFoot,
        Segment::RightFoot,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn spec(self) -> SegmentSpec {
        let arm = BodyShape::Cylinder { half_height: 0.4, radius: 0.075 };
        let leg = BodyShape::Cylinder { half_height: 0.45, radius: 0.075 };
        let foot = BodyShape::Ball { radius: 0.15 };
        let (shape, mass, offset, damping, friction, color) = match self {
            Segment::Head => (BodyShape::Ball { radius: 0.2 }, 5.0, [0.0, 1.2, 0.0], 0.3, None, 0xffc896),
            Segment::Torso => (
                BodyShape::Cuboid { half_extents: Vector3::new(0.3, 0.5, 0.2) },
                50.0,
                [0.0, 0.0, 0.0],
                0.5,
                Some(0.95),
                0x3498db,
            ),
            Segment::LeftArm => (arm, 3.0, [-0.45, 0.2, 0.0], 0.4, Some(0.3), 0x2c3e50),
            Segment::RightArm => (arm, 3.0, [0.45, 0.2, 0.0], 0.4, Some(0.3), 0x2c3e50),
            Segment::Hips => (
                BodyShape::Cuboid { half_extents: Vector3::new(0.25, 0.15, 0.15) },
                15.0,
                [0.0, -0.8, 0.0],
                0.4,
                None,
                0x2c3e50,
            ),
            Segment::LeftLeg => (leg, 4.0, [-0.15, -1.5, 0.0], 0.4, None, 0x95a5a6),
            Segment::RightLeg => (leg, 4.0, [0.15, -1.5, 0.0], 0.4, None, 0x95a5a6),
            Segment::LeftFoot => (foot, 1.0, [-0.15, -2.1, 0.0], 0.5, Some(0.5), 0x000000),
            Segment::RightFoot => (foot, 1.0, [0.15, -2.1, 0.0], 0.5, Some(0.5), 0x000000),
        };
        SegmentSpec {
            shape,
            mass,
            offset: Vector3::from(offset),
            damping,
            friction,
            color,
        }
    }
}

/// Ball-socket joints of the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Neck,
    LeftShoulder,
    RightShoulder,
    Waist,
    /// Arm-to-hip stabilizers keep the arms from flailing
    LeftArmHip,
    RightArmHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const COUNT: usize = 10;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Neck,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::Waist,
        Joint::LeftArmHip,
        Joint::RightArmHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    /// (segment a, local anchor on a, segment b, local anchor on b)
    fn connection(self) -> (Segment, [f32; 3], Segment, [f32; 3]) {
        use Segment::*;
        match self {
            Joint::Neck => (Head, [0.0, -0.2, 0.0], Torso, [0.0, 0.5, 0.0]),
            Joint::LeftShoulder => (Torso, [-0.3, 0.4, 0.0], LeftArm, [0.0, 0.4, 0.0]),
            Joint::RightShoulder => (Torso, [0.3, 0.4, 0.0], RightArm, [0.0, 0.4, 0.0]),
            Joint::Waist => (Torso, [0.0, -0.5, 0.0], Hips, [0.0, 0.15, 0.0]),
            Joint::LeftArmHip => (LeftArm, [0.0, -0.4, 0.0], Hips, [-0.25, 0.0, 0.0]),
            Joint::RightArmHip => (RightArm, [0.0, -0.4, 0.0], Hips, [0.25, 0.0, 0.0]),
            Joint::LeftKnee => (Hips, [-0.15, -0.15, 0.0], LeftLeg, [0.0, 0.45, 0.0]),
            Joint::RightKnee => (Hips, [0.15, -0.15, 0.0], RightLeg, [0.0, 0.45, 0.0]),
            Joint::LeftAnkle => (LeftLeg, [0.0, -0.45, 0.0], LeftFoot, [0.0, 0.0, 0.0]),
            Joint::RightAnkle => (RightLeg, [0.0, -0.45, 0.0], RightFoot, [0.0, 0.0, 0.0]),
        }
    }
}

fn visual_shape(shape: BodyShape) -> VisualShape {
    match shape {
        BodyShape::Cuboid { half_extents } => VisualShape::Box { size: half_extents * 2.0 },
        BodyShape::Ball { radius } => VisualShape::Sphere { radius },
        BodyShape::Cylinder { half_height, radius } => VisualShape::Cylinder {
            radius,
            height: half_height * 2.0,
        },
        BodyShape::Ground => VisualShape::Marker { radius: 0.0 },
    }
}

/// Every physics and scene resource of one courier body.
#[derive(Debug)]
pub struct Ragdoll {
    bodies: [RigidBodyHandle; Segment::COUNT],
    visuals: [VisualId; Segment::COUNT],
    joints: [ImpulseJointHandle; Joint::COUNT],
}

impl Ragdoll {
    /// Create all segments with the torso at `origin`, then wire the joints.
    pub fn spawn(physics: &mut PhysicsWorld, scene: &mut dyn SceneSink, origin: Vector3<f32>) -> Self {
        let specs = Segment::ALL.map(Segment::spec);

        let bodies = specs.map(|spec| {
            let mut desc = BodyDesc::dynamic(spec.shape, spec.mass, origin + spec.offset, CollisionLayer::Courier)
                .with_damping(spec.damping, spec.damping);
            if let Some(friction) = spec.friction {
                desc = desc.with_friction(friction);
            }
            physics.create_body(&desc)
        });

        let visuals = specs.map(|spec| {
            scene.create_visual(&VisualDesc {
                shape: visual_shape(spec.shape),
                pose: Pose::at(origin + spec.offset),
                color: spec.color,
            })
        });

        let joints = Joint::ALL.map(|joint| {
            let (a, anchor_a, b, anchor_b) = joint.connection();
            physics.add_constraint(&PointToPoint {
                body1: bodies[a.index()],
                anchor1: Point3::from(anchor_a),
                body2: bodies[b.index()],
                anchor2: Point3::from(anchor_b),
            })
        });

        Self { bodies, visuals, joints }
    }

    pub fn body(&self, segment: Segment) -> RigidBodyHandle {
        self.bodies[segment.index()]
    }

    /// Remove joints first, then bodies, then visuals.
    pub fn dispose(self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) {
        for (joint, handle) in Joint::ALL.iter().zip(self.joints) {
            let removed = physics.remove_constraint(handle);
            if !removed {
                log::error!("[Courier] Joint {:?} missing on dispose", joint);
            }
            debug_assert!(removed, "courier joint removed twice");
        }
        for (segment, handle) in Segment::ALL.iter().zip(self.bodies) {
            let removed = physics.remove_body(handle);
            if !removed {
                log::error!("[Courier] Segment {:?} missing on dispose", segment);
            }
            debug_assert!(removed, "courier segment removed twice");
        }
        for visual in self.visuals {
            scene.destroy_visual(visual);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierState {
    Uninitialized,
    Active,
    Disposed,
}

/// Vertical state of one foot used by the grounded check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootState {
    /// Height of the foot centre above the surface below it
    pub clearance: f32,
    pub vertical_speed: f32,
}

/// Grounded when the feet are low on average AND both are nearly still vertically.
pub fn evaluate_grounded(left: FootState, right: FootState, max_height: f32, max_speed: f32) -> bool {
    let average = (left.clearance + right.clearance) / 2.0;
    average < max_height && left.vertical_speed.abs() < max_speed && right.vertical_speed.abs() < max_speed
}

/// Yaw of a rotation: angle of its forward (+Z) axis around +Y.
pub fn heading_of(rotation: &UnitQuaternion<f32>) -> f32 {
    let forward = rotation * Vector3::z();
    forward.x.atan2(forward.z)
}

pub struct Courier {
    config: CourierConfig,
    state: CourierState,
    ragdoll: Option<Ragdoll>,
    jump_cooldown: f32,
    grounded: bool,
    velocity: Vector3<f32>,
}

impl Courier {
    pub fn new(config: CourierConfig) -> Self {
        Self {
            config,
            state: CourierState::Uninitialized,
            ragdoll: None,
            jump_cooldown: 0.0,
            grounded: false,
            velocity: Vector3::zeros(),
        }
    }

    pub fn state(&self) -> CourierState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CourierState::Active
    }

    /// Build a fresh ragdoll with the torso at `origin`. An existing ragdoll is
    /// disposed first, so repeated resets never accumulate joints.
    pub fn create_ragdoll(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink, origin: Vector3<f32>) {
        if let Some(ragdoll) = self.ragdoll.take() {
            ragdoll.dispose(physics, scene);
        }
        self.ragdoll = Some(Ragdoll::spawn(physics, scene, origin));
        self.state = CourierState::Active;
        self.jump_cooldown = 0.0;
        self.grounded = false;
        self.velocity = Vector3::zeros();
        log::debug!("[Courier] Spawned at ({:.1}, {:.1}, {:.1})", origin.x, origin.y, origin.z);
    }

    pub fn dispose(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) {
        if let Some(ragdoll) = self.ragdoll.take() {
            ragdoll.dispose(physics, scene);
            log::debug!("[Courier] Disposed");
        }
        self.state = CourierState::Disposed;
        self.grounded = false;
    }

    /// Turn held keys into forces and impulses for the next physics step.
    /// `facing` is the camera's forward direction; only its horizontal part is used.
    pub fn apply_input(&mut self, physics: &mut PhysicsWorld, keys: HeldKeys, dt: f32, facing: Vector3<f32>) {
        let Some(ragdoll) = &self.ragdoll else {
            return;
        };
        let torso = ragdoll.body(Segment::Torso);
        let hips = ragdoll.body(Segment::Hips);

        if self.jump_cooldown > 0.0 {
            self.jump_cooldown = (self.jump_cooldown - dt).max(0.0);
        }

        let force = if keys.is_held(Key::Sprint) {
            self.config.movement_force * self.config.sprint_multiplier
        } else {
            self.config.movement_force
        };

        if let Some(forward) = Vector3::new(facing.x, 0.0, facing.z).try_normalize(f32::EPSILON) {
            let right = Vector3::new(-forward.z, 0.0, forward.x);
            let mut movement = Vector3::zeros();
            if keys.is_held(Key::Forward) {
                movement += forward;
            }
            if keys.is_held(Key::Backward) {
                movement -= forward;
            }
            if keys.is_held(Key::Left) {
                movement -= right;
            }
            if keys.is_held(Key::Right) {
                movement += right;
            }
            if movement != Vector3::zeros() {
                physics.apply_force(torso, movement * force, None);
            }
        }

        self.update_grounded(physics);

        if keys.is_held(Key::Jump) && self.grounded && self.jump_cooldown <= 0.0 {
            let impulse = self.config.jump_impulse;
            physics.apply_impulse(torso, Vector3::new(0.0, impulse, 0.0), None);
            physics.apply_impulse(hips, Vector3::new(0.0, impulse * self.config.hip_jump_share, 0.0), None);
            self.jump_cooldown = self.config.jump_cooldown;
        }

        if keys.is_held(Key::Crouch) {
            let crouch = Vector3::new(0.0, -self.config.crouch_force, 0.0);
            physics.apply_force(torso, crouch, None);
            physics.apply_force(hips, crouch, None);
        }
    }

    fn foot_state(&self, physics: &PhysicsWorld, segment: Segment) -> Option<FootState> {
        let handle = self.ragdoll.as_ref()?.body(segment);
        let position = physics.position(handle)?;
        let velocity = physics.velocity(handle)?;
        Some(FootState {
            clearance: foot_clearance(physics, position),
            vertical_speed: velocity.y,
        })
    }

    /// Re-evaluate the grounded flag from the current foot state.
    pub fn update_grounded(&mut self, physics: &PhysicsWorld) -> bool {
        self.grounded = match (
            self.foot_state(physics, Segment::LeftFoot),
            self.foot_state(physics, Segment::RightFoot),
        ) {
            (Some(left), Some(right)) => evaluate_grounded(
                left,
                right,
                self.config.grounded_foot_height,
                self.config.grounded_foot_speed,
            ),
            _ => false,
        };
        self.grounded
    }

    /// Copy physical poses onto the visuals and refresh the torso velocity.
    pub fn update(&mut self, physics: &PhysicsWorld, scene: &mut dyn SceneSink) {
        let Some(ragdoll) = &self.ragdoll else {
            return;
        };
        for (handle, visual) in ragdoll.bodies.iter().zip(ragdoll.visuals.iter()) {
            if let (Some(position), Some(rotation)) = (physics.position(*handle), physics.rotation(*handle)) {
                scene.update_visual(*visual, &Pose::new(position, rotation));
            }
        }
        if let Some(velocity) = physics.velocity(ragdoll.body(Segment::Torso)) {
            self.velocity = velocity;
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn jump_cooldown(&self) -> f32 {
        self.jump_cooldown
    }

    /// Torso velocity as of the last `update`
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn segment_handle(&self, segment: Segment) -> Option<RigidBodyHandle> {
        self.ragdoll.as_ref().map(|ragdoll| ragdoll.body(segment))
    }

    pub fn torso_handle(&self) -> Option<RigidBodyHandle> {
        self.segment_handle(Segment::Torso)
    }

    /// Torso world position
    pub fn position(&self, physics: &PhysicsWorld) -> Option<Vector3<f32>> {
        physics.position(self.torso_handle()?)
    }

    pub fn head_position(&self, physics: &PhysicsWorld) -> Option<Vector3<f32>> {
        physics.position(self.segment_handle(Segment::Head)?)
    }

    /// Torso heading (yaw) in radians
    pub fn heading(&self, physics: &PhysicsWorld) -> Option<f32> {
        physics.rotation(self.torso_handle()?).map(|rotation| heading_of(&rotation))
    }

    /// Feet clearance and heading for stunt detection.
    pub fn aerial_sample(&self, physics: &PhysicsWorld) -> Option<AerialSample> {
        let left = self.foot_state(physics, Segment::LeftFoot)?;
        let right = self.foot_state(physics, Segment::RightFoot)?;
        Some(AerialSample {
            left_foot_height: left.clearance,
            right_foot_height: right.clearance,
            heading: self.heading(physics)?,
        })
    }

    /// Ragdoll segments whose bodies are still in `physics`.
    pub fn live_segment_count(&self, physics: &PhysicsWorld) -> usize {
        self.ragdoll.as_ref().map_or(0, |ragdoll| {
            ragdoll.bodies.iter().filter(|&&body| physics.has_body(body)).count()
        })
    }

    /// Ragdoll joints still registered in `physics`.
    pub fn live_joint_count(&self, physics: &PhysicsWorld) -> usize {
        self.ragdoll.as_ref().map_or(0, |ragdoll| {
            ragdoll.joints.iter().filter(|&&joint| physics.has_joint(joint)).count()
        })
    }
}

/// Foot height above the static surface directly below it, or above ground
/// level when nothing is below.
fn foot_clearance(physics: &PhysicsWorld, foot: Vector3<f32>) -> f32 {
    physics
        .raycast_down(foot, FOOT_PROBE_DISTANCE)
        .map(|(distance, _)| distance)
        .unwrap_or(foot.y - GROUND_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scene::HeadlessScene;

    #[test]
    fn test_segment_indices_match_table_order() {
        for (index, segment) in Segment::ALL.iter().enumerate() {
            assert_eq!(segment.index(), index);
        }
    }

    #[test]
    fn test_skeleton_connects_every_segment() {
        let mut touched = [false; Segment::COUNT];
        for joint in Joint::ALL {
            let (a, _, b, _) = joint.connection();
            assert_ne!(a, b);
            touched[a.index()] = true;
            touched[b.index()] = true;
        }
        assert!(touched.iter().all(|&t| t));
    }

    #[test]
    fn test_grounded_requires_both_conditions() {
        let resting = FootState { clearance: 0.15, vertical_speed: 0.0 };
        let high = FootState { clearance: 0.8, vertical_speed: 0.0 };
        let moving = FootState { clearance: 0.15, vertical_speed: -2.5 };

        assert!(evaluate_grounded(resting, resting, 0.3, 2.0));
        assert!(!evaluate_grounded(resting, high, 0.3, 2.0));
        assert!(!evaluate_grounded(resting, moving, 0.3, 2.0));
    }

    #[test]
    fn test_heading_of_quarter_turn() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        assert!((heading_of(&rotation) - std::f32::consts::FRAC_PI_2).abs() < 1.0e-5);
        assert!(heading_of(&UnitQuaternion::identity()).abs() < 1.0e-6);
    }

    #[test]
    fn test_lifecycle_states() {
        let mut physics = PhysicsWorld::new();
        let mut scene = HeadlessScene::new();
        let mut courier = Courier::new(CourierConfig::default());
        assert_eq!(courier.state(), CourierState::Uninitialized);

        courier.create_ragdoll(&mut physics, &mut scene, Vector3::new(0.0, 3.0, 0.0));
        assert!(courier.is_active());
        assert_eq!(physics.body_count(), Segment::COUNT);
        assert_eq!(physics.joint_count(), Joint::COUNT);
        assert_eq!(scene.live_visuals(), Segment::COUNT);

        courier.dispose(&mut physics, &mut scene);
        assert_eq!(courier.state(), CourierState::Disposed);
        assert_eq!(physics.body_count(), 0);
        assert_eq!(physics.joint_count(), 0);
        assert_eq!(scene.live_visuals(), 0);
        assert!(courier.position(&physics).is_none());
    }

    #[test]
    fn test_input_without_ragdoll_is_ignored() {
        let mut physics = PhysicsWorld::new();
        let mut courier = Courier::new(CourierConfig::default());
        courier.apply_input(&mut physics, HeldKeys::from_keys(&[Key::Forward, Key::Jump]), 0.016, Vector3::z());
        assert_eq!(physics.body_count(), 0);
        assert!(!courier.is_grounded());
    }
}
