use nalgebra::{Point3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use std::collections::{HashMap, HashSet};

use super::constants::physics as consts;
use super::impact_events::{began_contacts, BodyPair};

// Collision groups: courier segments and the parcel only touch static geometry.
// The ragdoll never collides with itself and the parcel never fights the torso
// it is pinned to.
const GROUP_STATIC: Group = Group::GROUP_1; // Level modules, ground
const GROUP_COURIER: Group = Group::GROUP_2; // Ragdoll segments
const GROUP_PARCEL: Group = Group::GROUP_3; // The carried parcel

/// Which collision layer a body's collider lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionLayer {
    Static,
    Courier,
    Parcel,
}

impl CollisionLayer {
    fn groups(self) -> InteractionGroups {
        match self {
            CollisionLayer::Static => InteractionGroups::new(GROUP_STATIC, Group::ALL),
            CollisionLayer::Courier => InteractionGroups::new(GROUP_COURIER, GROUP_STATIC),
            CollisionLayer::Parcel => InteractionGroups::new(GROUP_PARCEL, GROUP_STATIC),
        }
    }
}

/// Collision shape of a body. Dimensions are half sizes like Rapier's builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: Vector3<f32> },
    Ball { radius: f32 },
    /// Y-aligned cylinder
    Cylinder { half_height: f32, radius: f32 },
    /// Infinite ground half-space facing +Y
    Ground,
}

/// Everything needed to create one rigid body with a single collider.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub shape: BodyShape,
    /// Zero makes the body fixed
    pub mass: f32,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: Option<f32>,
    pub restitution: Option<f32>,
    pub layer: CollisionLayer,
}

impl BodyDesc {
    /// A fixed (massless) static body
    pub fn fixed(shape: BodyShape, position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            shape,
            mass: 0.0,
            position,
            rotation,
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: None,
            restitution: None,
            layer: CollisionLayer::Static,
        }
    }

    /// A dynamic body with identity rotation
    pub fn dynamic(shape: BodyShape, mass: f32, position: Vector3<f32>, layer: CollisionLayer) -> Self {
        Self {
            shape,
            mass,
            position,
            rotation: UnitQuaternion::identity(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: None,
            restitution: None,
            layer,
        }
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction);
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }
}

/// Point-to-point (ball socket) joint between two bodies, anchors in body-local space.
#[derive(Debug, Clone, Copy)]
pub struct PointToPoint {
    pub body1: RigidBodyHandle,
    pub anchor1: Point3<f32>,
    pub body2: RigidBodyHandle,
    pub anchor2: Point3<f32>,
}

/// A contact that began during the last `step` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub body1: RigidBodyHandle,
    pub body2: RigidBodyHandle,
    /// Relative approach speed along the contact normal, before the solver ran
    pub impact_speed: f32,
}

impl ContactEvent {
    pub fn involves(&self, body: RigidBodyHandle) -> bool {
        self.body1 == body || self.body2 == body
    }
}

/// Wrapper around Rapier3D holding every body, collider and joint of the game.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    default_friction: f32,
    default_restitution: f32,
    /// Unconsumed frame time
    accumulator: f32,
    /// Body pairs touching after the previous sub-step
    touching: HashSet<BodyPair>,
    /// Contacts that began during the current `step` call
    contacts: Vec<ContactEvent>,
}

/// Builds a collider for a body description.
fn build_collider(desc: &BodyDesc, default_friction: f32, default_restitution: f32) -> Collider {
    let builder = match desc.shape {
        BodyShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        BodyShape::Ball { radius } => ColliderBuilder::ball(radius),
        BodyShape::Cylinder { half_height, radius } => ColliderBuilder::cylinder(half_height, radius),
        BodyShape::Ground => ColliderBuilder::halfspace(Vector::y_axis()),
    };
    let builder = builder
        .collision_groups(desc.layer.groups())
        .friction(desc.friction.unwrap_or(default_friction))
        .restitution(desc.restitution.unwrap_or(default_restitution));
    if desc.mass > 0.0 {
        builder.mass(desc.mass).build()
    } else {
        builder.build()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity
    pub fn new() -> Self {
        Self::with_settings(
            consts::GRAVITY,
            consts::DEFAULT_FRICTION,
            consts::DEFAULT_RESTITUTION,
        )
    }

    /// Creates a world with the given downward gravity and default contact material
    pub fn with_settings(gravity: f32, friction: f32, restitution: f32) -> Self {
        Self {
            gravity: vector![0.0, -gravity, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            default_friction: friction,
            default_restitution: restitution,
            accumulator: 0.0,
            touching: HashSet::new(),
            contacts: Vec::new(),
        }
    }

    /// Creates a body and its collider. Positive mass makes it dynamic, zero makes it fixed.
    pub fn create_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let builder = if desc.mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder
            .translation(desc.position)
            .rotation(desc.rotation.scaled_axis())
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = build_collider(desc, self.default_friction, self.default_restitution);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        handle
    }

    /// Removes a body, its colliders and any joint still attached to it.
    /// Returns false for an unknown handle.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.touching.retain(|pair| pair.0 != handle && pair.1 != handle);
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Adds a ball-socket joint
    pub fn add_constraint(&mut self, spec: &PointToPoint) -> ImpulseJointHandle {
        let joint = SphericalJointBuilder::new()
            .local_anchor1(spec.anchor1)
            .local_anchor2(spec.anchor2)
            .build();
        self.impulse_joint_set
            .insert(spec.body1, spec.body2, joint, true)
    }

    /// Removes a joint. Returns false for an unknown handle.
    pub fn remove_constraint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.remove(handle, true).is_some()
    }

    /// Adds a force for the next sub-step, at the centre of mass or at a world-space point
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vector3<f32>, at_point: Option<Point3<f32>>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            match at_point {
                Some(point) => body.add_force_at_point(force, point, true),
                None => body.add_force(force, true),
            }
        }
    }

    /// Applies an instantaneous impulse, at the centre of mass or at a world-space point
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vector3<f32>, at_point: Option<Point3<f32>>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            match at_point {
                Some(point) => body.apply_impulse_at_point(impulse, point, true),
                None => body.apply_impulse(impulse, true),
            }
        }
    }

    /// Advances the simulation by `real_dt` using whole fixed sub-steps.
    /// Leftover time carries over to the next call; time beyond `max_substeps`
    /// is dropped. Returns the number of sub-steps run.
    pub fn step(&mut self, fixed_timestep: f32, real_dt: f32, max_substeps: u32) -> u32 {
        self.contacts.clear();
        if !real_dt.is_finite() || real_dt <= 0.0 || fixed_timestep <= 0.0 {
            return 0;
        }

        self.accumulator += real_dt;
        let mut substeps = 0;
        while self.accumulator >= fixed_timestep && substeps < max_substeps {
            self.substep(fixed_timestep);
            self.accumulator -= fixed_timestep;
            substeps += 1;
        }
        if self.accumulator >= fixed_timestep {
            self.accumulator %= fixed_timestep;
        }

        if substeps > 0 {
            for (_, body) in self.rigid_body_set.iter_mut() {
                body.reset_forces(false);
                body.reset_torques(false);
            }
        }
        substeps
    }

    fn substep(&mut self, dt: f32) {
        // Approach velocities must be read before the solver resolves the contact.
        let pre_step_velocity: HashMap<RigidBodyHandle, Vector<Real>> = self
            .rigid_body_set
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .map(|(handle, body)| (handle, *body.linvel()))
            .collect();

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        let current = self.active_contact_normals();
        let current_pairs: HashSet<BodyPair> = current.keys().copied().collect();
        for pair in began_contacts(&current_pairs, &self.touching) {
            let Some(normal) = current.get(&pair) else {
                continue;
            };
            let v1 = pre_step_velocity.get(&pair.0).copied().unwrap_or_else(Vector3::zeros);
            let v2 = pre_step_velocity.get(&pair.1).copied().unwrap_or_else(Vector3::zeros);
            self.contacts.push(ContactEvent {
                body1: pair.0,
                body2: pair.1,
                impact_speed: (v1 - v2).dot(normal).abs(),
            });
        }
        self.touching = current_pairs;
    }

    /// Touching body pairs with the normal of their first non-empty manifold.
    fn active_contact_normals(&self) -> HashMap<BodyPair, Vector<Real>> {
        let mut normals = HashMap::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let parent1 = self.collider_set.get(pair.collider1).and_then(|c| c.parent());
            let parent2 = self.collider_set.get(pair.collider2).and_then(|c| c.parent());
            let (Some(b1), Some(b2)) = (parent1, parent2) else {
                continue;
            };
            if b1 == b2 {
                continue;
            }
            let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) else {
                continue;
            };
            let key = BodyPair::new(b1, b2);
            // The key may swap the bodies; the normal must keep pointing body1 -> body2.
            let normal = if key.0 == b1 {
                manifold.data.normal
            } else {
                -manifold.data.normal
            };
            normals.entry(key).or_insert(normal);
        }
        normals
    }

    /// Contacts that began during the last `step` call
    pub fn contact_events(&self) -> &[ContactEvent] {
        &self.contacts
    }

    /// Rebuilds the query pipeline so ray casts see freshly created colliders
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Casts a ray downward against static geometry only.
    /// Returns (hit_distance, hit_y) if a surface is found within max_distance
    pub fn raycast_down(&self, origin: Vector3<f32>, max_distance: f32) -> Option<(f32, f32)> {
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vector![0.0, -1.0, 0.0]);
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_COURIER, GROUP_STATIC));

        let (_, toi) = self.query_pipeline.cast_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some((toi, ray.point_at(toi).y))
    }

    /// Gets the position of a rigid body
    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|body| *body.translation())
    }

    /// Gets the rotation of a rigid body
    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<UnitQuaternion<f32>> {
        self.rigid_body_set.get(handle).map(|body| *body.rotation())
    }

    /// Gets the linear velocity of a rigid body
    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|body| *body.linvel())
    }

    pub fn has_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn has_joint(&self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.get(handle).is_some()
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
