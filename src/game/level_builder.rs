//! Turns generated [`LevelData`] into static colliders and scene visuals.

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::RigidBodyHandle;

use super::constants::level as consts;
use super::level_generator::{LevelData, LevelGenerator, Module, ModuleType};
use super::physics::{BodyDesc, BodyShape, PhysicsWorld};
use super::scene::{Pose, SceneSink, VisualDesc, VisualId, VisualShape};

const MARKER_COLOR: u32 = 0xf1c40f;
const MARKER_HEIGHT: f32 = 4.0;

/// One static piece of the course.
#[derive(Debug, Clone)]
pub struct LevelObject {
    pub body: RigidBodyHandle,
    pub visual: VisualId,
    /// Delivery zone marker, if this object carries one
    pub marker: Option<VisualId>,
    pub pose: Pose,
    pub half_extents: Vector3<f32>,
    /// Index of the source module in `LevelData::modules`
    pub module_index: usize,
    pub is_delivery: bool,
}

/// Owns every collider and visual of the current level.
#[derive(Debug)]
pub struct LevelBuilder {
    generator: LevelGenerator,
    objects: Vec<LevelObject>,
    delivery_radius: f32,
}

impl Default for LevelBuilder {
    fn default() -> Self {
        Self::new(consts::DELIVERY_RADIUS)
    }
}

impl LevelBuilder {
    pub fn new(delivery_radius: f32) -> Self {
        Self {
            generator: LevelGenerator::new(),
            objects: Vec::new(),
            delivery_radius,
        }
    }

    /// Clear the current level, generate a new one and instantiate it.
    pub fn build_level(
        &mut self,
        level_number: u32,
        seed: Option<u64>,
        physics: &mut PhysicsWorld,
        scene: &mut dyn SceneSink,
    ) -> LevelData {
        let data = match seed {
            Some(seed) => self.generator.generate_with_seed(level_number, seed),
            None => self.generator.generate(level_number),
        };
        self.build(&data, physics, scene);
        data
    }

    /// Instantiate `data`, replacing whatever was built before.
    pub fn build(&mut self, data: &LevelData, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) {
        self.clear_level(physics, scene);

        for (index, module) in data.modules.iter().enumerate() {
            for (center, half_extents, rotation) in module_slabs(module) {
                self.add_object(physics, scene, module, index, center, half_extents, rotation);
            }
        }
        physics.refresh_queries();

        log::info!(
            "[Level] Built level {} ({:?}): {} modules, {} colliders, seed {}",
            data.level_number,
            data.difficulty,
            data.modules.len(),
            self.objects.len(),
            data.seed
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn add_object(
        &mut self,
        physics: &mut PhysicsWorld,
        scene: &mut dyn SceneSink,
        module: &Module,
        module_index: usize,
        center: Vector3<f32>,
        half_extents: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
    ) {
        let body = physics.create_body(&BodyDesc::fixed(
            BodyShape::Cuboid { half_extents },
            center,
            rotation,
        ));
        let pose = Pose::new(center, rotation);
        let visual = scene.create_visual(&VisualDesc {
            shape: VisualShape::Box { size: half_extents * 2.0 },
            pose,
            color: module.config.color,
        });
        let marker = module.is_delivery.then(|| {
            let marker_pose = Pose::at(center + Vector3::new(0.0, half_extents.y + MARKER_HEIGHT / 2.0, 0.0));
            scene.create_visual(&VisualDesc {
                shape: VisualShape::Marker { radius: 0.5 },
                pose: marker_pose,
                color: MARKER_COLOR,
            })
        });

        self.objects.push(LevelObject {
            body,
            visual,
            marker,
            pose,
            half_extents,
            module_index,
            is_delivery: module.is_delivery,
        });
    }

    /// Remove every level collider and release its visuals.
    pub fn clear_level(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) {
        if self.objects.is_empty() {
            return;
        }
        let count = self.objects.len();
        for object in self.objects.drain(..) {
            scene.destroy_visual(object.visual);
            if let Some(marker) = object.marker {
                scene.destroy_visual(marker);
            }
            let removed = physics.remove_body(object.body);
            if !removed {
                log::error!("[Level] Level collider {:?} was already removed", object.body);
            }
            debug_assert!(removed, "level collider removed twice");
        }
        physics.refresh_queries();
        log::debug!("[Level] Cleared {} level objects", count);
    }

    pub fn objects(&self) -> &[LevelObject] {
        &self.objects
    }

    /// Centre of the delivery zone box, if a level is built
    pub fn delivery_center(&self) -> Option<Vector3<f32>> {
        self.objects
            .iter()
            .find(|object| object.is_delivery)
            .map(|object| object.pose.position)
    }

    /// True when `position` is strictly within the delivery radius of the zone centre.
    pub fn check_delivery_reached(&self, position: &Vector3<f32>) -> bool {
        self.delivery_center()
            .map(|center| (position - center).norm() < self.delivery_radius)
            .unwrap_or(false)
    }
}

/// Yaw that turns +Z onto `direction`.
fn heading_rotation(direction: &Vector3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), direction.x.atan2(direction.z))
}

/// Collider boxes for a module as (centre, half extents, rotation).
fn module_slabs(module: &Module) -> Vec<(Vector3<f32>, Vector3<f32>, UnitQuaternion<f32>)> {
    let config = &module.config;
    let dir = module.direction;
    let start = module.start_position;
    let yaw = heading_rotation(&dir);
    let slab = consts::SLAB_THICKNESS;

    match module.module_type {
        ModuleType::Platform | ModuleType::DeliveryZone => {
            let mut center = start + dir * (config.depth / 2.0);
            center.y += config.height / 2.0;
            vec![(
                center,
                Vector3::new(config.width, config.height, config.depth) / 2.0,
                yaw,
            )]
        }
        ModuleType::TurnLeft | ModuleType::TurnRight => {
            let mut center = start + dir * (config.depth / 2.0);
            center.y += slab / 2.0;
            vec![(center, Vector3::new(config.width, slab, config.depth) / 2.0, yaw)]
        }
        ModuleType::RampUp | ModuleType::RampDown => {
            // The generator clamps drops at the ground, so the real height change
            // comes from the placed endpoints rather than the configured rise.
            let rise = module.end_position.y - start.y;
            let pitch = rise.atan2(config.depth);
            let length = config.depth.hypot(rise);
            let mut center = start + dir * (config.depth / 2.0);
            center.y = start.y + rise / 2.0 + slab / 2.0;
            let rotation = yaw * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -pitch);
            vec![(center, Vector3::new(config.width, slab, length) / 2.0, rotation)]
        }
        ModuleType::Jump => {
            let rail_width = config.width / 2.0 - 0.5;
            let perpendicular = Vector3::new(-dir.z, 0.0, dir.x);
            let mut base = start + dir * (config.depth / 2.0);
            base.y += slab / 2.0;
            let half_extents = Vector3::new(rail_width, slab, config.depth) / 2.0;
            vec![
                (base + perpendicular * (config.width / 4.0), half_extents, yaw),
                (base - perpendicular * (config.width / 4.0), half_extents, yaw),
            ]
        }
        ModuleType::Abyss => {
            let pad_depth = config.depth / 2.0;
            let half_extents = Vector3::new(config.width, slab, pad_depth) / 2.0;
            let mut near = start + dir * (pad_depth / 2.0);
            near.y += slab / 2.0;
            let far = near + dir * (pad_depth + config.gap);
            vec![(near, half_extents, yaw), (far, half_extents, yaw)]
        }
    }
}
