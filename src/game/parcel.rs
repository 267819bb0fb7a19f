//! The fragile parcel: health, attachment to the courier, and the explosion latch.
//!
//! Instead of calling back into the camera or the UI, the parcel queues
//! [`ParcelEvent`]s that the session drains after each tick.

use nalgebra::{Point3, Vector3};
use rapier3d::prelude::{ImpulseJointHandle, RigidBodyHandle};

use super::physics::{BodyDesc, BodyShape, CollisionLayer, PhysicsWorld, PointToPoint};
use super::scene::{Pose, SceneSink, VisualDesc, VisualId, VisualShape};
use crate::config::ParcelConfig;

/// Colour of a destroyed parcel
pub const DESTROYED_COLOR: u32 = 0x111111;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParcelEvent {
    Damaged { amount: f32, health: f32 },
    Detached,
    Exploded,
}

/// Health tint: green at full health, yellow at half, darkening to black-red at zero.
pub fn health_color(fraction: f32) -> u32 {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction > 0.5 {
        hsl_to_rgb(0.3 * (fraction - 0.5) * 2.0, 1.0, 0.5)
    } else {
        hsl_to_rgb(0.0, 1.0, 0.5 * (fraction / 0.5))
    }
}

/// HSL (all components 0..=1) to packed 0xRRGGBB.
fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> u32 {
    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    let channel = |t: f32| -> u32 {
        let t = t.rem_euclid(1.0);
        let value = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (value.clamp(0.0, 1.0) * 255.0).round() as u32
    };
    (channel(hue + 1.0 / 3.0) << 16) | (channel(hue) << 8) | channel(hue - 1.0 / 3.0)
}

pub struct Parcel {
    config: ParcelConfig,
    body: Option<RigidBodyHandle>,
    visual: Option<VisualId>,
    constraint: Option<ImpulseJointHandle>,
    health: f32,
    exploded: bool,
    events: Vec<ParcelEvent>,
}

impl Parcel {
    /// Create the parcel body and visual at `position`, unattached.
    pub fn spawn(
        config: ParcelConfig,
        physics: &mut PhysicsWorld,
        scene: &mut dyn SceneSink,
        position: Vector3<f32>,
    ) -> Self {
        let half_extents = Vector3::from(config.half_extents);
        let desc = BodyDesc::dynamic(
            BodyShape::Cuboid { half_extents },
            config.mass,
            position,
            CollisionLayer::Parcel,
        )
        .with_friction(config.friction)
        .with_restitution(config.restitution);
        let body = physics.create_body(&desc);
        let visual = scene.create_visual(&VisualDesc {
            shape: VisualShape::Box { size: half_extents * 2.0 },
            pose: Pose::at(position),
            color: health_color(1.0),
        });

        Self {
            health: config.max_health,
            config,
            body: Some(body),
            visual: Some(visual),
            constraint: None,
            exploded: false,
            events: Vec::new(),
        }
    }

    /// Apply damage. Non-positive amounts and damage to an exploded parcel are ignored.
    pub fn take_damage(&mut self, physics: &mut PhysicsWorld, amount: f32) {
        if self.exploded || amount <= 0.0 || amount.is_nan() {
            return;
        }

        self.health = (self.health - amount).max(0.0);
        self.events.push(ParcelEvent::Damaged {
            amount,
            health: self.health,
        });
        log::debug!("[Parcel] Took {:.1} damage, health {:.1}", amount, self.health);

        if amount > self.config.detach_damage {
            self.detach(physics);
        }
        if self.health <= 0.0 {
            self.explode(physics);
        }
    }

    /// Latch into the exploded state. Only the first call has any effect.
    pub fn explode(&mut self, physics: &mut PhysicsWorld) {
        if self.exploded {
            return;
        }
        self.exploded = true;

        if let Some(body) = self.body {
            physics.apply_impulse(body, Vector3::new(0.0, self.config.explosion_impulse, 0.0), None);
        }
        self.events.push(ParcelEvent::Exploded);
        log::info!("[Parcel] Exploded");

        self.detach(physics);
    }

    /// Pin the parcel to `anchor` at a local offset. No-op while already
    /// attached or once exploded.
    pub fn attach_to_courier(&mut self, physics: &mut PhysicsWorld, anchor: RigidBodyHandle, offset: Vector3<f32>) {
        if self.constraint.is_some() || self.exploded {
            return;
        }
        let Some(body) = self.body else {
            return;
        };
        self.constraint = Some(physics.add_constraint(&PointToPoint {
            body1: body,
            anchor1: Point3::origin(),
            body2: anchor,
            anchor2: Point3::from(offset),
        }));
    }

    pub fn detach(&mut self, physics: &mut PhysicsWorld) {
        let Some(constraint) = self.constraint.take() else {
            return;
        };
        let removed = physics.remove_constraint(constraint);
        if !removed {
            log::error!("[Parcel] Attachment joint {:?} was already removed", constraint);
        }
        debug_assert!(removed, "parcel joint removed twice");
        self.events.push(ParcelEvent::Detached);
    }

    /// Per-tick fall damage from excessive vertical speed.
    pub fn update(&mut self, physics: &mut PhysicsWorld) {
        if self.exploded {
            return;
        }
        let Some(velocity) = self.body.and_then(|body| physics.velocity(body)) else {
            return;
        };
        let fall_speed = velocity.y.abs();
        if fall_speed > self.config.fall_damage_threshold {
            let damage = (fall_speed - self.config.fall_damage_threshold) * self.config.fall_damage_multiplier;
            self.take_damage(physics, damage);
        }
    }

    /// Push pose and health tint to the scene.
    pub fn sync_visual(&self, physics: &PhysicsWorld, scene: &mut dyn SceneSink) {
        let (Some(body), Some(visual)) = (self.body, self.visual) else {
            return;
        };
        if let (Some(position), Some(rotation)) = (physics.position(body), physics.rotation(body)) {
            scene.update_visual(visual, &Pose::new(position, rotation));
        }
        let color = if self.exploded {
            DESTROYED_COLOR
        } else {
            health_color(self.health / self.config.max_health)
        };
        scene.set_visual_color(visual, color);
    }

    /// Detach, then release the body and visual.
    pub fn dispose(&mut self, physics: &mut PhysicsWorld, scene: &mut dyn SceneSink) {
        self.detach(physics);
        if let Some(body) = self.body.take() {
            let removed = physics.remove_body(body);
            if !removed {
                log::error!("[Parcel] Body {:?} was already removed", body);
            }
            debug_assert!(removed, "parcel body removed twice");
        }
        if let Some(visual) = self.visual.take() {
            scene.destroy_visual(visual);
        }
    }

    pub fn drain_events(&mut self) -> Vec<ParcelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.config.max_health
    }

    /// Health in percent (0..=100)
    pub fn health_percent(&self) -> f32 {
        self.health / self.config.max_health * 100.0
    }

    pub fn is_exploded(&self) -> bool {
        self.exploded
    }

    pub fn is_attached(&self) -> bool {
        self.constraint.is_some()
    }

    pub fn body_handle(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Option<Vector3<f32>> {
        physics.position(self.body?)
    }
}
