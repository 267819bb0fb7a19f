//! Boundary to whatever draws the game.
//!
//! The simulation never talks to a renderer directly: it describes visuals
//! through [`SceneSink`] and keeps the returned [`VisualId`]s. [`HeadlessScene`]
//! is the implementation used by the CLI and the tests; it only keeps track of
//! what is alive so leaks show up as counts.

use nalgebra::{UnitQuaternion, Vector3};
use std::collections::HashMap;

/// Opaque id of a visual owned by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u64);

/// Shape of a visual, in full sizes (not half extents).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualShape {
    Box { size: Vector3<f32> },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    /// Non-colliding marker such as the delivery ring
    Marker { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualDesc {
    pub shape: VisualShape,
    pub pose: Pose,
    /// 0xRRGGBB
    pub color: u32,
}

/// One-shot particle effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    DamageSparks,
    Explosion,
}

/// Rendering collaborator.
pub trait SceneSink {
    fn create_visual(&mut self, desc: &VisualDesc) -> VisualId;
    fn update_visual(&mut self, id: VisualId, pose: &Pose);
    fn set_visual_color(&mut self, id: VisualId, color: u32);
    fn destroy_visual(&mut self, id: VisualId);
    fn spawn_effect(&mut self, kind: EffectKind, position: Vector3<f32>);
    /// Point the follow camera at `target`. Scenes without a camera ignore it.
    fn follow_camera(&mut self, _target: Vector3<f32>) {}
}

/// Scene that draws nothing.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_id: u64,
    visuals: HashMap<VisualId, VisualDesc>,
    effects: Vec<(EffectKind, Vector3<f32>)>,
    camera_target: Option<Vector3<f32>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_visuals(&self) -> usize {
        self.visuals.len()
    }

    pub fn visual(&self, id: VisualId) -> Option<&VisualDesc> {
        self.visuals.get(&id)
    }

    pub fn effects(&self) -> &[(EffectKind, Vector3<f32>)] {
        &self.effects
    }

    pub fn camera_target(&self) -> Option<Vector3<f32>> {
        self.camera_target
    }
}

impl SceneSink for HeadlessScene {
    fn create_visual(&mut self, desc: &VisualDesc) -> VisualId {
        self.next_id += 1;
        let id = VisualId(self.next_id);
        self.visuals.insert(id, *desc);
        id
    }

    fn update_visual(&mut self, id: VisualId, pose: &Pose) {
        if let Some(desc) = self.visuals.get_mut(&id) {
            desc.pose = *pose;
        }
    }

    fn set_visual_color(&mut self, id: VisualId, color: u32) {
        if let Some(desc) = self.visuals.get_mut(&id) {
            desc.color = color;
        }
    }

    fn destroy_visual(&mut self, id: VisualId) {
        if self.visuals.remove(&id).is_none() {
            log::warn!("[Scene] Destroying unknown visual {:?}", id);
        }
    }

    fn spawn_effect(&mut self, kind: EffectKind, position: Vector3<f32>) {
        self.effects.push((kind, position));
    }

    fn follow_camera(&mut self, target: Vector3<f32>) {
        self.camera_target = Some(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_scene_tracks_live_visuals() {
        let mut scene = HeadlessScene::new();
        let desc = VisualDesc {
            shape: VisualShape::Sphere { radius: 0.2 },
            pose: Pose::at(Vector3::zeros()),
            color: 0xffffff,
        };
        let a = scene.create_visual(&desc);
        let b = scene.create_visual(&desc);
        assert_ne!(a, b);
        assert_eq!(scene.live_visuals(), 2);

        scene.set_visual_color(a, 0x111111);
        assert_eq!(scene.visual(a).unwrap().color, 0x111111);

        scene.destroy_visual(a);
        scene.destroy_visual(a);
        assert_eq!(scene.live_visuals(), 1);
    }
}
