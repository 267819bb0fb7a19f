//! Procedural obstacle-course generation.
//!
//! A level is an ordered list of [`Module`]s laid out by walking a cursor
//! (position + heading) forward: start platform, `8 + min(level, 12)` weighted
//! random modules, then the delivery zone. Generation is pure given the random
//! source; [`LevelGenerator::generate`] picks a fresh seed and records it in
//! [`LevelData::seed`] so any level can be replayed with `generate_with_seed`.

use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use super::constants::{level as consts, physics::GROUND_LEVEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Platform,
    RampUp,
    RampDown,
    Jump,
    TurnLeft,
    TurnRight,
    Abyss,
    DeliveryZone,
}

impl ModuleType {
    /// Types unlocked from Medium difficulty on
    pub fn is_advanced(self) -> bool {
        matches!(self, ModuleType::TurnLeft | ModuleType::TurnRight | ModuleType::Abyss)
    }
}

/// Types the random picker draws from, in weight-table order.
const BASE_MODULES: [ModuleType; 4] = [
    ModuleType::Platform,
    ModuleType::RampUp,
    ModuleType::RampDown,
    ModuleType::Jump,
];

const ADVANCED_MODULES: [ModuleType; 3] = [
    ModuleType::TurnLeft,
    ModuleType::TurnRight,
    ModuleType::Abyss,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl Difficulty {
    pub fn for_level(level_number: u32) -> Self {
        match level_number {
            0..=3 => Difficulty::Easy,
            4..=6 => Difficulty::Medium,
            7..=9 => Difficulty::Hard,
            _ => Difficulty::Extreme,
        }
    }

    /// Selection weight of a module type at this tier.
    pub fn weight(self, module_type: ModuleType) -> u32 {
        use ModuleType::*;
        let (platform, ramp_up, ramp_down, jump, turn, abyss) = match self {
            Difficulty::Easy => (40, 15, 15, 20, 5, 0),
            Difficulty::Medium => (34, 15, 15, 25, 8, 10),
            Difficulty::Hard => (15, 20, 20, 30, 10, 15),
            Difficulty::Extreme => (5, 15, 15, 35, 10, 25),
        };
        match module_type {
            Platform => platform,
            RampUp => ramp_up,
            RampDown => ramp_down,
            Jump => jump,
            TurnLeft | TurnRight => turn,
            Abyss => abyss,
            DeliveryZone => 0,
        }
    }

    /// Module types the random picker may use at this tier
    pub fn available_modules(self) -> Vec<ModuleType> {
        let mut modules = BASE_MODULES.to_vec();
        if self >= Difficulty::Medium {
            modules.extend_from_slice(&ADVANCED_MODULES);
        }
        modules
    }
}

/// Dimensions and type-specific parameters of a module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    /// Vertical change across the module (ramps): positive rises, negative drops
    pub rise: f32,
    /// Void left after the solid part (jumps, abysses)
    pub gap: f32,
    /// Heading change in radians (turns); positive turns left
    pub turn_angle: f32,
    /// 0xRRGGBB
    pub color: u32,
}

impl ModuleConfig {
    pub fn for_type(module_type: ModuleType) -> Self {
        let slab = consts::SLAB_THICKNESS;
        let base = Self {
            width: 4.0,
            depth: 6.0,
            height: slab,
            rise: 0.0,
            gap: 0.0,
            turn_angle: 0.0,
            color: 0x4a90a4,
        };
        match module_type {
            ModuleType::Platform => base,
            ModuleType::RampUp => Self { depth: 8.0, rise: 3.0, color: 0x5ba0b4, ..base },
            ModuleType::RampDown => Self { depth: 8.0, rise: -3.0, color: 0x5ba0b4, ..base },
            ModuleType::Jump => Self { depth: 3.0, gap: 3.0, color: 0xe67e22, ..base },
            ModuleType::TurnLeft => Self {
                width: 6.0,
                turn_angle: FRAC_PI_2,
                color: 0x9b59b6,
                ..base
            },
            ModuleType::TurnRight => Self {
                width: 6.0,
                turn_angle: -FRAC_PI_2,
                color: 0x9b59b6,
                ..base
            },
            ModuleType::Abyss => Self {
                width: 6.0,
                depth: 10.0,
                gap: 15.0,
                color: 0xc0392b,
                ..base
            },
            ModuleType::DeliveryZone => Self { width: 5.0, depth: 5.0, color: 0x2ecc71, ..base },
        }
    }

    /// Distance the cursor travels along the heading when this module is placed
    fn advance(&self) -> f32 {
        self.depth + self.gap + consts::MODULE_SPACING
    }
}

/// One placed segment of the course. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    pub config: ModuleConfig,
    pub start_position: Vector3<f32>,
    pub end_position: Vector3<f32>,
    /// Unit heading the module is laid along
    pub direction: Vector3<f32>,
    pub is_start: bool,
    pub is_delivery: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub modules: Vec<Module>,
    pub start_position: Vector3<f32>,
    pub delivery_position: Vector3<f32>,
    pub level_number: u32,
    pub difficulty: Difficulty,
    pub seed: u64,
}

impl LevelData {
    pub fn delivery_module(&self) -> Option<&Module> {
        self.modules.iter().find(|m| m.is_delivery)
    }
}

/// Number of random modules between start and delivery.
pub fn module_count(level_number: u32) -> usize {
    consts::BASE_MODULE_COUNT + level_number.min(consts::MAX_MODULE_INCREMENT) as usize
}

/// Pick from `candidates` with a draw in `[0, total_weight)`.
///
/// Walks the list subtracting weights; the first candidate that brings the
/// remainder to zero or below wins, so a draw exactly on a cumulative
/// boundary selects the candidate ending there. Zero-weight candidates are
/// never chosen; if nothing is reached the first candidate is returned.
pub fn select_weighted(candidates: &[(ModuleType, u32)], draw: f32) -> Option<ModuleType> {
    let mut remaining = draw;
    for &(module_type, weight) in candidates {
        if weight == 0 {
            continue;
        }
        remaining -= weight as f32;
        if remaining <= 0.0 {
            return Some(module_type);
        }
    }
    candidates.first().map(|&(module_type, _)| module_type)
}

/// Walking placement state while laying out a level.
struct Cursor {
    position: Vector3<f32>,
    direction: Vector3<f32>,
}

impl Cursor {
    fn rotate(&mut self, angle: f32) {
        // Positive angles turn left (counter-clockwise seen from above, +Z toward -X).
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), -angle);
        let turned = rotation * self.direction;
        self.direction = Vector3::new(turned.x, 0.0, turned.z).normalize();
    }

    fn advance(&mut self, distance: f32) {
        self.position += self.direction * distance;
    }

    fn clamp_to_ground(&mut self) {
        if self.position.y < GROUND_LEVEL {
            self.position.y = GROUND_LEVEL;
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LevelGenerator;

impl LevelGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate with a fresh random seed.
    pub fn generate(&self, level_number: u32) -> LevelData {
        let seed = rand::thread_rng().gen::<u64>();
        self.generate_with_seed(level_number, seed)
    }

    /// Deterministic generation: the same seed always yields the same level.
    pub fn generate_with_seed(&self, level_number: u32, seed: u64) -> LevelData {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut level = self.generate_with_rng(level_number, &mut rng);
        level.seed = seed;
        level
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(&self, level_number: u32, rng: &mut R) -> LevelData {
        let difficulty = Difficulty::for_level(level_number);
        let count = module_count(level_number);

        let mut modules = Vec::with_capacity(count + 2);
        let mut cursor = Cursor {
            position: Vector3::new(0.0, GROUND_LEVEL, 4.0),
            direction: Vector3::z(),
        };
        modules.push(start_platform());

        let candidates: Vec<(ModuleType, u32)> = difficulty
            .available_modules()
            .into_iter()
            .map(|module_type| (module_type, difficulty.weight(module_type)))
            .collect();
        let total_weight: u32 = candidates.iter().map(|&(_, w)| w).sum();

        for _ in 0..count {
            let draw = rng.gen::<f32>() * total_weight as f32;
            let Some(module_type) = select_weighted(&candidates, draw) else {
                break;
            };
            modules.push(place_module(&mut cursor, module_type));
        }

        modules.push(delivery_zone(&mut cursor, level_number));

        log::debug!(
            "[Level] Generated level {} ({:?}): {} modules",
            level_number,
            difficulty,
            modules.len()
        );

        LevelData {
            modules,
            start_position: Vector3::new(0.0, 2.0, 0.0),
            delivery_position: cursor.position + Vector3::new(0.0, 2.0, 0.0),
            level_number,
            difficulty,
            seed: 0,
        }
    }
}

fn start_platform() -> Module {
    Module {
        module_type: ModuleType::Platform,
        config: ModuleConfig {
            width: 6.0,
            depth: 8.0,
            height: 1.0,
            color: 0x27ae60,
            ..ModuleConfig::for_type(ModuleType::Platform)
        },
        start_position: Vector3::new(0.0, GROUND_LEVEL, -4.0),
        end_position: Vector3::new(0.0, GROUND_LEVEL, 4.0),
        direction: Vector3::z(),
        is_start: true,
        is_delivery: false,
    }
}

fn place_module(cursor: &mut Cursor, module_type: ModuleType) -> Module {
    let config = ModuleConfig::for_type(module_type);
    let start_position = cursor.position;

    if config.turn_angle != 0.0 {
        cursor.rotate(config.turn_angle);
    }
    cursor.position.y += config.rise;
    cursor.advance(config.advance());
    cursor.clamp_to_ground();

    Module {
        module_type,
        config,
        start_position,
        end_position: cursor.position,
        direction: cursor.direction,
        is_start: false,
        is_delivery: false,
    }
}

fn delivery_zone(cursor: &mut Cursor, level_number: u32) -> Module {
    let size = 5.0 + level_number as f32;
    let config = ModuleConfig {
        width: size,
        depth: size,
        ..ModuleConfig::for_type(ModuleType::DeliveryZone)
    };
    let module = Module {
        module_type: ModuleType::DeliveryZone,
        config,
        start_position: cursor.position - cursor.direction * 2.5,
        end_position: cursor.position,
        direction: cursor.direction,
        is_start: false,
        is_delivery: true,
    };
    cursor.advance(5.0);
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_thresholds() {
        assert_eq!(Difficulty::for_level(1), Difficulty::Easy);
        assert_eq!(Difficulty::for_level(3), Difficulty::Easy);
        assert_eq!(Difficulty::for_level(4), Difficulty::Medium);
        assert_eq!(Difficulty::for_level(6), Difficulty::Medium);
        assert_eq!(Difficulty::for_level(9), Difficulty::Hard);
        assert_eq!(Difficulty::for_level(10), Difficulty::Extreme);
    }

    #[test]
    fn test_module_count() {
        assert_eq!(module_count(1), 9);
        assert_eq!(module_count(12), 20);
        assert_eq!(module_count(50), 20);
    }

    #[test]
    fn test_select_weighted_boundaries() {
        let candidates = [
            (ModuleType::Platform, 40),
            (ModuleType::RampUp, 15),
            (ModuleType::RampDown, 15),
            (ModuleType::Jump, 20),
        ];
        assert_eq!(select_weighted(&candidates, 0.0), Some(ModuleType::Platform));
        assert_eq!(select_weighted(&candidates, 40.0), Some(ModuleType::Platform));
        assert_eq!(select_weighted(&candidates, 40.5), Some(ModuleType::RampUp));
        assert_eq!(select_weighted(&candidates, 55.0), Some(ModuleType::RampUp));
        assert_eq!(select_weighted(&candidates, 89.9), Some(ModuleType::Jump));
    }

    #[test]
    fn test_select_weighted_skips_zero_weights() {
        let candidates = [(ModuleType::Abyss, 0), (ModuleType::Jump, 10)];
        assert_eq!(select_weighted(&candidates, 0.0), Some(ModuleType::Jump));
    }

    #[test]
    fn test_select_weighted_falls_back_to_first() {
        let candidates = [(ModuleType::RampUp, 0), (ModuleType::Jump, 0)];
        assert_eq!(select_weighted(&candidates, 0.0), Some(ModuleType::RampUp));
        assert_eq!(select_weighted(&[], 0.0), None);
    }

    #[test]
    fn test_turn_left_rotates_counter_clockwise() {
        let mut cursor = Cursor {
            position: Vector3::zeros(),
            direction: Vector3::z(),
        };
        cursor.rotate(FRAC_PI_2);
        assert!((cursor.direction - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1.0e-5);
        cursor.rotate(-FRAC_PI_2);
        assert!((cursor.direction - Vector3::z()).norm() < 1.0e-5);
    }

    #[test]
    fn test_ramp_down_never_goes_below_ground() {
        let mut cursor = Cursor {
            position: Vector3::new(0.0, 1.0, 0.0),
            direction: Vector3::z(),
        };
        let module = place_module(&mut cursor, ModuleType::RampDown);
        assert_eq!(module.end_position.y, GROUND_LEVEL);
        assert!((module.end_position.z - 8.5).abs() < 1.0e-5);
    }

    #[test]
    fn test_jump_advances_past_gap() {
        let mut cursor = Cursor {
            position: Vector3::zeros(),
            direction: Vector3::z(),
        };
        let module = place_module(&mut cursor, ModuleType::Jump);
        assert!((module.end_position.z - 6.5).abs() < 1.0e-5);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let generator = LevelGenerator::new();
        let a = generator.generate_with_seed(7, 42);
        let b = generator.generate_with_seed(7, 42);
        assert_eq!(a, b);
        assert_eq!(a.seed, 42);
    }
}
