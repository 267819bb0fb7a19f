//! Game configuration parsing from courier.toml files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::constants::{courier, level, parcel, physics, scoring};

/// Physics section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward gravity in m/s²
    pub gravity: f32,
    /// Fixed sub-step in seconds
    pub timestep: f32,
    pub max_substeps: u32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: physics::GRAVITY,
            timestep: physics::TIMESTEP,
            max_substeps: physics::MAX_SUBSTEPS,
            friction: physics::DEFAULT_FRICTION,
            restitution: physics::DEFAULT_RESTITUTION,
        }
    }
}

/// Courier locomotion section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CourierConfig {
    pub movement_force: f32,
    pub sprint_multiplier: f32,
    pub jump_impulse: f32,
    pub hip_jump_share: f32,
    pub jump_cooldown: f32,
    pub crouch_force: f32,
    pub grounded_foot_height: f32,
    pub grounded_foot_speed: f32,
    pub spawn_height: f32,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            movement_force: courier::MOVEMENT_FORCE,
            sprint_multiplier: courier::SPRINT_MULTIPLIER,
            jump_impulse: courier::JUMP_IMPULSE,
            hip_jump_share: courier::HIP_JUMP_SHARE,
            jump_cooldown: courier::JUMP_COOLDOWN,
            crouch_force: courier::CROUCH_FORCE,
            grounded_foot_height: courier::GROUNDED_FOOT_HEIGHT,
            grounded_foot_speed: courier::GROUNDED_FOOT_SPEED,
            spawn_height: courier::SPAWN_HEIGHT,
        }
    }
}

/// Parcel section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParcelConfig {
    pub mass: f32,
    pub half_extents: [f32; 3],
    pub max_health: f32,
    pub detach_damage: f32,
    pub fall_damage_threshold: f32,
    pub fall_damage_multiplier: f32,
    pub impact_damage_threshold: f32,
    pub impact_damage_multiplier: f32,
    pub friction: f32,
    pub restitution: f32,
    pub explosion_impulse: f32,
    pub attach_offset: [f32; 3],
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            mass: parcel::MASS,
            half_extents: parcel::HALF_EXTENTS,
            max_health: parcel::MAX_HEALTH,
            detach_damage: parcel::DETACH_DAMAGE,
            fall_damage_threshold: parcel::FALL_DAMAGE_THRESHOLD,
            fall_damage_multiplier: parcel::FALL_DAMAGE_MULTIPLIER,
            impact_damage_threshold: parcel::IMPACT_DAMAGE_THRESHOLD,
            impact_damage_multiplier: parcel::IMPACT_DAMAGE_MULTIPLIER,
            friction: parcel::FRICTION,
            restitution: parcel::RESTITUTION,
            explosion_impulse: parcel::EXPLOSION_IMPULSE,
            attach_offset: parcel::ATTACH_OFFSET,
        }
    }
}

/// Scoring section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_points: f32,
    pub time_par: f32,
    pub points_per_second: f32,
    pub min_time_bonus: f32,
    pub style_bonus_per_stunt: f32,
    pub max_stunts_per_level: u32,
    pub airborne_foot_height: f32,
    pub min_air_time: f32,
    pub min_stunt_rotation: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points: scoring::BASE_POINTS,
            time_par: scoring::TIME_PAR,
            points_per_second: scoring::POINTS_PER_SECOND,
            min_time_bonus: scoring::MIN_TIME_BONUS,
            style_bonus_per_stunt: scoring::STYLE_BONUS_PER_STUNT,
            max_stunts_per_level: scoring::MAX_STUNTS_PER_LEVEL,
            airborne_foot_height: scoring::AIRBORNE_FOOT_HEIGHT,
            min_air_time: scoring::MIN_AIR_TIME,
            min_stunt_rotation: scoring::MIN_STUNT_ROTATION,
        }
    }
}

/// Level progression section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LevelConfig {
    pub start_level: u32,
    pub max_level: u32,
    pub delivery_radius: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            start_level: 1,
            max_level: 20,
            delivery_radius: level::DELIVERY_RADIUS,
        }
    }
}

/// Game configuration from courier.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub courier: CourierConfig,
    pub parcel: ParcelConfig,
    pub scoring: ScoringConfig,
    pub level: LevelConfig,
}

impl GameConfig {
    /// Load game configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Errors that can occur when loading game configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
