//! Score computation and aerial stunt detection.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::config::ScoringConfig;

/// Remaining parcel health as a 0..=1 factor. Zero once the parcel is gone.
pub fn integrity_multiplier(health: f32, max_health: f32) -> f32 {
    if health <= 0.0 || max_health <= 0.0 {
        return 0.0;
    }
    (health / max_health).clamp(0.0, 1.0)
}

/// Points gained (or lost) against par, floored at `min_bonus`.
pub fn time_bonus(elapsed: f32, time_par: f32, points_per_second: f32, min_bonus: f32) -> f32 {
    ((time_par - elapsed) * points_per_second).max(min_bonus)
}

pub fn final_score(base_points: f32, time_bonus: f32, style_bonus: f32, integrity_multiplier: f32) -> u32 {
    let raw = ((base_points + time_bonus + style_bonus) * integrity_multiplier).floor();
    raw.max(0.0) as u32
}

/// Wrap an angle difference into (-PI, PI].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Courier kinematics sampled once per tick for stunt detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AerialSample {
    /// Left foot height above the surface below it
    pub left_foot_height: f32,
    pub right_foot_height: f32,
    /// Torso yaw in radians
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base_points: f32,
    pub time_bonus: f32,
    pub style_bonus: f32,
    pub integrity_multiplier: f32,
    pub final_score: u32,
}

/// Per-level score state.
#[derive(Debug, Clone)]
pub struct ScoringSystem {
    config: ScoringConfig,
    integrity_multiplier: f32,
    time_bonus: f32,
    style_bonus: f32,
    aerial_stunts: u32,

    // Stunt tracking
    in_air: bool,
    air_time: f32,
    last_heading: f32,
    rotation: f32,
    rotation_detected: bool,
}

impl ScoringSystem {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            integrity_multiplier: 1.0,
            time_bonus: 0.0,
            style_bonus: 0.0,
            aerial_stunts: 0,
            in_air: false,
            air_time: 0.0,
            last_heading: 0.0,
            rotation: 0.0,
            rotation_detected: false,
        }
    }

    pub fn update_integrity(&mut self, health: f32, max_health: f32) {
        self.integrity_multiplier = integrity_multiplier(health, max_health);
    }

    pub fn update_time_bonus(&mut self, elapsed: f32) {
        self.time_bonus = time_bonus(
            elapsed,
            self.config.time_par,
            self.config.points_per_second,
            self.config.min_time_bonus,
        );
    }

    /// Credit one stunt unless the per-level cap is reached. Returns whether it counted.
    pub fn add_style_bonus(&mut self) -> bool {
        if self.aerial_stunts >= self.config.max_stunts_per_level {
            return false;
        }
        self.aerial_stunts += 1;
        self.style_bonus += self.config.style_bonus_per_stunt;
        true
    }

    /// Feed one tick of courier state. Returns true when a landing was credited as a stunt.
    pub fn update_aerial_detection(&mut self, sample: &AerialSample, dt: f32) -> bool {
        let threshold = self.config.airborne_foot_height;
        let airborne = sample.left_foot_height > threshold && sample.right_foot_height > threshold;

        if airborne {
            if !self.in_air {
                self.in_air = true;
                self.air_time = 0.0;
                self.rotation = 0.0;
                self.rotation_detected = false;
            } else {
                self.air_time += dt;
                self.rotation += wrap_angle(sample.heading - self.last_heading).abs();
                if self.rotation > self.config.min_stunt_rotation {
                    self.rotation_detected = true;
                }
            }
            self.last_heading = sample.heading;
            return false;
        }

        if !self.in_air {
            return false;
        }
        self.in_air = false;
        if self.air_time > self.config.min_air_time && self.rotation_detected {
            let credited = self.add_style_bonus();
            if credited {
                log::debug!(
                    "[Score] Stunt: {:.2}s air, {:.2} rad ({} of {})",
                    self.air_time,
                    self.rotation,
                    self.aerial_stunts,
                    self.config.max_stunts_per_level
                );
            }
            return credited;
        }
        false
    }

    pub fn final_score(&self) -> u32 {
        final_score(
            self.config.base_points,
            self.time_bonus,
            self.style_bonus,
            self.integrity_multiplier,
        )
    }

    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            base_points: self.config.base_points,
            time_bonus: self.time_bonus,
            style_bonus: self.style_bonus,
            integrity_multiplier: self.integrity_multiplier,
            final_score: self.final_score(),
        }
    }

    pub fn aerial_stunts(&self) -> u32 {
        self.aerial_stunts
    }

    pub fn is_in_air(&self) -> bool {
        self.in_air
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
