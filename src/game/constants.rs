//! Gameplay and physics tuning constants.
//! These are the defaults behind `GameConfig`; keep them in one place so the
//! config layer, the simulation and the tests agree.

/// Physics constants
pub mod physics {
    /// Downward gravity in m/s²
    pub const GRAVITY: f32 = 35.0;

    /// Fixed sub-step size (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Maximum fixed sub-steps consumed per frame
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Friction used when a body does not specify its own
    pub const DEFAULT_FRICTION: f32 = 0.4;

    /// Restitution used when a body does not specify its own
    pub const DEFAULT_RESTITUTION: f32 = 0.3;

    /// Ground plane height
    pub const GROUND_LEVEL: f32 = 0.0;
}

/// Courier (ragdoll) locomotion values
pub mod courier {
    /// Horizontal force applied to the torso while a movement key is held
    pub const MOVEMENT_FORCE: f32 = 150.0;

    pub const SPRINT_MULTIPLIER: f32 = 1.5;

    /// Vertical jump impulse applied to the torso
    pub const JUMP_IMPULSE: f32 = 800.0;

    /// Fraction of the jump impulse additionally applied to the hips
    pub const HIP_JUMP_SHARE: f32 = 0.3;

    /// Seconds between two jumps
    pub const JUMP_COOLDOWN: f32 = 0.5;

    /// Downward force on torso and hips while crouching
    pub const CROUCH_FORCE: f32 = 300.0;

    /// Average foot clearance below which the courier counts as grounded
    pub const GROUNDED_FOOT_HEIGHT: f32 = 0.3;

    /// Per-foot vertical speed below which the courier counts as grounded
    pub const GROUNDED_FOOT_SPEED: f32 = 2.0;

    /// How far above a level's start position the torso spawns
    pub const SPAWN_HEIGHT: f32 = 1.5;

    /// Max distance probed below each foot for the supporting surface
    pub const FOOT_PROBE_DISTANCE: f32 = 50.0;
}

/// Parcel values
pub mod parcel {
    pub const MASS: f32 = 5.0;

    /// Box half extents
    pub const HALF_EXTENTS: [f32; 3] = [0.3, 0.3, 0.4];

    pub const MAX_HEALTH: f32 = 100.0;

    /// A single hit above this amount knocks the parcel loose
    pub const DETACH_DAMAGE: f32 = 15.0;

    pub const FALL_DAMAGE_THRESHOLD: f32 = 25.0;
    pub const FALL_DAMAGE_MULTIPLIER: f32 = 2.0;

    /// Impact speed (m/s along the contact normal) that starts hurting the parcel
    pub const IMPACT_DAMAGE_THRESHOLD: f32 = 8.0;
    pub const IMPACT_DAMAGE_MULTIPLIER: f32 = 5.0;

    pub const FRICTION: f32 = 0.3;
    pub const RESTITUTION: f32 = 0.4;

    /// Upward impulse applied once when the parcel explodes
    pub const EXPLOSION_IMPULSE: f32 = 10.0;

    /// Attachment point on the courier torso (torso-local)
    pub const ATTACH_OFFSET: [f32; 3] = [0.0, 0.5, 0.2];
}

/// Scoring values
pub mod scoring {
    pub const BASE_POINTS: f32 = 2000.0;

    /// Par time in seconds
    pub const TIME_PAR: f32 = 60.0;

    pub const POINTS_PER_SECOND: f32 = 100.0;

    /// Lowest possible time bonus
    pub const MIN_TIME_BONUS: f32 = -1000.0;

    pub const STYLE_BONUS_PER_STUNT: f32 = 250.0;
    pub const MAX_STUNTS_PER_LEVEL: u32 = 2;

    /// Both feet above this clearance means airborne
    pub const AIRBORNE_FOOT_HEIGHT: f32 = 0.5;

    /// Air time (seconds) a stunt must exceed
    pub const MIN_AIR_TIME: f32 = 1.0;

    /// Accumulated heading change (radians) a stunt must exceed
    pub const MIN_STUNT_ROTATION: f32 = 0.5;
}

/// Level layout values
pub mod level {
    pub const BASE_MODULE_COUNT: usize = 8;
    pub const MAX_MODULE_INCREMENT: u32 = 12;

    /// Gap left between consecutive modules
    pub const MODULE_SPACING: f32 = 0.5;

    /// Distance from the delivery zone centre that counts as delivered
    pub const DELIVERY_RADIUS: f32 = 3.0;

    /// Thickness of ramps, turns, rails and pads
    pub const SLAB_THICKNESS: f32 = 0.5;
}

/// Ranking persistence values
pub mod ranking {
    pub const STORAGE_KEY: &str = "unstableCourierRanking";
    pub const MAX_ENTRIES: usize = 5;
    pub const NAME_LEN: usize = 3;
}
