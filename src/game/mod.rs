pub mod constants;
pub mod courier;
pub mod impact_events;
pub mod input;
pub mod level_builder;
pub mod level_generator;
pub mod parcel;
pub mod physics;
pub mod ranking;
pub mod scene;
pub mod scoring;
pub mod session;

pub use courier::{Courier, CourierState, Joint, Segment};
pub use level_generator::{Difficulty, LevelData, LevelGenerator, Module, ModuleType};
pub use parcel::{Parcel, ParcelEvent};
pub use physics::PhysicsWorld;
pub use scoring::{ScoreBreakdown, ScoringSystem};
pub use session::{GameEvent, GameSession, SessionState, TickSnapshot};
