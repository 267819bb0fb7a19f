//! Unstable Courier gameplay library
//!
//! This module exposes the simulation core (level generation, ragdoll courier,
//! parcel damage, scoring) for the CLI and for testing.

pub mod config;
pub mod game;
pub mod storage;
