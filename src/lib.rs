//! Zombie mod core - round and infection gameplay
//!
//! Mode selection, faction assignment and transitions, the damage/infection
//! hook, reward accumulation, win-condition checks and the round
//! controller. The host engine, access control and configuration are
//! injected through the traits in [`services`].

pub mod batch;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod services;
pub mod sim;

pub use error::{Result, ZmError};
