//! VirusSim core: an agent-based epidemic simulator.
//!
//! A fixed population moves around a bounded area, infects each other
//! on proximity, and moves through healthy -> infected -> recovered/dead
//! under social distancing, mask and hospital-capacity policies.
//! `engine::SimEngine` is the entry point.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod movement_subsystem;
pub mod person;
pub mod policy_subsystem;
pub mod population;
pub mod rng;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod subsystem;
pub mod trace;
pub mod types;
pub mod virus_subsystem;
