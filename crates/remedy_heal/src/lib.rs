//! # remedy_heal
//!
//! The healing loop controller: the single place where sandbox, oracles,
//! ledger, store and VCS come together and a run is driven to a definite
//! PASSED or FAILED verdict.

pub mod config;
pub mod engine;
pub mod error;

pub use config::HealConfig;
pub use engine::{HealTarget, HealingEngine};
pub use error::{HealError, HealResult};
