//! BDD step definitions for statusboard service

pub mod cycle_steps;
pub mod probe_steps;
