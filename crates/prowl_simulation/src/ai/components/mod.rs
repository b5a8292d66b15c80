//! AI components

pub mod agent;
pub mod behavior;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod behavior_tests;

// Re-export all components
pub use agent::*;
pub use behavior::*;
