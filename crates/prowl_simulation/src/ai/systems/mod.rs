//! AI systems (одна фаза тика на модуль)

pub mod behavior;
pub mod contact;
pub mod fsm;

// Re-export all systems
pub use behavior::*;
pub use contact::*;
pub use fsm::*;
