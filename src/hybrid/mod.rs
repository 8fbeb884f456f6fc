//! Coupling of a general rigid-body world with an orbital world on one timeline.

mod hybrid_body_link;
mod hybrid_coordinator;

pub use hybrid_body_link::*;
pub use hybrid_coordinator::*;

#[cfg(test)]
mod hybrid_coordinator_tests;
