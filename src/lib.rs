//! # Triad Engine
//!
//! Deterministic analytics over 3-component state vectors.
//!
//! The engine models an entity's state as a [`TriadicVector`], derives
//! scalar quality metrics from it, tracks how the vector evolves over a
//! sequence of observations, and simulates pairwise interaction among a
//! population of such entities.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         triad-engine                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │  metrics.rs        │  history.rs       │  tracker.rs          │
//! │  - TriadicVector   │  - stability      │  - EvolutionTracker  │
//! │  - strength        │  - decay_detected │  - Transition kinds  │
//! │  - balance         │                   │  - attractor / cycle │
//! │  - entropy         │                   │  - coherence trend   │
//! │  - alignment       │                   │                      │
//! ├────────────────────┴───────────────────┴──────────────────────┤
//! │  field.rs                    │  cascade.rs                    │
//! │  - InteractionField          │  - CascadeSimulator            │
//! │  - collective state          │  - synchronous coupling steps  │
//! │  - clusters / leader         │  - per-step field reports      │
//! │  - phase transition check    │  - opt-in convergence exit     │
//! └──────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use triad_engine::{CascadeSimulator, Entity, InteractionField};
//!
//! let mut field = InteractionField::new();
//! field.insert(Entity::new("a", 2.0, 1.0, 1.0));
//! field.insert(Entity::new("b", 1.0, 2.0, 1.0));
//! field.insert(Entity::new("c", 1.0, 1.0, 2.0));
//!
//! let simulator = CascadeSimulator::with_defaults();
//! let reports = simulator.run(&mut field, 10).unwrap();
//!
//! println!("final coherence: {:.4}", reports[9].report.field_coherence);
//! ```
//!
//! ## Design notes
//!
//! All computation is single-threaded, synchronous, and deterministic:
//! outputs are pure functions of the inputs plus each component's own
//! in-memory state. The engine never reads a clock; timestamps, when
//! wanted, are caller-supplied. Degenerate numeric input (zero vectors,
//! empty history) always maps to a documented neutral value; only
//! invalid configuration parameters produce errors.

pub mod cascade;
pub mod error;
pub mod field;
pub mod history;
pub mod metrics;
pub mod tracker;

// Re-exports for convenience
pub use cascade::{CascadeConfig, CascadeSimulator, StepReport};
pub use error::{Result, TriadError};
pub use field::{Entity, FieldReport, InteractionField, PairAlignment};
pub use metrics::{alignment, balance, diagnostic, entropy, strength, Diagnostic, TriadicVector};
pub use tracker::{
    classify_transition, EvolutionReport, EvolutionTracker, Snapshot, Transition, TransitionKind,
    Trend,
};

pub use history::{decay_detected, stability, stability_windowed};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
