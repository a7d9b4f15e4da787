//! Input: frontend-neutral movement intents and per-frame input snapshots.
//!
//! # Invariants
//! - The camera and session consume snapshots, never raw window events.
//! - Desktop and scripted (headless) input produce the same snapshot type.

pub mod direction;
pub mod snapshot;

pub use direction::MoveDirection;
pub use snapshot::{InputSnapshot, InputSource, ScriptedInput};
