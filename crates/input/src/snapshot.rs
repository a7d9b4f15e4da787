use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;

use crate::direction::MoveDirection;

/// Everything the frame loop needs to know about input for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Movement keys held this frame.
    pub held: BTreeSet<MoveDirection>,
    /// Accumulated pointer motion in screen space (y grows downward).
    pub mouse_delta: Vec2,
    pub sprint: bool,
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_held(mut self, direction: MoveDirection) -> Self {
        self.held.insert(direction);
        self
    }

    pub fn with_mouse_delta(mut self, delta: Vec2) -> Self {
        self.mouse_delta = delta;
        self
    }

    pub fn with_sprint(mut self, sprint: bool) -> Self {
        self.sprint = sprint;
        self
    }

    pub fn is_held(&self, direction: MoveDirection) -> bool {
        self.held.contains(&direction)
    }

    /// No keys held and no pointer motion.
    pub fn is_idle(&self) -> bool {
        self.held.is_empty() && self.mouse_delta == Vec2::ZERO
    }
}

/// Produces one snapshot per frame.
pub trait InputSource {
    fn poll(&mut self) -> InputSnapshot;
}

/// Replays a fixed list of snapshots, then reports idle input forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<InputSnapshot>,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames left before the script goes idle.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputSnapshot {
        match self.frames.pop_front() {
            Some(snapshot) => snapshot,
            None => {
                tracing::trace!("input script exhausted");
                InputSnapshot::default()
            }
        }
    }
}
