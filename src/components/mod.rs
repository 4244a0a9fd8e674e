//! Helper components wrapping disjoint slices of the plugin surface.
//!
//! - `CoreEngine` - plugin info, window, colour and picture primitives
//! - `KeyComponent` - keyboard injection and key-state polling
//! - `MouseComponent` - cursor movement and clicks
//! - `HighLevelProxy` - validated binding and polling find/click helpers,
//!   built on top of `CoreEngine`

pub mod engine;
pub mod key;
pub mod mouse;
pub mod proxy;

use serde::Serialize;

pub use engine::CoreEngine;
pub use key::KeyComponent;
pub use mouse::MouseComponent;
pub use proxy::{FindOutcome, HighLevelProxy};

/// Screen or client-area rectangle, inclusive of both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub(crate) fn args(&self) -> [serde_json::Value; 4] {
        [
            self.x1.into(),
            self.y1.into(),
            self.x2.into(),
            self.y2.into(),
        ]
    }
}
