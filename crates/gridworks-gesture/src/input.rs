//! Input event queue and per-frame edge detection.
//!
//! The input backend pushes [`InputEvent`]s as they happen. Once per frame
//! the queue is drained into an [`InputFrame`] holding press/held/release
//! edges for the place and erase actions and held state for the two
//! modifiers. A press and a release of the same code within one frame are
//! both observed.

use std::collections::{BTreeSet, VecDeque};

use gridworks_core::config::InputBindings;
use gridworks_core::geometry::GridPosition;
use gridworks_core::id::InputCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The pointer now resolves to this cell, or `None` when it no longer
    /// hits the grid plane at all.
    PointerMoved(Option<GridPosition>),
    Pressed(InputCode),
    Released(InputCode),
}

/// Button edges for one action within one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionEdges {
    pub pressed: bool,
    /// Down at the end of the frame.
    pub held: bool,
    pub released: bool,
}

impl ActionEdges {
    /// Whether the action was down at any point this frame.
    pub fn active(&self) -> bool {
        self.pressed || self.held || self.released
    }
}

/// Everything the gesture interpreter reads for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFrame {
    /// Pointer cell at the end of the frame.
    pub pointer: Option<GridPosition>,
    /// The pointer left the grid plane at some point this frame.
    pub pointer_lost: bool,
    pub place: ActionEdges,
    pub erase: ActionEdges,
    pub line_modifier: bool,
    pub rect_modifier: bool,
}

/// Buffers raw events between frames and tracks what is held down.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    pointer: Option<GridPosition>,
    held: BTreeSet<InputCode>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn is_held(&self, code: InputCode) -> bool {
        self.held.contains(&code)
    }

    /// Consume every queued event and summarize the frame.
    pub fn drain_frame(&mut self, bindings: &InputBindings) -> InputFrame {
        let mut frame = InputFrame::default();
        let mut pressed = BTreeSet::new();
        let mut released = BTreeSet::new();

        while let Some(event) = self.events.pop_front() {
            match event {
                InputEvent::PointerMoved(cell) => {
                    if cell.is_none() {
                        frame.pointer_lost = true;
                    }
                    self.pointer = cell;
                }
                InputEvent::Pressed(code) => {
                    // Key repeat arrives as repeated presses; only the first
                    // counts as an edge.
                    if self.held.insert(code) {
                        pressed.insert(code);
                    }
                }
                InputEvent::Released(code) => {
                    if self.held.remove(&code) {
                        released.insert(code);
                    }
                }
            }
        }

        let edges = |code: InputCode| ActionEdges {
            pressed: pressed.contains(&code),
            held: self.held.contains(&code),
            released: released.contains(&code),
        };
        frame.pointer = self.pointer;
        frame.place = edges(bindings.place);
        frame.erase = edges(bindings.erase);
        frame.line_modifier = self.held.contains(&bindings.line_modifier);
        frame.rect_modifier = self.held.contains(&bindings.rect_modifier);
        frame
    }
}
