//! Rectangle picking without any windowing code.
//!
//! A front end feeds pointer events in; the picker turns a press/release pair
//! into a `Geometry`, whichever direction the drag went.

use super::geometry::Geometry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickerEvent {
    Press(u32, u32),
    Release(u32, u32),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerState {
    Idle,
    Dragging { anchor: (u32, u32) },
    Committed(Geometry),
}

impl PickerState {
    pub fn transition(&self, event: PickerEvent) -> PickerState {
        match (self, event) {
            (_, PickerEvent::Reset) => PickerState::Idle,

            // a new press always starts a fresh drag
            (_, PickerEvent::Press(x, y)) => PickerState::Dragging { anchor: (x, y) },

            (PickerState::Dragging { anchor }, PickerEvent::Release(x, y)) => {
                PickerState::Committed(normalize(*anchor, (x, y)))
            }

            // release without a press
            (state, PickerEvent::Release(..)) => state.clone(),
        }
    }
}

fn normalize(a: (u32, u32), b: (u32, u32)) -> Geometry {
    let (left, right) = (a.0.min(b.0), a.0.max(b.0));
    let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
    Geometry::new(right - left, bottom - top, left, top)
}

pub struct GeometryPicker {
    state: PickerState,
}

impl GeometryPicker {
    pub fn new() -> Self {
        Self {
            state: PickerState::Idle,
        }
    }

    /// Applies one event; returns the geometry when a drag completes.
    pub fn handle(&mut self, event: PickerEvent) -> Option<Geometry> {
        let was_dragging = matches!(self.state, PickerState::Dragging { .. });
        self.state = self.state.transition(event);
        match &self.state {
            PickerState::Committed(g) if was_dragging => Some(*g),
            _ => None,
        }
    }

    pub fn current_state(&self) -> &PickerState {
        &self.state
    }

    pub fn committed(&self) -> Option<Geometry> {
        match self.state {
            PickerState::Committed(g) => Some(g),
            _ => None,
        }
    }
}

impl Default for GeometryPicker {
    fn default() -> Self {
        Self::new()
    }
}
