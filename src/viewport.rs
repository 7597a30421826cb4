//! On-screen pan and zoom of the composed frame.
//!
//! The viewport only moves the preview around; it never changes what is
//! composed or exported.

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 4.0;

/// Zoom change per unit of wheel delta.
const WHEEL_ZOOM_FACTOR: f32 = -0.001;

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty space or the frame itself; starts a drag.
    Canvas,
    /// A text area, input, select, button or label; never starts a drag.
    Control,
}

impl PointerTarget {
    /// Classifies an element by its tag name.
    pub fn from_tag(tag: &str) -> Self {
        const CONTROL_TAGS: [&str; 5] = ["textarea", "input", "select", "button", "label"];
        if CONTROL_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            Self::Control
        } else {
            Self::Canvas
        }
    }
}

/// Modifier keys held during a wheel event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    /// Pointer position minus pan at drag start.
    anchor: (f32, f32),
}

/// Translation and zoom applied to the preview.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pan: (f32, f32),
    zoom: f32,
    drag: Option<Drag>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: (0.0, 0.0),
            zoom: 1.0,
            drag: None,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Starts a drag unless the pointer landed on a control.
    ///
    /// Returns true if a drag started.
    pub fn pointer_down(&mut self, target: PointerTarget, x: f32, y: f32) -> bool {
        if target == PointerTarget::Control {
            return false;
        }
        self.drag = Some(Drag {
            anchor: (x - self.pan.0, y - self.pan.1),
        });
        true
    }

    /// Moves the preview with the pointer while dragging.
    ///
    /// Returns true if the pan changed.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let pan = (x - drag.anchor.0, y - drag.anchor.1);
        let changed = pan != self.pan;
        self.pan = pan;
        changed
    }

    /// Ends a drag (pointer released or left the surface).
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Zooms on ctrl/cmd + wheel. Plain wheel events are left to the page,
    /// and a non-finite delta is ignored.
    ///
    /// Returns true if the event was consumed.
    pub fn wheel(&mut self, delta_y: f32, modifiers: Modifiers) -> bool {
        if !(modifiers.ctrl || modifiers.meta) || !delta_y.is_finite() {
            return false;
        }
        self.zoom = (self.zoom + delta_y * WHEEL_ZOOM_FACTOR).clamp(MIN_ZOOM, MAX_ZOOM);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The CSS transform for the preview.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan.0, self.pan.1, self.zoom
        )
    }
}
