//! Sidebar and profile-menu chrome shared by every page.

/// Width of the sidebar in pixels.
pub const SIDEBAR_WIDTH: f64 = 260.0;
/// Viewports at most this wide use the narrow layout.
pub const NARROW_LAYOUT_MAX_WIDTH: f64 = 768.0;

/// Where a click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    MenuButton,
    ProfileButton,
    /// Anywhere in the chat area other than the menu button.
    ChatArea,
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start_x: f64,
    start_y: f64,
    start_offset: f64,
    horizontal: bool,
    offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavChrome {
    sidebar_open: bool,
    profile_menu_open: bool,
    sidebar_width: f64,
    drag: Option<Drag>,
}

impl Default for NavChrome {
    fn default() -> Self {
        Self::new(SIDEBAR_WIDTH)
    }
}

impl NavChrome {
    pub fn new(sidebar_width: f64) -> Self {
        Self {
            sidebar_open: false,
            profile_menu_open: false,
            sidebar_width,
            drag: None,
        }
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn profile_menu_open(&self) -> bool {
        self.profile_menu_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn close_sidebar(&mut self) {
        self.sidebar_open = false;
    }

    /// Handle a click anywhere on the page.
    pub fn click(&mut self, target: ClickTarget) {
        if target == ClickTarget::ProfileButton {
            self.profile_menu_open = !self.profile_menu_open;
        } else {
            self.profile_menu_open = false;
        }
        match target {
            ClickTarget::MenuButton => self.toggle_sidebar(),
            ClickTarget::ChatArea => self.close_sidebar(),
            ClickTarget::ProfileButton | ClickTarget::Elsewhere => {}
        }
    }

    /// Narrow layouts hide the sidebar once a conversation is picked.
    pub fn after_history_click(&mut self, viewport_width: f64) {
        if viewport_width <= NARROW_LAYOUT_MAX_WIDTH {
            self.close_sidebar();
        }
    }

    /// Begin a touch.  Touches on code blocks never drag the sidebar.
    /// `current_offset` is the sidebar's rendered offset when it is open.
    pub fn touch_start(&mut self, x: f64, y: f64, on_code: bool, current_offset: Option<f64>) {
        if on_code {
            self.drag = None;
            return;
        }
        let start_offset = if self.sidebar_open {
            current_offset.unwrap_or(0.0)
        } else {
            -self.sidebar_width
        };
        self.drag = Some(Drag {
            start_x: x,
            start_y: y,
            start_offset,
            horizontal: false,
            offset: start_offset,
        });
    }

    /// Track a touch.  The first move decides the axis; a mostly vertical
    /// first move cancels the drag.  Returns the sidebar offset while
    /// dragging horizontally.
    pub fn touch_move(&mut self, x: f64, y: f64) -> Option<f64> {
        let drag = self.drag.as_mut()?;
        let dx = x - drag.start_x;
        let dy = y - drag.start_y;
        if !drag.horizontal {
            if dx.abs() > dy.abs() {
                drag.horizontal = true;
            } else {
                self.drag = None;
                return None;
            }
        }
        drag.offset = (drag.start_offset + dx).clamp(-self.sidebar_width, 0.0);
        Some(drag.offset)
    }

    /// The sidebar offset of an active horizontal drag.
    pub fn drag_offset(&self) -> Option<f64> {
        self.drag.filter(|drag| drag.horizontal).map(|drag| drag.offset)
    }

    /// Finish a touch.  A horizontal swipe longer than a third of the sidebar
    /// opens it (rightwards, from closed) or closes it (leftwards, from open).
    pub fn touch_end(&mut self, x: f64) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if !drag.horizontal {
            return;
        }
        let distance = x - drag.start_x;
        let threshold = self.sidebar_width / 3.0;
        if self.sidebar_open {
            if distance < -threshold {
                self.sidebar_open = false;
            }
        } else if distance > threshold {
            self.sidebar_open = true;
        }
    }
}
