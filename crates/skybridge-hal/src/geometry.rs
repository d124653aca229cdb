//! Popup placement
//!
//! Popups are centered on the window that opens them, not on the primary
//! monitor. The window's screen offsets carry the multi-monitor position and
//! the ratio between the viewport width and the available screen width
//! approximates the browser zoom level.

/// Snapshot of the opener's window and screen geometry, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenMetrics {
    /// Horizontal offset of the window on the virtual screen (`screenLeft`/`screenX`)
    pub screen_left: f64,
    /// Vertical offset of the window on the virtual screen (`screenTop`/`screenY`)
    pub screen_top: f64,
    /// Viewport width (`innerWidth`, falling back to the document or screen width)
    pub viewport_width: f64,
    /// Viewport height (`innerHeight`, falling back to the document or screen height)
    pub viewport_height: f64,
    /// Available width of the screen the window is on (`screen.availWidth`)
    pub avail_width: f64,
}

/// Position and size of a popup window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopupGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PopupGeometry {
    /// Center a `width`×`height` popup on the opener window.
    ///
    /// A zero or negative available width is treated as a zoom factor of 1.
    pub fn centered(screen: &ScreenMetrics, width: u32, height: u32) -> Self {
        let zoom = if screen.avail_width > 0.0 && screen.viewport_width > 0.0 {
            screen.viewport_width / screen.avail_width
        } else {
            1.0
        };
        let w = f64::from(width);
        let h = f64::from(height);

        Self {
            left: (screen.viewport_width - w) / 2.0 / zoom + screen.screen_left,
            top: (screen.viewport_height - h) / 2.0 / zoom + screen.screen_top,
            width: w / zoom,
            height: h / zoom,
        }
    }

    /// Render as a `window.open` feature string.
    pub fn to_features(&self) -> String {
        format!(
            "scrollbars=yes, width={}, height={}, top={}, left={}",
            self.width.round(),
            self.height.round(),
            self.top.round(),
            self.left.round()
        )
    }
}
