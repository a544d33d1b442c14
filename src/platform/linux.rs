//! Linux-specific platform functionality
//!
//! Queries the X11 root window for the size of the whole virtual screen.
//! Works under Xorg and under XWayland when `DISPLAY` is set.

/// Size of the X11 root window (all monitors combined) in pixels.
///
/// Returns `None` when no X server is reachable.
pub fn virtual_screen_size() -> Option<(u32, u32)> {
    let display_name = std::env::var("DISPLAY").ok()?;
    root_window_size(&display_name)
}

/// Root window size of the named X display.
fn root_window_size(display_name: &str) -> Option<(u32, u32)> {
    use x11rb::connection::Connection;

    let (conn, screen_num) = match x11rb::connect(Some(display_name)) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("X11 connection to {} failed: {}", display_name, e);
            return None;
        }
    };

    let screen = conn.setup().roots.get(screen_num)?;
    let size = (
        u32::from(screen.width_in_pixels),
        u32::from(screen.height_in_pixels),
    );

    if size.0 == 0 || size.1 == 0 {
        return None;
    }
    Some(size)
}
