//! In-memory window layer
//!
//! Used by `run` (no GUI toolkit) and by tests. Tracks surface state and
//! logs every visibility change.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{DisplayInfo, Position, Rect, Surface, WindowLayer};

#[derive(Debug, Clone, Copy)]
struct SurfaceState {
    visible: bool,
    bounds: Rect,
}

pub struct HeadlessWindows {
    displays: Vec<DisplayInfo>,
    surfaces: Mutex<HashMap<Surface, SurfaceState>>,
}

fn display(id: &str, x: i32) -> DisplayInfo {
    DisplayInfo {
        id: id.to_string(),
        bounds: Rect {
            x,
            y: 0,
            width: 1920,
            height: 1080,
        },
        work_area: Rect {
            x,
            y: 0,
            width: 1920,
            height: 1040,
        },
    }
}

impl HeadlessWindows {
    /// The first display is treated as the active one.
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        let displays = if displays.is_empty() {
            vec![display("1", 0)]
        } else {
            displays
        };
        Self {
            displays,
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    /// One 1920x1080 display.
    pub fn single() -> Self {
        Self::new(vec![display("1", 0)])
    }

    /// Two 1920x1080 displays side by side, ids "1" and "2".
    #[cfg(test)]
    pub fn dual() -> Self {
        Self::new(vec![display("1", 0), display("2", 1920)])
    }

    fn with_surface<R>(&self, surface: Surface, f: impl FnOnce(Option<&mut SurfaceState>) -> R) -> R {
        let mut surfaces = self.surfaces.lock().unwrap_or_else(|e| e.into_inner());
        f(surfaces.get_mut(&surface))
    }
}

impl WindowLayer for HeadlessWindows {
    fn active_display(&self) -> DisplayInfo {
        self.displays[0].clone()
    }

    fn display_nearest(&self, point: Position) -> DisplayInfo {
        if let Some(found) = self.displays.iter().find(|d| d.bounds.contains(point)) {
            return found.clone();
        }

        let distance = |d: &DisplayInfo| {
            let c = d.bounds.center();
            let dx = i64::from(c.x) - i64::from(point.x);
            let dy = i64::from(c.y) - i64::from(point.y);
            dx * dx + dy * dy
        };
        self.displays
            .iter()
            .min_by_key(|d| distance(d))
            .unwrap_or(&self.displays[0])
            .clone()
    }

    fn exists(&self, surface: Surface) -> bool {
        self.with_surface(surface, |state| state.is_some())
    }

    fn create(&self, surface: Surface, bounds: Rect) {
        tracing::debug!(
            "Creating {} surface {:?} at {:?}",
            surface.name(),
            bounds.size(),
            bounds.position()
        );
        let mut surfaces = self.surfaces.lock().unwrap_or_else(|e| e.into_inner());
        surfaces.insert(
            surface,
            SurfaceState {
                visible: false,
                bounds,
            },
        );
    }

    fn is_visible(&self, surface: Surface) -> bool {
        self.with_surface(surface, |state| state.is_some_and(|s| s.visible))
    }

    fn bounds(&self, surface: Surface) -> Option<Rect> {
        self.with_surface(surface, |state| state.map(|s| s.bounds))
    }

    fn set_bounds(&self, surface: Surface, bounds: Rect) {
        self.with_surface(surface, |state| {
            if let Some(state) = state {
                state.bounds = bounds;
            }
        })
    }

    fn show(&self, surface: Surface) {
        self.with_surface(surface, |state| {
            if let Some(state) = state {
                if !state.visible {
                    tracing::info!("Showing {} at {:?}", surface.name(), state.bounds.position());
                }
                state.visible = true;
            }
        })
    }

    fn hide(&self, surface: Surface) {
        self.with_surface(surface, |state| {
            if let Some(state) = state {
                if state.visible {
                    tracing::info!("Hiding {}", surface.name());
                }
                state.visible = false;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_lifecycle() {
        let windows = HeadlessWindows::single();
        assert!(!windows.exists(Surface::Widget));
        // Operations on a missing surface are no-ops
        windows.show(Surface::Widget);
        assert!(!windows.is_visible(Surface::Widget));

        let bounds = Rect { x: 1, y: 2, width: 3, height: 4 };
        windows.create(Surface::Widget, bounds);
        assert!(windows.exists(Surface::Widget));
        assert!(!windows.is_visible(Surface::Widget));

        windows.show(Surface::Widget);
        assert!(windows.is_visible(Surface::Widget));
        assert!(!windows.is_visible(Surface::Lyrics));
        windows.hide(Surface::Widget);
        assert!(!windows.is_visible(Surface::Widget));
        assert_eq!(windows.bounds(Surface::Widget), Some(bounds));
    }

    #[test]
    fn test_display_nearest() {
        let windows = HeadlessWindows::dual();
        assert_eq!(windows.display_nearest(Position { x: 2500, y: 10 }).id, "2");
        assert_eq!(windows.display_nearest(Position { x: 100, y: 10 }).id, "1");
        // Off-screen points snap to the closest display
        assert_eq!(windows.display_nearest(Position { x: 5000, y: 500 }).id, "2");
        assert_eq!(windows.display_nearest(Position { x: -300, y: 500 }).id, "1");
    }
}
