//! Visibility, size and placement decisions for the two surfaces

use std::sync::Arc;

use anyhow::Result;

use super::{DisplayInfo, Position, Rect, Size, Surface, WindowLayer};
use crate::config::{get_json, keys, set_json, CredentialStore};
use crate::models::{PlaybackSnapshot, SizePreset, WidgetPreferences};

pub const LYRICS_SIZE: Size = Size {
    width: 380,
    height: 340,
};

/// Gap between a surface and the work-area edge.
const EDGE_INSET: i32 = 24;

/// The widget shows iff something is audibly playing.
pub fn widget_visible(snapshot: Option<&PlaybackSnapshot>) -> bool {
    snapshot.is_some_and(PlaybackSnapshot::is_active)
}

pub fn widget_size(preset: SizePreset) -> Size {
    match preset {
        SizePreset::Small => Size {
            width: 320,
            height: 120,
        },
        SizePreset::Medium => Size {
            width: 400,
            height: 160,
        },
        SizePreset::Large => Size {
            width: 520,
            height: 220,
        },
    }
}

/// Bottom-right corner of the work area, inset.
pub fn default_position(display: &DisplayInfo, size: Size) -> Position {
    let area = display.work_area;
    Position {
        x: area.x + area.width as i32 - size.width as i32 - EDGE_INSET,
        y: area.y + area.height as i32 - size.height as i32 - EDGE_INSET,
    }
}

fn position_key(surface: Surface, display_id: &str) -> String {
    let prefix = match surface {
        Surface::Widget => keys::WIDGET_POSITION_PREFIX,
        Surface::Lyrics => keys::LYRICS_POSITION_PREFIX,
    };
    format!("{}{}", prefix, display_id)
}

/// Store-backed glue between preferences and the window layer.
pub struct Coordinator {
    store: Arc<dyn CredentialStore>,
    windows: Arc<dyn WindowLayer>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn CredentialStore>, windows: Arc<dyn WindowLayer>) -> Self {
        Self { store, windows }
    }

    pub fn windows(&self) -> &dyn WindowLayer {
        self.windows.as_ref()
    }

    pub fn preferences(&self) -> WidgetPreferences {
        get_json(self.store.as_ref(), keys::WIDGET_PREFERENCES).unwrap_or_default()
    }

    pub fn save_preferences(&self, prefs: &WidgetPreferences) -> Result<()> {
        set_json(self.store.as_ref(), keys::WIDGET_PREFERENCES, prefs)
    }

    pub fn lyrics_enabled(&self) -> bool {
        self.store
            .get(keys::LYRICS_VISIBLE)
            .is_some_and(|v| v == "true")
    }

    pub fn set_lyrics_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .set(keys::LYRICS_VISIBLE, if enabled { "true" } else { "false" })
    }

    pub fn surface_size(&self, surface: Surface) -> Size {
        match surface {
            Surface::Widget => widget_size(self.preferences().size_preset),
            Surface::Lyrics => LYRICS_SIZE,
        }
    }

    /// Saved position for `display`, else the global fallback, else the
    /// default anchor.
    pub fn resolve_position(&self, surface: Surface, display: &DisplayInfo, size: Size) -> Position {
        let store = self.store.as_ref();
        get_json::<Position>(store, &position_key(surface, &display.id))
            .or_else(|| get_json(store, keys::WIDGET_POSITION))
            .unwrap_or_else(|| default_position(display, size))
    }

    /// Bounds on the active display.
    pub fn placement(&self, surface: Surface) -> Rect {
        let size = self.surface_size(surface);
        let display = self.windows.active_display();
        Rect::new(self.resolve_position(surface, &display, size), size)
    }

    /// Remember `bounds` for the display nearest their centre. Widget moves
    /// also update the global fallback.
    pub fn persist_position(&self, surface: Surface, bounds: Rect) -> Result<()> {
        let display = self.windows.display_nearest(bounds.center());
        let position = bounds.position();
        set_json(self.store.as_ref(), &position_key(surface, &display.id), &position)?;
        if surface == Surface::Widget {
            set_json(self.store.as_ref(), keys::WIDGET_POSITION, &position)?;
        }
        Ok(())
    }

    /// Create the widget lazily; a hidden widget is re-placed before showing.
    pub fn show_widget(&self) {
        if !self.windows.exists(Surface::Widget) {
            self.windows
                .create(Surface::Widget, self.placement(Surface::Widget));
        } else if !self.windows.is_visible(Surface::Widget) {
            self.windows
                .set_bounds(Surface::Widget, self.placement(Surface::Widget));
        }
        self.windows.show(Surface::Widget);
    }

    /// Show the lyrics surface if the user enabled it. Returns whether it is shown.
    pub fn show_lyrics_if_enabled(&self) -> bool {
        if !self.lyrics_enabled() {
            return false;
        }
        if !self.windows.exists(Surface::Lyrics) {
            self.windows
                .create(Surface::Lyrics, self.placement(Surface::Lyrics));
        }
        self.windows.show(Surface::Lyrics);
        true
    }

    pub fn lyrics_surface_active(&self) -> bool {
        self.lyrics_enabled() || self.windows.is_visible(Surface::Lyrics)
    }

    pub fn hide_widget(&self) {
        self.windows.hide(Surface::Widget);
    }

    pub fn hide_lyrics(&self) {
        self.windows.hide(Surface::Lyrics);
    }

    pub fn hide_all(&self) {
        self.windows.hide(Surface::Widget);
        self.windows.hide(Surface::Lyrics);
    }

    /// Resize the widget in place after a size preset change.
    pub fn apply_widget_size(&self) -> Result<()> {
        let Some(current) = self.windows.bounds(Surface::Widget) else {
            return Ok(());
        };
        let bounds = Rect::new(current.position(), self.surface_size(Surface::Widget));
        self.windows.set_bounds(Surface::Widget, bounds);
        self.persist_position(Surface::Widget, bounds)
    }

    /// Re-place the widget from its stored position, e.g. after a monitor change.
    pub fn reapply_widget_bounds(&self) {
        if self.windows.exists(Surface::Widget) {
            self.windows
                .set_bounds(Surface::Widget, self.placement(Surface::Widget));
        }
    }
}
