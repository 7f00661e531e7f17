//! Presentation layer interfaces
//!
//! The engine never touches real windows. It drives a [`WindowLayer`] for
//! the two surfaces (floating widget, lyrics overlay) and pushes typed
//! [`PresenceEvent`]s through an [`EventSink`].

mod coordinator;
pub mod foreground;
mod fullscreen;
mod headless;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use coordinator::{widget_size, widget_visible, Coordinator, LYRICS_SIZE};
pub use foreground::{probe_for, ForegroundProbe};
pub use fullscreen::FullscreenWatcher;
pub use headless::HeadlessWindows;

use crate::models::{PlaybackSnapshot, WidgetPreferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Screen rectangle in virtual-desktop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.x + (self.width / 2) as i32,
            y: self.y + (self.height / 2) as i32,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && i64::from(point.x) < i64::from(self.x) + i64::from(self.width)
            && i64::from(point.y) < i64::from(self.y) + i64::from(self.height)
    }
}

/// A monitor as reported by the window layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub id: String,
    pub bounds: Rect,
    /// Bounds minus taskbars and docks
    pub work_area: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Widget,
    Lyrics,
}

impl Surface {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Widget => "widget",
            Self::Lyrics => "lyrics",
        }
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "widget" => Ok(Self::Widget),
            "lyrics" => Ok(Self::Lyrics),
            other => Err(format!("Unknown surface: {}. Use: widget, lyrics", other)),
        }
    }
}

/// Window operations the engine needs from the host.
pub trait WindowLayer: Send + Sync {
    /// Display under the cursor
    fn active_display(&self) -> DisplayInfo;
    fn display_nearest(&self, point: Position) -> DisplayInfo;

    fn exists(&self, surface: Surface) -> bool;
    /// Create the surface hidden at `bounds`.
    fn create(&self, surface: Surface, bounds: Rect);
    fn is_visible(&self, surface: Surface) -> bool;
    fn bounds(&self, surface: Surface) -> Option<Rect>;
    fn set_bounds(&self, surface: Surface, bounds: Rect);
    /// Show without taking focus.
    fn show(&self, surface: Surface);
    fn hide(&self, surface: Surface);
}

/// Body of a lyrics update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayload {
    pub lyrics: Option<String>,
    pub loading: bool,
    pub now_playing: Option<PlaybackSnapshot>,
}

/// Outbound events for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PresenceEvent {
    NowPlaying(Option<PlaybackSnapshot>),
    Preferences(WidgetPreferences),
    Lyrics(LyricsPayload),
    Connected,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PresenceEvent);
}

/// Forwards events over an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PresenceEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresenceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PresenceEvent) {
        // Receiver gone means shutdown
        let _ = self.tx.send(event);
    }
}
