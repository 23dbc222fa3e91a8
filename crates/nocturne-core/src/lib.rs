//! Client-visible types shared between the playback core and its bindings:
//! events, commands, seek requests, chapters and playback options.

use serde::{Deserialize, Serialize};

mod options;
mod seek;

pub use options::{
    CursorAutohide, ForceWindow, HrSeekMode, KeepOpen, LoopSetting, PlayOpts,
};
pub use seek::{SeekFlags, SeekPrecision, SeekRequest, SeekTarget};

/// Events emitted by the playback core to clients and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerEvent {
    /// `playback_active` flipped; the core went idle or became active.
    CoreIdle,
    /// Effective pause engaged.
    Pause,
    /// Effective pause released.
    Unpause,
    /// A seek was dispatched to the demuxer.
    Seek,
    /// Playback time moved (also emitted as a dummy tick while paused/EOF).
    Tick,
    /// Cache fill or buffering state changed.
    CacheUpdate,
    /// The current chapter changed.
    ChapterChange,
    /// Audio and video started together after a load or seek.
    PlaybackRestart,
    /// The core entered idle mode (no playlist entry).
    Idle,
    /// The video output was reconfigured.
    VideoReconfig,
    /// The VO window was resized.
    WinResize,
    /// The VO window state (minimized, etc.) changed.
    WinState,
}

/// Commands accepted from the input subsystem and client bindings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Seek {
        target: SeekTarget,
        precision: SeekPrecision,
        flags: SeekFlags,
    },
    SetPause {
        pause: bool,
    },
    TogglePause,
    /// Step one frame forward (unpauses for exactly one frame).
    FrameStep,
    /// Step one frame back via a very-exact backstep seek.
    FrameBackStep,
    Quit,
}

/// A chapter marker on the media timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Start of the chapter in seconds.
    pub pts: f64,
    pub title: Option<String>,
}

impl Chapter {
    pub fn new(pts: f64, title: impl Into<String>) -> Self {
        Self {
            pts,
            title: Some(title.into()),
        }
    }

    pub fn untitled(pts: f64) -> Self {
        Self { pts, title: None }
    }
}
