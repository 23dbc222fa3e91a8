//! Capability traits for the external stages the control core drives.
//!
//! The core never decodes or renders anything itself; it orders operations on
//! these collaborators and reacts to the status codes they report. All trait
//! objects are owned by the [`PlayerContext`](crate::PlayerContext); external
//! threads only ever hold a [`WakeupHandle`](crate::WakeupHandle).

use nocturne_core::{Chapter, Command};

/// A decoded frame as seen by the control core: payloadless apart from its
/// presentation timestamp. Pixels and samples stay behind the stage traits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Presentation timestamp in seconds, if the stream carries one.
    pub pts: Option<f64>,
}

impl Frame {
    pub fn at(pts: f64) -> Self {
        Self { pts: Some(pts) }
    }
}

/// Result of polling a decoder for output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodePoll {
    Frame(Frame),
    /// The decoder needs more input before it can produce a frame.
    Starved,
    Eof,
}

/// Non-frame status forwarded into a filter graph sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Starved,
    Eof,
}

/// Flags passed along with a demuxer seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DemuxSeekFlags {
    /// Snap to the next keyframe at or after the target.
    pub forward: bool,
    /// The target is a fraction of the total stream, not seconds.
    pub factor: bool,
    /// High-resolution seek: the demuxer must not round forward.
    pub precise: bool,
    /// Best-effort seek within already-cached data only.
    pub cached: bool,
}

/// Demuxer reader state, polled once per playloop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderState {
    /// The reader has nothing to do right now.
    pub idle: bool,
    /// The reader cannot supply data fast enough for realtime playback.
    pub underrun: bool,
    pub eof: bool,
    /// Seconds of demuxed data buffered ahead of playback.
    pub ts_duration: Option<f64>,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self {
            idle: true,
            underrun: false,
            eof: false,
            ts_duration: None,
        }
    }
}

/// Stream-cache state, polled together with [`ReaderState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub idle: bool,
    /// Configured cache size in bytes; zero means no cache in use.
    pub size: i64,
}

impl Default for CacheInfo {
    fn default() -> Self {
        Self { idle: true, size: 0 }
    }
}

/// The container demuxer feeding every selected track.
pub trait Demuxer: Send {
    /// Total duration in seconds, if the container knows it.
    fn duration(&self) -> Option<f64>;
    fn seekable(&self) -> bool;
    /// Whether timestamps may reset mid-stream (e.g. broken transport
    /// streams); position reporting then falls back to byte offsets.
    fn ts_resets_possible(&self) -> bool;
    fn is_network(&self) -> bool;
    /// Current read position in bytes.
    fn file_pos(&self) -> Option<i64>;
    /// Total stream size in bytes.
    fn stream_size(&self) -> Option<i64>;
    fn chapters(&self) -> Vec<Chapter>;
    /// Seek to `target` (seconds, or a fraction when `flags.factor`).
    /// Returns false if the demuxer refused.
    fn seek(&mut self, target: f64, flags: DemuxSeekFlags) -> bool;
    fn reader_state(&self) -> ReaderState;
    fn cache_info(&self) -> CacheInfo;
}

/// A single elementary-stream decoder.
pub trait StreamDecoder: Send {
    /// Drop all internal state after a seek.
    fn reset(&mut self);
    /// Feed packets / advance internal decoding.
    fn work(&mut self);
    fn poll_frame(&mut self) -> DecodePoll;
}

/// The audio output device queue.
pub trait AudioOutput: Send {
    fn pause(&mut self);
    fn resume(&mut self);
    /// Drop everything buffered but not yet played.
    fn flush(&mut self);
    /// Let the buffered audio play out; returns true once the queue is empty.
    fn drain(&mut self) -> bool;
    /// Queue one frame; false means the device buffer is full.
    fn write(&mut self, frame: Frame) -> bool;
    /// Seconds of queued audio ahead of the speaker.
    fn delay(&self) -> f64;
}

/// Pixel format token negotiated with the video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat(pub u32);

/// Parameters for (re)configuring the video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Pixel aspect ratio numerator / denominator.
    pub par_w: u32,
    pub par_h: u32,
}

/// Window events drained once per playloop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoEvents {
    pub resize: bool,
    pub win_state: bool,
    /// The fullscreen flag changed from outside (window manager).
    pub fullscreen_state: bool,
}

/// The video output window and presentation queue.
pub trait VideoOutput: Send {
    fn set_paused(&mut self, paused: bool);
    /// Returns false if the output cannot display with these parameters.
    fn reconfig(&mut self, params: &VideoParams) -> bool;
    /// Whether the output currently has a working configuration.
    fn config_ok(&self) -> bool;
    fn queue_frame(&mut self, frame: Frame);
    /// Whether a displayable frame has been shown and is still up.
    fn has_frame(&self) -> bool;
    fn redraw(&mut self);
    /// Whether the output itself wants to be redrawn (expose, etc.).
    fn want_redraw(&self) -> bool;
    fn query_formats(&self) -> Vec<PixelFormat>;
    fn query_and_reset_events(&mut self) -> VoEvents;
    fn set_cursor_visible(&mut self, visible: bool);
    fn set_screensaver_enabled(&mut self, enabled: bool);
    fn fullscreen(&self) -> bool;
}

/// The input subsystem: queued user commands plus mouse activity.
pub trait InputSource: Send {
    fn read_command(&mut self) -> Option<Command>;
    /// Seconds until the next queued command is due; infinity when none is.
    fn queue_delay(&self) -> f64;
    /// Monotonic counter bumped on every mouse event.
    fn mouse_event_counter(&self) -> u64;
}

/// The complex filter graph, when one is configured. Tracks are addressed by
/// their index in the context's track list.
pub trait FilterGraph: Send {
    fn needs_input(&self, track: usize) -> bool;
    fn send_frame(&mut self, track: usize, frame: Frame);
    fn send_status(&mut self, track: usize, status: StreamStatus);
    /// Run the graph; returns true if progress was made.
    fn process(&mut self) -> bool;
    fn has_failed(&self) -> bool;
    /// Drop all in-flight data after a seek.
    fn seek_reset(&mut self);
}

/// Playlist access, limited to what the terminal handlers need.
pub trait Playlist: Send {
    fn has_current(&self) -> bool;
    fn has_next(&self) -> bool;
    /// Start demuxing the next entry in the background.
    fn prefetch_next(&mut self);
}

/// Subtitle renderer notifications.
pub trait Subtitles: Send {
    fn update(&mut self, pts: Option<f64>);
    fn reset(&mut self);
}

/// Stream recorder notifications.
pub trait Recorder: Send {
    fn mark_discontinuity(&mut self);
}

/// Encoding-mode sink notifications.
pub trait Encoder: Send {
    fn did_fail(&self) -> bool;
    fn discontinuity(&mut self);
}
