use serde::{Deserialize, Serialize};

/// When high-resolution seeks are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HrSeekMode {
    /// Never hr-seek unless the request explicitly demands it.
    Never,
    /// Hr-seek for absolute targets only.
    #[default]
    AbsoluteOnly,
    /// Hr-seek whenever the precision allows it.
    Always,
}

/// Behavior at end of file when nothing else keeps the core going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepOpen {
    /// Stop normally at EOF.
    #[default]
    No,
    /// Keep the last frame up if this is the final playlist entry.
    Yes,
    /// Keep the last frame up even with more playlist entries pending.
    Always,
}

/// Whole-file looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopSetting {
    #[default]
    Off,
    /// Loop this many more times, then stop.
    Count(u64),
    Inf,
}

/// Mouse cursor hiding over the video window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorAutohide {
    AlwaysVisible,
    AlwaysHidden,
    /// Hide after this many milliseconds without mouse activity.
    AfterMs(u32),
}

impl Default for CursorAutohide {
    fn default() -> Self {
        CursorAutohide::AfterMs(1000)
    }
}

/// When to force-create a VO window without a video chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForceWindow {
    #[default]
    No,
    /// Only once loading has finished (or when explicitly forced).
    Loaded,
    Always,
}

/// Playback options recognized by the control core.
///
/// Defaults follow common player behavior; everything here can be mutated at
/// runtime through the dispatch queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlayOpts {
    /// User-requested pause. The effective pause also folds in cache state.
    pub pause: bool,
    /// Whether decoders produce trustworthy PTS; required for hr-seeks.
    pub correct_pts: bool,
    pub hr_seek: HrSeekMode,
    /// Allow dropping frames while skipping to an hr-seek target.
    pub hr_seek_framedrop: bool,
    /// Extra seconds to seek earlier in the demuxer to compensate for bad
    /// keyframe placement.
    pub hr_seek_demuxer_offset: f64,
    /// Pause automatically when the demuxer underruns.
    pub cache_pause: bool,
    /// Seconds of demuxed data required before resuming from a cache pause.
    pub cache_pause_wait: f64,
    /// Start every playback restart in the buffering state.
    pub cache_pause_initial: bool,
    /// A and B endpoints of the AB-loop, if configured.
    pub ab_loop: [Option<f64>; 2],
    pub loop_file: LoopSetting,
    /// Whole-playlist repeat count consumed by the outer driver; keep-open
    /// only engages on the final pass.
    pub loop_times: u32,
    pub keep_open: KeepOpen,
    /// Also pause when keep-open holds the last frame.
    pub keep_open_pause: bool,
    /// Fixed-interval stepping: seek this many seconds once per shown frame.
    pub step_sec: f64,
    pub cursor_autohide: CursorAutohide,
    /// Apply cursor autohide only while fullscreen.
    pub cursor_autohide_fs: bool,
    pub stop_screensaver: bool,
    pub force_window: ForceWindow,
    /// Terminal message logged once when playback starts.
    pub playing_msg: Option<String>,
    /// OSD message shown once when playback starts.
    pub osd_playing_msg: Option<String>,
    /// Default OSD message duration in milliseconds.
    pub osd_duration_ms: u32,
    /// Stop after this many video frames.
    pub play_frames: Option<u64>,
    /// Playback start position in seconds, if restricted.
    pub play_start: Option<f64>,
    /// Playback end position in seconds, if restricted.
    pub play_end: Option<f64>,
    /// Keep running and wait for playlist entries instead of exiting.
    pub player_idle_mode: bool,
}

impl Default for PlayOpts {
    fn default() -> Self {
        Self {
            pause: false,
            correct_pts: true,
            hr_seek: HrSeekMode::default(),
            hr_seek_framedrop: true,
            hr_seek_demuxer_offset: 0.0,
            cache_pause: true,
            cache_pause_wait: 1.0,
            cache_pause_initial: false,
            ab_loop: [None, None],
            loop_file: LoopSetting::Off,
            loop_times: 1,
            keep_open: KeepOpen::No,
            keep_open_pause: true,
            step_sec: 0.0,
            cursor_autohide: CursorAutohide::default(),
            cursor_autohide_fs: false,
            stop_screensaver: true,
            force_window: ForceWindow::No,
            playing_msg: None,
            osd_playing_msg: None,
            osd_duration_ms: 1000,
            play_frames: None,
            play_start: None,
            play_end: None,
            player_idle_mode: false,
        }
    }
}

impl PlayOpts {
    /// True when both AB-loop endpoints are unset.
    pub fn ab_loop_disabled(&self) -> bool {
        self.ab_loop[0].is_none() && self.ab_loop[1].is_none()
    }
}
