//! The player context: the single mutable hub every handler operates on.
//!
//! One logical thread owns a [`PlayerContext`] and runs the playloop; all
//! cross-thread communication goes through the dispatch queue. The fields
//! mirror the state partitions of the core: clocking, playback state, time
//! and PTS, the queued seek, caching, chapters and window bookkeeping.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use nocturne_core::{Chapter, PlayOpts, PlayerEvent, SeekRequest};

use crate::dispatch::{Dispatch, WakeupHandle};
use crate::event_hub::EventHub;
use crate::osd::{OsdFunction, OsdState};
use crate::stages::{
    AudioOutput, Demuxer, Encoder, FilterGraph, Frame, InputSource, Playlist, Recorder,
    StreamDecoder, Subtitles, VideoOutput,
};

const EVENT_CAPACITY: usize = 256;

/// Per-pipeline decode/output progress. Ordered: a pipeline is start-ready
/// once it reaches [`PipelineStatus::Ready`]. Absent pipelines report `Eof`
/// after a reset so they never gate startup or end-of-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStatus {
    /// No pipeline has been configured yet.
    Absent,
    /// Decoding toward the start/seek target.
    Syncing,
    /// The first frame is prepared; waiting for the other pipeline.
    Ready,
    Playing,
    /// Input ran out; queued output is playing out.
    Draining,
    Eof,
}

/// Terminal signal consumed by the outer player driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Not stopping.
    KeepPlaying,
    /// Both pipelines hit EOF with nothing overriding it.
    AtEndOfFile,
    /// Unrecoverable failure or user quit.
    Quit,
}

/// One elementary stream of the open file, plus its decoder when selected.
pub struct Track {
    pub selected: bool,
    /// Loaded from a separate file with its own demuxer.
    pub is_external: bool,
    /// Per-track timestamp offset (e.g. audio delay), in seconds.
    pub seek_offset: f64,
    /// Present only for external tracks.
    pub demuxer: Option<Box<dyn Demuxer>>,
    pub decoder: Option<Box<dyn StreamDecoder>>,
}

impl Track {
    pub fn new(decoder: Box<dyn StreamDecoder>) -> Self {
        Self {
            selected: true,
            is_external: false,
            seek_offset: 0.0,
            demuxer: None,
            decoder: Some(decoder),
        }
    }
}

/// The audio pipeline: which track feeds it and what is in flight.
pub struct AudioChain {
    pub track: usize,
    /// Decoded but not yet written to the audio output.
    pub(crate) pending: Option<Frame>,
    /// PTS of the last frame handed to the output.
    pub(crate) last_pts: Option<f64>,
}

impl AudioChain {
    pub fn new(track: usize) -> Self {
        Self {
            track,
            pending: None,
            last_pts: None,
        }
    }
}

/// The video pipeline.
pub struct VideoChain {
    pub track: usize,
    /// A degenerate chain showing one still image; must not gate EOF or
    /// drive the playback clock like real video.
    pub is_cover_art: bool,
    pub(crate) pending: Option<Frame>,
}

impl VideoChain {
    pub fn new(track: usize) -> Self {
        Self {
            track,
            is_cover_art: false,
            pending: None,
        }
    }
}

/// Factory invoked when force-window needs to create a VO on demand. The
/// handle lets the window system wake the core without referencing it.
pub type VideoOutputFactory =
    Box<dyn FnMut(WakeupHandle) -> Option<Box<dyn VideoOutput>> + Send>;

pub struct PlayerContext {
    pub(crate) opts: PlayOpts,
    dispatch: Arc<Dispatch>,
    events: EventHub,

    // Clocking.
    epoch: Instant,
    last_time: Instant,
    /// Next wakeup budget in seconds; infinity means sleep until woken.
    /// Only `set_timeout` writes it (monotonically decreasing per iteration).
    pub(crate) sleeptime: f64,
    in_dispatch: bool,
    /// Wall time of the most recent seek; gates OSD redraw and the
    /// delayed-seek coalescing window.
    pub(crate) start_timestamp: f64,
    /// Frame-time accumulator used by the video writer; pause transitions
    /// subtract or discard elapsed time so it survives pauses intact.
    pub(crate) time_frame: f64,
    pub(crate) last_idle_tick: f64,

    // Playback state.
    pub(crate) paused: bool,
    pub(crate) paused_for_cache: bool,
    pub(crate) playback_active: bool,
    pub(crate) playing: bool,
    pub(crate) playback_initialized: bool,
    pub(crate) restart_complete: bool,
    pub(crate) in_playloop: bool,
    pub(crate) playing_msg_shown: bool,
    pub(crate) stop_play: StopReason,
    /// Remaining forward frame-steps; consumed by the video writer.
    pub(crate) step_frames: u32,
    /// Remaining frame budget when `play_frames` is set.
    pub(crate) max_frames: Option<u64>,
    pub(crate) video_status: PipelineStatus,
    pub(crate) audio_status: PipelineStatus,

    // Time & PTS.
    pub(crate) playback_pts: Option<f64>,
    pub(crate) last_seek_pts: Option<f64>,
    pub(crate) last_vo_pts: Option<f64>,
    pub(crate) video_pts: Option<f64>,
    pub(crate) hrseek_active: bool,
    pub(crate) hrseek_pts: Option<f64>,
    pub(crate) hrseek_framedrop: bool,
    pub(crate) hrseek_backstep: bool,
    pub(crate) hrseek_lastframe: bool,

    // Seek request.
    pub(crate) seek: Option<SeekRequest>,
    pub(crate) current_seek: Option<SeekRequest>,
    pub(crate) audio_allow_second_chance_seek: bool,

    // Caching.
    pub(crate) cache_buffer: i32,
    pub(crate) cache_stop_time: f64,
    pub(crate) next_cache_update: f64,

    // Chapters / loop.
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) last_chapter: i64,
    pub(crate) last_chapter_seek: i64,
    pub(crate) last_chapter_pts: Option<f64>,
    /// Whether the AB-loop B endpoint is still ahead of the position.
    pub(crate) ab_loop_clip: bool,

    // Window / cursor.
    pub(crate) mouse_event_ts: u64,
    pub(crate) mouse_timer: f64,
    pub(crate) mouse_cursor_visible: bool,
    pub(crate) window_fullscreen: bool,

    pub(crate) osd: OsdState,

    // Stages.
    pub(crate) demuxer: Option<Box<dyn Demuxer>>,
    pub(crate) tracks: Vec<Track>,
    pub(crate) audio_chain: Option<AudioChain>,
    pub(crate) video_chain: Option<VideoChain>,
    pub(crate) ao: Option<Box<dyn AudioOutput>>,
    pub(crate) vo: Option<Box<dyn VideoOutput>>,
    pub(crate) vo_factory: Option<VideoOutputFactory>,
    pub(crate) filter_graph: Option<Box<dyn FilterGraph>>,
    pub(crate) input: Option<Box<dyn InputSource>>,
    pub(crate) playlist: Option<Box<dyn Playlist>>,
    pub(crate) subtitles: Option<Box<dyn Subtitles>>,
    pub(crate) recorder: Option<Box<dyn Recorder>>,
    pub(crate) encoder: Option<Box<dyn Encoder>>,
}

impl PlayerContext {
    pub fn new(opts: PlayOpts) -> Self {
        let now = Instant::now();
        let max_frames = opts.play_frames;
        Self {
            opts,
            dispatch: Arc::new(Dispatch::new()),
            events: EventHub::new(EVENT_CAPACITY),
            epoch: now,
            last_time: now,
            sleeptime: f64::INFINITY,
            in_dispatch: false,
            start_timestamp: -1e9,
            time_frame: 0.0,
            last_idle_tick: -1e9,
            paused: false,
            paused_for_cache: false,
            playback_active: false,
            playing: false,
            playback_initialized: false,
            restart_complete: false,
            in_playloop: false,
            playing_msg_shown: false,
            stop_play: StopReason::KeepPlaying,
            step_frames: 0,
            max_frames,
            video_status: PipelineStatus::Absent,
            audio_status: PipelineStatus::Absent,
            playback_pts: None,
            last_seek_pts: None,
            last_vo_pts: None,
            video_pts: None,
            hrseek_active: false,
            hrseek_pts: None,
            hrseek_framedrop: false,
            hrseek_backstep: false,
            hrseek_lastframe: false,
            seek: None,
            current_seek: None,
            audio_allow_second_chance_seek: false,
            cache_buffer: 100,
            cache_stop_time: 0.0,
            next_cache_update: 0.0,
            chapters: Vec::new(),
            last_chapter: -2,
            last_chapter_seek: -2,
            last_chapter_pts: None,
            ab_loop_clip: true,
            mouse_event_ts: 0,
            mouse_timer: 0.0,
            mouse_cursor_visible: true,
            window_fullscreen: false,
            osd: OsdState::default(),
            demuxer: None,
            tracks: Vec::new(),
            audio_chain: None,
            video_chain: None,
            ao: None,
            vo: None,
            vo_factory: None,
            filter_graph: None,
            input: None,
            playlist: None,
            subtitles: None,
            recorder: None,
            encoder: None,
        }
    }

    // ---- wakeup discipline ----

    /// Seconds on the context's monotonic clock.
    pub(crate) fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Seconds elapsed since the previous call; advances the anchor.
    pub(crate) fn relative_time(&mut self) -> f64 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_time).as_secs_f64();
        self.last_time = now;
        delta
    }

    /// Cause the playloop to run another iteration. Safe to call from
    /// handlers; other threads use a [`WakeupHandle`].
    pub fn wakeup(&self) {
        self.dispatch.interrupt();
    }

    /// Lower the sleep budget for the next `wait_events`. Budgets combine
    /// via `min`; zero is equivalent to an immediate wakeup.
    pub fn set_timeout(&mut self, timeout: f64) {
        self.sleeptime = self.sleeptime.min(timeout);
        // A sleep already in progress cannot be shortened in place; force the
        // loop to re-evaluate its budget on the next iteration.
        if self.in_dispatch && timeout.is_finite() {
            self.wakeup();
        }
    }

    /// The playloop's only blocking point: run queued cross-thread work,
    /// then sleep up to the accumulated budget.
    pub fn wait_events(&mut self) {
        self.in_dispatch = true;
        let dispatch = Arc::clone(&self.dispatch);
        let timeout = self.sleeptime;
        dispatch.process(self, timeout);
        self.in_dispatch = false;
        self.sleeptime = f64::INFINITY;
    }

    pub fn wakeup_handle(&self) -> WakeupHandle {
        self.dispatch.handle()
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: PlayerEvent) {
        self.events.emit(event);
    }

    // ---- state reporting ----

    /// Recompute `playback_active` and push the transition to observers and
    /// the screensaver policy. Every transition emits exactly one event.
    pub(crate) fn update_core_idle_state(&mut self) {
        let eof = self.video_status == PipelineStatus::Eof
            && self.audio_status == PipelineStatus::Eof;
        let active = !self.paused
            && self.restart_complete
            && self.playing
            && self.in_playloop
            && !eof;

        if self.playback_active != active {
            self.playback_active = active;
            self.update_screensaver_state();
            self.notify(PlayerEvent::CoreIdle);
        }
    }

    pub(crate) fn update_screensaver_state(&mut self) {
        let enable = !self.playback_active || !self.opts.stop_screensaver;
        if let Some(vo) = self.vo.as_mut() {
            vo.set_screensaver_enabled(enable);
        }
    }

    pub fn stop_reason(&self) -> StopReason {
        self.stop_play
    }

    pub fn request_quit(&mut self) {
        self.stop_play = StopReason::Quit;
        self.wakeup();
    }

    /// Effective pause: user pause or cache-induced pause.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn restart_complete(&self) -> bool {
        self.restart_complete
    }

    pub fn video_status(&self) -> PipelineStatus {
        self.video_status
    }

    pub fn audio_status(&self) -> PipelineStatus {
        self.audio_status
    }

    pub fn opts(&self) -> &PlayOpts {
        &self.opts
    }

    pub fn opts_mut(&mut self) -> &mut PlayOpts {
        &mut self.opts
    }

    /// The most recently executed seek, until a restart completes.
    pub fn current_seek(&self) -> Option<SeekRequest> {
        self.current_seek
    }

    /// The transient OSD message, if one is showing.
    pub fn osd_message(&self) -> Option<&str> {
        self.osd.message()
    }

    /// The OSD state icon.
    pub fn osd_function(&self) -> Option<OsdFunction> {
        self.osd.function
    }

    // ---- wiring ----

    /// Install the demuxer and pull its chapter list.
    pub fn set_demuxer(&mut self, demuxer: Box<dyn Demuxer>) {
        self.chapters = demuxer.chapters();
        self.demuxer = Some(demuxer);
        self.last_chapter = -2;
        self.last_chapter_seek = -2;
        self.last_chapter_pts = None;
    }

    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn set_audio_chain(&mut self, chain: Option<AudioChain>) {
        self.audio_chain = chain;
    }

    pub fn set_video_chain(&mut self, chain: Option<VideoChain>) {
        self.video_chain = chain;
    }

    pub fn set_audio_output(&mut self, ao: Option<Box<dyn AudioOutput>>) {
        self.ao = ao;
    }

    pub fn set_video_output(&mut self, vo: Option<Box<dyn VideoOutput>>) {
        self.vo = vo;
    }

    pub fn set_video_output_factory(&mut self, factory: Option<VideoOutputFactory>) {
        self.vo_factory = factory;
    }

    pub fn set_filter_graph(&mut self, graph: Option<Box<dyn FilterGraph>>) {
        self.filter_graph = graph;
    }

    pub fn set_input(&mut self, input: Option<Box<dyn InputSource>>) {
        self.input = input;
    }

    pub fn set_playlist(&mut self, playlist: Option<Box<dyn Playlist>>) {
        self.playlist = playlist;
    }

    pub fn set_subtitles(&mut self, subtitles: Option<Box<dyn Subtitles>>) {
        self.subtitles = subtitles;
    }

    pub fn set_recorder(&mut self, recorder: Option<Box<dyn Recorder>>) {
        self.recorder = recorder;
    }

    pub fn set_encoder(&mut self, encoder: Option<Box<dyn Encoder>>) {
        self.encoder = encoder;
    }

    /// Mark the file loaded and arm the pipelines for their first start.
    /// Applies the configured initial pause state.
    pub fn start_playback(&mut self) {
        self.playing = true;
        self.playback_initialized = true;
        self.playing_msg_shown = false;
        self.stop_play = StopReason::KeepPlaying;
        crate::seek::reset_playback_state(self);
        let pause = self.opts.pause;
        crate::pause::set_pause_state(self, pause);
        self.start_timestamp = self.now();
        debug!(
            audio = ?self.audio_status,
            video = ?self.video_status,
            "playback armed"
        );
        self.wakeup();
    }
}
