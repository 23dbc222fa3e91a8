//! End-to-end playloop scenarios against scripted mock collaborators.

use std::sync::{Arc, Mutex};

use nocturne_core::{
    KeepOpen, PlayOpts, PlayerEvent, SeekFlags, SeekPrecision, SeekTarget,
};

use crate::context::{AudioChain, PipelineStatus, PlayerContext, StopReason, Track, VideoChain};
use crate::loops::{handle_eof, handle_keep_open, handle_loop_file};
use crate::playloop::run_playloop;
use crate::seek::{execute_queued_seek, queue_seek};
use crate::stages::DecodePoll;

use self::harness::{
    drain_events, AoState, DecoderLog, DemuxerState, MockAudioOutput, MockDecoder, MockDemuxer,
    MockVideoOutput, VoState,
};

mod harness {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use nocturne_core::{Chapter, PlayerEvent};
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;

    use crate::stages::{
        AudioOutput, CacheInfo, DecodePoll, DemuxSeekFlags, Demuxer, Frame, PixelFormat,
        ReaderState, StreamDecoder, VideoOutput, VideoParams, VoEvents,
    };

    pub(super) struct DemuxerState {
        pub duration: Option<f64>,
        pub seekable: bool,
        pub ts_resets_possible: bool,
        pub is_network: bool,
        pub reader: ReaderState,
        pub cache: CacheInfo,
        pub chapters: Vec<Chapter>,
        pub accept_seeks: bool,
        pub seeks: Vec<(f64, DemuxSeekFlags)>,
    }

    impl Default for DemuxerState {
        fn default() -> Self {
            Self {
                duration: Some(60.0),
                seekable: true,
                ts_resets_possible: false,
                is_network: false,
                reader: ReaderState::default(),
                cache: CacheInfo::default(),
                chapters: Vec::new(),
                accept_seeks: true,
                seeks: Vec::new(),
            }
        }
    }

    pub(super) struct MockDemuxer {
        pub state: Arc<Mutex<DemuxerState>>,
    }

    impl Demuxer for MockDemuxer {
        fn duration(&self) -> Option<f64> {
            self.state.lock().unwrap().duration
        }
        fn seekable(&self) -> bool {
            self.state.lock().unwrap().seekable
        }
        fn ts_resets_possible(&self) -> bool {
            self.state.lock().unwrap().ts_resets_possible
        }
        fn is_network(&self) -> bool {
            self.state.lock().unwrap().is_network
        }
        fn file_pos(&self) -> Option<i64> {
            None
        }
        fn stream_size(&self) -> Option<i64> {
            None
        }
        fn chapters(&self) -> Vec<Chapter> {
            self.state.lock().unwrap().chapters.clone()
        }
        fn seek(&mut self, target: f64, flags: DemuxSeekFlags) -> bool {
            let mut state = self.state.lock().unwrap();
            state.seeks.push((target, flags));
            state.accept_seeks
        }
        fn reader_state(&self) -> ReaderState {
            self.state.lock().unwrap().reader
        }
        fn cache_info(&self) -> CacheInfo {
            self.state.lock().unwrap().cache
        }
    }

    #[derive(Default)]
    pub(super) struct DecoderLog {
        pub resets: usize,
    }

    pub(super) struct MockDecoder {
        steps: Arc<Mutex<VecDeque<DecodePoll>>>,
        log: Arc<Mutex<DecoderLog>>,
    }

    impl MockDecoder {
        pub(super) fn scripted(
            steps: Vec<DecodePoll>,
        ) -> (Self, Arc<Mutex<VecDeque<DecodePoll>>>, Arc<Mutex<DecoderLog>>) {
            let steps = Arc::new(Mutex::new(VecDeque::from(steps)));
            let log = Arc::new(Mutex::new(DecoderLog::default()));
            (
                Self {
                    steps: Arc::clone(&steps),
                    log: Arc::clone(&log),
                },
                steps,
                log,
            )
        }
    }

    impl StreamDecoder for MockDecoder {
        fn reset(&mut self) {
            self.log.lock().unwrap().resets += 1;
        }
        fn work(&mut self) {}
        fn poll_frame(&mut self) -> DecodePoll {
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(DecodePoll::Starved)
        }
    }

    #[derive(Default)]
    pub(super) struct AoState {
        pub written: Vec<Frame>,
        pub calls: Vec<&'static str>,
        pub capacity: usize,
        pub delay: f64,
    }

    pub(super) struct MockAudioOutput {
        pub state: Arc<Mutex<AoState>>,
    }

    impl AudioOutput for MockAudioOutput {
        fn pause(&mut self) {
            self.state.lock().unwrap().calls.push("pause");
        }
        fn resume(&mut self) {
            self.state.lock().unwrap().calls.push("resume");
        }
        fn flush(&mut self) {
            let mut state = self.state.lock().unwrap();
            state.calls.push("flush");
            state.written.clear();
        }
        fn drain(&mut self) -> bool {
            true
        }
        fn write(&mut self, frame: Frame) -> bool {
            let mut state = self.state.lock().unwrap();
            if state.written.len() >= state.capacity {
                return false;
            }
            state.written.push(frame);
            true
        }
        fn delay(&self) -> f64 {
            self.state.lock().unwrap().delay
        }
    }

    #[derive(Default)]
    pub(super) struct VoState {
        pub frames: Vec<Frame>,
        pub has_frame: bool,
        pub config_ok: bool,
        pub redraws: usize,
        pub paused_calls: Vec<bool>,
        pub pending_events: VoEvents,
        pub fullscreen: bool,
    }

    pub(super) struct MockVideoOutput {
        pub state: Arc<Mutex<VoState>>,
    }

    impl VideoOutput for MockVideoOutput {
        fn set_paused(&mut self, paused: bool) {
            self.state.lock().unwrap().paused_calls.push(paused);
        }
        fn reconfig(&mut self, _params: &VideoParams) -> bool {
            self.state.lock().unwrap().config_ok = true;
            true
        }
        fn config_ok(&self) -> bool {
            self.state.lock().unwrap().config_ok
        }
        fn queue_frame(&mut self, frame: Frame) {
            let mut state = self.state.lock().unwrap();
            state.frames.push(frame);
            state.has_frame = true;
        }
        fn has_frame(&self) -> bool {
            self.state.lock().unwrap().has_frame
        }
        fn redraw(&mut self) {
            self.state.lock().unwrap().redraws += 1;
        }
        fn want_redraw(&self) -> bool {
            false
        }
        fn query_formats(&self) -> Vec<PixelFormat> {
            vec![PixelFormat(1)]
        }
        fn query_and_reset_events(&mut self) -> VoEvents {
            std::mem::take(&mut self.state.lock().unwrap().pending_events)
        }
        fn set_cursor_visible(&mut self, _visible: bool) {}
        fn set_screensaver_enabled(&mut self, _enabled: bool) {}
        fn fullscreen(&self) -> bool {
            self.state.lock().unwrap().fullscreen
        }
    }

    pub(super) fn drain_events(rx: &mut Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }
}

fn frames(ptss: &[f64]) -> Vec<DecodePoll> {
    ptss.iter()
        .map(|pts| DecodePoll::Frame(crate::stages::Frame::at(*pts)))
        .collect()
}

struct Player {
    pc: PlayerContext,
    demuxer: Arc<Mutex<DemuxerState>>,
    ao: Arc<Mutex<AoState>>,
    vo: Arc<Mutex<VoState>>,
    audio_log: Arc<Mutex<DecoderLog>>,
    video_log: Arc<Mutex<DecoderLog>>,
}

/// Wire a context with scripted audio and video chains, a demuxer and both
/// outputs, ready for `start_playback`.
fn player_with_av(opts: PlayOpts, audio_pts: &[f64], video_pts: &[f64]) -> Player {
    let mut pc = PlayerContext::new(opts);

    let demuxer = Arc::new(Mutex::new(DemuxerState::default()));
    pc.set_demuxer(Box::new(MockDemuxer {
        state: Arc::clone(&demuxer),
    }));

    let (audio_decoder, _steps, audio_log) = MockDecoder::scripted(frames(audio_pts));
    let audio_track = pc.add_track(Track::new(Box::new(audio_decoder)));
    pc.set_audio_chain(Some(AudioChain::new(audio_track)));

    let (video_decoder, _steps, video_log) = MockDecoder::scripted(frames(video_pts));
    let video_track = pc.add_track(Track::new(Box::new(video_decoder)));
    pc.set_video_chain(Some(VideoChain::new(video_track)));

    let ao = Arc::new(Mutex::new(AoState {
        capacity: 64,
        ..AoState::default()
    }));
    pc.set_audio_output(Some(Box::new(MockAudioOutput {
        state: Arc::clone(&ao),
    })));

    let vo = Arc::new(Mutex::new(VoState::default()));
    pc.set_video_output(Some(Box::new(MockVideoOutput {
        state: Arc::clone(&vo),
    })));

    Player {
        pc,
        demuxer,
        ao,
        vo,
        audio_log,
        video_log,
    }
}

/// Run iterations with an explicit wakeup each time, the way producers would
/// wake the core, so `wait_events` never sleeps its full budget.
fn run_iterations(pc: &mut PlayerContext, count: usize) {
    for _ in 0..count {
        pc.wakeup();
        run_playloop(pc);
    }
}

#[test]
fn clean_start_promotes_both_pipelines_together() {
    let mut player = player_with_av(
        PlayOpts::default(),
        &[0.0, 0.02, 0.04, 0.06],
        &[0.0, 1.0 / 30.0],
    );
    let mut rx = player.pc.subscribe_events();
    player.pc.start_playback();

    run_iterations(&mut player.pc, 6);

    assert!(player.pc.restart_complete());
    assert_eq!(player.pc.video_status(), PipelineStatus::Playing);
    assert_eq!(player.pc.audio_status(), PipelineStatus::Playing);

    let events = drain_events(&mut rx);
    let restarts = events
        .iter()
        .filter(|ev| **ev == PlayerEvent::PlaybackRestart)
        .count();
    assert_eq!(restarts, 1);

    // Audio started and frames flowed to both outputs.
    assert!(player.ao.lock().unwrap().calls.contains(&"resume"));
    assert!(!player.ao.lock().unwrap().written.is_empty());
    assert!(!player.vo.lock().unwrap().frames.is_empty());
}

#[test]
fn precise_seek_latches_hrseek_state() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    queue_seek(
        &mut player.pc,
        SeekTarget::Absolute(42.0),
        SeekPrecision::Exact,
        SeekFlags::NONE,
    );
    execute_queued_seek(&mut player.pc);

    assert!(player.pc.seek.is_none());
    assert!(player.pc.hrseek_active);
    assert_eq!(player.pc.hrseek_pts, Some(42.0));
    assert_eq!(player.pc.last_seek_pts, Some(42.0));
    assert!(player.pc.hrseek_framedrop);

    let seeks = &player.demuxer.lock().unwrap().seeks;
    assert_eq!(seeks.len(), 1);
    let (pts, flags) = seeks[0];
    assert_eq!(pts, 42.0);
    assert!(flags.precise);
    assert!(!flags.forward);

    // Decoders were reset as part of the pipeline reset.
    assert_eq!(player.audio_log.lock().unwrap().resets, 1);
    assert_eq!(player.video_log.lock().unwrap().resets, 1);
}

#[test]
fn cache_underrun_pauses_and_recovers_once() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    player.pc.restart_complete = true;
    player.pc.audio_status = PipelineStatus::Playing;
    player.pc.video_status = PipelineStatus::Playing;
    {
        let mut demuxer = player.demuxer.lock().unwrap();
        demuxer.is_network = true;
        demuxer.reader.idle = false;
        demuxer.reader.underrun = true;
        demuxer.reader.ts_duration = Some(0.0);
    }
    let mut rx = player.pc.subscribe_events();

    crate::cache::handle_pause_on_low_cache(&mut player.pc);
    crate::cache::handle_pause_on_low_cache(&mut player.pc);
    assert!(player.pc.paused_for_cache);
    assert!(player.pc.is_paused());
    assert!(player.ao.lock().unwrap().calls.contains(&"pause"));
    assert!(player.pc.cache_buffer < 100);

    {
        let mut demuxer = player.demuxer.lock().unwrap();
        demuxer.reader.underrun = false;
        demuxer.reader.ts_duration = Some(2.0);
    }
    crate::cache::handle_pause_on_low_cache(&mut player.pc);
    crate::cache::handle_pause_on_low_cache(&mut player.pc);
    assert!(!player.pc.paused_for_cache);
    assert!(!player.pc.is_paused());
    assert_eq!(player.pc.cache_buffer, 100);

    let events = drain_events(&mut rx);
    let pauses = events.iter().filter(|ev| **ev == PlayerEvent::Pause).count();
    let unpauses = events
        .iter()
        .filter(|ev| **ev == PlayerEvent::Unpause)
        .count();
    assert_eq!((pauses, unpauses), (1, 1));
}

#[test]
fn keep_open_reverts_eof_and_fetches_last_frame() {
    let mut opts = PlayOpts::default();
    opts.keep_open = KeepOpen::Yes;
    let mut player = player_with_av(opts, &[], &[]);
    player.pc.audio_status = PipelineStatus::Eof;
    player.pc.video_status = PipelineStatus::Eof;
    player.pc.last_vo_pts = Some(59.9);

    handle_eof(&mut player.pc);
    assert_eq!(player.pc.stop_play, StopReason::AtEndOfFile);

    handle_loop_file(&mut player.pc);
    handle_keep_open(&mut player.pc);

    assert_eq!(player.pc.stop_play, StopReason::KeepPlaying);
    // No frame was displayable: a very-exact seek to the end went out and
    // the hr-seek machinery was told to keep whatever last frame it finds.
    assert!(player.pc.hrseek_lastframe);
    assert_eq!(player.pc.hrseek_pts, Some(f64::INFINITY));
    let seeks = &player.demuxer.lock().unwrap().seeks;
    assert_eq!(seeks.len(), 1);
    // 60.0 end biased by the very-exact demuxer slack.
    assert!((seeks[0].0 - 59.5).abs() < 1e-9);
    assert_eq!(player.pc.playback_pts, Some(59.9));
    assert!(player.pc.is_paused());
}

#[test]
fn ab_loop_wraps_without_flushing_audio() {
    let mut opts = PlayOpts::default();
    opts.ab_loop = [Some(10.0), Some(20.0)];
    let mut player = player_with_av(opts, &[], &[]);
    player.pc.stop_play = StopReason::AtEndOfFile;

    handle_loop_file(&mut player.pc);
    assert_eq!(player.pc.stop_play, StopReason::KeepPlaying);
    let pending = player.pc.seek.expect("loop seek queued");
    assert_eq!(pending.target, SeekTarget::Absolute(10.0));
    assert_eq!(pending.precision, SeekPrecision::Exact);
    assert!(pending.flags.no_flush);

    execute_queued_seek(&mut player.pc);
    assert!(!player.ao.lock().unwrap().calls.contains(&"flush"));
    assert!(player.pc.ab_loop_clip);
    assert_eq!(player.pc.last_seek_pts, Some(10.0));
}

#[test]
fn backstep_targets_the_current_position() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    player.pc.playback_pts = Some(5.0);

    queue_seek(
        &mut player.pc,
        SeekTarget::Backstep,
        SeekPrecision::VeryExact,
        SeekFlags::NONE,
    );
    execute_queued_seek(&mut player.pc);

    assert!(player.pc.hrseek_active);
    assert!(player.pc.hrseek_backstep);
    assert_eq!(player.pc.hrseek_pts, Some(5.0));
    // Framedrop is disabled for very-exact seeks.
    assert!(!player.pc.hrseek_framedrop);
    let seeks = &player.demuxer.lock().unwrap().seeks;
    assert_eq!(seeks.len(), 1);
    assert!((seeks[0].0 - 4.5).abs() < 1e-9);
}

#[test]
fn failed_seek_still_clears_the_pending_request() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    player.demuxer.lock().unwrap().accept_seeks = false;
    queue_seek(
        &mut player.pc,
        SeekTarget::Absolute(10.0),
        SeekPrecision::Default,
        SeekFlags::NONE,
    );
    execute_queued_seek(&mut player.pc);
    assert!(player.pc.seek.is_none());
}

#[test]
fn cross_thread_work_reaches_the_context() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    let handle = player.pc.wakeup_handle();
    let worker = std::thread::spawn(move || {
        handle.run(|pc| {
            queue_seek(
                pc,
                SeekTarget::Absolute(30.0),
                SeekPrecision::Default,
                SeekFlags::NONE,
            );
        });
    });
    worker.join().unwrap();
    player.pc.set_timeout(5.0);
    player.pc.wait_events();
    let pending = player.pc.seek.expect("seek queued via dispatch");
    assert_eq!(pending.target, SeekTarget::Absolute(30.0));
}

#[test]
fn force_window_creates_and_configures_a_vo() {
    let mut opts = PlayOpts::default();
    opts.force_window = nocturne_core::ForceWindow::Always;
    let mut pc = PlayerContext::new(opts);
    let vo_state = Arc::new(Mutex::new(VoState::default()));
    let factory_state = Arc::clone(&vo_state);
    pc.set_video_output_factory(Some(Box::new(move |_handle| {
        Some(Box::new(MockVideoOutput {
            state: Arc::clone(&factory_state),
        }) as Box<dyn crate::stages::VideoOutput>)
    })));
    let mut rx = pc.subscribe_events();

    crate::window::handle_force_window(&mut pc, true);

    let state = vo_state.lock().unwrap();
    assert!(state.config_ok);
    assert!(state.paused_calls.contains(&true));
    assert_eq!(state.redraws, 1);
    drop(state);
    let events = drain_events(&mut rx);
    assert!(events.contains(&PlayerEvent::VideoReconfig));
}

#[test]
fn force_window_failure_disables_the_option() {
    let mut opts = PlayOpts::default();
    opts.force_window = nocturne_core::ForceWindow::Always;
    let mut pc = PlayerContext::new(opts);
    // No factory installed: creation must fail and turn the option off.
    crate::window::handle_force_window(&mut pc, true);
    assert_eq!(pc.opts().force_window, nocturne_core::ForceWindow::No);
    assert!(pc.vo.is_none());
}

#[test]
fn eof_waits_while_paused_on_the_last_frame() {
    let mut player = player_with_av(PlayOpts::default(), &[], &[]);
    player.pc.audio_status = PipelineStatus::Eof;
    player.pc.video_status = PipelineStatus::Eof;
    player.pc.paused = true;
    player.vo.lock().unwrap().has_frame = true;

    handle_eof(&mut player.pc);
    assert_eq!(player.pc.stop_play, StopReason::KeepPlaying);

    player.pc.paused = false;
    handle_eof(&mut player.pc);
    assert_eq!(player.pc.stop_play, StopReason::AtEndOfFile);
}
