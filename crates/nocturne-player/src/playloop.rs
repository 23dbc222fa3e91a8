//! The playloop dispatcher: one iteration runs the handlers in a fixed
//! order, sleeps once on the dispatch queue, and finishes by executing any
//! queued seek so it takes effect on a clean next iteration.

use tracing::warn;

use nocturne_core::{Command, PlayerEvent};

use crate::audio::{fill_audio_out_buffers, playing_audio_pts};
use crate::cache::handle_pause_on_low_cache;
use crate::context::{PipelineStatus, PlayerContext, StopReason};
use crate::loops::{handle_eof, handle_keep_open, handle_loop_file, handle_sstep};
use crate::osd::{handle_osd_redraw, update_osd_msg};
use crate::pause::{add_step_frame, set_pause_state};
use crate::restart::handle_playback_restart;
use crate::seek::{execute_queued_seek, queue_seek};
use crate::stages::{DecodePoll, StreamStatus};
use crate::timeline::handle_chapter_change;
use crate::video::write_video;
use crate::window::{handle_cursor_autohide, handle_force_window, handle_vo_events};

/// Interval for the synthetic tick emitted while paused or at EOF, so
/// observers keep getting time updates.
const DUMMY_TICK_INTERVAL: f64 = 0.050;

/// Run one playloop iteration. The only blocking point is the dispatch wait;
/// every handler polls and returns.
pub fn run_playloop(pc: &mut PlayerContext) {
    pc.in_playloop = true;
    run_playloop_iteration(pc);
    pc.in_playloop = false;
}

/// Drive the playloop until a terminal stop reason is signalled.
pub fn run_until_stopped(pc: &mut PlayerContext) -> StopReason {
    while pc.stop_play == StopReason::KeepPlaying {
        run_playloop(pc);
    }
    pc.stop_play
}

fn run_playloop_iteration(pc: &mut PlayerContext) {
    if pc.encoder.as_ref().is_some_and(|encoder| encoder.did_fail()) {
        warn!("encoder failed, quitting");
        pc.stop_play = StopReason::Quit;
        return;
    }

    update_demuxer_properties(pc);

    handle_complex_filter_decoders(pc);

    handle_cursor_autohide(pc);
    handle_vo_events(pc);

    if pc.filter_graph.is_some() {
        let progressed = pc
            .filter_graph
            .as_mut()
            .map(|graph| graph.process())
            .unwrap_or(false);
        if progressed {
            pc.wakeup();
        }
        if pc
            .filter_graph
            .as_ref()
            .is_some_and(|graph| graph.has_failed())
        {
            pc.stop_play = StopReason::AtEndOfFile;
        }
    }

    fill_audio_out_buffers(pc);
    write_video(pc);

    handle_playback_restart(pc);

    handle_playback_time(pc);

    handle_dummy_ticks(pc);

    update_osd_msg(pc);
    if pc.video_status == PipelineStatus::Eof {
        let pts = pc.playback_pts;
        if let Some(subtitles) = pc.subtitles.as_mut() {
            subtitles.update(pts);
        }
    }

    handle_eof(pc);

    handle_loop_file(pc);

    handle_keep_open(pc);

    handle_sstep(pc);

    pc.update_core_idle_state();

    if pc.stop_play != StopReason::KeepPlaying {
        return;
    }

    handle_osd_redraw(pc);

    pc.wait_events();

    handle_pause_on_low_cache(pc);

    process_input(pc);

    handle_chapter_change(pc);

    handle_force_window(pc, false);

    execute_queued_seek(pc);
}

/// Update the authoritative playback time from whichever pipeline leads.
/// Cover art never drives the clock.
pub(crate) fn handle_playback_time(pc: &mut PlayerContext) {
    let real_video = pc
        .video_chain
        .as_ref()
        .is_some_and(|chain| !chain.is_cover_art);
    if real_video
        && pc.video_status >= PipelineStatus::Playing
        && pc.video_status < PipelineStatus::Eof
    {
        pc.playback_pts = pc.video_pts;
    } else if pc.audio_status >= PipelineStatus::Playing
        && pc.audio_status < PipelineStatus::Eof
    {
        pc.playback_pts = playing_audio_pts(pc);
    }
}

/// Observers assume ticks keep coming; synthesize them while paused or at
/// EOF when no frame traffic produces real ones.
pub(crate) fn handle_dummy_ticks(pc: &mut PlayerContext) {
    let inert = matches!(
        pc.video_status,
        PipelineStatus::Eof | PipelineStatus::Absent
    ) || pc.paused;
    if inert && pc.now() - pc.last_idle_tick > DUMMY_TICK_INTERVAL {
        pc.last_idle_tick = pc.now();
        pc.notify(PlayerEvent::Tick);
    }
}

/// Refresh demuxer-derived properties the loop mirrors (the chapter list).
fn update_demuxer_properties(pc: &mut PlayerContext) {
    let Some(demuxer) = pc.demuxer.as_ref() else {
        return;
    };
    let chapters = demuxer.chapters();
    if chapters.len() != pc.chapters.len() {
        pc.chapters = chapters;
        pc.wakeup();
    }
}

/// Feed each selected track's decoder output into its filter-graph sink.
fn handle_complex_filter_decoders(pc: &mut PlayerContext) {
    let PlayerContext {
        filter_graph,
        tracks,
        ..
    } = pc;
    let Some(graph) = filter_graph.as_mut() else {
        return;
    };
    for (index, track) in tracks.iter_mut().enumerate() {
        if !track.selected || !graph.needs_input(index) {
            continue;
        }
        let Some(decoder) = track.decoder.as_mut() else {
            continue;
        };
        decoder.work();
        match decoder.poll_frame() {
            DecodePoll::Frame(frame) => graph.send_frame(index, frame),
            DecodePoll::Starved => graph.send_status(index, StreamStatus::Starved),
            DecodePoll::Eof => graph.send_status(index, StreamStatus::Eof),
        }
    }
}

/// Drain queued input and client commands, then arm the input-delay timer.
pub(crate) fn process_input(pc: &mut PlayerContext) {
    loop {
        let command = match pc.input.as_mut() {
            Some(input) => input.read_command(),
            None => None,
        };
        let Some(command) = command else { break };
        run_command(pc, command);
    }
    let delay = pc
        .input
        .as_ref()
        .map(|input| input.queue_delay())
        .unwrap_or(f64::INFINITY);
    pc.set_timeout(delay);
}

fn run_command(pc: &mut PlayerContext, command: Command) {
    match command {
        Command::Seek {
            target,
            precision,
            flags,
        } => queue_seek(pc, target, precision, flags),
        Command::SetPause { pause } => set_pause_state(pc, pause),
        Command::TogglePause => {
            let pause = !pc.opts.pause;
            set_pause_state(pc, pause);
        }
        Command::FrameStep => add_step_frame(pc, 1),
        Command::FrameBackStep => add_step_frame(pc, -1),
        Command::Quit => pc.stop_play = StopReason::Quit,
    }
}

/// A trimmed playloop used while no file is playing.
fn idle(pc: &mut PlayerContext) {
    handle_dummy_ticks(pc);
    pc.wait_events();
    process_input(pc);
    handle_cursor_autohide(pc);
    handle_vo_events(pc);
    update_osd_msg(pc);
    handle_osd_redraw(pc);
}

/// Wait for a playlist entry to play. On entry the audio output is torn
/// down, a window is forced if configured, and `Idle` is announced once.
pub fn idle_loop(pc: &mut PlayerContext) {
    let mut need_reinit = true;
    while pc.opts.player_idle_mode
        && !pc
            .playlist
            .as_ref()
            .is_some_and(|playlist| playlist.has_current())
        && pc.stop_play != StopReason::Quit
    {
        if need_reinit {
            pc.ao = None;
            handle_force_window(pc, true);
            pc.wakeup();
            pc.notify(PlayerEvent::Idle);
            need_reinit = false;
        }
        idle(pc);
    }
}

#[cfg(test)]
#[path = "tests/playloop_scenarios.rs"]
mod playloop_scenarios;
