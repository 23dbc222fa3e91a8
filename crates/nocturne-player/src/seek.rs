//! The seek request queue and its executor.
//!
//! Seeking is two-phase: requests from any source are coalesced into the
//! context's pending slot by [`queue_seek`], and the playloop executes the
//! merged request at a safe point via [`execute_queued_seek`]. The executor
//! resolves the target to demuxer coordinates, decides between keyframe and
//! high-resolution seeking, seeks external tracks, and resets the pipelines.

use tracing::{debug, warn};

use nocturne_core::{
    HrSeekMode, PlayerEvent, SeekFlags, SeekPrecision, SeekRequest, SeekTarget,
};

use crate::context::{PipelineStatus, PlayerContext, StopReason};
use crate::error::SeekError;
use crate::stages::DemuxSeekFlags;
use crate::timeline::{get_current_time, get_time_length};

/// Window after a seek during which delayed requests stay queued so one
/// frame from the previous target can be shown first.
const SEEK_COALESCE_WINDOW: f64 = 0.3;

/// Extra demuxer slack applied to very-exact seeks regardless of the
/// configured offset; compensates for demuxers with bad keyframe placement.
const VERY_EXACT_DEMUX_SLACK: f64 = 0.5;

/// Merge a new seek request into the pending slot.
///
/// Relative requests sum with a pending relative request and raise its
/// precision to the stricter of the two; a pending absolute target is kept
/// as-is apart from flag merging, and a pending factor request drops the
/// newcomer outright (coalescing against a proportional target is not
/// meaningful). Absolute, factor and backstep requests replace whatever is
/// pending.
pub fn queue_seek(
    pc: &mut PlayerContext,
    target: SeekTarget,
    precision: SeekPrecision,
    flags: SeekFlags,
) {
    pc.wakeup();

    if pc.stop_play == StopReason::AtEndOfFile {
        pc.stop_play = StopReason::KeepPlaying;
    }

    match target {
        SeekTarget::Relative(amount) => match pc.seek.as_mut() {
            Some(pending) => match pending.target {
                SeekTarget::Factor(_) => {}
                SeekTarget::Absolute(_) => {
                    pending.flags = pending.flags.union(flags);
                    pending.precision = pending.precision.max(precision);
                }
                SeekTarget::Relative(prev) => {
                    pending.target = SeekTarget::Relative(prev + amount);
                    pending.flags = pending.flags.union(flags);
                    pending.precision = pending.precision.max(precision);
                }
                SeekTarget::Backstep => {
                    // A backstep is a zero-length relative seek for merging.
                    pending.target = SeekTarget::Relative(amount);
                    pending.flags = pending.flags.union(flags);
                    pending.precision = pending.precision.max(precision);
                }
            },
            None => {
                pc.seek = Some(SeekRequest::new(target, precision, flags));
            }
        },
        SeekTarget::Absolute(_) | SeekTarget::Factor(_) | SeekTarget::Backstep => {
            pc.seek = Some(SeekRequest::new(target, precision, flags));
        }
    }
}

/// Drop the pending seek without executing it.
pub fn cancel_queued_seek(pc: &mut PlayerContext) {
    pc.seek = None;
}

/// Execute the pending seek if its delay window has passed.
pub fn execute_queued_seek(pc: &mut PlayerContext) {
    let Some(request) = pc.seek else { return };

    // An explicitly imprecise request cancels a precise seek in flight:
    // void the delay window so it runs immediately.
    if pc.hrseek_active && request.precision == SeekPrecision::Keyframe {
        pc.start_timestamp = -1e9;
    }

    // During continuous seeking (arrow key held down), finish showing one
    // frame from the previous target before seeking again.
    if request.flags.delay
        && pc.video_status < PipelineStatus::Playing
        && pc.now() - pc.start_timestamp < SEEK_COALESCE_WINDOW
    {
        return;
    }

    if let Err(err) = seek(pc, request) {
        warn!(?request, %err, "seek not executed");
    }
    pc.seek = None;
}

/// The seek executor: resolve the target, drive the demuxers, reset the
/// pipelines and latch hr-seek state.
pub(crate) fn seek(pc: &mut PlayerContext, request: SeekRequest) -> Result<(), SeekError> {
    let Some(demuxer) = pc.demuxer.as_ref() else {
        return Err(SeekError::NoDemuxer);
    };
    let ts_resets_possible = demuxer.ts_resets_possible();
    let seekable = demuxer.seekable();

    let mut hr_seek_very_exact = request.precision == SeekPrecision::VeryExact;
    let current_time = get_current_time(pc);
    if current_time.is_none() && matches!(request.target, SeekTarget::Relative(_)) {
        return Err(SeekError::UnknownTarget);
    }
    let current_time = current_time.unwrap_or(0.0);

    let mut demux_flags = DemuxSeekFlags::default();
    let seek_pts: Option<f64> = match request.target {
        SeekTarget::Absolute(pts) => Some(pts),
        SeekTarget::Backstep => {
            hr_seek_very_exact = true;
            Some(current_time)
        }
        SeekTarget::Relative(amount) => {
            demux_flags.forward = amount > 0.0;
            Some(current_time + amount)
        }
        SeekTarget::Factor(fraction) => get_time_length(pc).map(|len| fraction * len),
    };

    let mut demux_pts = seek_pts;

    let hr_seek = pc.opts.correct_pts
        && request.precision != SeekPrecision::Keyframe
        && seek_pts.is_some()
        && ((pc.opts.hr_seek == HrSeekMode::AbsoluteOnly
            && matches!(request.target, SeekTarget::Absolute(_)))
            || pc.opts.hr_seek == HrSeekMode::Always
            || request.precision >= SeekPrecision::Exact);

    // A backward, proportional or before-last-chapter jump invalidates the
    // chapter-seek anchor.
    let backward = match request.target {
        SeekTarget::Relative(amount) => amount < 0.0,
        SeekTarget::Absolute(pts) => pts < 0.0,
        _ => false,
    };
    let before_last_chapter = matches!(
        (request.target, pc.last_chapter_pts),
        (SeekTarget::Absolute(pts), Some(chapter_pts)) if pts < chapter_pts
    );
    if matches!(request.target, SeekTarget::Factor(_)) || backward || before_last_chapter {
        pc.last_chapter_seek = -2;
    }

    // Prefer a proportional demuxer seek when timestamps are unreliable.
    if let SeekTarget::Factor(fraction) = request.target {
        if !hr_seek && (ts_resets_possible || seek_pts.is_none()) {
            demux_pts = Some(fraction);
            demux_flags.factor = true;
        }
    }

    if hr_seek {
        let mut offset = pc.opts.hr_seek_demuxer_offset;
        if hr_seek_very_exact {
            offset = offset.max(VERY_EXACT_DEMUX_SLACK);
        }
        for track in &pc.tracks {
            if !track.is_external {
                offset = offset.max(-track.seek_offset);
            }
        }
        demux_pts = demux_pts.map(|pts| pts - offset);
        demux_flags.precise = true;
        demux_flags.forward = false;
    }

    let Some(demux_target) = demux_pts else {
        return Err(SeekError::UnknownTarget);
    };

    if !seekable {
        demux_flags.cached = true;
    }
    if let Some(demuxer) = pc.demuxer.as_mut() {
        if !demuxer.seek(demux_target, demux_flags) {
            return Err(SeekError::Unseekable);
        }
    }

    // Seek selected external tracks to the same target. External tracks
    // always get their own offset applied; hr-seek compensation only covers
    // the main demuxer.
    for track in pc.tracks.iter_mut() {
        if !(track.selected && track.is_external) {
            continue;
        }
        let Some(track_demuxer) = track.demuxer.as_mut() else {
            continue;
        };
        let mut pos = demux_target + track.seek_offset;
        if demux_flags.factor {
            match seek_pts {
                Some(pts) => pos = pts,
                None => continue,
            }
        }
        track_demuxer.seek(pos, DemuxSeekFlags::default());
    }

    if !request.flags.no_flush {
        crate::audio::clear_audio_output_buffers(pc);
    }

    reset_playback_state(pc);

    if let Some(recorder) = pc.recorder.as_mut() {
        recorder.mark_discontinuity();
    }

    // The target acts as "current position" for further relative seeks until
    // a frame from the new position has been decoded.
    pc.last_seek_pts = seek_pts;

    if hr_seek {
        pc.hrseek_active = true;
        pc.hrseek_framedrop = !hr_seek_very_exact && pc.opts.hr_seek_framedrop;
        pc.hrseek_backstep = matches!(request.target, SeekTarget::Backstep);
        pc.hrseek_pts = seek_pts;
        debug!(
            pts = ?pc.hrseek_pts,
            framedrop = pc.hrseek_framedrop,
            backstep = pc.hrseek_backstep,
            "hr-seek latched"
        );
    }

    if pc.stop_play == StopReason::AtEndOfFile {
        pc.stop_play = StopReason::KeepPlaying;
    }

    pc.start_timestamp = pc.now();
    pc.wakeup();
    pc.notify(PlayerEvent::Seek);
    pc.notify(PlayerEvent::Tick);

    // A backward keyframe seek may land past the target; let the audio
    // pipeline retry once if it overshot.
    pc.audio_allow_second_chance_seek = !hr_seek && !demux_flags.forward;

    pc.ab_loop_clip = match (pc.last_seek_pts, pc.opts.ab_loop[1]) {
        (Some(pts), Some(b)) => pts < b,
        _ => false,
    };

    pc.current_seek = Some(request);
    Ok(())
}

/// Clear per-file playback state after a seek or on file load: drain the
/// filter graph, reset decoders and chains, and forget hr-seek latches.
pub fn reset_playback_state(pc: &mut PlayerContext) {
    if let Some(graph) = pc.filter_graph.as_mut() {
        graph.seek_reset();
    }
    for track in pc.tracks.iter_mut() {
        if let Some(decoder) = track.decoder.as_mut() {
            decoder.reset();
        }
    }

    if let Some(chain) = pc.audio_chain.as_mut() {
        chain.pending = None;
        chain.last_pts = None;
    }
    if let Some(chain) = pc.video_chain.as_mut() {
        chain.pending = None;
    }
    pc.audio_status = if pc.audio_chain.is_some() {
        PipelineStatus::Syncing
    } else {
        PipelineStatus::Eof
    };
    pc.video_status = if pc.video_chain.is_some() {
        PipelineStatus::Syncing
    } else {
        PipelineStatus::Eof
    };
    pc.video_pts = None;
    pc.time_frame = 0.0;

    if let Some(subtitles) = pc.subtitles.as_mut() {
        subtitles.reset();
    }

    pc.hrseek_active = false;
    pc.hrseek_framedrop = false;
    pc.hrseek_lastframe = false;
    pc.hrseek_backstep = false;
    pc.hrseek_pts = None;
    pc.current_seek = None;
    pc.playback_pts = None;
    pc.last_seek_pts = None;
    pc.step_frames = 0;
    pc.ab_loop_clip = true;
    pc.restart_complete = false;

    if let Some(encoder) = pc.encoder.as_mut() {
        encoder.discontinuity();
    }

    pc.update_core_idle_state();
}
