//! End-of-file handling and everything that can override it: AB-loops,
//! whole-file loops, keep-open and fixed-interval stepping.

use tracing::debug;

use nocturne_core::{KeepOpen, LoopSetting, SeekFlags, SeekPrecision, SeekRequest, SeekTarget};

use crate::context::{PipelineStatus, PlayerContext, StopReason};
use crate::osd::{set_osd_function, OsdFunction};
use crate::pause::set_pause_state;
use crate::seek::queue_seek;
use crate::timeline::get_time_length;

/// Signal end of file once both pipelines are done, unless we're paused
/// showing the last video frame (then the user probably wants to stay).
pub(crate) fn handle_eof(pc: &mut PlayerContext) {
    let showing_last_frame =
        pc.paused && pc.vo.as_ref().is_some_and(|vo| vo.has_frame());
    let any_chain = pc.audio_chain.is_some() || pc.video_chain.is_some();
    if any_chain
        && !showing_last_frame
        && pc.audio_status == PipelineStatus::Eof
        && pc.video_status == PipelineStatus::Eof
        && pc.stop_play == StopReason::KeepPlaying
    {
        pc.stop_play = StopReason::AtEndOfFile;
    }
}

/// Convert a pending EOF into a loop seek. AB-loops take priority over
/// whole-file loops.
pub(crate) fn handle_loop_file(pc: &mut PlayerContext) {
    if pc.stop_play == StopReason::AtEndOfFile && !pc.opts.ab_loop_disabled() {
        // The queued seek executes before the next decode attempt, so
        // reverting stop_play here is safe.
        pc.stop_play = StopReason::KeepPlaying;
        let start = pc.opts.ab_loop[0].unwrap_or(0.0);
        queue_seek(
            pc,
            SeekTarget::Absolute(start),
            SeekPrecision::Exact,
            SeekFlags {
                delay: false,
                no_flush: true,
            },
        );
        debug!(start, "ab-loop wrap");
        return;
    }

    if pc.opts.loop_file != LoopSetting::Off && pc.stop_play == StopReason::AtEndOfFile {
        pc.stop_play = StopReason::KeepPlaying;
        set_osd_function(pc, OsdFunction::FastForward);
        queue_seek(
            pc,
            SeekTarget::Absolute(0.0),
            SeekPrecision::Default,
            SeekFlags {
                delay: false,
                no_flush: true,
            },
        );
        if let LoopSetting::Count(n) = pc.opts.loop_file {
            pc.opts.loop_file = if n > 1 {
                LoopSetting::Count(n - 1)
            } else {
                LoopSetting::Off
            };
        }
    }
}

/// Seek approximately to the end of the file and let the hr-seek machinery
/// retain whatever last frame it finds.
pub fn seek_to_last_frame(pc: &mut PlayerContext) {
    if pc.video_chain.is_none() {
        return;
    }
    if pc.hrseek_lastframe {
        // Already tried; don't loop on it.
        return;
    }
    let Some(end) = pc.opts.play_end.or_else(|| get_time_length(pc)) else {
        return;
    };
    debug!(end, "seeking to last frame");
    let result = crate::seek::seek(
        pc,
        SeekRequest::new(
            SeekTarget::Absolute(end),
            SeekPrecision::VeryExact,
            SeekFlags::NONE,
        ),
    );
    if result.is_err() {
        return;
    }
    // Stop only when the final frame is reached, wherever that is.
    if pc.hrseek_active {
        pc.hrseek_pts = Some(f64::INFINITY);
        pc.hrseek_lastframe = true;
    }
}

/// Keep the window open on the last frame instead of ending the file.
pub(crate) fn handle_keep_open(pc: &mut PlayerContext) {
    let last_entry = pc.opts.keep_open == KeepOpen::Always
        || !pc.playlist.as_ref().is_some_and(|playlist| playlist.has_next());
    if pc.opts.keep_open != KeepOpen::No
        && pc.stop_play == StopReason::AtEndOfFile
        && last_entry
        && pc.opts.loop_times == 1
    {
        pc.stop_play = StopReason::KeepPlaying;
        if pc.video_chain.is_some() {
            let has_frame = pc.vo.as_ref().is_some_and(|vo| vo.has_frame());
            if !has_frame {
                // EOF was reached without a displayable frame (seek past the
                // end); fetch the real last frame.
                seek_to_last_frame(pc);
            }
            pc.playback_pts = pc.last_vo_pts;
        }
        if pc.opts.keep_open_pause {
            set_pause_state(pc, true);
        }
    }
}

/// Fixed-interval stepping and frame-step bookkeeping at EOF.
pub(crate) fn handle_sstep(pc: &mut PlayerContext) {
    if pc.stop_play != StopReason::KeepPlaying || !pc.restart_complete {
        return;
    }

    if pc.opts.step_sec > 0.0 && !pc.paused {
        set_osd_function(pc, OsdFunction::FastForward);
        let step = pc.opts.step_sec;
        queue_seek(
            pc,
            SeekTarget::Relative(step),
            SeekPrecision::Default,
            SeekFlags::NONE,
        );
    }

    if pc.video_status >= PipelineStatus::Eof {
        // With a frame budget, end the file even if audio remains.
        if pc.opts.play_frames.is_some() && pc.stop_play == StopReason::KeepPlaying {
            pc.stop_play = StopReason::AtEndOfFile;
        }
        if pc.step_frames > 0 && !pc.paused {
            set_pause_state(pc, true);
        }
    }
}
