//! The video writer: pulls decoded frames, paces them against the frame-time
//! accumulator and hands them to the video output. Advances `video_status`,
//! consumes frame-steps, honors hr-seek targets (including backstep and
//! keep-last-frame) and clips at the AB-loop B endpoint.

use crate::context::{PipelineStatus, PlayerContext, VideoChain};
use crate::stages::DecodePoll;

/// Assumed frame duration when PTS are missing or non-monotonic.
const FALLBACK_FRAME_DURATION: f64 = 1.0 / 60.0;
/// Anything longer is treated as a timestamp discontinuity.
const MAX_FRAME_DURATION: f64 = 10.0;

pub(crate) fn write_video(pc: &mut PlayerContext) {
    let Some(mut chain) = pc.video_chain.take() else {
        return;
    };
    if pc.vo.is_some() {
        match pc.video_status {
            PipelineStatus::Syncing => sync_video(pc, &mut chain),
            PipelineStatus::Playing => advance_video(pc, &mut chain),
            _ => {}
        }
    }
    pc.video_chain = Some(chain);
}

enum SyncOutcome {
    Wait,
    Ready,
    Eof,
}

/// Decode toward the start/seek target. During an hr-seek, frames before the
/// target roll through `pending` so the most recent one survives for
/// backstep and keep-last-frame handling.
fn sync_video(pc: &mut PlayerContext, chain: &mut VideoChain) {
    let hrseek_target = if pc.hrseek_active { pc.hrseek_pts } else { None };
    let mut outcome = SyncOutcome::Wait;

    match pc
        .tracks
        .get_mut(chain.track)
        .and_then(|track| track.decoder.as_mut())
    {
        Some(decoder) => loop {
            decoder.work();
            match decoder.poll_frame() {
                DecodePoll::Frame(frame) => {
                    if let (Some(target), Some(pts)) = (hrseek_target, frame.pts) {
                        if pts < target {
                            chain.pending = Some(frame);
                            continue;
                        }
                        // Backstep wants the frame just before the target.
                        if pc.hrseek_backstep && chain.pending.is_some() {
                            outcome = SyncOutcome::Ready;
                            break;
                        }
                    }
                    chain.pending = Some(frame);
                    outcome = SyncOutcome::Ready;
                    break;
                }
                DecodePoll::Starved => break,
                DecodePoll::Eof => {
                    if pc.hrseek_lastframe && chain.pending.is_some() {
                        // Keep whatever last frame the stream had.
                        outcome = SyncOutcome::Ready;
                    } else {
                        chain.pending = None;
                        outcome = SyncOutcome::Eof;
                    }
                    break;
                }
            }
        },
        None => outcome = SyncOutcome::Eof,
    }

    match outcome {
        SyncOutcome::Wait => {}
        SyncOutcome::Ready => {
            pc.video_status = PipelineStatus::Ready;
            pc.wakeup();
        }
        SyncOutcome::Eof => {
            pc.video_status = PipelineStatus::Eof;
            pc.wakeup();
        }
    }
}

fn advance_video(pc: &mut PlayerContext, chain: &mut VideoChain) {
    if pc.paused {
        return;
    }
    let elapsed = pc.relative_time();
    pc.time_frame -= elapsed;

    let mut eof = false;
    if chain.pending.is_none() {
        match pc
            .tracks
            .get_mut(chain.track)
            .and_then(|track| track.decoder.as_mut())
        {
            Some(decoder) => {
                decoder.work();
                match decoder.poll_frame() {
                    DecodePoll::Frame(frame) => chain.pending = Some(frame),
                    DecodePoll::Starved => {}
                    DecodePoll::Eof => eof = true,
                }
            }
            None => eof = true,
        }
    }

    // Stop at the AB-loop B endpoint; the loop handler turns the resulting
    // EOF into a seek back to A.
    if pc.ab_loop_clip {
        if let (Some(frame), Some(b)) = (chain.pending, pc.opts.ab_loop[1]) {
            if frame.pts.is_some_and(|pts| pts >= b) {
                chain.pending = None;
                eof = true;
            }
        }
    }

    if let Some(frame) = chain.pending {
        if pc.max_frames == Some(0) {
            pc.video_status = PipelineStatus::Eof;
            pc.wakeup();
            return;
        }
        if pc.time_frame > 1e-6 {
            let due_in = pc.time_frame;
            pc.set_timeout(due_in);
            return;
        }

        if let Some(vo) = pc.vo.as_mut() {
            vo.queue_frame(frame);
        }
        let duration = match (frame.pts, pc.video_pts) {
            (Some(new), Some(prev)) if new > prev => (new - prev).min(MAX_FRAME_DURATION),
            _ => FALLBACK_FRAME_DURATION,
        };
        pc.time_frame += duration;
        pc.video_pts = frame.pts.or(pc.video_pts);
        pc.last_vo_pts = frame.pts.or(pc.last_vo_pts);
        chain.pending = None;
        if let Some(remaining) = pc.max_frames {
            pc.max_frames = Some(remaining.saturating_sub(1));
        }
        if chain.is_cover_art {
            // A still image is shown once and never gates EOF afterwards.
            pc.video_status = PipelineStatus::Eof;
        }
        if pc.step_frames > 0 {
            pc.step_frames -= 1;
            if pc.step_frames == 0 {
                crate::pause::set_pause_state(pc, true);
            }
        }
        pc.wakeup();
    } else if eof {
        pc.video_status = PipelineStatus::Eof;
        pc.wakeup();
    }
}
