//! The audio feeder: pulls decoded frames and drives the audio output,
//! advancing `audio_status` from syncing through playing to EOF. The control
//! core only routes frames and timestamps; samples live behind the
//! [`AudioOutput`](crate::stages::AudioOutput) trait.

use tracing::debug;

use crate::context::{AudioChain, PipelineStatus, PlayerContext};
use crate::stages::DecodePoll;

/// Tolerance before a keyframe seek counts as having overshot the target.
const SECOND_CHANCE_SLACK: f64 = 0.5;

pub(crate) fn clear_audio_output_buffers(pc: &mut PlayerContext) {
    if let Some(ao) = pc.ao.as_mut() {
        ao.flush();
    }
}

/// Audio position as heard: PTS of the last queued frame minus the output's
/// buffered delay.
pub(crate) fn playing_audio_pts(pc: &PlayerContext) -> Option<f64> {
    let chain = pc.audio_chain.as_ref()?;
    let last = chain.last_pts?;
    let delay = pc.ao.as_ref().map(|ao| ao.delay()).unwrap_or(0.0);
    Some(last - delay)
}

/// One feeder step, run every playloop iteration.
pub(crate) fn fill_audio_out_buffers(pc: &mut PlayerContext) {
    let Some(mut chain) = pc.audio_chain.take() else {
        return;
    };
    if pc.ao.is_some() {
        match pc.audio_status {
            PipelineStatus::Syncing => sync_toward_target(pc, &mut chain),
            PipelineStatus::Playing if !pc.paused => push_to_output(pc, &mut chain),
            PipelineStatus::Draining => {
                let drained = pc.ao.as_mut().map(|ao| ao.drain()).unwrap_or(true);
                if drained {
                    pc.audio_status = PipelineStatus::Eof;
                    pc.wakeup();
                }
            }
            _ => {}
        }
    }
    pc.audio_chain = Some(chain);
}

/// Promote a prepared audio buffer into actual playback; called by the
/// restart handler once both pipelines are ready.
pub(crate) fn start_audio_playback(pc: &mut PlayerContext) {
    if pc.audio_status != PipelineStatus::Ready {
        return;
    }
    pc.audio_status = PipelineStatus::Playing;
    if !pc.paused {
        if let Some(ao) = pc.ao.as_mut() {
            ao.resume();
        }
    }
    let Some(mut chain) = pc.audio_chain.take() else {
        return;
    };
    push_to_output(pc, &mut chain);
    pc.audio_chain = Some(chain);
}

enum SyncOutcome {
    Wait,
    Ready,
    Eof,
    /// A keyframe seek overshot the target; retry the seek once.
    Overshot(f64),
}

fn sync_toward_target(pc: &mut PlayerContext, chain: &mut AudioChain) {
    let hrseek_target = if pc.hrseek_active { pc.hrseek_pts } else { None };
    let second_chance = if pc.audio_allow_second_chance_seek {
        pc.last_seek_pts
    } else {
        None
    };

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
                            continue;
                        }
                    }
                    if let (Some(target), Some(pts)) = (second_chance, frame.pts) {
                        if pts > target + SECOND_CHANCE_SLACK {
                            outcome = SyncOutcome::Overshot(target);
                            break;
                        }
                    }
                    chain.pending = Some(frame);
                    outcome = SyncOutcome::Ready;
                    break;
                }
                DecodePoll::Starved => break,
                DecodePoll::Eof => {
                    outcome = SyncOutcome::Eof;
                    break;
                }
            }
        },
        None => outcome = SyncOutcome::Eof,
    }

    match outcome {
        SyncOutcome::Wait => {}
        SyncOutcome::Ready => {
            pc.audio_status = PipelineStatus::Ready;
            pc.wakeup();
        }
        SyncOutcome::Eof => {
            pc.audio_status = PipelineStatus::Eof;
            pc.wakeup();
        }
        SyncOutcome::Overshot(target) => {
            pc.audio_allow_second_chance_seek = false;
            debug!(seek_pts = target, "audio overshot keyframe seek, retrying");
            if let Some(demuxer) = pc.demuxer.as_mut() {
                demuxer.seek(target, Default::default());
            }
            if let Some(decoder) = pc
                .tracks
                .get_mut(chain.track)
                .and_then(|track| track.decoder.as_mut())
            {
                decoder.reset();
            }
            chain.pending = None;
        }
    }
}

fn push_to_output(pc: &mut PlayerContext, chain: &mut AudioChain) {
    let mut eof = false;
    {
        let Some(decoder) = pc
            .tracks
            .get_mut(chain.track)
            .and_then(|track| track.decoder.as_mut())
        else {
            return;
        };
        let Some(ao) = pc.ao.as_mut() else { return };
        loop {
            if chain.pending.is_none() {
                decoder.work();
                match decoder.poll_frame() {
                    DecodePoll::Frame(frame) => chain.pending = Some(frame),
                    DecodePoll::Starved => break,
                    DecodePoll::Eof => {
                        eof = true;
                        break;
                    }
                }
            }
            let Some(frame) = chain.pending else { break };
            // Stop at the AB-loop B endpoint like the video writer does.
            if pc.ab_loop_clip {
                if let (Some(pts), Some(b)) = (frame.pts, pc.opts.ab_loop[1]) {
                    if pts >= b {
                        chain.pending = None;
                        eof = true;
                        break;
                    }
                }
            }
            if !ao.write(frame) {
                break;
            }
            chain.last_pts = frame.pts;
            chain.pending = None;
        }
    }
    if eof && chain.pending.is_none() {
        pc.audio_status = PipelineStatus::Draining;
        pc.wakeup();
    }
}
