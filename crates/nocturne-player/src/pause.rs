//! Pause reconciliation: user pause and cache pause fold into one effective
//! pause that is propagated to the outputs exactly once per transition.

use tracing::debug;

use nocturne_core::{PlayerEvent, SeekFlags, SeekPrecision, SeekTarget};

use crate::context::PlayerContext;

/// Apply a new user-pause value and reconcile the effective pause state.
///
/// The effective pause is `user_pause || paused_for_cache`. On a transition
/// the audio and video outputs are told once, the OSD is refreshed, and the
/// frame-time accumulator is adjusted so the video scheduler does not count
/// time spent paused.
pub fn set_pause_state(pc: &mut PlayerContext, user_pause: bool) {
    let mut send_update = pc.opts.pause != user_pause;
    pc.opts.pause = user_pause;

    let internal_paused = user_pause || pc.paused_for_cache;
    if internal_paused != pc.paused {
        pc.paused = internal_paused;
        send_update = true;

        if pc.audio_chain.is_some() {
            if let Some(ao) = pc.ao.as_mut() {
                if internal_paused {
                    ao.pause();
                } else {
                    ao.resume();
                }
            }
        }
        if let Some(vo) = pc.vo.as_mut() {
            vo.set_paused(internal_paused);
        }

        pc.osd.function = None;
        pc.osd.force_update = true;
        pc.wakeup();

        if internal_paused {
            pc.step_frames = 0;
            // Stop the frame-time accumulator where the pause caught it.
            let elapsed = pc.relative_time();
            pc.time_frame -= elapsed;
        } else {
            // Ignore the time that passed while paused.
            let _ = pc.relative_time();
        }
        debug!(paused = internal_paused, user_pause, cache = pc.paused_for_cache, "pause state");
    }

    pc.update_core_idle_state();

    if send_update {
        pc.notify(if pc.paused {
            PlayerEvent::Pause
        } else {
            PlayerEvent::Unpause
        });
    }
}

/// Re-run reconciliation after `paused_for_cache` changed, without touching
/// the user's pause choice.
pub(crate) fn update_internal_pause_state(pc: &mut PlayerContext) {
    let user_pause = pc.opts.pause;
    set_pause_state(pc, user_pause);
}

/// Frame stepping. Forward steps run one frame and pause again; backward
/// steps are a very-exact backstep seek, suppressed while an hr-seek is
/// already in flight.
pub fn add_step_frame(pc: &mut PlayerContext, dir: i32) {
    if pc.video_chain.is_none() {
        return;
    }
    if dir > 0 {
        pc.step_frames += 1;
        set_pause_state(pc, false);
    } else if dir < 0 && !pc.hrseek_active {
        crate::seek::queue_seek(
            pc,
            SeekTarget::Backstep,
            SeekPrecision::VeryExact,
            SeekFlags::NONE,
        );
        set_pause_state(pc, true);
    }
}
