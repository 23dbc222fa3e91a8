//! Playback-restart synchronization: audio and video buffers are both filled
//! before either starts, so the two pipelines begin together after a load or
//! seek.

use tracing::debug;

use nocturne_core::PlayerEvent;

use crate::audio;
use crate::context::{PipelineStatus, PlayerContext};
use crate::pause::update_internal_pause_state;
use crate::playloop::handle_playback_time;
use crate::seek::execute_queued_seek;

pub(crate) fn handle_playback_restart(pc: &mut PlayerContext) {
    if pc.audio_status < PipelineStatus::Ready || pc.video_status < PipelineStatus::Ready {
        return;
    }

    if pc.opts.cache_pause_initial
        && (pc.video_status == PipelineStatus::Ready
            || pc.audio_status == PipelineStatus::Ready)
    {
        // A pipeline is restarting and initial buffering is enabled: start
        // both paused so no audio is dropped and video does not run ahead.
        pc.paused_for_cache = true;
        pc.cache_buffer = 0;
        update_internal_pause_state(pc);
    }

    if pc.video_status == PipelineStatus::Ready {
        pc.video_status = PipelineStatus::Playing;
        // Consume the timer delta so the first frame is not scheduled as if
        // the whole sync phase were frame time.
        let _ = pc.relative_time();
        pc.wakeup();
    }

    if pc.audio_status == PipelineStatus::Ready {
        // A new seek queued while this one finishes: don't start the audio,
        // serve the newer intent immediately.
        if pc.seek.is_some() && pc.video_status == PipelineStatus::Playing {
            handle_playback_time(pc);
            execute_queued_seek(pc);
            return;
        }
        audio::start_audio_playback(pc);
    }

    if !pc.restart_complete {
        pc.hrseek_active = false;
        pc.restart_complete = true;
        pc.current_seek = None;
        pc.audio_allow_second_chance_seek = false;
        handle_playback_time(pc);
        pc.notify(PlayerEvent::PlaybackRestart);
        pc.update_core_idle_state();
        if !pc.playing_msg_shown {
            crate::osd::show_playing_message(pc);
        }
        pc.playing_msg_shown = true;
        pc.wakeup();
        pc.ab_loop_clip = match (pc.playback_pts, pc.opts.ab_loop[1]) {
            (Some(pts), Some(b)) => pts < b,
            _ => false,
        };
        debug!(pts = ?pc.playback_pts, "playback restart complete");
    }
}
