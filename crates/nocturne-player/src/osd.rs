//! On-screen display housekeeping owned by the loop: the transient message,
//! the state icon, and redraw gating. Rendering itself is the VO's business.

use crate::context::{PipelineStatus, PlayerContext};

/// Icon reflecting what playback is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsdFunction {
    Play,
    Pause,
    FastForward,
    Rewind,
}

#[derive(Default)]
pub(crate) struct OsdState {
    pub(crate) function: Option<OsdFunction>,
    /// A state change wants the OSD repainted even without a new message.
    pub(crate) force_update: bool,
    pub(crate) want_redraw: bool,
    msg: Option<OsdMsg>,
}

struct OsdMsg {
    text: String,
    expires_at: f64,
}

impl OsdState {
    pub(crate) fn message(&self) -> Option<&str> {
        self.msg.as_ref().map(|m| m.text.as_str())
    }

    fn take_want_redraw(&mut self) -> bool {
        std::mem::take(&mut self.want_redraw)
    }
}

/// Show a transient OSD message for `duration_ms` milliseconds.
pub fn set_osd_msg(pc: &mut PlayerContext, text: impl Into<String>, duration_ms: u32) {
    let expires_at = pc.now() + duration_ms as f64 / 1000.0;
    pc.osd.msg = Some(OsdMsg {
        text: text.into(),
        expires_at,
    });
    pc.osd.want_redraw = true;
    pc.wakeup();
}

pub(crate) fn set_osd_function(pc: &mut PlayerContext, function: OsdFunction) {
    pc.osd.function = Some(function);
    pc.osd.force_update = true;
}

/// Expire the transient message and fold forced updates into a redraw wish.
pub(crate) fn update_osd_msg(pc: &mut PlayerContext) {
    let now = pc.now();
    if let Some(msg) = &pc.osd.msg {
        if msg.expires_at <= now {
            pc.osd.msg = None;
            pc.osd.want_redraw = true;
        } else {
            let remaining = msg.expires_at - now;
            pc.set_timeout(remaining);
        }
    }
    if pc.osd.force_update {
        pc.osd.force_update = false;
        pc.osd.want_redraw = true;
    }
}

/// Redraw the VO when the OSD or the output asks for it, without fighting
/// normal video presentation or slowing down an in-progress seek.
pub(crate) fn handle_osd_redraw(pc: &mut PlayerContext) {
    let Some(vo) = pc.vo.as_ref() else { return };
    if !vo.config_ok() {
        return;
    }
    // While playing normally the OSD is repainted as part of video display.
    if !pc.paused && pc.sleeptime < 0.1 && pc.video_status == PipelineStatus::Playing {
        return;
    }
    let use_video = pc
        .video_chain
        .as_ref()
        .is_some_and(|chain| !chain.is_cover_art);
    if use_video && pc.now() - pc.start_timestamp < 0.1 {
        pc.set_timeout(0.1);
        return;
    }
    let want = pc.osd.take_want_redraw() || pc.vo.as_ref().is_some_and(|vo| vo.want_redraw());
    if !want {
        return;
    }
    if let Some(vo) = pc.vo.as_mut() {
        vo.redraw();
    }
}

/// Report the once-per-file playing message after a completed restart.
pub(crate) fn show_playing_message(pc: &mut PlayerContext) {
    if let Some(msg) = pc.opts.playing_msg.clone() {
        if !msg.is_empty() {
            tracing::info!("{msg}");
        }
    }
    if let Some(msg) = pc.opts.osd_playing_msg.clone() {
        if !msg.is_empty() {
            let duration = pc.opts.osd_duration_ms;
            set_osd_msg(pc, msg, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use nocturne_core::PlayOpts;

    use super::*;

    #[test]
    fn message_expires_and_requests_redraw() {
        let mut pc = PlayerContext::new(PlayOpts::default());
        set_osd_msg(&mut pc, "volume: 50%", 0);
        assert_eq!(pc.osd.message(), Some("volume: 50%"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        pc.osd.want_redraw = false;
        update_osd_msg(&mut pc);
        assert_eq!(pc.osd.message(), None);
        assert!(pc.osd.want_redraw);
    }
}
