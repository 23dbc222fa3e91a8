//! VO window housekeeping: cursor autohide, window event draining, and
//! force-creating a window when there is no video to drive one.

use tracing::error;

use nocturne_core::{CursorAutohide, ForceWindow, PlayerEvent};

use crate::context::{PipelineStatus, PlayerContext};
use crate::error::WindowError;
use crate::stages::VideoParams;

/// Window size used when a window exists only for input/OSD purposes.
const FORCED_WINDOW_SIZE: (u32, u32) = (960, 480);

pub(crate) fn handle_cursor_autohide(pc: &mut PlayerContext) {
    if pc.vo.is_none() {
        return;
    }

    let mut visible = pc.mouse_cursor_visible;
    let now = pc.now();

    let counter = pc
        .input
        .as_ref()
        .map(|input| input.mouse_event_counter())
        .unwrap_or(0);
    if counter != pc.mouse_event_ts {
        pc.mouse_event_ts = counter;
        let delay = match pc.opts.cursor_autohide {
            CursorAutohide::AfterMs(ms) => ms as f64 / 1000.0,
            _ => 0.0,
        };
        pc.mouse_timer = now + delay;
        visible = true;
    }

    if pc.mouse_timer > now {
        let remaining = pc.mouse_timer - now;
        pc.set_timeout(remaining);
    } else {
        visible = false;
    }

    match pc.opts.cursor_autohide {
        CursorAutohide::AlwaysVisible => visible = true,
        CursorAutohide::AlwaysHidden => visible = false,
        CursorAutohide::AfterMs(_) => {}
    }

    if pc.opts.cursor_autohide_fs && !pc.window_fullscreen {
        visible = true;
    }

    if visible != pc.mouse_cursor_visible {
        if let Some(vo) = pc.vo.as_mut() {
            vo.set_cursor_visible(visible);
        }
    }
    pc.mouse_cursor_visible = visible;
}

/// Drain window events and forward them to observers.
pub(crate) fn handle_vo_events(pc: &mut PlayerContext) {
    let Some(vo) = pc.vo.as_mut() else { return };
    let events = vo.query_and_reset_events();
    if events.fullscreen_state {
        // The flag changed from outside (window manager); resync our view.
        pc.window_fullscreen = vo.fullscreen();
    }
    if events.resize {
        pc.notify(PlayerEvent::WinResize);
    }
    if events.win_state {
        pc.notify(PlayerEvent::WinState);
    }
}

pub(crate) fn uninit_video_out(pc: &mut PlayerContext) {
    pc.vo = None;
}

/// Create or tear down the VO depending on whether a window is wanted
/// without real video: idle mode, audio-only files, or a stalled video
/// track that never produced a frame.
pub(crate) fn handle_force_window(pc: &mut PlayerContext, force: bool) {
    // Idle, or loading finished, or explicitly forced mid-load.
    let act = !pc.playing || pc.playback_initialized || force;

    // A selected video track that never decoded a frame still deserves
    // a window.
    let stalled_video = pc.playback_initialized
        && pc.restart_complete
        && pc.video_status == PipelineStatus::Eof
        && pc.video_chain.is_some()
        && !pc.vo.as_ref().is_some_and(|vo| vo.config_ok());

    // Don't interfere with real video playback.
    if pc.video_chain.is_some() && !stalled_video {
        return;
    }

    if pc.opts.force_window == ForceWindow::No {
        if act && pc.video_chain.is_none() {
            uninit_video_out(pc);
        }
        return;
    }

    if pc.opts.force_window != ForceWindow::Always && !act {
        return;
    }

    if let Err(err) = create_forced_window(pc, force) {
        error!(%err, "cannot open a forced window");
        pc.opts.force_window = ForceWindow::No;
        uninit_video_out(pc);
    }
}

fn create_forced_window(pc: &mut PlayerContext, force: bool) -> Result<(), WindowError> {
    if pc.vo.is_none() {
        let handle = pc.wakeup_handle();
        let vo = match pc.vo_factory.as_mut() {
            Some(factory) => factory(handle).ok_or(WindowError::CreateFailed)?,
            None => return Err(WindowError::CreateFailed),
        };
        pc.vo = Some(vo);
        pc.mouse_cursor_visible = true;
    }

    let needs_config = !pc.vo.as_ref().is_some_and(|vo| vo.config_ok()) || force;
    if needs_config {
        let Some(vo) = pc.vo.as_mut() else {
            return Err(WindowError::CreateFailed);
        };
        // Pick whatever format works.
        let format = vo
            .query_formats()
            .into_iter()
            .next()
            .ok_or(WindowError::NoFormat)?;
        let (width, height) = FORCED_WINDOW_SIZE;
        let params = VideoParams {
            format,
            width,
            height,
            par_w: 1,
            par_h: 1,
        };
        if !vo.reconfig(&params) {
            return Err(WindowError::ReconfigFailed);
        }
        pc.update_screensaver_state();
        if let Some(vo) = pc.vo.as_mut() {
            vo.set_paused(true);
            vo.redraw();
        }
        pc.notify(PlayerEvent::VideoReconfig);
    }

    Ok(())
}
