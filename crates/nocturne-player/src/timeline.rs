//! Time and position accessors, and chapter tracking.
//!
//! All timestamps are `Option<f64>` seconds: an unknown time stays unknown
//! through every accessor instead of collapsing into a spurious finite value.

use nocturne_core::{PlayerEvent, SeekFlags, SeekPrecision, SeekTarget};

use crate::context::PlayerContext;

/// Total duration in seconds, if the demuxer knows it.
pub fn get_time_length(pc: &PlayerContext) -> Option<f64> {
    pc.demuxer.as_ref().and_then(|d| d.duration())
}

/// The authoritative current time: the playback PTS once frames are playing,
/// the last seek target while a seek is still settling.
pub fn get_current_time(pc: &PlayerContext) -> Option<f64> {
    if pc.demuxer.is_none() {
        return None;
    }
    pc.playback_pts.or(pc.last_seek_pts)
}

/// Current time with cosmetics applied: while mid-seek the reported time is
/// clamped into the file's duration so the UI never shows an overshoot.
pub fn get_playback_time(pc: &PlayerContext) -> Option<f64> {
    let cur = get_current_time(pc)?;
    if pc.playback_pts.is_none() {
        if let Some(length) = get_time_length(pc) {
            return Some(cur.clamp(0.0, length.max(0.0)));
        }
    }
    Some(cur)
}

/// Playback position as a ratio in `[0, 1]`.
///
/// With `use_range`, the configured play start/end window is the basis.
/// Falls back to the byte position when timestamps are unusable.
pub fn get_current_pos_ratio(pc: &PlayerContext, use_range: bool) -> Option<f64> {
    let demuxer = pc.demuxer.as_ref()?;

    let mut start = 0.0;
    let mut len = get_time_length(pc);
    if use_range {
        let total = len.unwrap_or(0.0).max(0.0);
        let startpos = pc.opts.play_start.unwrap_or(0.0).max(0.0);
        let mut endpos = match pc.opts.play_end {
            Some(end) if end <= total => end,
            _ => total,
        };
        if endpos < startpos {
            endpos = startpos;
        }
        start = startpos;
        len = Some(endpos - startpos);
    }

    let mut ans = None;
    if let (Some(pos), Some(len)) = (get_current_time(pc), len) {
        if len > 0.0 {
            ans = Some(((pos - start) / len).clamp(0.0, 1.0));
        }
    }

    if ans.is_none() || demuxer.ts_resets_possible() {
        if let (Some(size), Some(filepos)) = (demuxer.stream_size(), demuxer.file_pos()) {
            if size > 0 && filepos >= 0 {
                ans = Some((filepos as f64 / size as f64).clamp(0.0, 1.0));
            }
        }
    }

    if use_range {
        if let (Some(budget), Some(remaining)) = (pc.opts.play_frames, pc.max_frames) {
            if budget > 0 {
                let frame_ratio = 1.0 - remaining as f64 / budget as f64;
                ans = Some(ans.unwrap_or(0.0).max(frame_ratio));
            }
        }
    }

    ans
}

/// Position as integer percent, 0–100.
pub fn get_percent_pos(pc: &PlayerContext) -> Option<i32> {
    get_current_pos_ratio(pc, false).map(|ratio| (ratio * 100.0) as i32)
}

/// Buffering percentage while cache-paused, 100 otherwise. `None` without a
/// demuxer.
pub fn get_cache_buffering_percentage(pc: &PlayerContext) -> Option<i32> {
    pc.demuxer.as_ref().map(|_| pc.cache_buffer)
}

/// Index of the current chapter: `-2` with no chapters, `-1` before the
/// first chapter. A recent chapter seek pins the result so tightly spaced
/// chapters don't flap while the seek settles.
pub fn get_current_chapter(pc: &PlayerContext) -> i64 {
    if pc.chapters.is_empty() {
        return -2;
    }
    let i = match get_current_time(pc) {
        Some(now) => pc
            .chapters
            .iter()
            .position(|chapter| now < chapter.pts)
            .unwrap_or(pc.chapters.len()) as i64,
        None => 0,
    };
    pc.last_chapter_seek.max(i - 1)
}

pub fn get_chapter_count(pc: &PlayerContext) -> usize {
    pc.chapters.len()
}

/// `None` when the chapter is out of range or untitled.
pub fn chapter_name(pc: &PlayerContext, chapter: i64) -> Option<&str> {
    if chapter < 0 {
        return None;
    }
    pc.chapters
        .get(chapter as usize)
        .and_then(|c| c.title.as_deref())
}

/// Start of the chapter in seconds; chapter `-1` starts at zero.
pub fn chapter_start_time(pc: &PlayerContext, chapter: i64) -> Option<f64> {
    if chapter == -1 {
        return Some(0.0);
    }
    if chapter < 0 {
        return None;
    }
    pc.chapters.get(chapter as usize).map(|c| c.pts)
}

/// Queue a seek to the start of `chapter` and anchor chapter reporting to it
/// until playback moves past.
pub fn seek_chapter(pc: &mut PlayerContext, chapter: i64) -> bool {
    let Some(pts) = chapter_start_time(pc, chapter) else {
        return false;
    };
    pc.last_chapter_seek = chapter;
    pc.last_chapter_pts = Some(pts);
    crate::seek::queue_seek(
        pc,
        SeekTarget::Absolute(pts),
        SeekPrecision::Default,
        SeekFlags::NONE,
    );
    true
}

/// Emit a chapter-change notification when the computed chapter moves.
pub(crate) fn handle_chapter_change(pc: &mut PlayerContext) {
    let chapter = get_current_chapter(pc);
    if chapter != pc.last_chapter {
        pc.last_chapter = chapter;
        pc.notify(PlayerEvent::ChapterChange);
    }
}
