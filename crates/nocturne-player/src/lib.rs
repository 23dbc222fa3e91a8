//! The playback control core: a single-threaded cooperative playloop that
//! coordinates demuxing, decoding and output stages across start, seek,
//! underflow and end-of-file.
//!
//! One thread owns the [`PlayerContext`] and drives [`run_playloop`]. Every
//! other thread (input readers, client bindings, window systems, audio
//! callbacks) talks to the core exclusively through the dispatch queue via a
//! [`WakeupHandle`]. Collaborating stages (demuxer, outputs, decoders) live
//! behind the capability traits in [`stages`].

#![deny(clippy::wildcard_imports)]

mod audio;
mod cache;
mod context;
mod dispatch;
mod error;
mod event_hub;
mod loops;
mod osd;
mod pause;
mod playloop;
mod restart;
mod seek;
pub mod stages;
mod timeline;
mod video;
mod window;

pub use context::{
    AudioChain, PipelineStatus, PlayerContext, StopReason, Track, VideoChain,
    VideoOutputFactory,
};
pub use dispatch::{WakeupHandle, Work};
pub use error::{SeekError, WindowError};
pub use loops::seek_to_last_frame;
pub use osd::{set_osd_msg, OsdFunction};
pub use pause::{add_step_frame, set_pause_state};
pub use playloop::{idle_loop, run_playloop, run_until_stopped};
pub use seek::{cancel_queued_seek, execute_queued_seek, queue_seek, reset_playback_state};
pub use timeline::{
    chapter_name, chapter_start_time, get_cache_buffering_percentage, get_chapter_count,
    get_current_chapter, get_current_pos_ratio, get_current_time, get_percent_pos,
    get_playback_time, get_time_length, seek_chapter,
};
