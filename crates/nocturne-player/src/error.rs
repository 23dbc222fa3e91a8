//! Typed errors for the fallible edges of the control core.
//!
//! Playloop handlers never propagate errors; the seek executor and the
//! force-window path return these so the calling handler can log and fall
//! back (disable force-window, treat the file as unseekable) per the error
//! taxonomy of the core.

use thiserror::Error;

/// Errors produced while dispatching a seek to the demuxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeekError {
    /// No demuxer is loaded.
    #[error("no demuxer to seek in")]
    NoDemuxer,
    /// The seek target could not be resolved to a timestamp (unknown current
    /// position for a relative seek, unknown duration for a factor seek).
    #[error("seek target position is unknown")]
    UnknownTarget,
    /// The demuxer refused the seek.
    #[error("cannot seek in this stream")]
    Unseekable,
}

/// Errors produced while force-creating the VO window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The video output factory produced nothing.
    #[error("video output creation failed")]
    CreateFailed,
    /// The output reported no usable pixel format.
    #[error("video output supports no pixel format")]
    NoFormat,
    /// The output rejected the window configuration.
    #[error("video output reconfiguration failed")]
    ReconfigFailed,
}
