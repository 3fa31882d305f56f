//! # Composition
//!
//! Components that combine media: joining two videos end to end (optionally
//! crossfaded) and attaching an audio track to a video with its duration
//! reconciled by looping or trimming.

pub mod av_merge;
pub mod concat;

pub use av_merge::{reconcile, AudioVideoMerger, DEFAULT_OUTPUT_NAME};
pub use concat::VideoMerger;
