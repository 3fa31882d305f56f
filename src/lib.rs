//! # Clipsmith
//!
//! Touch up audio and video files, join clips and put soundtracks under them.
//!
//! Every operation accepts either a file on disk or the in-memory result of a
//! previous operation, so steps can be chained without writing intermediate
//! files. Only the step run with [`OutputMode::Save`] writes anything.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clipsmith::{
//!     audio::AudioEnhancer,
//!     composition::AudioVideoMerger,
//!     config::Config,
//!     output::OutputMode,
//!     video::VideoEnhancer,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let audio = AudioEnhancer::from_config(&config)?;
//! let video = VideoEnhancer::from_config(&config)?;
//! let merger = AudioVideoMerger::from_config(&config)?;
//!
//! let quieter = audio.decrease_volume("song.mp3", -10.0, OutputMode::InMemory).await?;
//! let graded = video.adjust_color("clip.mp4", 1.1, 1.2, 1.3, OutputMode::InMemory).await?;
//! let fps = graded.clip().map(|clip| clip.fps());
//!
//! let output = merger
//!     .merge(graded, quieter, "final_output.mp4", OutputMode::Save, fps)
//!     .await?;
//! println!("Wrote {:?}", output.path());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - Decoding, WAV output and the audio operation set
//! - [`video`] - Lazy clip graph, ffmpeg decode/encode and the video operation set
//! - [`composition`] - Video concatenation and audio/video merging
//! - [`app`] - Interactive console menus
//! - [`config`] - Configuration management

pub mod app;
pub mod audio;
pub mod composition;
pub mod config;
pub mod error;
pub mod output;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    app::App,
    audio::{AudioData, AudioEnhancer, AudioInput, AudioOutput},
    composition::{AudioVideoMerger, VideoMerger},
    config::Config,
    error::{ClipsmithError, Result},
    output::OutputMode,
    video::{VideoClip, VideoEnhancer, VideoInput, VideoOutput},
};
