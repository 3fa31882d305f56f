//! # Audio Module
//!
//! Decoding, WAV output and the audio operation set: gain, fades,
//! pitch-preserving speed change, reverse, cut and RMS normalization over an
//! in-memory mono buffer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clipsmith::audio::AudioEnhancer;
//! use clipsmith::config::Config;
//! use clipsmith::output::OutputMode;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let enhancer = AudioEnhancer::from_config(&Config::default())?;
//!
//! // Chain in memory, write only the final result
//! let quieter = enhancer.decrease_volume("song.mp3", -6.0, OutputMode::InMemory).await?;
//! let saved = enhancer.fade_out(quieter, 2.0, OutputMode::Save).await?;
//! println!("Wrote {:?}", saved.path());
//! # Ok(())
//! # }
//! ```

pub mod enhancer;
pub mod loader;
pub mod stretch;
pub mod types;
pub mod writer;

pub use enhancer::{AudioAction, AudioEnhancer};
pub use loader::AudioLoader;
pub use stretch::TimeStretcher;
pub use types::{AudioData, AudioInput, AudioOutput};
pub use writer::AudioWriter;
