use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::task;
use tracing::{debug, error, info};

use crate::{
    audio::{
        loader::AudioLoader,
        stretch::TimeStretcher,
        types::{AudioData, AudioInput, AudioOutput},
        writer::AudioWriter,
    },
    config::{AudioConfig, Config},
    error::{AudioError, ClipsmithError, Result},
    output::{derived_path, format_param, OutputMode},
};

/// Named step of an [`AudioEnhancer::apply_multiple`] pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAction {
    IncreaseVolume,
    DecreaseVolume,
    FadeIn,
    FadeOut,
    SpeedChange,
    Reverse,
    Cut,
    Normalize,
}

impl AudioAction {
    pub const ALL: [AudioAction; 8] = [
        Self::IncreaseVolume,
        Self::DecreaseVolume,
        Self::FadeIn,
        Self::FadeOut,
        Self::SpeedChange,
        Self::Reverse,
        Self::Cut,
        Self::Normalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::IncreaseVolume => "increase_volume",
            Self::DecreaseVolume => "decrease_volume",
            Self::FadeIn => "fade_in",
            Self::FadeOut => "fade_out",
            Self::SpeedChange => "speed_change",
            Self::Reverse => "reverse",
            Self::Cut => "cut",
            Self::Normalize => "normalize",
        }
    }

    /// Argument used when a pipeline step carries none
    pub fn default_argument(self) -> Option<f32> {
        match self {
            Self::IncreaseVolume => Some(3.0),
            Self::DecreaseVolume => Some(-6.0),
            Self::FadeIn | Self::FadeOut => Some(2.0),
            Self::SpeedChange => Some(1.25),
            Self::Reverse => None,
            Self::Cut => Some(0.0),
            Self::Normalize => Some(-1.0),
        }
    }

    /// Run this action on a buffer. For [`AudioAction::Cut`] the argument is
    /// the start time and the cut runs to the end of the buffer.
    pub fn apply(self, data: &AudioData, argument: Option<f32>, config: &AudioConfig) -> Result<AudioData> {
        let value = argument.or(self.default_argument()).unwrap_or_default();

        match self {
            Self::IncreaseVolume | Self::DecreaseVolume => Ok(apply_gain(data, value)),
            Self::FadeIn => Ok(apply_fade_in(data, value)),
            Self::FadeOut => Ok(apply_fade_out(data, value)),
            Self::SpeedChange => {
                config.check_speed(value)?;
                apply_speed(data, value, &stretcher_for(config))
            }
            Self::Reverse => Ok(apply_reverse(data)),
            Self::Cut => apply_cut(data, value, None),
            Self::Normalize => Ok(apply_normalize(data, value, config.rms_epsilon)),
        }
    }
}

impl FromStr for AudioAction {
    type Err = AudioError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == name.trim())
            .ok_or_else(|| AudioError::UnknownAction { name: name.to_string() })
    }
}

// ==========================================
// BUFFER TRANSFORMS
// ==========================================

/// Multiply by `10^(db/20)` and clip to [-1, 1]
pub fn apply_gain(data: &AudioData, db: f32) -> AudioData {
    let factor = 10f32.powf(db / 20.0);
    let samples = data.samples.iter().map(|&s| (s * factor).clamp(-1.0, 1.0)).collect();
    AudioData::new(samples, data.sample_rate)
}

/// Number of samples a fade of `duration` seconds covers, clamped to the buffer
fn fade_len(data: &AudioData, duration: f32) -> usize {
    data.index_for_time(duration as f64).min(data.len())
}

/// Point `i` of an `n`-point linear ramp from 0 to 1, endpoints included
fn ramp(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    }
}

/// Linear 0→1 ramp over the first `duration` seconds
pub fn apply_fade_in(data: &AudioData, duration: f32) -> AudioData {
    let n = fade_len(data, duration);
    let mut out = data.clone();
    for (i, sample) in out.samples.iter_mut().take(n).enumerate() {
        *sample *= ramp(i, n);
    }
    out
}

/// Linear 1→0 ramp over the last `duration` seconds
pub fn apply_fade_out(data: &AudioData, duration: f32) -> AudioData {
    let n = fade_len(data, duration);
    let mut out = data.clone();
    let start = out.len() - n;
    for (i, sample) in out.samples[start..].iter_mut().enumerate() {
        *sample *= 1.0 - ramp(i, n);
    }
    out
}

pub fn apply_reverse(data: &AudioData) -> AudioData {
    let samples = data.samples.iter().rev().copied().collect();
    AudioData::new(samples, data.sample_rate)
}

/// An end of zero seconds means "to the end", same as `None`
fn open_end(end: Option<f32>) -> Option<f32> {
    end.filter(|&e| e != 0.0)
}

/// Keep `[start, end)` seconds; `None` (or `Some(0.0)`) runs to the end of the buffer
pub fn apply_cut(data: &AudioData, start: f32, end: Option<f32>) -> Result<AudioData> {
    let end = open_end(end);
    if start < 0.0 || end.map_or(false, |e| e < start) {
        return Err(AudioError::InvalidParameters {
            details: format!("Invalid cut range {}..{:?}", start, end),
        }.into());
    }

    let start_idx = data.index_for_time(start as f64).min(data.len());
    let end_idx = end
        .map(|e| data.index_for_time(e as f64))
        .unwrap_or(data.len())
        .clamp(start_idx, data.len());

    Ok(AudioData::new(data.samples[start_idx..end_idx].to_vec(), data.sample_rate))
}

/// Scale so the RMS level lands on `target_db`
pub fn apply_normalize(data: &AudioData, target_db: f32, epsilon: f32) -> AudioData {
    let current_db = 20.0 * (data.rms() + epsilon).log10();
    let gain = target_db - current_db;
    debug!("Normalize: {:.2} dB -> {:.2} dB (gain {:+.2} dB)", current_db, target_db, gain);
    apply_gain(data, gain)
}

/// Pitch-preserving speed change; `factor > 1` shortens the buffer
pub fn apply_speed(data: &AudioData, factor: f32, stretcher: &TimeStretcher) -> Result<AudioData> {
    let samples = stretcher.stretch(&data.samples, factor as f64)?;
    Ok(AudioData::new(samples, data.sample_rate))
}

fn stretcher_for(config: &AudioConfig) -> TimeStretcher {
    TimeStretcher::new(config.stretch_fft_size, config.stretch_hop_size)
}

fn format_end(end: Option<f32>) -> String {
    open_end(end).map(format_param).unwrap_or_else(|| "end".to_string())
}

// ==========================================
// COMPONENT
// ==========================================

/// Audio operation set.
///
/// Every operation accepts a file path or an in-memory buffer. With
/// [`OutputMode::Save`] the result is written as `<base>_<suffix>.wav` into the
/// output directory, otherwise the buffer is handed back for chaining.
pub struct AudioEnhancer {
    output_dir: PathBuf,
    config: AudioConfig,
}

impl AudioEnhancer {
    /// Create an enhancer writing into `output_dir` (created if missing)
    pub fn new<P: Into<PathBuf>>(output_dir: P, config: AudioConfig) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir, config })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.output.audio_path(), config.audio.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn increase_volume(
        &self,
        input: impl Into<AudioInput>,
        db_gain: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        info!("🔊 Increasing volume by {} dB", db_gain);
        self.run(input.into(), format!("volup{}", format_param(db_gain)), mode, move |data| {
            Ok(apply_gain(&data, db_gain))
        }).await
    }

    /// `db_reduce` is expected to be negative
    pub async fn decrease_volume(
        &self,
        input: impl Into<AudioInput>,
        db_reduce: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        info!("🔉 Decreasing volume by {} dB", db_reduce);
        self.run(input.into(), format!("voldown{}", format_param(db_reduce.abs())), mode, move |data| {
            Ok(apply_gain(&data, db_reduce))
        }).await
    }

    pub async fn fade_in(
        &self,
        input: impl Into<AudioInput>,
        duration: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        self.run(input.into(), format!("fadein{}", format_param(duration)), mode, move |data| {
            Ok(apply_fade_in(&data, duration))
        }).await
    }

    pub async fn fade_out(
        &self,
        input: impl Into<AudioInput>,
        duration: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        self.run(input.into(), format!("fadeout{}", format_param(duration)), mode, move |data| {
            Ok(apply_fade_out(&data, duration))
        }).await
    }

    pub async fn speed_change(
        &self,
        input: impl Into<AudioInput>,
        factor: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        info!("⏩ Changing speed x{}", factor);
        self.config.check_speed(factor)?;
        let stretcher = stretcher_for(&self.config);
        self.run(input.into(), format!("speed{}", format_param(factor)), mode, move |data| {
            apply_speed(&data, factor, &stretcher)
        }).await
    }

    pub async fn reverse(&self, input: impl Into<AudioInput>, mode: OutputMode) -> Result<AudioOutput> {
        self.run(input.into(), "reversed".to_string(), mode, |data| Ok(apply_reverse(&data))).await
    }

    pub async fn cut(
        &self,
        input: impl Into<AudioInput>,
        start: f32,
        end: Option<f32>,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        let suffix = format!("cut{}-{}", format_param(start), format_end(end));
        self.run(input.into(), suffix, mode, move |data| apply_cut(&data, start, end)).await
    }

    pub async fn normalize(
        &self,
        input: impl Into<AudioInput>,
        target_db: f32,
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        info!("📏 Normalizing to {} dB", target_db);
        let epsilon = self.config.rms_epsilon;
        self.run(input.into(), format!("norm{}dB", target_db.trunc() as i32), mode, move |data| {
            Ok(apply_normalize(&data, target_db, epsilon))
        }).await
    }

    /// Apply named actions in order, feeding each result into the next.
    ///
    /// Fails before touching the audio if any name is unknown. Intermediate
    /// results stay in memory; only the final buffer is saved, as
    /// `<base>_pipeline.wav`.
    pub async fn apply_multiple(
        &self,
        input: impl Into<AudioInput>,
        actions: &[(&str, Option<f32>)],
        mode: OutputMode,
    ) -> Result<AudioOutput> {
        let steps = actions
            .iter()
            .map(|(name, argument)| {
                name.parse::<AudioAction>()
                    .map(|action| (action, *argument))
                    .map_err(|e| {
                        error!("Unknown action: {}", name);
                        ClipsmithError::from(e)
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let config = self.config.clone();
        self.run(input.into(), "pipeline".to_string(), mode, move |data| {
            steps.into_iter().try_fold(data, |current, (action, argument)| {
                info!("Applying: {} ({:?})", action.name(), argument);
                action.apply(&current, argument, &config).map_err(|e| {
                    error!("Action failed: {}", action.name());
                    e
                })
            })
        }).await
    }

    async fn resolve(&self, input: AudioInput) -> Result<AudioData> {
        match input {
            AudioInput::File(path) => AudioLoader::load(&path).await,
            AudioInput::Buffer(data) => Ok(data),
        }
    }

    /// Resolve the input, run `op` off the async runtime, then save or return
    async fn run<F>(&self, input: AudioInput, suffix: String, mode: OutputMode, op: F) -> Result<AudioOutput>
    where
        F: FnOnce(AudioData) -> Result<AudioData> + Send + 'static,
    {
        let base = input.base_name();
        let data = self.resolve(input).await?;
        let target = mode
            .is_save()
            .then(|| derived_path(&self.output_dir, &base, &suffix, "wav"));
        let bit_depth = self.config.wav_bit_depth;

        task::spawn_blocking(move || -> Result<AudioOutput> {
            let result = op(data)?;
            match target {
                Some(path) => {
                    AudioWriter::write_wav(&path, &result, bit_depth)?;
                    info!("💾 Saved {:?} ({:.2}s)", path, result.duration());
                    Ok(AudioOutput::Saved(path))
                }
                None => Ok(AudioOutput::Buffer(result)),
            }
        })
        .await
        .map_err(|e| ClipsmithError::generic(format!("Audio task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::f32::consts::PI;
    use tempfile::tempdir;

    fn sine(amplitude: f32, sample_rate: u32, seconds: f32) -> AudioData {
        let samples = (0..(sample_rate as f32 * seconds) as usize)
            .map(|i| amplitude * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioData::new(samples, sample_rate)
    }

    fn noise(seed: u64, len: usize) -> AudioData {
        let mut rng = SmallRng::seed_from_u64(seed);
        AudioData::new((0..len).map(|_| rng.gen_range(-0.3..0.3)).collect(), 8000)
    }

    fn enhancer() -> (tempfile::TempDir, AudioEnhancer) {
        let dir = tempdir().unwrap();
        let enhancer = AudioEnhancer::new(dir.path().join("enhanced_audio"), AudioConfig::default()).unwrap();
        (dir, enhancer)
    }

    fn buffer(output: AudioOutput) -> AudioData {
        output.into_buffer().expect("expected in-memory output")
    }

    #[tokio::test]
    async fn test_gain_round_trip() {
        let (_dir, enhancer) = enhancer();
        for seed in 0..5 {
            let input = noise(seed, 4000);
            let quieter = enhancer.decrease_volume(input.clone(), -6.0, OutputMode::InMemory).await.unwrap();
            let restored = buffer(enhancer.increase_volume(quieter, 6.0, OutputMode::InMemory).await.unwrap());

            for (a, b) in input.samples.iter().zip(&restored.samples) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[tokio::test]
    async fn test_gain_clips_to_unit_range() {
        let loud = apply_gain(&AudioData::new(vec![0.9, -0.9], 8000), 12.0);
        assert_eq!(loud.samples, vec![1.0, -1.0]);
    }

    #[tokio::test]
    async fn test_double_reverse_is_identity() {
        let (_dir, enhancer) = enhancer();
        let input = noise(7, 1234);
        let once = enhancer.reverse(input.clone(), OutputMode::InMemory).await.unwrap();
        let twice = buffer(enhancer.reverse(once, OutputMode::InMemory).await.unwrap());
        assert_eq!(twice, input);
    }

    #[tokio::test]
    async fn test_normalize_is_idempotent() {
        let (_dir, enhancer) = enhancer();
        let input = sine(0.05, 22050, 0.5);
        let first = buffer(enhancer.normalize(input, -14.0, OutputMode::InMemory).await.unwrap());
        let second = buffer(enhancer.normalize(first.clone(), -14.0, OutputMode::InMemory).await.unwrap());

        let level = 20.0 * first.rms().log10();
        assert!((level + 14.0).abs() < 0.01, "level {}", level);
        for (a, b) in first.samples.iter().zip(&second.samples) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_minus_six_db_halves_rms() {
        let (_dir, enhancer) = enhancer();
        let input = sine(0.1, 22050, 1.0);
        let output = buffer(enhancer.decrease_volume(input.clone(), -6.0, OutputMode::InMemory).await.unwrap());
        let ratio = output.rms() / input.rms();
        assert!((ratio - 0.5).abs() < 0.01, "ratio {}", ratio);
        assert_eq!(output.sample_rate, 22050);
    }

    #[test]
    fn test_fades_clamp_and_copy() {
        let input = AudioData::new(vec![1.0; 800], 8000);

        let faded_in = apply_fade_in(&input, 10.0);
        assert_eq!(faded_in.samples[0], 0.0);
        assert_eq!(faded_in.samples[799], 1.0);
        assert!((faded_in.samples[400] - 400.0 / 799.0).abs() < 1e-6);

        let faded_out = apply_fade_out(&input, 0.05);
        assert_eq!(faded_out.samples[399], 1.0);
        assert_eq!(faded_out.samples[400], 1.0);
        assert_eq!(faded_out.samples[799], 0.0);

        // Source untouched
        assert!(input.samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_cut_ranges() {
        let input = AudioData::new((0..100).map(|i| i as f32 / 100.0).collect(), 10);

        let middle = apply_cut(&input, 2.0, Some(5.0)).unwrap();
        assert_eq!(middle.len(), 30);
        assert_eq!(middle.samples[0], 0.2);

        let tail = apply_cut(&input, 9.0, None).unwrap();
        assert_eq!(tail.len(), 10);

        let past_end = apply_cut(&input, 20.0, None).unwrap();
        assert!(past_end.is_empty());

        assert!(apply_cut(&input, 5.0, Some(2.0)).is_err());

        let zero_end = apply_cut(&input, 3.0, Some(0.0)).unwrap();
        assert_eq!(zero_end.len(), 70);
        assert_eq!(format_end(Some(0.0)), "end");
    }

    #[test]
    fn test_action_names() {
        assert_eq!("fade_in".parse::<AudioAction>().unwrap(), AudioAction::FadeIn);
        assert_eq!("normalize".parse::<AudioAction>().unwrap(), AudioAction::Normalize);
        assert!("louder".parse::<AudioAction>().is_err());
        for action in AudioAction::ALL {
            assert_eq!(action.name().parse::<AudioAction>().unwrap(), action);
        }
    }

    #[tokio::test]
    async fn test_pipeline_unknown_action_fails_fast() {
        let (_dir, enhancer) = enhancer();
        let result = enhancer
            .apply_multiple(noise(1, 100), &[("reverse", None), ("louder", Some(3.0))], OutputMode::InMemory)
            .await;

        assert!(matches!(
            result,
            Err(ClipsmithError::Audio(AudioError::UnknownAction { ref name })) if name == "louder"
        ));
    }

    #[tokio::test]
    async fn test_pipeline_chains_in_order() {
        let (_dir, enhancer) = enhancer();
        let input = AudioData::new(vec![0.5; 8000], 8000);
        let output = buffer(
            enhancer
                .apply_multiple(
                    input,
                    &[("cut", Some(0.5)), ("decrease_volume", None), ("fade_in", Some(0.1))],
                    OutputMode::InMemory,
                )
                .await
                .unwrap(),
        );

        assert_eq!(output.len(), 4000);
        assert_eq!(output.samples[0], 0.0);
        let expected = 0.5 * 10f32.powf(-6.0 / 20.0);
        assert!((output.samples[3999] - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_saved_names_follow_parameters() {
        let (_dir, enhancer) = enhancer();
        let input = sine(0.1, 22050, 1.0);

        let saved = enhancer.decrease_volume(input.clone(), -6.0, OutputMode::Save).await.unwrap();
        let path = saved.path().unwrap().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "audio_voldown6.0.wav");
        let reloaded = AudioLoader::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), input.len());

        let cut = enhancer.cut(path.clone(), 0.25, None, OutputMode::Save).await.unwrap();
        assert_eq!(cut.path().unwrap().file_name().unwrap(), "audio_voldown6.0_cut0.25-end.wav");

        let norm = enhancer.normalize(input.clone(), -14.0, OutputMode::Save).await.unwrap();
        assert_eq!(norm.path().unwrap().file_name().unwrap(), "audio_norm-14dB.wav");

        let piped = enhancer
            .apply_multiple(input, &[("reverse", None)], OutputMode::Save)
            .await
            .unwrap();
        assert_eq!(piped.path().unwrap().file_name().unwrap(), "audio_pipeline.wav");
    }

    #[tokio::test]
    async fn test_speed_change_shortens() {
        let (_dir, enhancer) = enhancer();
        let input = sine(0.1, 22050, 1.0);
        let output = buffer(enhancer.speed_change(input, 2.0, OutputMode::InMemory).await.unwrap());
        assert_eq!(output.len(), 11025);
        assert_eq!(output.sample_rate, 22050);
    }

    #[tokio::test]
    async fn test_speed_factor_out_of_range() {
        let (_dir, enhancer) = enhancer();
        let input = sine(0.1, 22050, 1.0);
        for factor in [0.0001, 0.0, -1.0, 100.0] {
            let result = enhancer.speed_change(input.clone(), factor, OutputMode::InMemory).await;
            assert!(matches!(
                result,
                Err(ClipsmithError::Audio(AudioError::InvalidParameters { .. }))
            ));
        }

        let piped = enhancer
            .apply_multiple(input, &[("speed_change", Some(0.0001))], OutputMode::InMemory)
            .await;
        assert!(piped.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_input() {
        let (dir, enhancer) = enhancer();
        let result = enhancer
            .reverse(dir.path().join("nope.wav"), OutputMode::InMemory)
            .await;
        assert!(result.is_err());
    }
}
