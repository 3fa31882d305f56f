use clipsmith::{
    audio::{AudioData, AudioEnhancer, AudioLoader},
    composition::{AudioVideoMerger, VideoMerger, DEFAULT_OUTPUT_NAME},
    config::Config,
    output::OutputMode,
    video::{VideoClip, VideoEncoder, VideoLoader},
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tempfile::tempdir;

fn sine(sample_rate: u32, seconds: f64) -> AudioData {
    let len = (sample_rate as f64 * seconds) as usize;
    let samples = (0..len)
        .map(|i| 0.1 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    AudioData::new(samples, sample_rate)
}

fn config_in(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.output.root = root.to_path_buf();
    config
}

#[tokio::test]
async fn decrease_volume_halves_rms_and_saves_every_sample() {
    let dir = tempdir().unwrap();
    let enhancer = AudioEnhancer::from_config(&config_in(dir.path())).unwrap();
    let tone = sine(22050, 1.0);

    let quieter = enhancer
        .decrease_volume(tone.clone(), -6.0, OutputMode::InMemory)
        .await
        .unwrap()
        .into_buffer()
        .unwrap();
    let ratio = quieter.rms() / tone.rms();
    assert!((ratio - 0.5).abs() < 0.01, "rms ratio {}", ratio);

    let saved = enhancer
        .decrease_volume(tone.clone(), -6.0, OutputMode::Save)
        .await
        .unwrap();
    let path = saved.path().unwrap();
    assert_eq!(path.file_name().unwrap(), "audio_voldown6.0.wav");

    let reloaded = AudioLoader::load(path).await.unwrap();
    assert_eq!(reloaded.len(), tone.len());
    assert_eq!(reloaded.sample_rate, 22050);
}

#[tokio::test]
async fn gain_round_trip_reverse_and_normalize_laws() {
    let dir = tempdir().unwrap();
    let enhancer = AudioEnhancer::from_config(&config_in(dir.path())).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);

    for _ in 0..5 {
        let samples: Vec<f32> = (0..4000).map(|_| rng.gen_range(-0.2..0.2)).collect();
        let signal = AudioData::new(samples, 8000);
        let gain = rng.gen_range(-12.0f32..-1.0);

        let down = enhancer.decrease_volume(signal.clone(), gain, OutputMode::InMemory).await.unwrap();
        let back = enhancer
            .increase_volume(down, -gain, OutputMode::InMemory)
            .await
            .unwrap()
            .into_buffer()
            .unwrap();
        for (a, b) in signal.samples.iter().zip(&back.samples) {
            assert!((a - b).abs() < 1e-5);
        }

        let once = enhancer.reverse(signal.clone(), OutputMode::InMemory).await.unwrap();
        let twice = enhancer
            .reverse(once, OutputMode::InMemory)
            .await
            .unwrap()
            .into_buffer()
            .unwrap();
        assert_eq!(twice, signal);

        let first = enhancer
            .normalize(signal.clone(), -20.0, OutputMode::InMemory)
            .await
            .unwrap()
            .into_buffer()
            .unwrap();
        let second = enhancer
            .normalize(first.clone(), -20.0, OutputMode::InMemory)
            .await
            .unwrap()
            .into_buffer()
            .unwrap();
        for (a, b) in first.samples.iter().zip(&second.samples) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}

#[tokio::test]
async fn concatenating_two_solid_clips_gives_two_seconds_at_target_geometry() {
    let dir = tempdir().unwrap();
    let merger = VideoMerger::from_config(&config_in(dir.path())).unwrap();
    let clip = VideoClip::solid([0, 128, 255], (320, 240), 1.0, 24.0);

    let merged = merger
        .merge(clip.clone(), clip.clone(), 0.0, OutputMode::InMemory)
        .await
        .unwrap()
        .into_clip()
        .unwrap();
    assert!((merged.duration() - 2.0).abs() < 1.0 / 30.0);
    assert_eq!(merged.size(), (1280, 720));
    assert_eq!(merged.fps(), 30.0);

    let crossfaded = merger
        .merge(clip.clone(), clip.clone(), 0.4, OutputMode::InMemory)
        .await
        .unwrap()
        .into_clip()
        .unwrap();
    assert!((crossfaded.duration() - 1.6).abs() < 1.0 / 30.0);

    if !VideoEncoder::ffmpeg_available() {
        return;
    }
    let saved = merger.merge(clip.clone(), clip, 0.0, OutputMode::Save).await.unwrap();
    let info = VideoLoader::probe(saved.path().unwrap()).unwrap();
    assert_eq!((info.width, info.height), (1280, 720));
    assert!((info.fps - 30.0).abs() < 0.01);
    assert!((info.duration - 2.0).abs() < 0.1);
}

#[tokio::test]
async fn short_audio_is_looped_under_a_longer_video() {
    let dir = tempdir().unwrap();
    let merger = AudioVideoMerger::from_config(&config_in(dir.path())).unwrap();
    let clip = VideoClip::solid([255, 0, 0], (320, 240), 1.0, 24.0);

    let merged = merger
        .merge(clip.clone(), sine(22050, 0.5), DEFAULT_OUTPUT_NAME, OutputMode::InMemory, None)
        .await
        .unwrap()
        .into_clip()
        .unwrap();
    let audio = merged.audio().unwrap();
    assert!((audio.duration() - 1.0).abs() < 1e-3);

    let trimmed = merger
        .merge(clip.clone(), sine(22050, 3.0), DEFAULT_OUTPUT_NAME, OutputMode::InMemory, None)
        .await
        .unwrap()
        .into_clip()
        .unwrap();
    assert!((trimmed.audio().unwrap().duration() - 1.0).abs() < 1e-3);

    let exact = sine(22050, 1.0);
    let unchanged = merger
        .merge(clip, exact.clone(), DEFAULT_OUTPUT_NAME, OutputMode::InMemory, None)
        .await
        .unwrap()
        .into_clip()
        .unwrap();
    assert_eq!(unchanged.audio(), Some(&exact));
}

#[tokio::test]
async fn full_pipeline_in_memory_then_saved() {
    if !VideoEncoder::ffmpeg_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let audio = AudioEnhancer::from_config(&config).unwrap();
    let video = clipsmith::VideoEnhancer::from_config(&config).unwrap();
    let merger = AudioVideoMerger::from_config(&config).unwrap();

    let quieter = audio
        .decrease_volume(sine(22050, 0.5), -10.0, OutputMode::InMemory)
        .await
        .unwrap();
    let graded = video
        .adjust_color(
            VideoClip::solid([90, 120, 200], (320, 240), 1.0, 24.0),
            1.1,
            1.2,
            1.3,
            OutputMode::InMemory,
        )
        .await
        .unwrap();
    let fps = graded.clip().map(|clip| clip.fps());

    let output = merger
        .merge(graded, quieter, "final_output.mp4", OutputMode::Save, fps)
        .await
        .unwrap();
    let info = VideoLoader::probe(output.path().unwrap()).unwrap();
    assert!(info.has_audio);
    assert!((info.fps - 24.0).abs() < 0.01);
}
