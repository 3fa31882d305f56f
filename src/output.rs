//! Shared output handling: whether an operation keeps its result in memory or
//! writes it to disk, and how written files are named.

use std::path::{Path, PathBuf};

/// What an operation does with its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Hand the result back for further chaining
    #[default]
    InMemory,

    /// Write the result into the component's output directory
    Save,
}

impl OutputMode {
    pub fn is_save(self) -> bool {
        matches!(self, Self::Save)
    }
}

impl From<bool> for OutputMode {
    fn from(save: bool) -> Self {
        if save {
            Self::Save
        } else {
            Self::InMemory
        }
    }
}

/// Format a numeric parameter for use in a file name.
///
/// Whole numbers keep one decimal place (`5.0`, not `5`) so names stay stable
/// regardless of how the value was typed.
pub fn format_param<T>(value: T) -> String
where
    T: Into<f64> + std::fmt::Display + Copy,
{
    let wide: f64 = value.into();
    if wide.is_finite() && wide.fract() == 0.0 {
        format!("{:.1}", wide)
    } else {
        format!("{}", value)
    }
}

/// Build `<dir>/<base>_<suffix>.<ext>`
pub fn derived_path(dir: &Path, base: &str, suffix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", base, suffix, extension))
}

/// File stem of a path, or `fallback` when there is none
pub fn base_name(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Lower-cased extension of a path, if any
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_param_keeps_one_decimal() {
        assert_eq!(format_param(5.0), "5.0");
        assert_eq!(format_param(-14.0), "-14.0");
        assert_eq!(format_param(1.25), "1.25");
        assert_eq!(format_param(0.5), "0.5");
        assert_eq!(format_param(1.1f32), "1.1");
    }

    #[test]
    fn test_derived_path() {
        let path = derived_path(Path::new("out"), "song", "volup5.0", "wav");
        assert_eq!(path, PathBuf::from("out/song_volup5.0.wav"));
    }

    #[test]
    fn test_base_name_fallback() {
        assert_eq!(base_name(Path::new("/music/track.final.mp3"), "audio"), "track.final");
        assert_eq!(base_name(Path::new(""), "audio"), "audio");
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("Clip.MP4")), Some("mp4".to_string()));
        assert_eq!(extension_of(Path::new("noext")), None);
    }

    #[test]
    fn test_mode_from_bool() {
        assert_eq!(OutputMode::from(true), OutputMode::Save);
        assert!(!OutputMode::from(false).is_save());
    }
}
