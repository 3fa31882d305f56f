use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::output::extension_of;

/// Which kind of media a path prompt accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Accepted extensions, lower case and without the dot
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Audio => &["mp3", "wav", "m4a", "flac"],
            Self::Video => &["mp4", "mov", "avi", "mkv"],
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    fn label(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// Line-oriented console over any reader/writer pair
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Print `prompt: ` and read one trimmed line.
    ///
    /// End of input is reported as [`AppError::InputClosed`].
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(AppError::InputClosed.into());
        }
        Ok(line.trim().to_string())
    }

    pub fn ask_number(&mut self, prompt: &str) -> Result<f64> {
        let answer = self.ask(prompt)?;
        answer
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| AppError::InvalidNumber { input: answer }.into())
    }

    /// Ask until the user names an existing file of the right kind and
    /// confirms it with `y`
    pub fn ask_path(&mut self, prompt: &str, kind: MediaKind) -> Result<PathBuf> {
        loop {
            let answer = self.ask(prompt)?;
            let path = PathBuf::from(answer.trim_matches('"').trim());

            if !path.exists() {
                self.say("❌ File not found! Try again.")?;
                continue;
            }

            if !kind.accepts(&path) {
                self.say(format!(
                    "⚠️ That's not an {} file! Please provide a valid {} format.",
                    kind.label(),
                    kind.label()
                ))?;
                continue;
            }

            let confirm = self.ask(&format!("✅ Confirm file: {} ? (y/n)", path.display()))?;
            if confirm.eq_ignore_ascii_case("y") {
                return Ok(path);
            }
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
