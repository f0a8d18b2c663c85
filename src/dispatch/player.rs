//! Playback backends.

use super::PlaybackConfig;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Errors that can occur while playing a sample.
#[derive(Debug)]
pub enum PlaybackError {
    /// The resolved asset does not exist
    Missing(PathBuf),
    /// The backend cannot play anything (e.g. player binary not found)
    Unavailable(String),
    /// Playback started but did not finish cleanly
    Failed { path: PathBuf, message: String },
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackError::Missing(path) => write!(f, "asset not found: {}", path.display()),
            PlaybackError::Unavailable(msg) => write!(f, "playback unavailable: {msg}"),
            PlaybackError::Failed { path, message } => {
                write!(f, "playback of {} failed: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Something that can play one sample file to completion.
///
/// Implementations are called from the playback workers and may block.
pub trait Player: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;

    fn name(&self) -> &str;
}

/// A player that only logs what it would play.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlayer;

impl Player for NullPlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        tracing::info!(asset = %path.display(), "play");
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Plays samples by running an external command with the asset path
/// appended, e.g. `["aplay", "-q"]`.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl CommandPlayer {
    /// Resolve the player program once, up front.
    pub fn new(command: &[String]) -> Result<Self, PlaybackError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PlaybackError::Unavailable("empty player command".to_string()))?;

        let resolved = resolve_program(program).ok_or_else(|| {
            PlaybackError::Unavailable(format!("player {program:?} not found on PATH"))
        })?;

        Ok(Self {
            program: resolved,
            args: args.to_vec(),
            label: command.join(" "),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Player for CommandPlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| PlaybackError::Failed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Failed {
                path: path.to_path_buf(),
                message: format!("player exited with {status}"),
            })
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

/// Build the player described by the configuration.
pub fn player_from_config(config: &PlaybackConfig) -> Result<Box<dyn Player>, PlaybackError> {
    match &config.command {
        Some(command) => Ok(Box::new(CommandPlayer::new(command)?)),
        None => Ok(Box::new(NullPlayer)),
    }
}
