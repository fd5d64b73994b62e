//! Two-stem separation via demucs
//!
//! The tool's output layout is a fixed convention:
//! `<out_root>/<model>/<input-stem>/{vocals.wav,no_vocals.wav}`. Output paths
//! are computed from the input filename rather than scanning the tree, so the
//! caller must keep `out_root` unique per job.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Separation model passed to demucs.
const SEPARATION_MODEL: &str = "htdemucs_ft";

/// Separation stage errors
#[derive(Debug, Error)]
pub enum SeparationError {
    /// Could not start the external tool
    #[error("failed to launch demucs: {0}")]
    Launch(#[from] std::io::Error),

    /// Tool exited non-zero; carries its diagnostic output
    #[error("demucs failed: {0}")]
    ToolFailed(String),

    /// Tool exited zero but an expected track is missing
    #[error("expected output track missing: {0}")]
    MissingTrack(PathBuf),

    /// Input filename has no usable stem component
    #[error("input file has no basename: {0}")]
    BadInput(PathBuf),
}

/// Local locations of the two separated tracks.
#[derive(Debug, Clone)]
pub struct SeparatedStems {
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

/// Compute where demucs will write the two tracks for `input` under `out_root`.
pub fn stem_output_paths(input: &Path, out_root: &Path) -> Result<SeparatedStems, SeparationError> {
    let base = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SeparationError::BadInput(input.to_path_buf()))?;

    let out_dir = out_root.join(SEPARATION_MODEL).join(base);
    Ok(SeparatedStems {
        vocals: out_dir.join("vocals.wav"),
        instrumental: out_dir.join("no_vocals.wav"),
    })
}

/// demucs wrapper producing vocals + instrumental from one input file.
#[derive(Debug, Clone, Default)]
pub struct DemucsSeparator {
    program_override: Option<PathBuf>,
}

impl DemucsSeparator {
    /// Substitute the separation executable. Used by tests to stand in a
    /// stub for `python3 -m demucs`.
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program_override = Some(program);
        self
    }

    fn base_command(&self) -> Command {
        match &self.program_override {
            Some(program) => Command::new(program),
            None => {
                let mut cmd = Command::new("python3");
                cmd.arg("-m").arg("demucs");
                cmd
            }
        }
    }

    /// Run the separation and return the two track paths, verified to exist.
    /// Any tool failure is fatal; partial output is never trusted.
    pub async fn separate(
        &self,
        input: &Path,
        out_root: &Path,
    ) -> Result<SeparatedStems, SeparationError> {
        info!(input = %input.display(), out_root = %out_root.display(), model = SEPARATION_MODEL, "Separation starting");

        let mut cmd = self.base_command();
        let output = cmd
            .arg("--two-stems=vocals")
            .arg("-n")
            .arg(SEPARATION_MODEL)
            .arg("-o")
            .arg(out_root)
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(input = %input.display(), %stderr, "demucs exited non-zero");
            return Err(SeparationError::ToolFailed(stderr.trim().to_string()));
        }

        let stems = stem_output_paths(input, out_root)?;
        for track in [&stems.vocals, &stems.instrumental] {
            if !track.exists() {
                return Err(SeparationError::MissingTrack(track.clone()));
            }
        }

        info!(vocals = %stems.vocals.display(), instrumental = %stems.instrumental.display(), "Separation complete");
        Ok(stems)
    }
}
