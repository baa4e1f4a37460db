//! FFmpeg-backed audio transcoder
//!
//! Every backend's output is normalized to MP3 through a single external
//! encoding pipeline. Input is either a buffered payload (bridge WAV or raw
//! PCM) or a live stream from a local engine's stdout.

use crate::error::TtsError;
use bytes::Bytes;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Input description for a transcode run
///
/// Raw PCM carries its sample metadata on the side since the stream has no
/// container to declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeInput {
    Wav,
    RawPcm {
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    },
}

/// Wrapper around one external FFmpeg pipeline
pub struct AudioTranscoder {
    ffmpeg: PathBuf,
}

impl AudioTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Probe whether the encoder binary can be executed at all
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Encode a buffered payload to MP3
    pub async fn encode(&self, data: Bytes, input: TranscodeInput) -> Result<Bytes, TtsError> {
        if data.is_empty() {
            return Err(TtsError::Transcode("input audio is empty".to_string()));
        }

        let mut child = self.spawn(input)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Transcode("failed to open encoder stdin".to_string()))?;

        // Feed stdin from a separate task so a full stdout pipe cannot
        // deadlock the encoder against us.
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&data).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TtsError::Transcode(format!("encoder did not complete: {}", e)))?;

        if let Ok(Err(e)) = writer.await {
            // A closed pipe here usually means ffmpeg already rejected the
            // stream; prefer its stderr below if it failed.
            debug!("encoder stdin write ended early: {}", e);
        }

        self.finish(output)
    }

    /// Encode a live stream (a local engine's stdout) to MP3
    ///
    /// The source is consumed to completion; the caller still owns the
    /// producing child process and checks its exit status.
    pub async fn encode_stream<R>(
        &self,
        mut source: R,
        input: TranscodeInput,
    ) -> Result<Bytes, TtsError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut child = self.spawn(input)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Transcode("failed to open encoder stdin".to_string()))?;

        let pump = tokio::spawn(async move {
            let result = tokio::io::copy(&mut source, &mut stdin).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TtsError::Transcode(format!("encoder did not complete: {}", e)))?;

        if let Ok(Err(e)) = pump.await {
            debug!("engine-to-encoder pipe ended early: {}", e);
        }

        self.finish(output)
    }

    fn spawn(&self, input: TranscodeInput) -> Result<tokio::process::Child, TtsError> {
        let mut cmd = Command::new(&self.ffmpeg);

        match input {
            TranscodeInput::Wav => {
                cmd.args(["-f", "wav"]);
            }
            TranscodeInput::RawPcm {
                sample_rate,
                bit_depth,
                channels,
            } => {
                // Signed little-endian samples; the stream itself carries no
                // format information.
                cmd.arg("-f").arg(format!("s{}le", bit_depth));
                cmd.arg("-ar").arg(sample_rate.to_string());
                cmd.arg("-ac").arg(channels.to_string());
            }
        }

        cmd.args(["-i", "pipe:0"]);
        cmd.args(Self::adaptive_mp3_settings());
        cmd.args(["-f", "mp3", "pipe:1", "-y"]);

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            warn!("failed to spawn ffmpeg: {}", e);
            TtsError::Transcode(format!("failed to spawn ffmpeg: {}", e))
        })
    }

    /// Adaptive MP3 settings: VBR quality over a fixed bitrate, forced mono,
    /// and no explicit sample rate so the encoder picks one from the input.
    pub fn adaptive_mp3_settings() -> [&'static str; 10] {
        [
            "-acodec",
            "mp3",
            "-q:a",
            "2",
            "-compression_level",
            "2",
            "-joint_stereo",
            "1",
            "-ac",
            "1",
        ]
    }

    fn finish(&self, output: std::process::Output) -> Result<Bytes, TtsError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TtsError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                truncate(&stderr, 500)
            )));
        }

        if output.stdout.is_empty() {
            return Err(TtsError::Transcode(
                "ffmpeg produced no audio output".to_string(),
            ));
        }

        Ok(Bytes::from(output.stdout))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
