//! Video decoding and encoding through `ffmpeg` child processes.
//!
//! Frames cross the process boundary as packed `rgb24` rawvideo, so no codec
//! library is linked. Both ends kill and reap their child on drop if the
//! stream was not finished normally.

pub mod probe;

pub use probe::{parse_probe_json, probe_video, VideoInfo};

use crate::pipeline::{FrameSink, FrameSource};
use crate::trace::{trace_event, trace_warn};
use crate::util::{FollowCamError, FollowCamResult};
use ::image::RgbImage;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_error(program: &str, err: io::Error) -> FollowCamError {
    if err.kind() == ErrorKind::NotFound {
        FollowCamError::Ffmpeg {
            reason: format!("{program} not found on PATH"),
        }
    } else {
        FollowCamError::Ffmpeg {
            reason: format!("failed to start {program}: {err}"),
        }
    }
}

fn reap(child: &mut Child) {
    // kill fails only if the child already exited; wait reaps it either way.
    let _ = child.kill();
    let _ = child.wait();
}

/// Decodes a video file into full-resolution RGB frames.
pub struct FfmpegSource {
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    frame_len: usize,
}

impl FfmpegSource {
    /// Probes `path` and starts decoding it.
    pub fn open(path: &Path) -> FollowCamResult<Self> {
        let info = probe_video(path)?;
        let mut child = Command::new("ffmpeg")
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child);
                return Err(FollowCamError::Ffmpeg {
                    reason: "decoder stdout unavailable".to_string(),
                });
            }
        };

        Ok(Self {
            info,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            frame_len: info.width as usize * info.height as usize * 3,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> FollowCamResult<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }

        if filled == 0 {
            self.stdout = None;
            if let Some(mut child) = self.child.take() {
                let status = child.wait()?;
                if !status.success() {
                    return Err(FollowCamError::SourceUnreadable {
                        reason: format!("decoder exited with {status}"),
                    });
                }
            }
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(FollowCamError::SourceUnreadable {
                reason: format!("truncated frame: {filled} of {} bytes", buf.len()),
            });
        }

        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or(FollowCamError::BufferTooSmall {
                needed: self.frame_len,
                got: filled,
            })
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
        }
    }
}

/// Encoder settings for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct EncoderSettings {
    /// Frame width fed to the encoder.
    pub width: u32,
    /// Frame height fed to the encoder.
    pub height: u32,
    /// Output frame rate.
    pub fps: f64,
    /// x264 preset.
    pub preset: String,
    /// x264 constant rate factor.
    pub crf: u8,
}

impl EncoderSettings {
    /// H.264 `veryfast`/CRF 20 for the given size and rate.
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            preset: "veryfast".to_string(),
            crf: 20,
        }
    }
}

/// Encodes RGB frames into an H.264 MP4 file.
pub struct FfmpegSink {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    written: u64,
}

impl FfmpegSink {
    /// Starts an encoder writing to `path` (overwritten if present).
    pub fn create(path: &Path, settings: &EncoderSettings) -> FollowCamResult<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(FollowCamError::InvalidDimensions {
                width: settings.width as usize,
                height: settings.height as usize,
            });
        }
        let size = format!("{}x{}", settings.width, settings.height);
        let rate = format!("{}", settings.fps);
        let crf = settings.crf.to_string();
        let mut child = Command::new("ffmpeg")
            .args(["-nostdin", "-y", "-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size, "-r", &rate])
            .args(["-i", "-", "-an", "-c:v", "libx264", "-preset", &settings.preset])
            .args(["-crf", &crf, "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                reap(&mut child);
                return Err(FollowCamError::Ffmpeg {
                    reason: "encoder stdin unavailable".to_string(),
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            width: settings.width,
            height: settings.height,
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            written: 0,
        })
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> FollowCamResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(FollowCamError::InvalidDimensions {
                width: frame.width() as usize,
                height: frame.height() as usize,
            });
        }
        let stdin = self.stdin.as_mut().ok_or_else(|| FollowCamError::Ffmpeg {
            reason: "encoder already finished".to_string(),
        })?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            if e.kind() == ErrorKind::BrokenPipe {
                FollowCamError::Ffmpeg {
                    reason: "encoder closed its input".to_string(),
                }
            } else {
                FollowCamError::Io(e)
            }
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> FollowCamResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };
        // stdin is dropped here, which closes the pipe and lets ffmpeg finalize.
        let status = child.wait()?;
        flushed?;
        if !status.success() {
            return Err(FollowCamError::Ffmpeg {
                reason: format!("encoder exited with {status}"),
            });
        }
        trace_event!("encoder_finished", frames = self.written);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            trace_warn!(path = %self.path.display(), "encoder dropped before finish");
            reap(&mut child);
        }
    }
}
