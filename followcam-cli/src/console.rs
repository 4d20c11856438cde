//! Terminal operator surface: stdin commands, region prompts, PNG preview.
//!
//! stdin is read on its own thread so `poll` never blocks the frame loop.
//! Commands and region answers share that one line stream.

use followcam::{
    CommandSource, FollowCamResult, OperatorCommand, Preview, Region, RegionSelector,
    SelectionPrompt,
};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::cell::RefCell;
use std::io::BufRead;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{info, warn};

type Lines = Rc<RefCell<Receiver<String>>>;

/// Starts the stdin reader thread and returns the shared line stream.
pub fn stdin_lines() -> Lines {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    Rc::new(RefCell::new(rx))
}

fn parse_command(line: &str) -> Option<OperatorCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" => Some(OperatorCommand::Quit),
        "s" | "recalibrate" => Some(OperatorCommand::Recalibrate),
        "a" | "add" => Some(OperatorCommand::AddTemplate),
        _ => None,
    }
}

/// `q`/`s`/`a` commands typed on stdin.
pub struct ConsoleCommands {
    lines: Option<Lines>,
}

impl ConsoleCommands {
    pub fn new(lines: Option<Lines>) -> Self {
        Self { lines }
    }
}

impl CommandSource for ConsoleCommands {
    fn poll(&mut self) -> Option<OperatorCommand> {
        let lines = self.lines.as_ref()?;
        loop {
            let received = lines.borrow().try_recv();
            let line = match received {
                Ok(line) => line,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.lines = None;
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(command) => return Some(command),
                None => warn!(input = line.trim(), "unknown command (q, s, a)"),
            }
        }
    }
}

/// Region prompts answered with `x y w h` on stdin.
///
/// The frame to select on is written to `snapshot` first. A preset region
/// answers the initial prompt without asking.
pub struct ConsoleSelector {
    lines: Option<Lines>,
    snapshot: PathBuf,
    initial: Option<Region>,
}

impl ConsoleSelector {
    pub fn new(lines: Option<Lines>, snapshot: PathBuf, initial: Option<Region>) -> Self {
        Self {
            lines,
            snapshot,
            initial,
        }
    }
}

impl RegionSelector for ConsoleSelector {
    fn request_region(&mut self, frame: &RgbImage, prompt: SelectionPrompt) -> Option<Region> {
        if prompt == SelectionPrompt::Initial {
            if let Some(region) = self.initial.take() {
                return Some(region);
            }
        }
        let Some(lines) = self.lines.as_ref() else {
            warn!(?prompt, "no operator console; selection skipped");
            return None;
        };

        if let Err(err) = frame.save(&self.snapshot) {
            warn!(%err, path = %self.snapshot.display(), "failed to write selection snapshot");
        }
        let what = match prompt {
            SelectionPrompt::Initial => "draw the subject",
            SelectionPrompt::Recalibrate => "re-center the camera",
            SelectionPrompt::AddTemplate => "add a reference pose",
        };
        info!(
            snapshot = %self.snapshot.display(),
            width = frame.width(),
            height = frame.height(),
            "{what}: enter `x y w h` (empty line cancels)"
        );

        loop {
            let Ok(line) = lines.borrow().recv() else {
                return None;
            };
            if line.trim().is_empty() {
                return None;
            }
            match line.parse::<Region>() {
                Ok(region) => return Some(region),
                Err(reason) => warn!(%reason, "invalid region, try again"),
            }
        }
    }
}

/// Rewrites a PNG file with the latest annotated output frame.
pub struct PngPreview {
    path: PathBuf,
    height: u32,
}

impl PngPreview {
    pub fn new(path: PathBuf, height: u32) -> Self {
        Self { path, height }
    }
}

impl Preview for PngPreview {
    fn show(&mut self, frame: &RgbImage) -> FollowCamResult<()> {
        let shown = if self.height > 0 && self.height < frame.height() {
            let width = (u64::from(frame.width()) * u64::from(self.height)
                / u64::from(frame.height()))
            .max(1) as u32;
            imageops::resize(frame, width, self.height, FilterType::Triangle)
        } else {
            frame.clone()
        };
        // A stale preview is not worth aborting the render for.
        if let Err(err) = shown.save(&self.path) {
            warn!(%err, path = %self.path.display(), "preview write failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_command, ConsoleCommands, ConsoleSelector};
    use followcam::{CommandSource, OperatorCommand, Region, RegionSelector, SelectionPrompt};
    use image::RgbImage;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;

    #[test]
    fn command_letters() {
        assert_eq!(parse_command("q"), Some(OperatorCommand::Quit));
        assert_eq!(parse_command(" S \n"), Some(OperatorCommand::Recalibrate));
        assert_eq!(parse_command("a"), Some(OperatorCommand::AddTemplate));
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn poll_skips_noise_and_never_blocks() {
        let (tx, rx) = mpsc::channel();
        let lines = Rc::new(RefCell::new(rx));
        let mut commands = ConsoleCommands::new(Some(lines));
        assert_eq!(commands.poll(), None);
        tx.send(String::new()).unwrap();
        tx.send("zzz".to_string()).unwrap();
        tx.send("a".to_string()).unwrap();
        assert_eq!(commands.poll(), Some(OperatorCommand::AddTemplate));
        assert_eq!(commands.poll(), None);
    }

    #[test]
    fn preset_region_answers_initial_prompt_only() {
        let frame = RgbImage::new(4, 4);
        let region = Region::new(1, 1, 2, 2);
        let mut selector = ConsoleSelector::new(None, "unused.png".into(), Some(region));
        assert_eq!(
            selector.request_region(&frame, SelectionPrompt::Initial),
            Some(region)
        );
        assert_eq!(
            selector.request_region(&frame, SelectionPrompt::Recalibrate),
            None
        );
    }

    #[test]
    fn region_prompt_retries_then_cancels() {
        let dir = std::env::temp_dir().join("followcam-console-test.png");
        let (tx, rx) = mpsc::channel();
        let lines = Rc::new(RefCell::new(rx));
        let mut selector = ConsoleSelector::new(Some(lines), dir, None);
        tx.send("nope".to_string()).unwrap();
        tx.send("10, 20, 30, 40".to_string()).unwrap();
        tx.send(String::new()).unwrap();
        let frame = RgbImage::new(64, 64);
        assert_eq!(
            selector.request_region(&frame, SelectionPrompt::AddTemplate),
            Some(Region::new(10, 20, 30, 40))
        );
        assert_eq!(
            selector.request_region(&frame, SelectionPrompt::Recalibrate),
            None
        );
    }
}
