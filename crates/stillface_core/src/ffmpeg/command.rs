//! ffmpeg argument builders.
//!
//! Every builder is a pure function returning the arguments that follow
//! the program name, so the exact command line can be checked without
//! running ffmpeg.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::config::StackingSettings;
use crate::models::Camera;
use crate::timestamps::TimeRange;

/// Leading arguments of every invocation: quiet, errors only, overwrite.
const BASE_ARGS: [&str; 4] = ["-hide_banner", "-loglevel", "error", "-y"];

/// Filter stacking four inputs as a 2x2 grid.
const GRID_FILTER: &str = "[0:v][1:v]hstack=inputs=2[top];\
                           [2:v][3:v]hstack=inputs=2[bottom];\
                           [top][bottom]vstack=inputs=2[v]";

/// Filter stacking two inputs top/bottom.
const VSTACK_FILTER: &str = "[0:v][1:v]vstack=inputs=2[v]";

/// An ffmpeg argument list and the file it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    args: Vec<OsString>,
    output: PathBuf,
}

impl FfmpegCommand {
    fn new(output: &Path) -> Self {
        Self {
            args: BASE_ARGS.iter().map(OsString::from).collect(),
            output: output.to_path_buf(),
        }
    }

    fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Finish with the output path as the last argument.
    fn finish(self) -> Self {
        let output = self.output.clone();
        self.arg(output)
    }

    /// Arguments after the program name.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// File written by this command.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Human-readable command line for logs.
    ///
    /// Arguments containing spaces or filter syntax are single-quoted.
    pub fn to_command_line(&self, program: &str) -> String {
        let mut parts = vec![program.to_string()];
        parts.extend(self.args.iter().map(|a| {
            let s = a.to_string_lossy();
            if s.contains([' ', '[', ';']) {
                format!("'{}'", s)
            } else {
                s.to_string()
            }
        }));
        parts.join(" ")
    }
}

/// Cut `range` out of `input` into `output`.
///
/// Seeks before the input (`-ss`) and limits the duration (`-t`). With
/// `reencode = false` streams are copied, which snaps the start to the
/// nearest keyframe.
pub fn cut_command(input: &Path, output: &Path, range: &TimeRange, reencode: bool) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output)
        .arg("-ss")
        .arg(range.start().to_string())
        .arg("-i")
        .arg(input)
        .arg("-t")
        .arg(range.duration_secs().to_string());

    let cmd = if reencode {
        cmd.args(["-c:v", "libx264", "-c:a", "aac"])
    } else {
        cmd.args(["-c", "copy"])
    };

    cmd.finish()
}

/// Stack `top` over `bottom`, keeping the audio of input `audio_input` (0 or 1).
pub fn vstack_command(top: &Path, bottom: &Path, output: &Path, audio_input: usize) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .arg("-i")
        .arg(top)
        .arg("-i")
        .arg(bottom)
        .args(["-filter_complex", VSTACK_FILTER, "-map", "[v]", "-map"])
        .arg(format!("{}:a", audio_input))
        .finish()
}

/// Options for the black placeholder of a missing grid camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: u32,
    pub audio_source: Camera,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self::from(&StackingSettings::default())
    }
}

impl From<&StackingSettings> for GridOptions {
    fn from(settings: &StackingSettings) -> Self {
        Self {
            width: settings.placeholder_width,
            height: settings.placeholder_height,
            fps: settings.placeholder_fps,
            duration_secs: settings.placeholder_duration_secs,
            audio_source: settings.audio_source,
        }
    }
}

/// A 2x2 grid command and the camera whose audio it keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCommand {
    pub command: FfmpegCommand,
    pub audio_from: Option<Camera>,
}

/// Build the 2x2 grid of one phase.
///
/// Inputs are placed in [`Camera::GRID_ORDER`]; a camera missing from
/// `clips` is replaced by a black lavfi source. Audio comes from
/// `options.audio_source` when present, otherwise from the first present
/// camera in [`Camera::AUDIO_PRIORITY`]. Returns `None` when no camera is
/// present at all.
pub fn grid_command(
    clips: &BTreeMap<Camera, PathBuf>,
    output: &Path,
    options: &GridOptions,
) -> Option<GridCommand> {
    if !Camera::GRID_ORDER.iter().any(|c| clips.contains_key(c)) {
        return None;
    }

    let placeholder = format!(
        "color=black:size={}x{}:rate={}:duration={}",
        options.width, options.height, options.fps, options.duration_secs
    );

    let mut cmd = FfmpegCommand::new(output);
    for camera in Camera::GRID_ORDER {
        cmd = match clips.get(&camera) {
            Some(path) => cmd.arg("-i").arg(path),
            None => cmd.args(["-f", "lavfi", "-i"]).arg(&placeholder),
        };
    }

    let audio_from = std::iter::once(options.audio_source)
        .chain(Camera::AUDIO_PRIORITY)
        .find(|c| clips.contains_key(c));

    cmd = cmd.args(["-filter_complex", GRID_FILTER, "-map", "[v]"]);

    if let Some(camera) = audio_from {
        let index = Camera::GRID_ORDER
            .iter()
            .position(|c| *c == camera)
            .unwrap_or_default();
        // `?` keeps the command valid when the clip has no audio stream
        cmd = cmd.arg("-map").arg(format!("{}:a?", index));
    }

    Some(GridCommand {
        command: cmd.arg("-shortest").finish(),
        audio_from,
    })
}

/// Grab a single frame at `at_secs` as an image.
pub fn thumbnail_command(input: &Path, at_secs: f64, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .arg("-ss")
        .arg(format!("{:.3}", at_secs.max(0.0)))
        .arg("-i")
        .arg(input)
        .args(["-frames:v", "1"])
        .finish()
}

/// ffprobe arguments printing the container duration in seconds.
pub fn duration_probe_args(input: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(input.as_os_str().to_os_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(cmd: &FfmpegCommand) -> Vec<String> {
        cmd.get_args()
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    fn clips(cameras: &[Camera]) -> BTreeMap<Camera, PathBuf> {
        cameras
            .iter()
            .map(|c| (*c, PathBuf::from(format!("/out/{}_play.mp4", c))))
            .collect()
    }

    #[test]
    fn cut_uses_stream_copy() {
        let range: TimeRange = "00:10-03:10".parse().unwrap();
        let cmd = cut_command(
            Path::new("/synced/baby.mp4"),
            Path::new("/out/baby_baseline.mp4"),
            &range,
            false,
        );

        assert_eq!(
            strs(&cmd),
            vec![
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-ss",
                "00:10",
                "-i",
                "/synced/baby.mp4",
                "-t",
                "180",
                "-c",
                "copy",
                "/out/baby_baseline.mp4",
            ]
        );
        assert_eq!(cmd.output(), Path::new("/out/baby_baseline.mp4"));
    }

    #[test]
    fn cut_can_reencode() {
        let range: TimeRange = "01:00-01:30".parse().unwrap();
        let args = strs(&cut_command(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &range,
            true,
        ));
        assert!(args.contains(&"libx264".to_string()));
        assert!(!args.contains(&"copy".to_string()));
    }

    #[test]
    fn vstack_maps_bottom_audio() {
        let args = strs(&vstack_command(
            Path::new("mother.mp4"),
            Path::new("baby.mp4"),
            Path::new("mb.mp4"),
            1,
        ));
        let pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[pos + 1], "[0:v][1:v]vstack=inputs=2[v]");
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a"));
        assert_eq!(args.last().unwrap(), "mb.mp4");
    }

    #[test]
    fn grid_with_all_cameras() {
        let grid = grid_command(
            &clips(&Camera::ALL),
            Path::new("/vis/session_play.mp4"),
            &GridOptions::default(),
        )
        .unwrap();
        let args = strs(&grid.command);

        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(
            inputs,
            vec![
                "/out/mother_play.mp4",
                "/out/window_play.mp4",
                "/out/baby_play.mp4",
                "/out/door_play.mp4",
            ]
        );
        assert_eq!(grid.audio_from, Some(Camera::Baby));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "2:a?"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!args.contains(&"lavfi".to_string()));
    }

    #[test]
    fn grid_fills_missing_camera_with_black() {
        let grid = grid_command(
            &clips(&[Camera::Mother, Camera::Baby, Camera::Door]),
            Path::new("grid.mp4"),
            &GridOptions::default(),
        )
        .unwrap();
        let args = strs(&grid.command);

        // Window is input 1
        let inputs: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(inputs[1], "color=black:size=1920x1080:rate=60:duration=300");
        assert_eq!(args.iter().filter(|a| *a == "lavfi").count(), 1);
    }

    #[test]
    fn grid_audio_falls_back_by_priority() {
        let grid = grid_command(
            &clips(&[Camera::Window, Camera::Mother]),
            Path::new("grid.mp4"),
            &GridOptions::default(),
        )
        .unwrap();

        // Baby missing: mother is next in priority and sits at index 0
        assert_eq!(grid.audio_from, Some(Camera::Mother));
        let args = strs(&grid.command);
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
    }

    #[test]
    fn grid_honours_configured_audio_source() {
        let options = GridOptions {
            audio_source: Camera::Door,
            ..GridOptions::default()
        };
        let grid = grid_command(&clips(&Camera::ALL), Path::new("grid.mp4"), &options).unwrap();
        assert_eq!(grid.audio_from, Some(Camera::Door));
        let args = strs(&grid.command);
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "3:a?"));
    }

    #[test]
    fn grid_without_inputs_is_none() {
        assert!(grid_command(&BTreeMap::new(), Path::new("grid.mp4"), &GridOptions::default())
            .is_none());
    }

    #[test]
    fn thumbnail_grabs_one_frame() {
        let args = strs(&thumbnail_command(
            Path::new("session_stillface.mp4"),
            61.5,
            Path::new("thumb.png"),
        ));
        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "61.500"));
        assert!(args.windows(2).any(|w| w[0] == "-frames:v" && w[1] == "1"));
    }

    #[test]
    fn command_line_quotes_filters() {
        let cmd = vstack_command(
            Path::new("a.mp4"),
            Path::new("b.mp4"),
            Path::new("c.mp4"),
            1,
        );
        let line = cmd.to_command_line("ffmpeg");
        assert!(line.starts_with("ffmpeg -hide_banner"));
        assert!(line.contains("'[0:v][1:v]vstack=inputs=2[v]'"));
    }
}
