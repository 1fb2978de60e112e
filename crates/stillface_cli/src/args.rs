//! Command-line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use stillface_core::models::{Camera, PhaseTimestamps, SubjectId};
use stillface_core::timestamps::TimeRange;

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/stillface.toml";

/// Cut Still-Face recordings into baseline/play/stillface/reunion clips.
#[derive(Parser, Debug)]
#[command(name = "stillface")]
#[command(version, about)]
pub struct Cli {
    /// Config file (created with defaults if missing)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// ffmpeg executable to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Log the ffmpeg commands without running them
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a synced directory into phase clips
    Cut(CutArgs),
    /// Cut one subject's session from the database
    Session(SessionArgs),
    /// Rebuild the composites of an already cut session
    Stack(StackArgs),
    /// Extract the stillface thumbnail of one or all sessions
    Thumbnail(ThumbnailArgs),
}

/// Options shared by the cutting commands.
#[derive(Args, Debug, Default)]
pub struct CutOptions {
    /// Cameras to cut, comma separated (default: all)
    #[arg(long, value_delimiter = ',', value_name = "CAMERA")]
    pub cameras: Vec<Camera>,

    /// Only cut, do not build the composites
    #[arg(long = "no_stack", alias = "no-stack")]
    pub no_stack: bool,

    /// Re-encode instead of stream copy (frame-exact start)
    #[arg(long)]
    pub reencode: bool,
}

#[derive(Args, Debug)]
pub struct CutArgs {
    /// Directory with the synced <camera>.mp4 recordings
    #[arg(long = "synced_dir", alias = "synced-dir", value_name = "DIR")]
    pub synced_dir: PathBuf,

    #[arg(long = "baseline_timestamps", alias = "baseline-timestamps", value_name = "MM:SS-MM:SS")]
    pub baseline_timestamps: TimeRange,

    #[arg(long = "play_timestamps", alias = "play-timestamps", value_name = "MM:SS-MM:SS")]
    pub play_timestamps: TimeRange,

    #[arg(long = "stillface_timestamps", alias = "stillface-timestamps", value_name = "MM:SS-MM:SS")]
    pub stillface_timestamps: TimeRange,

    #[arg(long = "reunion_timestamps", alias = "reunion-timestamps", value_name = "MM:SS-MM:SS")]
    pub reunion_timestamps: TimeRange,

    /// Directory receiving the <camera>_<phase>.mp4 clips
    #[arg(long = "out_dir", alias = "out-dir", value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Directory receiving the composites (default: <out_dir>/visualize)
    #[arg(long = "visualize_dir", alias = "visualize-dir", value_name = "DIR")]
    pub visualize_dir: Option<PathBuf>,

    #[command(flatten)]
    pub options: CutOptions,
}

impl CutArgs {
    pub fn timestamps(&self) -> PhaseTimestamps {
        PhaseTimestamps::new(
            self.baseline_timestamps,
            self.play_timestamps,
            self.stillface_timestamps,
            self.reunion_timestamps,
        )
    }
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Subject ID (directory name under Sessions/)
    pub subject: SubjectId,

    #[arg(long, value_name = "MM:SS-MM:SS")]
    pub baseline: TimeRange,

    #[arg(long, value_name = "MM:SS-MM:SS")]
    pub play: TimeRange,

    #[arg(long, value_name = "MM:SS-MM:SS")]
    pub stillface: TimeRange,

    #[arg(long, value_name = "MM:SS-MM:SS")]
    pub reunion: TimeRange,

    /// Session database root (default: from config)
    #[arg(long = "db-dir", value_name = "DIR")]
    pub db_dir: Option<PathBuf>,

    #[command(flatten)]
    pub options: CutOptions,
}

impl SessionArgs {
    pub fn timestamps(&self) -> PhaseTimestamps {
        PhaseTimestamps::new(self.baseline, self.play, self.stillface, self.reunion)
    }
}

#[derive(Args, Debug)]
pub struct StackArgs {
    /// Subject ID (directory name under Sessions/)
    pub subject: SubjectId,

    /// Session database root (default: from config)
    #[arg(long = "db-dir", value_name = "DIR")]
    pub db_dir: Option<PathBuf>,

    /// Regenerate composites that already exist
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    /// Subject ID (default: every session in the database)
    pub subject: Option<SubjectId>,

    /// Session database root (default: from config)
    #[arg(long = "db-dir", value_name = "DIR")]
    pub db_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use stillface_core::models::Phase;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cut_accepts_underscore_flags() {
        let cli = Cli::parse_from([
            "stillface",
            "cut",
            "--synced_dir",
            "data/Sessions/686527/synced",
            "--baseline_timestamps",
            "00:10-03:10",
            "--play_timestamps",
            "03:20-06:20",
            "--stillface_timestamps",
            "06:30-08:30",
            "--reunion_timestamps",
            "08:40-11:40",
            "--out_dir",
            "data/Sessions/686527/processed",
        ]);

        let Commands::Cut(args) = cli.command else {
            panic!("expected cut subcommand");
        };
        assert_eq!(args.synced_dir, PathBuf::from("data/Sessions/686527/synced"));
        assert_eq!(args.out_dir, PathBuf::from("data/Sessions/686527/processed"));
        assert_eq!(args.timestamps().get(Phase::Baseline).duration_secs(), 180);
        assert_eq!(args.timestamps().get(Phase::Stillface).to_string(), "06:30-08:30");
        assert!(args.options.cameras.is_empty());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn cut_accepts_kebab_aliases_and_defaults_out_dir() {
        let cli = Cli::parse_from([
            "stillface",
            "--dry-run",
            "cut",
            "--synced-dir",
            "synced",
            "--baseline-timestamps",
            "00:00-01:00",
            "--play-timestamps",
            "01:00-02:00",
            "--stillface-timestamps",
            "02:00-03:00",
            "--reunion-timestamps",
            "03:00-04:00",
            "--cameras",
            "baby,mother",
        ]);

        assert!(cli.dry_run);
        let Commands::Cut(args) = cli.command else {
            panic!("expected cut subcommand");
        };
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!(args.options.cameras, vec![Camera::Baby, Camera::Mother]);
    }

    #[test]
    fn cut_rejects_bad_range() {
        let result = Cli::try_parse_from([
            "stillface",
            "cut",
            "--synced_dir",
            "synced",
            "--baseline_timestamps",
            "03:10-00:10",
            "--play_timestamps",
            "03:20-06:20",
            "--stillface_timestamps",
            "06:30-08:30",
            "--reunion_timestamps",
            "08:40-11:40",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn session_parses_subject_and_globals() {
        let cli = Cli::parse_from([
            "stillface",
            "session",
            "686527",
            "--baseline",
            "00:10-03:10",
            "--play",
            "03:20-06:20",
            "--stillface",
            "06:30-08:30",
            "--reunion",
            "08:40-11:40",
            "--db-dir",
            "/data/db",
            "-v",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.ffmpeg, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        let Commands::Session(args) = cli.command else {
            panic!("expected session subcommand");
        };
        assert_eq!(args.subject.as_str(), "686527");
        assert_eq!(args.db_dir, Some(PathBuf::from("/data/db")));
        assert_eq!(args.timestamps().get(Phase::Reunion).duration_secs(), 180);
    }

    #[test]
    fn thumbnail_subject_is_optional() {
        let cli = Cli::parse_from(["stillface", "thumbnail"]);
        assert!(matches!(cli.command, Commands::Thumbnail(ThumbnailArgs { subject: None, .. })));

        assert!(Cli::try_parse_from(["stillface", "stack", "../escape"]).is_err());
    }
}
