use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "wavescope")]
#[command(about = "Replays simulation probe, field and voxel data", long_about = None)]
pub struct Args {
    /// Path to the project JSON file
    pub path: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Advance one simulation step per frame
    #[arg(long)]
    pub play: bool,

    /// Frame rate cap
    #[arg(long, default_value_t = 50, value_name = "FPS")]
    pub fps: u32,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Target duration of one frame
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["wavescope", "project.json"]).expect("Failed to parse");
        assert_eq!(args.path, PathBuf::from("project.json"));
        assert!(!args.verbose);
        assert!(!args.play);
        assert_eq!(args.max_frames, None);
        assert_eq!(args.frame_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_zero_fps_does_not_divide_by_zero() {
        let args = Args::try_parse_from(["wavescope", "p.json", "--fps", "0", "--max-frames", "3"])
            .expect("Failed to parse");
        assert_eq!(args.frame_time(), Duration::from_secs(1));
        assert_eq!(args.max_frames, Some(3));
    }

    #[test]
    fn test_path_required() {
        assert!(Args::try_parse_from(["wavescope"]).is_err());
    }
}
