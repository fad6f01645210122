use log::{error, info, LevelFilter};

use wavescope::app::{self, LoopConfig, LoopExit};
use wavescope::cli::Args;
use wavescope::console::CommandChannel;
use wavescope::{HeadlessRenderer, ProjectConfig, Scene, ViewState};

fn main() {
    let args = Args::parse_args();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = match ProjectConfig::load(&args.path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut renderer = HeadlessRenderer::new();
    let mut scene = match Scene::build(&config, &mut renderer) {
        Ok(scene) => scene,
        Err(e) => {
            error!("Failed to build scene: {}", e);
            std::process::exit(1);
        }
    };

    let console = match CommandChannel::stdin() {
        Ok(console) => console,
        Err(e) => {
            error!("Failed to start console: {}", e);
            std::process::exit(1);
        }
    };

    let mut view = ViewState::new(config.scene_extent());
    let loop_config = LoopConfig {
        frame_time: args.frame_time(),
        play: args.play,
        max_frames: args.max_frames,
        ..Default::default()
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match app::run(
        &mut scene,
        &mut renderer,
        &mut view,
        &console,
        &loop_config,
        &mut out,
    ) {
        Ok(LoopExit::EndOfInput) => info!("Quit at step {}", view.step),
        Ok(LoopExit::FrameLimit) => info!("Frame limit reached at step {}", view.step),
        Err(e) => {
            error!("Console output failed: {}", e);
            std::process::exit(1);
        }
    }
}
