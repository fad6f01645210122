//! Frame loop
//!
//! One iteration per frame: poll the console, apply input to the view, feed
//! the visibility trigger through the scene, load the current step and draw.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::console::{Command, CommandChannel, ConsoleEvent};
use crate::render::RenderBackend;
use crate::scene::Scene;
use crate::view::{InputSnapshot, Key, ViewState};

/// Frame loop settings
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Target frame duration; also the `dt` handed to the view
    pub frame_time: Duration,
    /// Step forward every frame
    pub play: bool,
    pub max_frames: Option<u64>,
    /// Viewport width / height
    pub aspect: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_time: Duration::from_millis(20),
            play: false,
            max_frames: None,
            aspect: 4.0 / 3.0,
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    EndOfInput,
    FrameLimit,
}

/// Run frames until the console ends or the frame limit is reached.
/// Console replies are written to `out`.
pub fn run<W: Write>(
    scene: &mut Scene,
    renderer: &mut dyn RenderBackend,
    view: &mut ViewState,
    console: &CommandChannel,
    config: &LoopConfig,
    out: &mut W,
) -> io::Result<LoopExit> {
    let dt = config.frame_time.as_secs_f32();
    let mut frames = 0u64;

    loop {
        let started = Instant::now();

        let mut input = InputSnapshot::default();
        if config.play {
            input.held.insert(Key::StepForward);
        }

        match console.poll() {
            Some(ConsoleEvent::EndOfInput) => {
                log::info!("Console closed after {} frames", frames);
                return Ok(LoopExit::EndOfInput);
            }
            Some(ConsoleEvent::Line(line)) => {
                handle_command(Command::parse(&line), scene, renderer, view, out)?;
            }
            None => {}
        }

        view.update(&input, dt, scene.total_steps());
        scene.apply_trigger(input.trigger, renderer);
        scene.set_step(view.step, renderer);
        scene.draw(renderer, &view.view_projection(config.aspect));

        if let Some(error) = renderer.last_error() {
            log::error!("Render error: {}", error);
        }

        frames += 1;
        if config.max_frames.is_some_and(|max| frames >= max) {
            return Ok(LoopExit::FrameLimit);
        }

        let elapsed = started.elapsed();
        if elapsed < config.frame_time {
            thread::sleep(config.frame_time - elapsed);
        }
    }
}

fn handle_command<W: Write>(
    command: Command,
    scene: &mut Scene,
    renderer: &mut dyn RenderBackend,
    view: &mut ViewState,
    out: &mut W,
) -> io::Result<()> {
    match command {
        Command::LastError => match renderer.last_error() {
            Some(error) => writeln!(out, "{}", error)?,
            None => writeln!(out, "no error")?,
        },
        Command::ProgramLog => writeln!(out, "{}", renderer.program_log())?,
        Command::Frame(step) => view.step = step,
        Command::Next => view.step += 1,
        Command::Prev => view.step = view.step.saturating_sub(1),
        Command::Toggle(trigger) => scene.toggle(trigger, renderer),
        Command::Status => writeln!(out, "{}", scene.status_line())?,
        Command::Unknown(line) => writeln!(out, "{}", line)?,
    }
    out.flush()
}
