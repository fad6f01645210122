//! Line-oriented command console
//!
//! A reader thread forwards lines to the frame loop over a one-slot channel.
//! The loop polls once per frame and never waits on it.

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use std::io::{self, BufRead};
use std::thread;

use wavescope_data::MaterialId;

use crate::scene::Trigger;

/// What the reader thread delivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Line(String),
    /// `quit`, end of input, or a read failure
    EndOfInput,
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report the renderer's last error
    LastError,
    /// Dump the shader program log
    ProgramLog,
    /// Jump to a simulation step
    Frame(u64),
    Next,
    Prev,
    Toggle(Trigger),
    Status,
    /// Anything else; echoed back
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or("");
        let arg = words.next();
        let extra = words.next().is_some();

        let parsed = match (head, arg) {
            _ if extra => None,
            ("ge", None) => Some(Command::LastError),
            ("gi", None) => Some(Command::ProgramLog),
            ("next", None) => Some(Command::Next),
            ("prev", None) => Some(Command::Prev),
            ("status", None) => Some(Command::Status),
            ("frame", Some(n)) => n.parse().ok().map(Command::Frame),
            ("toggle", Some(target)) => parse_toggle(target).map(Command::Toggle),
            _ => None,
        };

        parsed.unwrap_or_else(|| Command::Unknown(line.to_string()))
    }
}

fn parse_toggle(target: &str) -> Option<Trigger> {
    match target {
        "driver" => Some(Trigger::Driver),
        "voxels" => Some(Trigger::VoxelMap),
        n => {
            let id: u8 = n.parse().ok()?;
            if id as usize > wavescope_data::material::PALETTE_SIZE {
                return None;
            }
            MaterialId::new(id).map(Trigger::Material)
        }
    }
}

/// Receiving end of the console thread
pub struct CommandChannel {
    receiver: Receiver<ConsoleEvent>,
}

impl CommandChannel {
    /// Spawn the reader thread over `input`.
    ///
    /// The thread is detached; it exits after sending `EndOfInput`, or when
    /// the channel is dropped.
    pub fn spawn<R>(input: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = bounded(1);

        thread::Builder::new()
            .name("console".to_string())
            .spawn(move || {
                for line in input.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            log::warn!("Console read failed: {}", e);
                            break;
                        }
                    };

                    if line.trim() == "quit" {
                        break;
                    }
                    if sender.send(ConsoleEvent::Line(line)).is_err() {
                        return;
                    }
                }
                let _ = sender.send(ConsoleEvent::EndOfInput);
            })?;

        Ok(Self { receiver })
    }

    /// Console reading standard input
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    /// Take the pending event, if any. A vanished reader counts as end of
    /// input.
    pub fn poll(&self) -> Option<ConsoleEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(ConsoleEvent::EndOfInput),
        }
    }

    /// Block until the next event. Only used where waiting is acceptable.
    pub fn recv(&self) -> ConsoleEvent {
        self.receiver.recv().unwrap_or(ConsoleEvent::EndOfInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn material(id: u8) -> Trigger {
        Trigger::Material(MaterialId::new(id).expect("non-zero material"))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ge"), Command::LastError);
        assert_eq!(Command::parse("gi"), Command::ProgramLog);
        assert_eq!(Command::parse("  frame 120 "), Command::Frame(120));
        assert_eq!(Command::parse("next"), Command::Next);
        assert_eq!(Command::parse("prev"), Command::Prev);
        assert_eq!(Command::parse("status"), Command::Status);
        assert_eq!(Command::parse("toggle 8"), Command::Toggle(material(8)));
        assert_eq!(Command::parse("toggle driver"), Command::Toggle(Trigger::Driver));
        assert_eq!(Command::parse("toggle voxels"), Command::Toggle(Trigger::VoxelMap));
    }

    #[test]
    fn test_unknown_lines_kept_verbatim() {
        for line in ["hello", "frame", "frame -1", "toggle 0", "toggle 9", "ge now", ""] {
            assert_eq!(Command::parse(line), Command::Unknown(line.to_string()));
        }
    }

    #[test]
    fn test_lines_then_end_of_input() {
        let channel =
            CommandChannel::spawn(Cursor::new("status\nnext\n")).expect("Failed to spawn console");

        assert_eq!(channel.recv(), ConsoleEvent::Line("status".to_string()));
        assert_eq!(channel.recv(), ConsoleEvent::Line("next".to_string()));
        assert_eq!(channel.recv(), ConsoleEvent::EndOfInput);
        // Reader has exited; the disconnect is reported as end of input too
        assert_eq!(channel.recv(), ConsoleEvent::EndOfInput);
    }

    #[test]
    fn test_quit_stops_reading() {
        let channel = CommandChannel::spawn(Cursor::new("quit\nstatus\n"))
            .expect("Failed to spawn console");

        assert_eq!(channel.recv(), ConsoleEvent::EndOfInput);
        assert_eq!(channel.recv(), ConsoleEvent::EndOfInput);
    }

    #[test]
    fn test_poll_reports_disconnect() {
        let channel = CommandChannel::spawn(Cursor::new("")).expect("Failed to spawn console");
        assert_eq!(channel.recv(), ConsoleEvent::EndOfInput);

        let mut polled = None;
        for _ in 0..100 {
            polled = channel.poll();
            if polled.is_some() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(polled, Some(ConsoleEvent::EndOfInput));
    }
}
