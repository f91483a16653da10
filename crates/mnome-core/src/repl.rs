//! Read-evaluate loop.
//!
//! [`Repl`] reads one line at a time on its own worker thread, splits off the
//! command name and hands the rest of the line to the [`CommandRegistry`].
//! Errors are printed and never end the loop.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::commands::CommandRegistry;
use crate::error::Result;
use crate::worker::{StopSignal, Worker};

/// Prompt printed before every line.
pub const DEFAULT_PROMPT: &str = "[mnome]: ";

/// Shared output handle for the loop and the command handlers.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Console writing to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    /// Console writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write `text` and flush.
    pub fn print(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            log::warn!("Failed to write to console: {}", e);
        }
    }

    /// Write `text` followed by a newline.
    pub fn println(&self, text: &str) {
        self.print(&format!("{text}\n"));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Line-oriented command loop.
pub struct Repl {
    commands: Arc<CommandRegistry>,
    input: Input,
    console: Console,
    prompt: String,
    worker: Worker,
}

impl Repl {
    /// Loop over stdin and stdout.
    pub fn new(commands: CommandRegistry) -> Self {
        Self::with_io(commands, BufReader::new(io::stdin()), Console::stdout())
    }

    /// Loop over the given input and console.
    pub fn with_io(
        commands: CommandRegistry,
        input: impl BufRead + Send + 'static,
        console: Console,
    ) -> Self {
        Self {
            commands: Arc::new(commands),
            input: Arc::new(Mutex::new(Box::new(input))),
            console,
            prompt: DEFAULT_PROMPT.to_string(),
            worker: Worker::new("mnome-repl"),
        }
    }

    /// Replace the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Registered commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Registered commands, for adding more.
    ///
    /// A running loop keeps the set it was started with; changes apply from
    /// the next `start`.
    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        Arc::make_mut(&mut self.commands)
    }

    /// Output handle shared with the loop.
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Start the loop. A previous run is joined first.
    pub fn start(&self) -> Result<()> {
        let commands = self.commands.clone();
        let input = self.input.clone();
        let console = self.console.clone();
        let prompt = self.prompt.clone();
        self.worker
            .start(move |stop| run(&commands, &input, &console, &prompt, &stop))
    }

    /// Request the loop to stop. Takes effect after the current line.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Whether the loop thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Block until the loop has exited.
    pub fn wait_for_stop(&self) -> Result<()> {
        self.worker.wait_for_stop()
    }

    /// Stop flag of the loop, for commands and signal handlers.
    pub fn stop_signal(&self) -> StopSignal {
        self.worker.stop_signal()
    }
}

impl std::fmt::Debug for Repl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repl")
            .field("commands", &self.commands.len())
            .field("prompt", &self.prompt)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

fn run(commands: &CommandRegistry, input: &Input, console: &Console, prompt: &str, stop: &StopSignal) {
    let mut buf = Vec::new();
    while !stop.is_requested() {
        console.print(prompt);

        buf.clear();
        // Bytes, not `read_line`: a line that is not UTF-8 must not end the loop.
        let read = input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_until(b'\n', &mut buf);
        match read {
            Ok(0) => {
                log::debug!("End of input");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to read input: {}", e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let (name, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        if let Err(e) = commands.dispatch(name, rest) {
            log::debug!("Command '{}' failed: {:?}", name, e);
            console.println(&e.to_string());
        }
    }
}
