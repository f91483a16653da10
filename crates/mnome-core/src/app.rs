//! The metronome application: a beat player driven by a command loop.

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::Context;

use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::error::Result;
use crate::player::{validate_bpm, AccentPattern, AudioSink, BeatPlayer};
use crate::repl::{Console, Repl};
use crate::worker::StopSignal;

/// Owns the player and the command loop wired to it.
#[derive(Debug)]
pub struct Metronome {
    player: Arc<BeatPlayer>,
    repl: Repl,
}

impl Metronome {
    /// Metronome reading commands from stdin.
    pub fn new(config: &Config, sink: Arc<dyn AudioSink>, sample_rate: u32) -> Result<Self> {
        Self::with_io(
            config,
            sink,
            sample_rate,
            BufReader::new(std::io::stdin()),
            Console::stdout(),
        )
    }

    /// Metronome over the given input and console.
    pub fn with_io(
        config: &Config,
        sink: Arc<dyn AudioSink>,
        sample_rate: u32,
        input: impl BufRead + Send + 'static,
        console: Console,
    ) -> Result<Self> {
        let player = Arc::new(BeatPlayer::new(config.player.bpm, sample_rate, sink)?);
        player.set_beat(config.beat.generate(sample_rate));
        player.set_accentuated_beat(config.accent.generate(sample_rate));
        player.set_accentuated_pattern(config.accent_pattern()?);

        let mut repl = Repl::with_io(CommandRegistry::new(), input, console.clone())
            .with_prompt(config.repl.prompt.clone());
        let exit = repl.stop_signal();
        register_builtins(repl.commands_mut(), &player, exit, &console);

        Ok(Self { player, repl })
    }

    /// The beat player.
    pub fn player(&self) -> &Arc<BeatPlayer> {
        &self.player
    }

    /// The command loop.
    pub fn repl(&self) -> &Repl {
        &self.repl
    }

    /// Commands of the loop, for registering more before `start`.
    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        self.repl.commands_mut()
    }

    /// Start reading commands. Playback starts with the `start` command.
    pub fn start(&self) -> Result<()> {
        self.repl.start()
    }

    /// Request both the player and the loop to stop.
    pub fn stop(&self) {
        self.player.stop();
        self.repl.stop();
    }

    /// Wait for the loop to end, then stop playback.
    pub fn wait_for_stop(&self) -> Result<()> {
        self.repl.wait_for_stop()?;
        self.player.stop();
        self.player.wait_for_stop()
    }

    /// Handle for stopping from another thread, e.g. a signal handler.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            repl: self.repl.stop_signal(),
            player: self.player.stop_signal(),
        }
    }
}

/// Stops a [`Metronome`] from any thread without borrowing it.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    repl: StopSignal,
    player: StopSignal,
}

impl ShutdownHandle {
    /// Silence the player and end the loop after its current line.
    pub fn shutdown(&self) {
        self.player.request();
        self.repl.request();
    }
}

fn register_builtins(
    commands: &mut CommandRegistry,
    player: &Arc<BeatPlayer>,
    exit: StopSignal,
    console: &Console,
) {
    commands.register("exit", move |()| {
        exit.request();
        Ok(())
    });

    let (p, out) = (player.clone(), console.clone());
    commands.register("start", move |()| {
        if p.is_running() {
            out.println("Already playing");
            return Ok(());
        }
        p.start()?;
        Ok(())
    });

    let p = player.clone();
    commands.register("stop", move |()| {
        p.stop();
        p.wait_for_stop()?;
        Ok(())
    });

    let p = player.clone();
    commands.register("bpm", move |(text,): (String,)| {
        let bpm: u32 = text
            .parse()
            .with_context(|| format!("{text:?} is not a number of beats per minute"))?;
        validate_bpm(bpm)?;
        p.reconfigure(|p| p.set_bpm(bpm))?;
        Ok(())
    });

    let p = player.clone();
    commands.register("pattern", move |(text,): (String,)| {
        let pattern: AccentPattern = text.parse()?;
        p.reconfigure(|p| {
            p.set_accentuated_pattern(pattern);
            Ok(())
        })?;
        Ok(())
    });

    let out = console.clone();
    commands.register("test", move |(a, b): (String, String)| {
        out.println(&format!("a {a} b {b}"));
        Ok(())
    });

    let out = console.clone();
    commands.register("test2", move |(pairs,): (Vec<(String, String)>,)| {
        for (i, (a, b)) in pairs.into_iter().enumerate() {
            out.println(&format!("{i}: {a} & {b}"));
        }
        Ok(())
    });

    let (p, out) = (player.clone(), console.clone());
    commands.register("status", move |()| {
        let pattern = p.accent_pattern();
        out.println(&format!(
            "{} at {} bpm, pattern {}",
            if p.is_running() { "playing" } else { "stopped" },
            p.bpm(),
            if pattern.is_empty() { "(none)".to_string() } else { pattern.to_string() },
        ));
        Ok(())
    });

    // Listed commands are fixed at this point, so the text is built once.
    let mut usage: Vec<String> = commands
        .iter()
        .map(|c| format!("  {} {}", c.name(), c.help_signature()).trim_end().to_string())
        .collect();
    usage.push("  help".to_string());
    usage.sort();
    let help = format!("Commands:\n{}", usage.join("\n"));
    let out = console.clone();
    commands.register("help", move |()| {
        out.println(&help);
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{ChannelSink, Frame};
    use crate::testing::{init_logging, wait_until, ChannelReader, SharedBuffer};
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        app: Metronome,
        lines: Sender<String>,
        output: SharedBuffer,
        frames: Receiver<Frame>,
    }

    impl Harness {
        fn new() -> Self {
            init_logging();
            let (sink, frames) = ChannelSink::unbounded();
            let (lines, rx) = unbounded();
            let output = SharedBuffer::default();
            let app = Metronome::with_io(
                &Config::default(),
                Arc::new(sink),
                8_000,
                ChannelReader::new(rx),
                Console::new(output.clone()),
            )
            .unwrap();
            app.start().unwrap();
            wait_until(|| output.contents().contains("[mnome]: "));
            Self {
                app,
                lines,
                output,
                frames,
            }
        }

        fn send(&self, line: &str) {
            self.lines.send(format!("{line}\n")).unwrap();
        }

        /// Send `line` and wait until the loop is back at the prompt.
        fn run(&self, line: &str) {
            let prompts = self.output.contents().matches("[mnome]: ").count();
            self.send(line);
            wait_until(|| self.output.contents().matches("[mnome]: ").count() > prompts);
        }

        fn frame(&self) -> Frame {
            self.frames.recv_timeout(TIMEOUT).unwrap()
        }

        fn finish(self) {
            self.send("exit");
            self.app.wait_for_stop().unwrap();
            assert!(!self.app.player().is_running());
        }
    }

    #[test]
    fn test_start_plays_accent_pattern() {
        let h = Harness::new();
        h.run("start");
        let accents: Vec<bool> = (0..5).map(|_| h.frame().accented).collect();
        assert_eq!(accents, [true, false, false, false, true]);
        h.finish();
    }

    #[test]
    fn test_bpm_command_changes_cadence() {
        let h = Harness::new();
        h.run("start");
        let first = h.frame();
        assert_eq!(first.bpm, 80);
        assert_eq!(first.samples.len(), 6_000);
        // Frames before the change keep the old 750 ms cadence.
        let start = Instant::now();
        let before: Vec<u32> = (0..2).map(|_| h.frame().bpm).collect();
        let elapsed = start.elapsed();
        assert_eq!(before, [80, 80]);
        assert!(elapsed >= Duration::from_millis(1350), "too fast: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2000), "too slow: {:?}", elapsed);

        h.run("bpm 120");
        assert!(h.app.player().is_running());
        let changed = loop {
            let frame = h.frame();
            if frame.bpm == 120 {
                break frame;
            }
        };
        // Restart begins a new bar.
        assert_eq!(changed.index, 0);
        assert!(changed.accented);
        let start = Instant::now();
        h.frame();
        h.frame();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "too fast: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1400), "too slow: {:?}", elapsed);
        h.finish();
    }

    #[test]
    fn test_whitespace_line_dispatches_nothing() {
        let h = Harness::new();
        h.run("   ");
        h.run("status");
        let output = h.output.contents();
        assert!(output.contains("stopped at 80 bpm, pattern *+++"));
        assert!(!output.contains("valid command"));
        assert!(!output.contains("parsing"));
        h.finish();
    }

    #[test]
    fn test_test_command_keeps_argument_order() {
        let h = Harness::new();
        h.run("test a b");
        h.run("test2 w x y z");
        let output = h.output.contents();
        assert!(output.contains("a a b b"));
        assert!(output.contains("0: w & x\n1: y & z"));
        h.finish();
    }

    #[test]
    fn test_bad_input_leaves_state_unchanged() {
        let h = Harness::new();
        h.run("frobnicate 1");
        h.run("bpm fast");
        h.run("bpm 0");
        h.run("pattern *x+");
        h.run("bpm");
        let output = h.output.contents();
        assert!(output.contains("\"frobnicate\" is not a valid command"));
        assert!(output.contains("Could not get that, please try again"));
        assert!(output.contains("usage: bpm [STRING]"));

        let state = h.app.player().snapshot();
        assert_eq!(state.beat_rate, 80);
        assert_eq!(state.accent_pattern.to_string(), "*+++");
        assert!(!h.app.player().is_running());
        h.finish();
    }

    #[test]
    fn test_pattern_and_bpm_while_stopped() {
        let h = Harness::new();
        h.run("pattern *+");
        h.run("bpm 1000");
        assert!(!h.app.player().is_running());
        assert_eq!(h.app.player().bpm(), 1000);

        h.run("start");
        let accents: Vec<bool> = (0..4).map(|_| h.frame().accented).collect();
        assert_eq!(accents, [true, false, true, false]);
        h.run("stop");
        assert!(!h.app.player().is_running());
        h.finish();
    }

    #[test]
    fn test_start_twice_is_harmless() {
        let h = Harness::new();
        h.run("start");
        h.run("start");
        assert!(h.output.contents().contains("Already playing"));
        assert!(h.app.player().is_running());
        h.finish();
    }

    #[test]
    fn test_help_lists_commands() {
        let h = Harness::new();
        h.run("help");
        let output = h.output.contents();
        for line in ["  bpm [STRING]", "  exit", "  help", "  test [STRING STRING]", "  test2 [[STRING STRING]...]"] {
            assert!(output.contains(line), "missing {line:?} in {output}");
        }
        h.finish();
    }

    #[test]
    fn test_shutdown_handle_stops_everything() {
        let h = Harness::new();
        h.run("start");
        h.frame();
        h.app.shutdown_handle().shutdown();
        // The loop notices the request once the next line arrives.
        h.send("");
        h.app.wait_for_stop().unwrap();
        assert!(!h.app.repl().is_running());
        assert!(!h.app.player().is_running());
    }
}
