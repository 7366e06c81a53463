//! Device control through an external command-line client.
//!
//! The television's control protocol is spoken by a separate program (by
//! default `bscpylgtvcommand`). The configured command template is rendered,
//! split into argv with shell-words (no shell is involved), and run with a
//! deadline. The change counts only if the command exits 0 and its stdout
//! passes the configured reply patterns.

use super::PictureModeController;
use super::mode::PictureMode;
use super::reply::ReplyPatterns;
use super::template::{TemplateError, render_template};
use crate::config::Config;
use crate::error::{Result, TvModeError};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Maximum number of output lines quoted in a failure message.
const ERROR_MAX_LINES: usize = 20;

/// Maximum characters of output quoted in a failure message.
const ERROR_MAX_CHARS: usize = 2048;

/// Interval between child status checks.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// How long output is still collected once the command has been killed.
///
/// Background processes it started may keep the pipes open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Result of running the device command once.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the process was killed at the deadline.
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Sets the picture mode by running a configured command.
#[derive(Debug, Clone)]
pub struct CommandController {
    address: String,
    command: String,
    timeout: Duration,
    reply: ReplyPatterns,
}

impl CommandController {
    /// Controller that trusts the exit status alone.
    pub fn new(address: impl Into<String>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            command: command.into(),
            timeout,
            reply: ReplyPatterns::default(),
        }
    }

    /// Build from configuration; fails if no device address is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.require_address()?,
            config.device.command.clone(),
            config.device_timeout(),
        )
        .with_reply_patterns(ReplyPatterns::from_device_config(&config.device)?))
    }

    pub fn with_reply_patterns(mut self, reply: ReplyPatterns) -> Self {
        self.reply = reply;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Render the template and split it into argv.
    pub fn argv(&self, mode: PictureMode) -> Result<Vec<String>> {
        let vars = [
            ("address", self.address.as_str()),
            ("mode", mode.surface_value()),
        ];

        let rendered = render_template(&self.command, &vars).map_err(|e| {
            let hint = match &e {
                TemplateError::UnknownPlaceholder { .. } => {
                    "\nAvailable placeholders: address, mode"
                }
                TemplateError::Unclosed { .. } => "",
            };
            TvModeError::ConfigError(format!(
                "device.command '{}': {}{}",
                self.command, e, hint
            ))
        })?;

        let args = shell_words::split(&rendered).map_err(|e| {
            TvModeError::ConfigError(format!(
                "failed to parse device.command '{}': {}\n\n\
                 Fix: check for unmatched quotes or invalid escape sequences in config.yaml.",
                rendered, e
            ))
        })?;

        if args.is_empty() {
            return Err(TvModeError::ConfigError(format!(
                "device.command is empty after parsing: '{}'",
                rendered
            )));
        }

        Ok(args)
    }

    /// Run the command for `mode`, killing it at the deadline.
    pub fn run(&self, mode: PictureMode) -> Result<CommandOutcome> {
        let args = self.argv(mode)?;
        let program = &args[0];

        let mut child = Command::new(program)
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TvModeError::GuardedActionFailure(format!(
                    "failed to execute device command '{}': {}\n\n\
                     Fix: ensure the command is installed and in PATH.",
                    program, e
                ))
            })?;

        let start = Instant::now();
        // Drain both pipes concurrently so a chatty client cannot block on a full pipe.
        let stdout = child.stdout.take().map(Drain::spawn);
        let stderr = child.stderr.take().map(Drain::spawn);

        let (exit_code, timed_out) = wait_with_timeout(&mut child, self.timeout)?;

        // Anything the command left running may hold the pipes open, so
        // output is collected only until the deadline (or a short grace).
        let now = Instant::now();
        let collect_until = if timed_out {
            now + DRAIN_GRACE
        } else {
            (start + self.timeout).max(now + DRAIN_GRACE)
        };

        Ok(CommandOutcome {
            exit_code,
            timed_out,
            stdout: Drain::collect(stdout, collect_until),
            stderr: Drain::collect(stderr, collect_until),
        })
    }
}

impl PictureModeController for CommandController {
    fn set_picture_mode(&self, mode: PictureMode) -> Result<()> {
        let outcome = self.run(mode)?;
        if !outcome.succeeded() {
            return Err(TvModeError::GuardedActionFailure(describe_failure(
                &outcome,
                self.timeout,
            )));
        }
        match self.reply.rejection(&outcome.stdout) {
            None => Ok(()),
            Some(reason) => Err(TvModeError::GuardedActionFailure(with_output(
                reason, &outcome,
            ))),
        }
    }
}

/// Background reader for one of the child's pipes.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });
        Self { buf, done }
    }

    /// Whatever was read by `until`; a reader still blocked is left behind.
    fn collect(drain: Option<Self>, until: Instant) -> String {
        let Some(drain) = drain else {
            return String::new();
        };
        let _ = drain
            .done
            .recv_timeout(until.saturating_duration_since(Instant::now()));
        let bytes = match drain.buf.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok((None, true));
                }
                thread::sleep(WAIT_POLL);
            }
            Err(e) => {
                return Err(TvModeError::GuardedActionFailure(format!(
                    "failed to check device command status: {}",
                    e
                )));
            }
        }
    }
}

/// Human-readable failure with the tail of the command's output.
fn describe_failure(outcome: &CommandOutcome, timeout: Duration) -> String {
    let msg = if outcome.timed_out {
        format!("device command timed out after {}s", timeout.as_secs())
    } else {
        match outcome.exit_code {
            Some(code) => format!("device command exited with code {}", code),
            None => "device command was terminated by a signal".to_string(),
        }
    };
    with_output(msg, outcome)
}

/// Append the tail of the command's output to `msg`.
fn with_output(mut msg: String, outcome: &CommandOutcome) -> String {
    let combined = match (outcome.stdout.trim(), outcome.stderr.trim()) {
        ("", "") => String::new(),
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{}\n{}", out, err),
    };

    let (tail, cut) = truncate_output(&combined, ERROR_MAX_LINES, ERROR_MAX_CHARS);
    if !tail.is_empty() {
        msg.push_str(if cut {
            "\nOutput (truncated):\n"
        } else {
            "\nOutput:\n"
        });
        msg.push_str(&tail);
    }
    msg
}

/// Keep the last lines of output, bounded by line and character count.
///
/// The flag is set when anything was dropped.
fn truncate_output(output: &str, max_lines: usize, max_chars: usize) -> (String, bool) {
    let lines: Vec<&str> = output.lines().collect();

    // Take last N lines (most likely to contain errors)
    let (relevant, dropped_lines) = if lines.len() > max_lines {
        (&lines[lines.len() - max_lines..], true)
    } else {
        (&lines[..], false)
    };

    let result = relevant.join("\n");
    if result.len() <= max_chars {
        return (result, dropped_lines);
    }

    let mut cut = result.len() - max_chars;
    while !result.is_char_boundary(cut) {
        cut += 1;
    }
    (format!("...(truncated)...\n{}", &result[cut..]), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(command: &str, timeout: Duration) -> CommandController {
        CommandController::new("192.168.0.2", command, timeout)
    }

    #[test]
    fn test_default_template_argv() {
        let config = {
            let mut c = Config::default();
            c.device.address = Some("192.168.0.2".to_string());
            c
        };
        let ctl = CommandController::from_config(&config).unwrap();

        assert_eq!(ctl.address(), "192.168.0.2");
        assert_eq!(
            ctl.argv(PictureMode::GameOptimizer).unwrap(),
            vec![
                "bscpylgtvcommand",
                "192.168.0.2",
                "set_current_picture_mode",
                "game"
            ]
        );
    }

    #[test]
    fn test_from_config_requires_address() {
        let err = CommandController::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, TvModeError::UserError(_)));
    }

    #[test]
    fn test_argv_keeps_quoted_arguments_together() {
        let ctl = controller(
            r#"lgtv --host {address} --payload "picture {mode}""#,
            Duration::from_secs(1),
        );
        assert_eq!(
            ctl.argv(PictureMode::FilmMaker).unwrap(),
            vec!["lgtv", "--host", "192.168.0.2", "--payload", "picture filmMaker"]
        );
    }

    #[test]
    fn test_argv_reports_template_errors() {
        let ctl = controller("lgtv {host} {mode}", Duration::from_secs(1));
        let err = ctl.argv(PictureMode::FilmMaker).unwrap_err();
        assert!(matches!(err, TvModeError::ConfigError(_)));
        assert!(err.to_string().contains("{host}"));
        assert!(err.to_string().contains("Available placeholders"));

        let ctl = controller("lgtv \"{mode}", Duration::from_secs(1));
        assert!(ctl.argv(PictureMode::FilmMaker).is_err());
    }

    #[test]
    fn test_missing_program_is_guarded_action_failure() {
        let ctl = controller(
            "tvmode-definitely-not-installed {mode}",
            Duration::from_secs(1),
        );
        let err = ctl.set_picture_mode(PictureMode::GameOptimizer).unwrap_err();
        assert!(matches!(err, TvModeError::GuardedActionFailure(_)));
        assert!(err.to_string().contains("PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        let ctl = controller("true {address} {mode}", Duration::from_secs(5));
        ctl.set_picture_mode(PictureMode::FilmMaker).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure_with_output() {
        let ctl = controller(
            "sh -c 'echo refused {mode} >&2; exit 3'",
            Duration::from_secs(5),
        );
        let err = ctl.set_picture_mode(PictureMode::GameOptimizer).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, TvModeError::GuardedActionFailure(_)));
        assert!(msg.contains("exited with code 3"), "{msg}");
        assert!(msg.contains("refused game"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn test_runaway_command_is_killed() {
        let ctl = controller("sleep 10", Duration::from_millis(300));
        let start = Instant::now();
        let outcome = ctl.run(PictureMode::FilmMaker).unwrap();

        assert!(outcome.timed_out);
        assert!(!outcome.succeeded());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_background_grandchild_does_not_extend_timeout() {
        let ctl = controller("sh -c 'sleep 4 & wait'", Duration::from_millis(300));
        let start = Instant::now();
        let outcome = ctl.run(PictureMode::FilmMaker).unwrap();

        assert!(outcome.timed_out);
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "took {:?}",
            start.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_output_before_background_exit_is_kept() {
        let ctl = controller("sh -c 'echo done; sleep 4 &'", Duration::from_millis(500));
        let start = Instant::now();
        let outcome = ctl.run(PictureMode::FilmMaker).unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.stdout.trim(), "done");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_refusal_in_reply_is_failure() {
        let device = crate::config::DeviceConfig::default();
        let ctl = controller(
            r#"echo "{{'returnValue': False}}""#,
            Duration::from_secs(5),
        )
        .with_reply_patterns(ReplyPatterns::from_device_config(&device).unwrap());

        let err = ctl.set_picture_mode(PictureMode::GameOptimizer).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, TvModeError::GuardedActionFailure(_)));
        assert!(msg.contains("device reported failure"), "{msg}");
        assert!(msg.contains("'returnValue': False"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn test_accepted_reply_is_success() {
        let device = crate::config::DeviceConfig::default();
        let ctl = controller(
            r#"echo '{{"returnValue": true}}'"#,
            Duration::from_secs(5),
        )
        .with_reply_patterns(ReplyPatterns::from_device_config(&device).unwrap());

        ctl.set_picture_mode(PictureMode::GameOptimizer).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_confirmation_is_failure() {
        let mut config = Config::default();
        config.device.address = Some("192.168.0.2".to_string());
        config.device.command = "echo connected {mode}".to_string();
        config.device.success_pattern = Some(r#"returnValue['"]?\s*:\s*true"#.to_string());
        let ctl = CommandController::from_config(&config).unwrap();

        let err = ctl.set_picture_mode(PictureMode::FilmMaker).unwrap_err();
        assert!(matches!(err, TvModeError::GuardedActionFailure(_)));
        assert!(err.to_string().contains("device.success_pattern"));
    }

    #[test]
    fn test_from_config_rejects_invalid_reply_pattern() {
        let mut config = Config::default();
        config.device.address = Some("192.168.0.2".to_string());
        config.device.success_pattern = Some("(".to_string());

        let err = CommandController::from_config(&config).unwrap_err();
        assert!(matches!(err, TvModeError::ConfigError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout() {
        let ctl = controller("echo {address} {mode}", Duration::from_secs(5));
        let outcome = ctl.run(PictureMode::GameOptimizer).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.stdout.trim(), "192.168.0.2 game");
    }

    #[test]
    fn test_describe_failure_timeout() {
        let outcome = CommandOutcome {
            exit_code: None,
            timed_out: true,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(
            describe_failure(&outcome, Duration::from_secs(30)),
            "device command timed out after 30s"
        );
    }

    #[test]
    fn test_describe_failure_labels_short_output_as_complete() {
        let outcome = CommandOutcome {
            exit_code: Some(1),
            timed_out: false,
            stdout: "connection refused\n".to_string(),
            stderr: String::new(),
        };
        let msg = describe_failure(&outcome, Duration::from_secs(30));
        assert_eq!(
            msg,
            "device command exited with code 1\nOutput:\nconnection refused"
        );
    }

    #[test]
    fn test_describe_failure_labels_cut_output_as_truncated() {
        let noisy: String = (1..=30).map(|i| format!("line{}\n", i)).collect();
        let outcome = CommandOutcome {
            exit_code: Some(1),
            timed_out: false,
            stdout: noisy,
            stderr: String::new(),
        };
        let msg = describe_failure(&outcome, Duration::from_secs(30));
        assert!(msg.contains("\nOutput (truncated):\nline11\n"), "{msg}");
        assert!(!msg.contains("line10\n"), "{msg}");
    }

    #[test]
    fn test_truncate_output_keeps_tail() {
        let output = "line1\nline2\nline3\nline4\nline5";
        assert_eq!(
            truncate_output(output, 3, 1000),
            ("line3\nline4\nline5".to_string(), true)
        );
        assert_eq!(
            truncate_output(output, 5, 1000),
            (output.to_string(), false)
        );

        let long = "a".repeat(100);
        let (result, cut) = truncate_output(&long, 1000, 50);
        assert!(cut);
        assert!(result.starts_with("...(truncated)..."));
        assert!(result.ends_with(&"a".repeat(50)));
    }

    #[test]
    fn test_truncate_output_respects_char_boundaries() {
        let output = "é".repeat(40);
        let (result, cut) = truncate_output(&output, 10, 11);
        assert!(cut);
        assert!(result.contains("truncated"));
    }
}
