//! Running an external command with a deadline.

use crate::ValidateError;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

/// Run `command` to completion, killing it once `timeout` passes or
/// `cancel` is set. Output is drained on reader threads so a chatty
/// compiler cannot block on a full pipe.
pub fn run(mut command: Command, timeout: Duration, cancel: &AtomicBool) -> Result<Output, ValidateError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.load(Ordering::Relaxed) {
            stop(&mut child);
            return Err(ValidateError::Cancelled);
        }
        if started.elapsed() >= timeout {
            stop(&mut child);
            tracing::debug!(%program, ?timeout, "killed validator");
            return Err(ValidateError::TimedOut {
                tool: program,
                after: timeout,
            });
        }
        thread::sleep(POLL);
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_collects_output() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = run(command, Duration::from_secs(10), &AtomicBool::new(false)).unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[test]
    fn test_slow_commands_time_out() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5"]);
        let started = Instant::now();
        let err = run(command, Duration::from_millis(100), &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, ValidateError::TimedOut { .. }), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_flag_stops_the_command() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5"]);
        let err = run(command, Duration::from_secs(10), &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, ValidateError::Cancelled));
    }
}
