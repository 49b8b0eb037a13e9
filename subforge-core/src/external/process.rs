// ============================================================================
// subforge-core/src/external/process.rs
// ============================================================================
//
// STREAMING RUNNER: Line-by-Line Subprocess Output with Ticks and Deadline
//
// stdout and stderr are drained by one reader thread each. A line ends at
// '\n', '\r' or '\r\n', so carriage-return progress arrives as it is
// printed; a run longer than `MAX_LINE_BYTES` is delivered in pieces of at
// most that size. Raw bytes are kept intact. Lines travel over
// an mpsc channel to the calling thread, which is the only place callbacks
// run. The same loop wakes up every `tick_interval` to fire the tick
// callback and enforce the optional deadline. Ticks stop as soon as the
// process has exited and both pipes are closed.

// ---- Standard library imports ----
use std::borrow::Cow;
use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

// ---- External crate imports ----
use log::{debug, warn};

/// Longest run of output delivered as a single line.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        })
    }
}

/// One line of subprocess output, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLine {
    pub source: StreamSource,
    pub raw: Vec<u8>,
}

impl StreamLine {
    /// The line as text, without its terminator.
    pub fn text(&self) -> Cow<'_, str> {
        let mut end = self.raw.len();
        while end > 0 && matches!(self.raw[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        String::from_utf8_lossy(&self.raw[..end])
    }
}

/// Runner settings.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    pub tick_interval: Duration,
    /// Kill the process once this much time has passed.
    pub timeout: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            timeout: None,
        }
    }
}

/// How a streamed process ended.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    /// True if the deadline expired and the process was killed.
    pub timed_out: bool,
    pub elapsed: Duration,
}

fn send_line(tx: &Sender<StreamLine>, source: StreamSource, line: &mut Vec<u8>) -> bool {
    let raw = std::mem::take(line);
    tx.send(StreamLine { source, raw }).is_ok()
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    source: StreamSource,
    tx: Sender<StreamLine>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut line = Vec::new();
        // The last read ended on '\r'; a '\n' may still follow it.
        let mut pending_cr = false;
        loop {
            let available = match reader.fill_buf() {
                Ok([]) => break,
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Stopped reading {source}: {e}");
                    break;
                }
            };

            if pending_cr {
                pending_cr = false;
                let lf = available[0] == b'\n';
                if lf {
                    line.push(b'\n');
                }
                reader.consume(usize::from(lf));
                if !send_line(&tx, source, &mut line) {
                    break;
                }
                continue;
            }

            let room = MAX_LINE_BYTES - line.len();
            let window = &available[..available.len().min(room)];
            let (used, complete) = match window.iter().position(|b| matches!(b, b'\n' | b'\r')) {
                Some(pos) if window[pos] == b'\r' => match available.get(pos + 1) {
                    Some(b'\n') => (pos + 2, true),
                    Some(_) => (pos + 1, true),
                    None => {
                        pending_cr = true;
                        (pos + 1, false)
                    }
                },
                Some(pos) => (pos + 1, true),
                None => (window.len(), line.len() + window.len() >= MAX_LINE_BYTES),
            };
            line.extend_from_slice(&available[..used]);
            reader.consume(used);

            if complete && !send_line(&tx, source, &mut line) {
                break;
            }
        }
        if !line.is_empty() {
            send_line(&tx, source, &mut line);
        }
    })
}

/// Receives a streamed process's output on the calling thread.
pub trait StreamHandler {
    /// Called for every line from both pipes, in arrival order.
    fn on_line(&mut self, line: &StreamLine);

    /// Called every tick interval while the process runs.
    fn on_tick(&mut self, _elapsed: Duration) {}
}

/// Spawns `cmd` and streams its output to `handler`.
///
/// # Errors
///
/// Returns the spawn error unchanged so callers can map it to their own
/// error kind. Errors while waiting are also returned as `io::Error`.
pub fn run_streaming(
    cmd: &mut Command,
    options: StreamOptions,
    handler: &mut dyn StreamHandler,
) -> std::io::Result<ProcessOutcome> {
    debug!("Running command: {cmd:?}");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let started = Instant::now();
    let tick = options.tick_interval.max(Duration::from_millis(10));
    let deadline = options.timeout.map(|t| started + t);

    let (tx, rx) = mpsc::channel::<StreamLine>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, StreamSource::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, StreamSource::Stderr, tx.clone()));
    }
    drop(tx);

    let mut timed_out = false;
    let mut next_tick = started + tick;

    // Phase 1: pipes open.
    loop {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            timed_out = true;
            break;
        }

        let wake = deadline.map_or(next_tick, |deadline| next_tick.min(deadline));
        match rx.recv_timeout(wake.saturating_duration_since(now)) {
            Ok(line) => handler.on_line(&line),
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                if now >= next_tick {
                    handler.on_tick(now.duration_since(started));
                    next_tick = now + tick;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Phase 2: pipes closed (or deadline hit), the process may still be running.
    let status = loop {
        if !timed_out {
            if let Some(status) = child.try_wait()? {
                break status;
            }
        }
        let now = Instant::now();
        if timed_out || deadline.is_some_and(|deadline| now >= deadline) {
            warn!("Process exceeded its deadline, killing it");
            timed_out = true;
            let _ = child.kill();
            break child.wait()?;
        }
        if now >= next_tick {
            handler.on_tick(now.duration_since(started));
            next_tick = now + tick;
        }
        thread::sleep(Duration::from_millis(20).min(tick));
    };

    if timed_out {
        // Grandchildren may still hold the pipes open; take what already
        // arrived and leave the reader threads to finish on their own.
        while let Ok(line) = rx.try_recv() {
            handler.on_line(&line);
        }
    } else {
        for reader in readers {
            let _ = reader.join();
        }
    }

    Ok(ProcessOutcome {
        status,
        timed_out,
        elapsed: started.elapsed(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collector {
        lines: Vec<(StreamSource, String)>,
        raw: Vec<u8>,
        longest: usize,
        ticks: usize,
    }

    impl StreamHandler for Collector {
        fn on_line(&mut self, line: &StreamLine) {
            self.longest = self.longest.max(line.raw.len());
            self.raw.extend_from_slice(&line.raw);
            self.lines.push((line.source, line.text().into_owned()));
        }

        fn on_tick(&mut self, _elapsed: Duration) {
            self.ticks += 1;
        }
    }

    #[test]
    fn lines_from_both_pipes_arrive() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2; printf 'tail'");
        let mut collector = Collector::default();
        let outcome = run_streaming(&mut cmd, StreamOptions::default(), &mut collector).unwrap();

        assert!(outcome.status.success());
        assert!(!outcome.timed_out);
        let lines = &collector.lines;
        assert!(lines.contains(&(StreamSource::Stdout, "out".to_string())));
        assert!(lines.contains(&(StreamSource::Stderr, "err".to_string())));
        assert!(lines.contains(&(StreamSource::Stdout, "tail".to_string())));
    }

    #[test]
    fn carriage_returns_split_lines() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("printf 'frame 1/3\\rframe 2/3\\rframe 3/3\\r\\ndone\\r\\n'");
        let mut collector = Collector::default();
        run_streaming(&mut cmd, StreamOptions::default(), &mut collector).unwrap();

        let texts: Vec<&str> = collector.lines.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["frame 1/3", "frame 2/3", "frame 3/3", "done"]);
        assert_eq!(collector.raw, b"frame 1/3\rframe 2/3\rframe 3/3\r\ndone\r\n");
    }

    #[test]
    fn unterminated_output_is_chunked() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("head -c 300000 /dev/zero | tr '\\0' x >&2");
        let mut collector = Collector::default();
        let outcome = run_streaming(&mut cmd, StreamOptions::default(), &mut collector).unwrap();

        assert!(outcome.status.success());
        assert_eq!(collector.raw.len(), 300_000);
        assert!(collector.longest <= MAX_LINE_BYTES);
        assert!(collector.lines.len() >= 300_000 / MAX_LINE_BYTES);
    }

    #[test]
    fn deadline_kills_the_process() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 5");
        let mut collector = Collector::default();
        let outcome = run_streaming(
            &mut cmd,
            StreamOptions {
                tick_interval: Duration::from_millis(50),
                timeout: Some(Duration::from_millis(300)),
            },
            &mut collector,
        )
        .unwrap();

        assert!(outcome.timed_out);
        assert!(!outcome.status.success());
        assert!(outcome.elapsed < Duration::from_secs(5));
        assert!(collector.ticks >= 1);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut cmd = Command::new("subforge-no-such-program");
        let mut collector = Collector::default();
        let err = run_streaming(&mut cmd, StreamOptions::default(), &mut collector).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
