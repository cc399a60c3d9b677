//! Per-transfer progress reporting.
//!
//! The downloader holds an injected `ProgressReporter`; the no-op
//! implementation keeps the hot path free of display work when verbosity is
//! off. `ConsoleReporter` aggregates the live counters of every in-flight
//! transfer into a multi-line stderr display redrawn by a background thread.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Live counter for one in-flight transfer. Created when response headers
/// arrive, dropped when the transfer settles.
pub trait TransferHandle: Send {
    /// Records the total number of bytes transferred so far.
    fn advance(&self, transferred: u64);
}

/// Sink for transfer progress, shared across concurrently running downloads.
pub trait ProgressReporter: Send + Sync {
    /// Registers a new transfer. `total_bytes` is the Content-Length, or 0
    /// when the size is unknown.
    fn register(&self, filename: &str, total_bytes: u64) -> Box<dyn TransferHandle>;

    /// Finalizes the display. Called exactly once after every descriptor in a
    /// batch has settled.
    fn stop_all(&self);
}

/// Reporter used when verbosity is off: registrations and advances are no-ops.
pub struct NoopReporter;

struct NoopHandle;

impl TransferHandle for NoopHandle {
    fn advance(&self, _transferred: u64) {}
}

impl ProgressReporter for NoopReporter {
    fn register(&self, _filename: &str, _total_bytes: u64) -> Box<dyn TransferHandle> {
        Box::new(NoopHandle)
    }

    fn stop_all(&self) {}
}

struct Entry {
    filename: String,
    total_bytes: u64,
    transferred: AtomicU64,
}

impl Entry {
    /// Fraction complete in [0.0, 1.0]; 0.0 while the size is unknown.
    fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.transferred.load(Ordering::Relaxed) as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Multi-line terminal progress display.
///
/// Concurrent `advance` calls only store into per-entry atomics; a single
/// render thread owns the terminal and redraws all lines every tick, so the
/// output cannot interleave.
pub struct ConsoleReporter {
    entries: Arc<Mutex<Vec<Arc<Entry>>>>,
    stop: Arc<AtomicBool>,
    render: Mutex<Option<std::thread::JoinHandle<()>>>,
}

const RENDER_INTERVAL: Duration = Duration::from_millis(200);

impl ConsoleReporter {
    pub fn new() -> Self {
        let entries: Arc<Mutex<Vec<Arc<Entry>>>> = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let render = {
            let entries = Arc::clone(&entries);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut lines_drawn = 0usize;
                loop {
                    let done = stop.load(Ordering::Relaxed);
                    redraw(&entries, &mut lines_drawn);
                    if done {
                        break;
                    }
                    std::thread::sleep(RENDER_INTERVAL);
                }
            })
        };
        Self {
            entries,
            stop,
            render: Mutex::new(Some(render)),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn redraw(entries: &Mutex<Vec<Arc<Entry>>>, lines_drawn: &mut usize) {
    let entries = entries.lock().unwrap();
    if entries.is_empty() {
        return;
    }
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    // Move the cursor back over the previously drawn block.
    if *lines_drawn > 0 {
        let _ = write!(out, "\x1b[{}A", *lines_drawn);
    }
    for entry in entries.iter() {
        let transferred = entry.transferred.load(Ordering::Relaxed);
        let line = if entry.total_bytes > 0 {
            format!(
                "  {}  {}/{} B ({:.0}%)",
                entry.filename,
                transferred,
                entry.total_bytes,
                entry.fraction() * 100.0
            )
        } else {
            format!("  {}  {} B", entry.filename, transferred)
        };
        // Clear to end of line so a shrinking line leaves no residue.
        let _ = writeln!(out, "\r{}\x1b[K", line);
    }
    let _ = out.flush();
    *lines_drawn = entries.len();
}

struct ConsoleHandle {
    entry: Arc<Entry>,
}

impl TransferHandle for ConsoleHandle {
    fn advance(&self, transferred: u64) {
        self.entry.transferred.store(transferred, Ordering::Relaxed);
    }
}

impl ProgressReporter for ConsoleReporter {
    fn register(&self, filename: &str, total_bytes: u64) -> Box<dyn TransferHandle> {
        let entry = Arc::new(Entry {
            filename: filename.to_string(),
            total_bytes,
            transferred: AtomicU64::new(0),
        });
        self.entries.lock().unwrap().push(Arc::clone(&entry));
        Box::new(ConsoleHandle { entry })
    }

    fn stop_all(&self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.render.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_accepts_advances() {
        let reporter = NoopReporter;
        let handle = reporter.register("a.jpg", 100);
        handle.advance(50);
        reporter.stop_all();
    }

    #[test]
    fn fraction_bounds() {
        let entry = Entry {
            filename: "a.jpg".into(),
            total_bytes: 200,
            transferred: AtomicU64::new(50),
        };
        assert!((entry.fraction() - 0.25).abs() < 1e-9);
        entry.transferred.store(400, Ordering::Relaxed);
        assert!((entry.fraction() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn indeterminate_size_reports_zero_fraction() {
        let entry = Entry {
            filename: "a.jpg".into(),
            total_bytes: 0,
            transferred: AtomicU64::new(123),
        };
        assert_eq!(entry.fraction(), 0.0);
    }

    #[test]
    fn console_reporter_tolerates_concurrent_advances() {
        let reporter = Arc::new(ConsoleReporter::new());
        let mut workers = Vec::new();
        for i in 0..4 {
            let reporter = Arc::clone(&reporter);
            workers.push(std::thread::spawn(move || {
                let handle = reporter.register(&format!("file-{i}"), 1_000);
                for n in 0..1_000u64 {
                    handle.advance(n);
                }
            }));
        }
        for w in workers {
            w.join().unwrap();
        }
        reporter.stop_all();
        // A second stop is a no-op rather than a panic.
        reporter.stop_all();
    }
}
