//! Terminal resize watching.
//!
//! On Unix a background thread waits for `SIGWINCH`, reads the new width from
//! a [`WidthSource`] and redraws the line under the screen lock. Elsewhere, or
//! when asked to with [`ResizeWatcher::spawn_polling`], the thread polls the
//! source and applies a width once it has been stable for one poll interval.
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(unix)]
use signal_hook::consts::SIGWINCH;
#[cfg(unix)]
use signal_hook::iterator::{Handle, Signals};

use crate::editor::{SharedScreen, lock};
use crate::terminal::WidthSource;

/// Poll interval used when none is configured.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Holds back a width change until no newer change arrived for `delay_ms`.
#[derive(Debug)]
pub struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u64)>,
}

impl ResizeDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub const fn queue(&mut self, width: u16, now_ms: u64) {
        self.pending = Some((width, now_ms));
    }

    pub fn take_ready(&mut self, now_ms: u64) -> Option<u16> {
        let (width, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some(width)
        } else {
            None
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// How the watcher thread is told to exit.
enum Stopper {
    /// Closing the handle ends the signal iterator.
    #[cfg(unix)]
    Signals(Handle),
    /// Checked by the polling loop after every sleep.
    Flag(Arc<AtomicBool>),
}

impl fmt::Debug for Stopper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Signals(_) => f.write_str("Signals"),
            Self::Flag(flag) => f.debug_tuple("Flag").field(flag).finish(),
        }
    }
}

impl Stopper {
    fn stop(&self) {
        match self {
            #[cfg(unix)]
            Self::Signals(handle) => handle.close(),
            Self::Flag(flag) => flag.store(true, Ordering::Relaxed),
        }
    }
}

/// Redraws a shared screen when the terminal width changes. Stops on drop.
#[derive(Debug)]
pub struct ResizeWatcher {
    stopper: Stopper,
    thread: Option<JoinHandle<()>>,
}

impl ResizeWatcher {
    /// Start redrawing `screen` whenever the terminal is resized.
    ///
    /// Each `SIGWINCH` triggers one width query; signals that arrive together
    /// are applied as one redraw.
    ///
    /// # Errors
    /// Returns an error if the signal handler cannot be registered or the
    /// watcher thread cannot be spawned.
    #[cfg(unix)]
    pub fn spawn<S, W>(source: S, screen: SharedScreen<W>) -> io::Result<Self>
    where
        S: WidthSource,
        W: Write + Send + 'static,
    {
        let mut signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();
        let thread = spawn_thread(move || {
            for signal in signals.forever() {
                tracing::trace!(signal, "resize signal received");
                if !apply_width(&source, &screen) {
                    break;
                }
            }
        })?;
        Ok(Self {
            stopper: Stopper::Signals(handle),
            thread: Some(thread),
        })
    }

    /// Start redrawing `screen` whenever the terminal is resized, polling
    /// every [`DEFAULT_POLL`].
    ///
    /// # Errors
    /// Returns an error if the watcher thread cannot be spawned.
    #[cfg(not(unix))]
    pub fn spawn<S, W>(source: S, screen: SharedScreen<W>) -> io::Result<Self>
    where
        S: WidthSource,
        W: Write + Send + 'static,
    {
        Self::spawn_polling(source, screen, DEFAULT_POLL)
    }

    /// Start watching `source`, polling every `poll`.
    ///
    /// # Errors
    /// Returns an error if the watcher thread cannot be spawned.
    pub fn spawn_polling<S, W>(
        source: S,
        screen: SharedScreen<W>,
        poll: Duration,
    ) -> io::Result<Self>
    where
        S: WidthSource,
        W: Write + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = spawn_thread(move || poll_width(&source, &screen, poll, &flag))?;
        Ok(Self {
            stopper: Stopper::Flag(stop),
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stopper.stop();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("resize watcher panicked");
        }
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_thread(body: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rawline-resize".to_string())
        .spawn(body)
}

/// Query the width and apply it. Returns `false` once the screen can no
/// longer be drawn.
#[cfg(unix)]
fn apply_width<S: WidthSource, W: Write>(source: &S, screen: &SharedScreen<W>) -> bool {
    let Some(width) = source.columns() else {
        tracing::debug!("resize signal ignored, width unknown");
        return true;
    };
    redraw(screen, width)
}

fn redraw<W: Write>(screen: &SharedScreen<W>, width: u16) -> bool {
    let result = lock(screen).resize(usize::from(width));
    if let Err(err) = result {
        tracing::warn!(%err, "resize redraw failed, watcher stopping");
        return false;
    }
    true
}

fn poll_width<S: WidthSource, W: Write>(
    source: &S,
    screen: &SharedScreen<W>,
    poll: Duration,
    stop: &AtomicBool,
) {
    let started = Instant::now();
    let delay_ms = u64::try_from(poll.as_millis()).unwrap_or(u64::MAX);
    let mut debouncer = ResizeDebouncer::new(delay_ms);
    let mut last_seen = None;

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(poll);
        let now_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let observed = source.columns();
        if let Some(width) = observed
            && observed != last_seen
        {
            last_seen = observed;
            debouncer.queue(width, now_ms);
        }

        if let Some(width) = debouncer.take_ready(now_ms)
            && !redraw(screen, width)
        {
            return;
        }
    }
}
