use crate::line_accumulator::{LineAccumulator, DEFAULT_LINE_DELIMITER};
use crate::line_handler::{LineHandler, LogLineHandler};
use crate::serial_link::{LinkOpener, PortSettings, SerialLink, SystemOpener, DEFAULT_BAUD_RATE};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Size of the scratch buffer each read fills.
pub const READ_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub line_delimiter: u8,
    /// Read timeout; bounds how long `stop()` waits for the reader to notice.
    pub poll_interval: Duration,
    /// Pause after a failed or empty read before re-arming.
    pub read_error_backoff: Duration,
}

impl SessionConfig {
    /// Byte that ends a line.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.line_delimiter = delimiter;
        self
    }

    /// Read timeout used by the background reader.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Pause after a failed or empty read; zero re-arms failed reads at once.
    pub fn with_read_error_backoff(mut self, backoff: Duration) -> Self {
        self.read_error_backoff = backoff;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            line_delimiter: DEFAULT_LINE_DELIMITER,
            poll_interval: Duration::from_millis(50),
            read_error_backoff: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Port {port} is already open on this session")]
    AlreadyOpen { port: String },

    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Session is not open")]
    NotOpen,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything the background reader touches, behind one lock.
struct ReadState {
    open: bool,
    accumulator: LineAccumulator,
    handler: Box<dyn LineHandler>,
}

impl ReadState {
    fn dispatch(&mut self, bytes: &[u8]) -> usize {
        let handler = &mut self.handler;
        self.accumulator.feed(bytes, |line| handler.on_line(line))
    }
}

fn lock_state(state: &Mutex<ReadState>) -> MutexGuard<'_, ReadState> {
    // A panicking handler must not wedge stop()
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Live resources of a started session.
struct Run {
    writer: Box<dyn SerialLink>,
    cancel: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

/// One serial device, read line by line on a background thread.
///
/// Completed lines go to the [`LineHandler`] given at construction. Writes are
/// synchronous and happen on the caller's thread. Dropping the session stops it.
pub struct SerialSession {
    opener: Box<dyn LinkOpener>,
    config: SessionConfig,
    state: Arc<Mutex<ReadState>>,
    run: Option<Run>,
    device_path: String,
    baud_rate: u32,
}

impl SerialSession {
    /// Session on real devices with the default configuration.
    pub fn new(handler: impl LineHandler) -> Self {
        Self::with_config(handler, SessionConfig::default())
    }

    /// Session on real devices with a custom configuration.
    pub fn with_config(handler: impl LineHandler, config: SessionConfig) -> Self {
        Self::with_opener(SystemOpener, handler, config)
    }

    /// Session that opens devices through `opener` instead of the OS.
    pub fn with_opener(
        opener: impl LinkOpener + 'static,
        handler: impl LineHandler,
        config: SessionConfig,
    ) -> Self {
        let state = ReadState {
            open: false,
            accumulator: LineAccumulator::new(config.line_delimiter),
            handler: Box::new(handler),
        };

        Self {
            opener: Box::new(opener),
            config,
            state: Arc::new(Mutex::new(state)),
            run: None,
            device_path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Start at [`DEFAULT_BAUD_RATE`].
    pub fn start_default(&mut self, device_path: &str) -> Result<(), SessionError> {
        self.start(device_path, DEFAULT_BAUD_RATE)
    }

    /// Open `device_path` at 8N1 and arm the background read loop.
    ///
    /// Fails without side effects if this session already has a port open.
    pub fn start(&mut self, device_path: &str, baud_rate: u32) -> Result<(), SessionError> {
        if self.run.is_some() {
            log::error!(
                "Port {} is already open, refusing to start {}",
                self.device_path,
                device_path
            );
            return Err(SessionError::AlreadyOpen {
                port: self.device_path.clone(),
            });
        }

        let settings = PortSettings::new(baud_rate, self.config.poll_interval);
        let open_error = |source: serialport::Error| {
            log::error!("Failed to open {} at {} baud: {}", device_path, baud_rate, source);
            SessionError::Open {
                port: device_path.to_string(),
                source,
            }
        };
        let writer = self.opener.open(device_path, &settings).map_err(open_error)?;
        let reader = writer.split_reader().map_err(open_error)?;

        {
            let mut state = lock_state(&self.state);
            state.accumulator.clear();
            state.accumulator.set_delimiter(self.config.line_delimiter);
            state.open = true;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let read_loop = ReadLoop {
            link: reader,
            state: Arc::clone(&self.state),
            cancel: Arc::clone(&cancel),
            error_backoff: self.config.read_error_backoff,
            poll_interval: self.config.poll_interval,
            device_path: device_path.to_string(),
        };
        let spawned = thread::Builder::new()
            .name(format!("serial-read {}", device_path))
            .spawn(move || read_loop.run());
        let reader = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Failed to spawn read thread for {}: {}", device_path, e);
                lock_state(&self.state).open = false;
                return Err(e.into());
            }
        };

        self.device_path = device_path.to_string();
        self.baud_rate = baud_rate;
        self.run = Some(Run {
            writer,
            cancel,
            reader,
        });
        log::debug!("Opened {} at {} baud", device_path, baud_rate);
        Ok(())
    }

    /// Close the port and join the read thread. No-op when not started.
    pub fn stop(&mut self) {
        let Some(Run {
            writer,
            cancel,
            reader,
        }) = self.run.take()
        else {
            return;
        };

        {
            let mut state = lock_state(&self.state);
            state.open = false;
            cancel.store(true, Ordering::SeqCst);
        }
        drop(writer);

        if reader.join().is_err() {
            log::warn!("Read thread for {} panicked", self.device_path);
        }
        log::debug!("Closed {}", self.device_path);
    }

    /// One write attempt; returns how many bytes the device accepted.
    pub fn write_some(&mut self, bytes: &[u8]) -> Result<usize, SessionError> {
        let run = self.run.as_mut().ok_or(SessionError::NotOpen)?;
        if bytes.is_empty() {
            return Ok(0);
        }

        let written = run.writer.write(bytes)?;
        tracing::trace!(port = %self.device_path, written, requested = bytes.len(), "write");
        Ok(written)
    }

    /// [`Self::write_some`] for text.
    pub fn write_str(&mut self, text: &str) -> Result<usize, SessionError> {
        self.write_some(text.as_bytes())
    }

    /// True while a device handle is live.
    pub fn is_open(&self) -> bool {
        self.run.is_some()
    }

    /// Path of the current or most recently opened device.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Baud rate of the current or most recently opened device.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Byte that currently ends a line.
    pub fn line_delimiter(&self) -> u8 {
        self.config.line_delimiter
    }

    /// Change the delimiter; applies immediately to a running session.
    pub fn set_line_delimiter(&mut self, delimiter: u8) {
        self.config.line_delimiter = delimiter;
        lock_state(&self.state).accumulator.set_delimiter(delimiter);
    }

    /// Bytes received since the last delimiter, lossily decoded.
    pub fn pending_line(&self) -> String {
        String::from_utf8_lossy(lock_state(&self.state).accumulator.pending()).into_owned()
    }
}

impl Default for SerialSession {
    fn default() -> Self {
        Self::new(LogLineHandler)
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ReadLoop {
    link: Box<dyn SerialLink>,
    state: Arc<Mutex<ReadState>>,
    cancel: Arc<AtomicBool>,
    error_backoff: Duration,
    poll_interval: Duration,
    device_path: String,
}

impl ReadLoop {
    fn idle_pause(&self) -> Duration {
        if self.error_backoff.is_zero() {
            self.poll_interval
        } else {
            self.error_backoff
        }
    }

    fn run(mut self) {
        let span = tracing::debug_span!("serial_read", port = %self.device_path);
        let _entered = span.enter();
        let mut scratch = [0u8; READ_BUFFER_SIZE];

        while !self.cancel.load(Ordering::SeqCst) {
            let result = self.link.read(&mut scratch);

            let mut state = lock_state(&self.state);
            if !state.open {
                break;
            }

            match result {
                Ok(0) => {
                    // End of stream from the link; wait instead of re-reading at once
                    drop(state);
                    thread::sleep(self.idle_pause());
                }
                Ok(n) => {
                    let lines = state.dispatch(&scratch[..n]);
                    tracing::trace!(bytes = n, lines, "read completed");
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    // Tolerated: the session stays open and the read is re-armed
                    tracing::trace!(error = %e, "read failed");
                    drop(state);
                    if !self.error_backoff.is_zero() {
                        thread::sleep(self.error_backoff);
                    }
                }
            }
        }

        log::debug!("Read loop for {} finished", self.device_path);
    }
}
