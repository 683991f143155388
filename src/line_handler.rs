use std::sync::mpsc::Sender;

/// Receives every completed line of a session.
///
/// Called on the session's background read thread while the read state is
/// locked, so implementations should hand work off rather than block.
pub trait LineHandler: Send + 'static {
    fn on_line(&mut self, line: String);
}

impl<F> LineHandler for F
where
    F: FnMut(String) + Send + 'static,
{
    fn on_line(&mut self, line: String) {
        self(line);
    }
}

/// Forwards lines into an `mpsc` channel.
#[derive(Debug, Clone)]
pub struct ChannelHandler(pub Sender<String>);

impl LineHandler for ChannelHandler {
    fn on_line(&mut self, line: String) {
        if self.0.send(line).is_err() {
            log::debug!("Line receiver dropped, discarding line");
        }
    }
}

/// Default handler: logs each line at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLineHandler;

impl LineHandler for LogLineHandler {
    fn on_line(&mut self, line: String) {
        log::info!("Received line: {}", line);
    }
}
