//! # Serial Lines
//!
//! A Rust library for talking to serial devices one line at a time.
//!
//! A [`SerialSession`] opens a port at 8N1 without flow control, reads it on a
//! dedicated background thread, and splits the incoming bytes into lines on a
//! configurable delimiter. Every completed line is handed to a [`LineHandler`].
//! Writes are synchronous and happen on the caller's thread.
//!
//! ## Features
//!
//! - **Cross-platform device discovery**: Uses `serialport` to list present serial devices
//! - **Background line reader**: One read thread per open session, joined on stop
//! - **Pluggable line handling**: Closures, channels, or the default logging handler
//! - **Testable seams**: Device directory and device opener are traits
//!
//! ## Examples
//!
//! ### Listing Devices
//!
//! ```rust,no_run
//! use serial_lines::{DeviceDirectory, SystemDirectory};
//!
//! for device in SystemDirectory.list_ports() {
//!     println!("{} at {}", device.friendly_name, device.port_name);
//! }
//! println!("First port: {:?}", SystemDirectory.port_name(0));
//! ```
//!
//! ### Reading Lines
//!
//! ```rust,no_run
//! use serial_lines::{ChannelHandler, SerialSession};
//! use std::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel();
//! let mut session = SerialSession::new(ChannelHandler(tx));
//! session.start("/dev/ttyUSB0", 115_200)?;
//!
//! session.write_str("status\n")?;
//! for line in rx.iter().take(3) {
//!     println!("device said: {}", line);
//! }
//!
//! session.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Custom Delimiter and Closure Handler
//!
//! ```rust,no_run
//! use serial_lines::{SerialSession, SessionConfig};
//!
//! let config = SessionConfig::default().with_delimiter(b';');
//! let mut session = SerialSession::with_config(
//!     |reply: String| println!("CAT reply: {}", reply),
//!     config,
//! );
//! session.start_default("COM3")?;
//! session.write_str("FA;")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod line_accumulator;
pub mod line_handler;
pub mod port_directory;
pub mod serial_link;
pub mod serial_session;

#[cfg(test)]
mod testing;

// Re-export the main types for convenience
pub use line_accumulator::{LineAccumulator, DEFAULT_LINE_DELIMITER};

pub use line_handler::{ChannelHandler, LineHandler, LogLineHandler};

pub use port_directory::{DeviceDescriptor, DeviceDirectory, DirectoryError, SystemDirectory};

pub use serial_link::{
    LinkOpener, PortSettings, SerialLink, SystemLink, SystemOpener, DEFAULT_BAUD_RATE,
};

pub use serial_session::{SerialSession, SessionConfig, SessionError, READ_BUFFER_SIZE};
