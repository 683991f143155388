//! In-memory stand-ins for the device directory and serial devices.

use crate::port_directory::{DeviceDescriptor, DeviceDirectory, DirectoryError};
use crate::serial_link::{LinkOpener, PortSettings, SerialLink};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeDirectory {
    devices: Option<Vec<DeviceDescriptor>>,
}

impl FakeDirectory {
    pub fn with_devices(devices: &[(&str, &str)]) -> Self {
        Self {
            devices: Some(
                devices
                    .iter()
                    .map(|(name, port)| DeviceDescriptor::new(*name, *port))
                    .collect(),
            ),
        }
    }

    pub fn failing() -> Self {
        Self { devices: None }
    }
}

impl DeviceDirectory for FakeDirectory {
    fn query(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
        self.devices.clone().ok_or_else(|| {
            DirectoryError::Enumeration(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "device class unavailable",
            ))
        })
    }
}

type Incoming = Arc<Mutex<Receiver<io::Result<Vec<u8>>>>>;
type WritePlan = Arc<Mutex<VecDeque<WriteOutcome>>>;

/// Scripted result for the next write; unscripted writes accept everything.
#[derive(Debug, Clone, Copy)]
enum WriteOutcome {
    Fail(io::ErrorKind),
    Accept(usize),
}

/// Test-side handle of a fake device: push bytes in, inspect what was written.
#[derive(Clone)]
pub struct FakeDevice {
    incoming: Sender<io::Result<Vec<u8>>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    opened: Arc<Mutex<Vec<(String, PortSettings)>>>,
    write_plan: WritePlan,
}

impl FakeDevice {
    pub fn send(&self, bytes: &[u8]) {
        self.incoming.send(Ok(bytes.to_vec())).unwrap();
    }

    pub fn send_error(&self, kind: io::ErrorKind) {
        self.incoming
            .send(Err(io::Error::new(kind, "simulated read failure")))
            .unwrap();
    }

    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.write_plan
            .lock()
            .unwrap()
            .push_back(WriteOutcome::Fail(kind));
    }

    /// Next write accepts at most `limit` bytes.
    pub fn accept_next_write(&self, limit: usize) {
        self.write_plan
            .lock()
            .unwrap()
            .push_back(WriteOutcome::Accept(limit));
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<(String, PortSettings)> {
        self.opened.lock().unwrap().clone()
    }
}

/// Opens any path except those in `missing`; every link shares one device.
pub struct FakeOpener {
    incoming: Incoming,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    opened: Arc<Mutex<Vec<(String, PortSettings)>>>,
    write_plan: WritePlan,
    missing: Vec<String>,
}

impl FakeOpener {
    pub fn new() -> (Self, FakeDevice) {
        let (tx, rx) = mpsc::channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let opened = Arc::new(Mutex::new(Vec::new()));
        let write_plan = Arc::new(Mutex::new(VecDeque::new()));
        let opener = Self {
            incoming: Arc::new(Mutex::new(rx)),
            written: Arc::clone(&written),
            opened: Arc::clone(&opened),
            write_plan: Arc::clone(&write_plan),
            missing: Vec::new(),
        };
        let device = FakeDevice {
            incoming: tx,
            written,
            opened,
            write_plan,
        };
        (opener, device)
    }

    pub fn with_missing(mut self, path: &str) -> Self {
        self.missing.push(path.to_string());
        self
    }
}

impl LinkOpener for FakeOpener {
    fn open(
        &self,
        device_path: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialLink>, serialport::Error> {
        if self.missing.iter().any(|p| p == device_path) {
            return Err(serialport::Error::new(
                serialport::ErrorKind::NoDevice,
                format!("{} not found", device_path),
            ));
        }
        self.opened
            .lock()
            .unwrap()
            .push((device_path.to_string(), *settings));

        Ok(Box::new(FakeLink {
            incoming: Arc::clone(&self.incoming),
            written: Arc::clone(&self.written),
            write_plan: Arc::clone(&self.write_plan),
            read_timeout: settings.read_timeout,
        }))
    }
}

struct FakeLink {
    incoming: Incoming,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    write_plan: WritePlan,
    read_timeout: Duration,
}

impl SerialLink for FakeLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let incoming = self.incoming.lock().unwrap();
        match incoming.recv_timeout(self.read_timeout) {
            Ok(Ok(bytes)) => {
                assert!(bytes.len() <= buf.len(), "fake reads must fit the scratch buffer");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.read_timeout);
                Err(io::Error::new(io::ErrorKind::TimedOut, "device gone"))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = match self.write_plan.lock().unwrap().pop_front() {
            Some(WriteOutcome::Fail(kind)) => {
                return Err(io::Error::new(kind, "simulated write failure"))
            }
            Some(WriteOutcome::Accept(limit)) => limit.min(buf.len()),
            None => buf.len(),
        };
        self.written.lock().unwrap().push(buf[..accepted].to_vec());
        Ok(accepted)
    }

    fn split_reader(&self) -> Result<Box<dyn SerialLink>, serialport::Error> {
        Ok(Box::new(Self {
            incoming: Arc::clone(&self.incoming),
            written: Arc::clone(&self.written),
            write_plan: Arc::clone(&self.write_plan),
            read_timeout: self.read_timeout,
        }))
    }
}

/// Opens links whose reads always report end of stream, counting the reads.
#[derive(Default)]
pub struct EndOfStreamOpener {
    reads: Arc<AtomicUsize>,
}

impl EndOfStreamOpener {
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl LinkOpener for EndOfStreamOpener {
    fn open(
        &self,
        _device_path: &str,
        _settings: &PortSettings,
    ) -> Result<Box<dyn SerialLink>, serialport::Error> {
        Ok(Box::new(EndOfStreamLink {
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct EndOfStreamLink {
    reads: Arc<AtomicUsize>,
}

impl SerialLink for EndOfStreamLink {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn split_reader(&self) -> Result<Box<dyn SerialLink>, serialport::Error> {
        Ok(Box::new(Self {
            reads: Arc::clone(&self.reads),
        }))
    }
}
