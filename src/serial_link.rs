use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Line parameters applied when a device is opened.
///
/// Framing is fixed at 8N1 without flow control; only the baud rate and the read
/// timeout vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    pub read_timeout: Duration,
}

impl PortSettings {
    pub fn new(baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout,
        }
    }
}

/// An open byte stream to a serial device.
pub trait SerialLink: Send {
    /// Read whatever is available. A `TimedOut` error means nothing arrived
    /// within the configured read timeout.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Single write attempt; may accept fewer bytes than offered.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Second handle to the same device, used by the background reader.
    fn split_reader(&self) -> Result<Box<dyn SerialLink>, serialport::Error>;
}

pub trait LinkOpener: Send + Sync {
    fn open(
        &self,
        device_path: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialLink>, serialport::Error>;
}

/// Opens real devices through `serialport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(
        &self,
        device_path: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialLink>, serialport::Error> {
        let port = serialport::new(device_path, settings.baud_rate)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .parity(settings.parity)
            .flow_control(settings.flow_control)
            .timeout(settings.read_timeout)
            .open()?;

        let mut link = SystemLink { port };
        link.discard_input()?;
        Ok(Box::new(link))
    }
}

pub struct SystemLink {
    port: Box<dyn SerialPort>,
}

impl SystemLink {
    /// Drop anything the driver buffered before we opened the port
    fn discard_input(&mut self) -> Result<(), serialport::Error> {
        self.port.clear(serialport::ClearBuffer::Input)
    }
}

impl SerialLink for SystemLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.port, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.port, buf)
    }

    fn split_reader(&self) -> Result<Box<dyn SerialLink>, serialport::Error> {
        let port = self.port.try_clone()?;
        Ok(Box::new(Self { port }))
    }
}
