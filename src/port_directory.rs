use serialport::{SerialPortInfo, SerialPortType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub friendly_name: String,
    pub port_name: String,
}

impl DeviceDescriptor {
    pub fn new(friendly_name: impl Into<String>, port_name: impl Into<String>) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            port_name: port_name.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Serial device enumeration failed: {0}")]
    Enumeration(#[from] serialport::Error),
}

/// Source of the serial devices currently present on the system.
///
/// Only [`DeviceDirectory::query`] must be implemented; the remaining methods are
/// the non-failing conveniences the rest of the crate and the demos use.
pub trait DeviceDirectory {
    /// Raw enumeration. Devices that could not be described are already skipped.
    fn query(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError>;

    /// All present devices, or an empty list if enumeration is unavailable.
    fn list_ports(&self) -> Vec<DeviceDescriptor> {
        match self.query() {
            Ok(devices) => devices,
            Err(e) => {
                log::error!("Could not enumerate serial devices: {}", e);
                Vec::new()
            }
        }
    }

    fn port_names(&self) -> Vec<String> {
        self.list_ports()
            .into_iter()
            .map(|device| device.port_name)
            .collect()
    }

    fn port_count(&self) -> usize {
        self.list_ports().len()
    }

    /// Port name at `index`, or an empty string when out of range.
    fn port_name(&self, index: usize) -> String {
        self.list_ports()
            .into_iter()
            .nth(index)
            .map(|device| device.port_name)
            .unwrap_or_default()
    }

    fn print_devices(&self) {
        let devices = self.list_ports();
        println!("{} serial device(s):", devices.len());
        for device in devices {
            println!("\t{} ({})", device.port_name, device.friendly_name);
        }
    }
}

/// Directory backed by the operating system through `serialport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDirectory;

impl SystemDirectory {
    fn describe(info: SerialPortInfo) -> Option<DeviceDescriptor> {
        if info.port_name.is_empty() {
            log::debug!("Skipping serial device without a port name");
            return None;
        }

        let friendly_name = match &info.port_type {
            SerialPortType::UsbPort(usb) => usb
                .product
                .clone()
                .or_else(|| usb.manufacturer.clone())
                .unwrap_or_else(|| format!("USB serial device {:04x}:{:04x}", usb.vid, usb.pid)),
            SerialPortType::PciPort => "PCI serial port".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
            SerialPortType::Unknown => info.port_name.clone(),
        };

        Some(DeviceDescriptor::new(friendly_name, info.port_name))
    }
}

impl DeviceDirectory for SystemDirectory {
    fn query(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
        let ports = serialport::available_ports()?;
        log::debug!("Found {} serial port candidates", ports.len());

        Ok(ports.into_iter().filter_map(Self::describe).collect())
    }
}
