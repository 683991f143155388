// Line monitor example
//
// Opens a serial port, prints every line the device sends, and forwards each
// line typed on stdin to the device. Ends on EOF (Ctrl+D).

use clap::Parser;
use serial_lines::{DeviceDirectory, SerialSession, SessionConfig, SystemDirectory};
use std::io::{self, BufRead};

#[derive(Parser)]
#[command(name = "line_monitor")]
#[command(version = "1.0")]
#[command(about = "Print lines received from a serial device")]
#[command(long_about = "Open a serial port at 8N1, print every delimited line it sends and forward stdin lines to it. Run without a port to list available devices.")]
struct Args {
    /// Serial port to open, e.g. /dev/ttyUSB0 or COM3
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = serial_lines::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Line delimiter character
    #[arg(short, long, default_value_t = '\n', help = "Single ASCII character ending each line")]
    delimiter: char,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let Some(port) = args.port else {
        SystemDirectory.print_devices();
        return Ok(());
    };

    let delimiter = match u8::try_from(args.delimiter) {
        Ok(byte) if byte.is_ascii() => byte,
        _ => {
            eprintln!("Invalid delimiter: {:?}. Use a single ASCII character", args.delimiter);
            std::process::exit(1);
        }
    };

    let config = SessionConfig::default().with_delimiter(delimiter);
    let mut session = SerialSession::with_config(|line: String| println!("< {}", line), config);
    session.start(&port, args.baud)?;
    println!("✓ Opened {} at {} baud. Ctrl+D to quit.\n", port, args.baud);

    for line in io::stdin().lock().lines() {
        let mut bytes = line?.into_bytes();
        bytes.push(delimiter);

        // write_some may accept only part of the buffer
        let mut offset = 0;
        while offset < bytes.len() {
            let written = session.write_some(&bytes[offset..])?;
            if written == 0 {
                return Err(format!("{} accepted no bytes", port).into());
            }
            offset += written;
        }
    }

    session.stop();
    println!("Closed {}", port);
    Ok(())
}
