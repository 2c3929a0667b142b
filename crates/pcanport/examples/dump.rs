//! Print every frame received on a CAN channel.
//!
//! No hardware is needed: the channel lives on an in-memory bus and a second
//! node on the same bus sends a handful of frames.
//!
//! Run with:
//!   cargo run -p pcanport --example dump --features logging -- --count 12 --filter "100 107"

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use pcanport::filter::FilterSpec;
use pcanport::frame::Frame;
use pcanport::logging::{init_logging, LogFormat, LogLevel};
use pcanport::native::VirtualBus;
use pcanport::port::{Port, PortConfig, PortEvent};

#[derive(Parser, Debug)]
#[command(name = "dump", about = "Print inbound CAN frames")]
struct Args {
    /// Bus bit rate in bits per second.
    #[arg(long, default_value_t = 250_000)]
    rate: u32,

    /// Hex identifier range to receive, e.g. "100 1FF".
    #[arg(long)]
    filter: Option<String>,

    /// Use 29-bit identifiers.
    #[arg(long)]
    ext: bool,

    /// Frames the simulated node sends.
    #[arg(long, default_value_t = 8)]
    count: u32,

    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let bus = Arc::new(VirtualBus::new(2));

    let mut config = PortConfig::default().with_can_rate(args.rate);
    if let Some(range) = &args.filter {
        config = config.with_filter(FilterSpec::id(range.clone(), args.ext));
    }
    let board = Port::new(Arc::clone(&bus), config)?;
    let mut events = board.take_events().ok_or("event stream already taken")?;

    let ports = board.list()?;
    println!("{ports:#?}");
    let (first, last) = match (ports.first(), ports.last()) {
        (Some(first), Some(last)) if ports.len() > 1 => (first.path, last.path),
        _ => return Err("need two CAN channels".into()),
    };

    println!("Opening {last}");
    board.open(last)?;

    let printer = thread::spawn(move || {
        while let Some(event) = events.blocking_recv() {
            match event {
                PortEvent::Open => println!("Port Open"),
                PortEvent::Data(frame) => {
                    println!("Msg: {:x} {:02x?}", frame.id, frame.payload.as_ref())
                }
                PortEvent::Status(status) => println!("Status: {status}"),
                PortEvent::Error(info) => eprintln!("Port Error: {}", info.message),
                PortEvent::Close(reason) => println!("Port Closed ({reason:?})"),
                PortEvent::Write(_) => {}
            }
        }
    });

    let node = Port::new(Arc::clone(&bus), PortConfig::default().with_can_rate(args.rate))?;
    node.open(first)?;
    for i in 0..args.count {
        let id = if args.ext { 0x18FF_0000 | i } else { 0x100 + i };
        let payload = vec![i as u8; (i % 9) as usize];
        node.write(&Frame::new(id, args.ext, payload))?;
        thread::sleep(Duration::from_millis(20));
    }
    node.close()?;

    board.close()?;
    printer.join().map_err(|_| "printer thread panicked")?;
    Ok(())
}
