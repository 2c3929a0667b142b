//! Two nodes on one bus bouncing frames back and forth.
//!
//! Each node sends a frame filled with its own byte; the other node sends it
//! straight back. When a node sees its own fill byte come back, it grows the
//! payload by one byte. Identifiers follow the J1939 layout (priority, PGN
//! 0xEF00, destination, source) so both ports can filter on the extended
//! range "08000000 1CFFFFFF".
//!
//! Run with:
//!   cargo run -p pcanport --example pingpong --features logging

use std::sync::Arc;

use clap::Parser;
use pcanport::filter::FilterSpec;
use pcanport::frame::{Frame, MAX_PAYLOAD};
use pcanport::logging::{init_logging, LogFormat, LogLevel};
use pcanport::native::{ChannelHandle, VirtualBus};
use pcanport::port::{Port, PortConfig, PortEvent, PortEvents};

const PGN: u32 = 0xEF00;

#[derive(Parser, Debug)]
#[command(name = "pingpong", about = "Bounce frames between two CAN nodes")]
struct Args {
    /// Bus bit rate in bits per second.
    #[arg(long, default_value_t = 250_000)]
    rate: u32,

    /// Times each node runs through payload sizes 1 to 8.
    #[arg(long, default_value_t = 2)]
    rounds: u32,

    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevel,
}

fn j1939_id(priority: u32, dst: u8, src: u8) -> u32 {
    (priority << 26) | ((PGN | u32::from(dst)) << 8) | u32::from(src)
}

fn source(id: u32) -> u8 {
    (id & 0xFF) as u8
}

struct Pinger {
    port: Port<VirtualBus>,
    events: PortEvents,
    address: u8,
    priority: u32,
    fill: u8,
}

impl Pinger {
    fn open(
        bus: &Arc<VirtualBus>,
        channel: ChannelHandle,
        config: PortConfig,
        address: u8,
        priority: u32,
        fill: u8,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let port = Port::new(Arc::clone(bus), config)?;
        let events = port.take_events().ok_or("event stream already taken")?;
        port.open(channel)?;
        println!("Device {address:02X} ready on {channel}");
        Ok(Self {
            port,
            events,
            address,
            priority,
            fill,
        })
    }

    fn send(&self, dst: u8, payload: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
        let id = j1939_id(self.priority, dst, self.address);
        self.port.write(&Frame::extended(id, payload))?;
        Ok(())
    }

    /// Next inbound frame. Delivery on the virtual bus is synchronous, so
    /// anything sent to us is already queued.
    fn next_data(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        while let Some(event) = self.events.try_recv() {
            match event {
                PortEvent::Data(frame) => return Ok(frame),
                PortEvent::Status(status) => println!("{:02X} status: {status}", self.address),
                PortEvent::Error(info) => return Err(info.message.into()),
                _ => {}
            }
        }
        Err(format!("{:02X} expected a frame", self.address).into())
    }

    /// Handle one inbound frame: echo it if it came from the peer, report it
    /// if it is our own coming back.
    fn handle(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let frame = self.next_data()?;
        let from = source(frame.id);
        if frame.payload.first() == Some(&self.fill) {
            println!(
                "{:02X} Received {} byte response from {from:02X}",
                self.address,
                frame.payload.len()
            );
            return Ok(());
        }
        self.send(from, frame.payload.to_vec())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let bus = Arc::new(VirtualBus::new(2));
    let config = PortConfig::default()
        .with_can_rate(args.rate)
        .with_filter(FilterSpec::id("08000000 1CFFFFFF", true));

    let mut device1 = Pinger::open(&bus, ChannelHandle(0x51), config.clone(), 0x80, 4, 0x55)?;
    let mut device2 = Pinger::open(&bus, ChannelHandle(0x52), config, 0x81, 5, 0xAA)?;

    for _ in 0..args.rounds {
        for size in 1..=MAX_PAYLOAD {
            println!("{:02X} sending {size} bytes", device1.address);
            device1.send(device2.address, vec![device1.fill; size])?;
            device2.handle()?;
            device1.handle()?;

            println!("{:02X} sending {size} bytes", device2.address);
            device2.send(device1.address, vec![device2.fill; size])?;
            device1.handle()?;
            device2.handle()?;
        }
    }

    device1.port.close()?;
    device2.port.close()?;
    Ok(())
}
