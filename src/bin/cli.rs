//! Manual bring-up and smoke-test harness for `esp-flash-core`.
//!
//! Not the product's shipping interface (SPEC_FULL §1, §10) — a GUI or other
//! thin surface is expected to consume the library directly. This binary
//! exists to drive `auto_connect`/read/write/verify/dump/load by hand while
//! developing against real hardware, in the same spirit as the teacher
//! crate's `util` feature bin.

use std::str::FromStr;

use log::{error, info};
use structopt::StructOpt;

use esp_flash_core::session::Session;

use simplelog::{LevelFilter, TermLogger, TerminalMode};

use ihex::{Record, Reader};

#[derive(Debug, StructOpt)]
struct Options {
    #[structopt(subcommand)]
    operation: Operation,

    /// Serial device to connect to. Omit to probe every available port.
    #[structopt(long, env = "ESPFLASH_PORT")]
    port: Option<String>,

    /// Configure log level
    #[structopt(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: LevelFilter,
}

#[derive(Debug, StructOpt)]
enum Operation {
    /// Connect and print chip identity, features, and flash size
    Info,
    /// Read bytes from flash
    Read {
        /// Flash address for read start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
        /// Length of flash read in bytes
        length: u32,
    },
    /// Write bytes to flash
    Write {
        /// Flash address for write start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        /// Data to write, as a hex string
        #[structopt(long)]
        data: HexData,

        /// Disable deflate compression on the wire
        #[structopt(long)]
        no_compress: bool,
    },
    /// Verify previously-written flash content against local data
    Verify {
        /// Flash address for verify start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        #[structopt(long)]
        data: HexData,
    },
    /// Dump flash into an ihex file
    Dump {
        /// Flash address for read start in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        /// Length of flash read in bytes
        length: u32,

        /// Output ihex file
        #[structopt(long, default_value = "dump.ihex")]
        file: String,
    },
    /// Write flash from an ihex file
    Load {
        /// Input ihex file
        file: String,

        /// Disable deflate compression on the wire
        #[structopt(long)]
        no_compress: bool,
    },
    /// Read one 32-bit register
    ReadReg {
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
    },
    /// Write one 32-bit register
    WriteReg {
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
        #[structopt(parse(try_from_str = parse_hex))]
        value: u32,
    },
    /// Reboot the target out of the bootloader
    Reset,
}

#[derive(Debug)]
struct HexData(Vec<u8>);

impl FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s).map(HexData)
    }
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u32::from_str_radix(s, 16)
}

fn print_progress(label: &str, percent: u32) {
    info!("{label}: {percent}%");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Options::from_args();
    TermLogger::init(opts.log_level, simplelog::Config::default(), TerminalMode::Mixed)?;

    let mut session = Session::new();
    info!("connecting...");
    if let Err(e) = session.auto_connect(opts.port.as_deref()) {
        error!("connect failed: {e}");
        return Ok(());
    }

    let info = session.info().clone();
    info!("connected on {}", info.com_port);
    info!("chip family: {}", info.chip_family);
    info!("chip: {}", info.chip_description);
    info!("features: {}", info.chip_features);
    info!("flash size: {} bytes", info.flash_size);

    match opts.operation {
        Operation::Info => {}
        Operation::Read { address, length } => {
            info!("reading {length} bytes from 0x{address:08x}");
            match session.read_flash(address, length, |pct| print_progress("read", pct)) {
                Ok(data) => info!("read {} bytes: {}", data.len(), hex::encode(&data)),
                Err(e) => error!("read failed: {e}"),
            }
        }
        Operation::Write { address, data, no_compress } => {
            info!("writing {} bytes to 0x{address:08x}", data.0.len());
            let result = session.flash_upload(address, data.0, !no_compress, |pct| print_progress("write", pct));
            match result {
                Ok(()) => info!("write complete"),
                Err(e) => error!("write failed: {e}"),
            }
        }
        Operation::Verify { address, data } => {
            let result = session.verify_flash(address, &data.0, |pct| print_progress("verify", pct));
            match result {
                Ok(()) => info!("verify ok"),
                Err(e) => error!("verify failed: {e}"),
            }
        }
        Operation::Dump { address, length, file } => {
            info!("reading {length} bytes from 0x{address:08x} to file {file}");
            let data = match session.read_flash(address, length, |pct| print_progress("read", pct)) {
                Ok(data) => data,
                Err(e) => {
                    error!("read failed: {e}");
                    return Ok(());
                }
            };

            let mut records = Vec::new();
            for (c, chunk) in data.chunks(32).enumerate() {
                records.push(Record::Data {
                    offset: (address as usize + c * 32) as u16,
                    value: chunk.to_vec(),
                });
            }
            records.push(Record::EndOfFile);

            let ihex_text = ihex::create_object_file_representation(&records)?;
            std::fs::write(&file, ihex_text)?;
            info!("dump complete");
        }
        Operation::Load { file, no_compress } => {
            info!("loading file {file}");
            let text = std::fs::read_to_string(&file)?;
            for record in Reader::new(&text) {
                match record {
                    Ok(Record::Data { offset, value }) => {
                        info!("writing {} bytes at 0x{:08x}", value.len(), offset);
                        let result = session.flash_upload(offset as u32, value, !no_compress, |pct| {
                            print_progress("write", pct)
                        });
                        if let Err(e) = result {
                            error!("write failed: {e}");
                            return Ok(());
                        }
                    }
                    Ok(Record::EndOfFile) => {}
                    Ok(other) => error!("unrecognised record: {other:?}"),
                    Err(e) => {
                        error!("reader error: {e:?}");
                        return Ok(());
                    }
                }
            }
            info!("load complete");
        }
        Operation::ReadReg { address } => match session.read_reg(address) {
            Ok(value) => info!("0x{address:08x} = 0x{value:08x}"),
            Err(e) => error!("read_reg failed: {e}"),
        },
        Operation::WriteReg { address, value } => match session.write_reg(address, value) {
            Ok(true) => info!("wrote 0x{value:08x} to 0x{address:08x}"),
            Ok(false) => error!("write_reg rejected by device"),
            Err(e) => error!("write_reg failed: {e}"),
        },
        Operation::Reset => match session.reset_from_boot() {
            Ok(()) => info!("reset issued"),
            Err(e) => error!("reset failed: {e}"),
        },
    }

    session.disconnect();
    Ok(())
}
