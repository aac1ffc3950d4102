//! Thin wrapper around a `serialport::SerialPort`, grounded in
//! `esp_serial.cpp`'s `openPort`/`serialWrite`/`serialRead`/`serialReadOneFrame`.
//!
//! `serialReadOneFrame`'s incremental byte-at-a-time SLIP decode is kept as
//! its own loop here (rather than buffering and calling into [`crate::slip`])
//! so a malformed escape aborts only the in-progress frame, matching the
//! original's `break` out of the inner loop while leaving the outer timeout
//! loop running.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;

const FRAME_DELIMITER: u8 = 0xC0;
const ESC: u8 = 0xDB;
const ESC_END: u8 = 0xDC;
const ESC_ESC: u8 = 0xDD;

/// The byte-level and control-line operations [`crate::transport::Transport`]
/// and the reset sequencer need from a serial connection. Exists so tests can
/// substitute an in-memory mock for [`SerialAdapter`] without touching a real
/// OS serial device (SPEC_FULL §8, "Ambient test tooling").
pub trait SerialChannel: Send {
    fn write_all(&mut self, data: &[u8], timeout: Duration) -> std::io::Result<()>;
    fn read_for(&mut self, timeout: Duration) -> Vec<u8>;
    fn read_one_frame(&mut self, timeout: Duration) -> Vec<u8>;
    fn set_baud(&mut self, baud: u32) -> std::io::Result<()>;
    fn set_dtr(&mut self, asserted: bool) -> std::io::Result<()>;
    fn set_rts(&mut self, asserted: bool) -> std::io::Result<()>;
}

/// An open serial connection to a candidate bootloader target.
pub struct SerialAdapter {
    port: Box<dyn SerialPort>,
}

impl SerialAdapter {
    /// Opens `path` at `baud` with the 8N1 framing the ROM bootloader expects.
    pub fn open(path: &str, baud: u32) -> std::io::Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
        Ok(Self { port })
    }

    pub fn set_baud(&mut self, baud: u32) -> std::io::Result<()> {
        self.port
            .set_baud_rate(baud)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }

    pub fn set_dtr(&mut self, asserted: bool) -> std::io::Result<()> {
        self.port
            .write_data_terminal_ready(asserted)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }

    pub fn set_rts(&mut self, asserted: bool) -> std::io::Result<()> {
        self.port
            .write_request_to_send(asserted)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }

    /// Discards any bytes buffered from before this write, then writes `data`
    /// and waits for it to drain.
    pub fn write_all(&mut self, data: &[u8], timeout: Duration) -> std::io::Result<()> {
        let _ = self.port.clear(serialport::ClearBuffer::Input);
        self.port.set_timeout(timeout)?;
        self.port.write_all(data)
    }

    /// Reads whatever bytes arrive until `timeout` elapses, or until a read
    /// returns nothing after some data has already been collected.
    pub fn read_for(&mut self, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut data = Vec::new();
        let mut buf = [0u8; 256];
        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let _ = self.port.set_timeout(remaining.min(Duration::from_millis(5)).max(Duration::from_millis(1)));
            match self.port.read(&mut buf) {
                Ok(0) => {
                    if !data.is_empty() {
                        break;
                    }
                }
                Ok(n) => data.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    if !data.is_empty() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        data
    }

    /// Reads and unescapes exactly one SLIP frame (the payload between two
    /// `0xC0` delimiters), or returns an empty vector if none arrives, or a
    /// malformed escape is seen, before `timeout` elapses.
    pub fn read_one_frame(&mut self, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut data = Vec::new();
        let mut frame_started = false;
        let mut escape_started = false;
        let mut byte = [0u8; 1];

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let _ = self.port.set_timeout(remaining.min(Duration::from_millis(5)).max(Duration::from_millis(1)));
            match self.port.read(&mut byte) {
                Ok(0) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(_) => break,
                Ok(_) => {}
            }
            let b = byte[0];

            if !frame_started {
                if b == FRAME_DELIMITER {
                    frame_started = true;
                }
                continue;
            }

            if b == FRAME_DELIMITER {
                return data;
            }

            if b == ESC {
                escape_started = true;
                continue;
            }

            if escape_started {
                escape_started = false;
                match b {
                    ESC_END => data.push(FRAME_DELIMITER),
                    ESC_ESC => data.push(ESC),
                    _ => break,
                }
                continue;
            }

            data.push(b);
        }

        Vec::new()
    }
}

impl SerialChannel for SerialAdapter {
    fn write_all(&mut self, data: &[u8], timeout: Duration) -> std::io::Result<()> {
        SerialAdapter::write_all(self, data, timeout)
    }

    fn read_for(&mut self, timeout: Duration) -> Vec<u8> {
        SerialAdapter::read_for(self, timeout)
    }

    fn read_one_frame(&mut self, timeout: Duration) -> Vec<u8> {
        SerialAdapter::read_one_frame(self, timeout)
    }

    fn set_baud(&mut self, baud: u32) -> std::io::Result<()> {
        SerialAdapter::set_baud(self, baud)
    }

    fn set_dtr(&mut self, asserted: bool) -> std::io::Result<()> {
        SerialAdapter::set_dtr(self, asserted)
    }

    fn set_rts(&mut self, asserted: bool) -> std::io::Result<()> {
        SerialAdapter::set_rts(self, asserted)
    }
}
