//! The connect engine and public host-facing [`Session`] API, grounded in
//! `esp_serial.cpp`'s `EspToolQt` class (`autoConnect`, `disconnect`,
//! `readFlash`, `flashUpload`, `verifyFlash`, `read_reg`/`write_reg`) plus
//! SPEC_FULL §4.4/§6.
//!
//! This is the one place the whole protocol stack (serial, SLIP, transport,
//! reset, stub, rebaud, flash, SPI, target registry) is wired together behind
//! a single blocking, single-threaded session, matching §5's concurrency
//! model: at most one command in flight, no pipelining, no cancellation
//! mid-command.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reset::{self, ResetStrategy};
use crate::serial::SerialAdapter;
use crate::slip;
use crate::targets::{self, ReadPort, RegisterPort, TargetDescriptor};
use crate::transport::Transport;
use crate::{flash, rebaud, spi, stub};

const CHIP_DETECT_MAGIC_REG_ADDR: u32 = 0x4000_1000;
const SYNC_BAUD: u32 = 115_200;
const DEFAULT_REBAUD: u32 = 460_800;

/// Identity and status snapshot populated once [`Session::auto_connect`]
/// succeeds, cleared on [`Session::disconnect`] (§3 `SessionState.info`).
#[derive(Debug, Clone, Default)]
pub struct TargetInfo {
    pub connected: bool,
    pub com_port: String,
    pub chip_family: String,
    pub chip_description: String,
    pub chip_features: String,
    pub flash_size: u32,
}

/// A live (or idle) connection to one bootloader target. Owns the serial
/// port for its entire connected lifetime; see §3 invariants.
pub struct Session {
    transport: Option<Transport>,
    target: Option<Arc<dyn TargetDescriptor>>,
    reset_strategy: Option<ResetStrategy>,
    baud: u32,
    info: TargetInfo,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Builds an idle session. No hardware is touched until [`auto_connect`](Self::auto_connect).
    pub fn new() -> Self {
        Self {
            transport: None,
            target: None,
            reset_strategy: None,
            baud: SYNC_BAUD,
            info: TargetInfo::default(),
        }
    }

    /// Lists the serial device names the OS currently exposes, in
    /// enumeration order (the original tool's own port order is unspecified
    /// per SPEC_FULL §9; this crate does not reverse it).
    pub fn get_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.info.connected
    }

    pub fn info(&self) -> &TargetInfo {
        &self.info
    }

    /// Probes one port, at one baud, with the sync burst already open on it.
    /// Returns `true` once a `> 50`-byte reply arrives to any of four bursts.
    fn probe_sync(port: &mut SerialAdapter, sync_frame: &[u8]) -> bool {
        for _ in 0..4 {
            if port.write_all(sync_frame, Duration::from_millis(50)).is_err() {
                return false;
            }
            let data = port.read_for(Duration::from_millis(50));
            if data.len() > 50 {
                return true;
            }
        }
        false
    }

    /// Walks the cross product of candidate ports and reset strategies,
    /// locking onto the first one that answers the sync burst, per §4.4 step 3.
    fn find_target_port(candidate_ports: &[String]) -> Option<(SerialAdapter, String, ResetStrategy)> {
        let sync_payload = {
            let mut body = vec![0x07, 0x07, 0x12, 0x20];
            body.extend(std::iter::repeat(0x55).take(32));
            body
        };
        let sync_frame = slip::encode_command(crate::transport::SYNC, &sync_payload, 0);

        for port_name in candidate_ports.iter().rev() {
            for strategy in [ResetStrategy::Classic, ResetStrategy::UsbJtagSerial] {
                debug!("probing {port_name} with reset strategy {strategy:?}");
                let mut port = match SerialAdapter::open(port_name, SYNC_BAUD) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("can't open {port_name}: {e}");
                        continue;
                    }
                };
                if reset::reset_to_boot(&mut port, strategy).is_err() {
                    continue;
                }
                if Self::probe_sync(&mut port, &sync_frame) {
                    return Some((port, port_name.clone(), strategy));
                }
            }
        }
        None
    }

    /// Discovers, syncs with, stub-loads, rebauds and identifies an attached
    /// target. On any failure the session is left disconnected with the port
    /// closed (§4.4 "Failure semantics", §7 "well-defined Idle state").
    ///
    /// `port` pins the search to one device; `None` walks every port
    /// [`get_ports`](Self::get_ports) reports, in reverse enumeration order.
    pub fn auto_connect(&mut self, port: Option<&str>) -> Result<()> {
        self.disconnect();

        let candidates: Vec<String> = match port {
            Some(p) => vec![p.to_string()],
            None => Self::get_ports(),
        };

        let (mut serial, found_port, strategy) =
            Self::find_target_port(&candidates).ok_or(Error::SyncTimeout)?;
        info!("device found on {found_port}");

        serial.read_for(Duration::from_millis(200));
        let mut transport = Transport::new(serial);

        let magic = transport.read_reg(CHIP_DETECT_MAGIC_REG_ADDR);
        if magic == 0 {
            return Err(Error::SyncTimeout);
        }

        let target = targets::registry()
            .into_iter()
            .find(|candidate| candidate.chip_compare_magic_value(magic))
            .ok_or(Error::UnknownChip(magic))?;
        info!("chip detected: {}", target.chip_name());

        if !stub::upload_stub(&mut transport, target.as_ref()) {
            return Err(Error::StubUploadFailed);
        }

        let requested_baud = DEFAULT_REBAUD;
        if !rebaud::rebaud(&mut transport, target.as_ref(), SYNC_BAUD, requested_baud) {
            return Err(Error::RebaudFailed(requested_baud));
        }
        self.baud = requested_baud;

        let chip_description = target.chip_description(&mut transport);
        let chip_features = target.chip_features(&mut transport);
        let crystal_freq = target.crystal_freq_mhz(&mut transport, self.baud);
        let flash_size = spi::get_flash_size(target.as_ref(), &mut transport);

        info!("chip is {chip_description}");
        info!("features: {chip_features}");
        info!("crystal is {crystal_freq}MHz");
        info!("flash size: {flash_size} bytes");

        self.info = TargetInfo {
            connected: true,
            com_port: found_port,
            chip_family: target.chip_name().to_string(),
            chip_description,
            chip_features,
            flash_size,
        };
        self.reset_strategy = Some(strategy);
        self.target = Some(target);
        self.transport = Some(transport);

        Ok(())
    }

    /// Returns to the idle state, releasing the serial port. Safe to call
    /// whether or not the session is connected.
    pub fn disconnect(&mut self) {
        self.transport = None;
        self.target = None;
        self.reset_strategy = None;
        self.info = TargetInfo::default();
    }

    fn transport_mut(&mut self) -> Result<&mut Transport> {
        self.transport.as_mut().ok_or(Error::NotConnected)
    }

    fn target(&self) -> Result<&Arc<dyn TargetDescriptor>> {
        self.target.as_ref().ok_or(Error::NotConnected)
    }

    /// Reboots the target out of the bootloader and into its application.
    pub fn reset_from_boot(&mut self) -> Result<()> {
        let transport = self.transport_mut()?;
        reset::reset_from_boot(transport.port_mut()).map_err(Error::PortUnavailable)
    }

    pub fn read_reg(&mut self, address: u32) -> Result<u32> {
        Ok(self.transport_mut()?.read_reg(address))
    }

    pub fn write_reg(&mut self, address: u32, value: u32) -> Result<bool> {
        Ok(self.transport_mut()?.write_reg(address, value))
    }

    /// Reads `size` bytes of flash starting at `offset`, verified against the
    /// device-reported MD5 trailer (§4.7).
    pub fn read_flash(&mut self, offset: u32, size: u32, on_progress: impl FnMut(u32)) -> Result<Vec<u8>> {
        let target = self.target()?.clone();
        let transport = self.transport_mut()?;
        flash::read_flash(transport, target.as_ref(), offset, size, on_progress)
            .ok_or(Error::ProtocolFrameInvalid)
    }

    /// Writes `data` to flash at `offset` in verify-and-retry macro-blocks
    /// (§4.8). `compressed` selects the deflate-compressed wire path.
    pub fn flash_upload(
        &mut self,
        offset: u32,
        data: Vec<u8>,
        compressed: bool,
        on_progress: impl FnMut(u32),
    ) -> Result<()> {
        let target = self.target()?.clone();
        let transport = self.transport_mut()?;
        flash::flash_upload(transport, target.as_ref(), offset, data, compressed, on_progress)
    }

    /// Verifies previously-written flash content without rewriting it.
    pub fn verify_flash(&mut self, offset: u32, data: &[u8], on_progress: impl FnMut(u32)) -> Result<()> {
        let transport = self.transport_mut()?;
        flash::verify_flash(transport, offset, data, on_progress)
    }
}

impl ReadPort for Session {
    fn read_reg(&mut self, address: u32) -> u32 {
        match self.transport.as_mut() {
            Some(t) => t.read_reg(address),
            None => 0,
        }
    }
}

impl RegisterPort for Session {
    fn write_reg(&mut self, address: u32, value: u32) -> bool {
        match self.transport.as_mut() {
            Some(t) => t.write_reg(address, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_session_rejects_flash_ops() {
        let mut session = Session::new();
        assert!(!session.is_connected());
        assert!(matches!(session.read_reg(0x1000), Err(Error::NotConnected)));
        assert!(matches!(
            session.read_flash(0, 16, |_| {}),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn disconnect_clears_info() {
        let mut session = Session::new();
        session.info.connected = true;
        session.disconnect();
        assert!(!session.is_connected());
        assert_eq!(session.info().com_port, "");
    }
}
