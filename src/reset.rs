//! DTR/RTS reset sequences used to force a target into or out of the ROM
//! bootloader (SPEC_FULL §4.2), grounded in `esp_reset.cpp`'s two reset
//! strategies (ported from https://github.com/espressif/esptool's reset.py).

use std::thread::sleep;
use std::time::Duration;

use crate::serial::SerialChannel;

/// Which DTR/RTS wiring the target board uses to enter the ROM bootloader.
///
/// Most boards use the classic auto-reset circuit (`Classic`); boards that
/// expose a native USB-JTAG-Serial peripheral instead (ESP32-C3/S3/C6/H2
/// internal USB) need the alternate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStrategy {
    Classic,
    UsbJtagSerial,
}

/// Drives the target into the ROM download bootloader.
pub fn reset_to_boot(port: &mut dyn SerialChannel, strategy: ResetStrategy) -> std::io::Result<()> {
    match strategy {
        ResetStrategy::Classic => {
            port.set_dtr(false)?;
            port.set_rts(true)?;
            sleep(Duration::from_millis(500));
            port.set_dtr(true)?;
            port.set_rts(false)?;
            sleep(Duration::from_millis(500));
            port.set_dtr(false)?;
            port.set_rts(false)?;
        }
        ResetStrategy::UsbJtagSerial => {
            port.set_dtr(false)?;
            port.set_rts(false)?;
            sleep(Duration::from_millis(100));
            port.set_dtr(true)?;
            port.set_rts(false)?;
            sleep(Duration::from_millis(100));
            port.set_rts(true)?;
            port.set_dtr(false)?;
            port.set_rts(true)?;
            sleep(Duration::from_millis(100));
            port.set_dtr(false)?;
            port.set_rts(false)?;
        }
    }
    Ok(())
}

/// Hard-resets the target out of the bootloader and back into its normal
/// application (or restarts a running application).
pub fn reset_from_boot(port: &mut dyn SerialChannel) -> std::io::Result<()> {
    port.set_rts(true)?;
    sleep(Duration::from_millis(200));
    port.set_rts(false)?;
    sleep(Duration::from_millis(200));
    Ok(())
}
