//! ESP32-S3 descriptor, grounded in `targets/esp32s3.cpp`.

use super::{RegisterPort, TargetDescriptor};

const EFUSE_BASE: u32 = 0x6000_7000;
const EFUSE_BLOCK1_ADDR: u32 = EFUSE_BASE + 0x044;
const EFUSE_BLOCK2_ADDR: u32 = EFUSE_BASE + 0x05C;

const UARTDEV_BUF_NO: u32 = 0x3FCE_F00C;
const UARTDEV_BUF_NO_USB_OTG: u32 = 3;
const USB_RAM_BLOCK: u32 = 0x800;

fn pkg_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 21) & 0x07
}

fn blk_version_major(port: &mut dyn RegisterPort) -> u32 {
    port.read_reg(EFUSE_BLOCK2_ADDR + 4 * 4) & 0x03
}

fn blk_version_minor(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 24) & 0x07
}

fn raw_major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 5) >> 24) & 0x03
}

fn raw_minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    let hi = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 5) >> 23) & 0x01;
    let low = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 18) & 0x07;
    (hi << 3) + low
}

/// The major-version field was repurposed on block version v1.1; only chip
/// rev v0.0 hits this combination, so it is special-cased rather than
/// misreported as some other revision.
fn is_eco0(minor_raw: u32, port: &mut dyn RegisterPort) -> bool {
    (minor_raw & 0x7) == 0 && blk_version_major(port) == 1 && blk_version_minor(port) == 1
}

fn major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    let minor_raw = raw_minor_chip_version(port);
    if is_eco0(minor_raw, port) {
        0
    } else {
        raw_major_chip_version(port)
    }
}

fn minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    let minor_raw = raw_minor_chip_version(port);
    if is_eco0(minor_raw, port) {
        0
    } else {
        minor_raw
    }
}

fn flash_cap(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 27) & 0x07
}

fn flash_vendor(port: &mut dyn RegisterPort) -> &'static str {
    match port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4) & 0x07 {
        1 => "XMC",
        2 => "GD",
        3 => "FM",
        4 => "TT",
        5 => "BY",
        _ => "",
    }
}

fn psram_cap(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4) >> 3) & 0x03
}

fn psram_vendor(port: &mut dyn RegisterPort) -> &'static str {
    match (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4) >> 7) & 0x03 {
        1 => "AP_3v3",
        2 => "AP_1v8",
        _ => "",
    }
}

pub struct Esp32S3;

impl Esp32S3 {
    fn uart_no(&self, port: &mut dyn RegisterPort) -> u32 {
        port.read_reg(UARTDEV_BUF_NO) & 0xFF
    }
}

impl TargetDescriptor for Esp32S3 {
    fn chip_name(&self) -> &'static str {
        "ESP32-S3"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &[
            "ESP32-S3",
            "ESP32-S3R2",
            "ESP32-S3R8",
            "ESP32-S3-PICO-1-N8R2",
            "ESP32-S3FN8",
            "ESP32-S3-WROOM-1-N4",
            "ESP32-S3-WROOM-1-N8",
        ]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x9
    }

    fn stub_entry(&self) -> u32 {
        0x4037_8000
    }

    fn stub_text(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_text_start(&self) -> u32 {
        0x4037_0000
    }

    fn stub_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_data_start(&self) -> u32 {
        0x3FCB_0000
    }

    fn spi_reg_base(&self) -> u32 {
        0x6000_2000
    }

    fn spi_usr_reg(&self) -> u32 {
        self.spi_reg_base() + 0x18
    }

    fn spi_usr1_reg(&self) -> u32 {
        self.spi_reg_base() + 0x1C
    }

    fn spi_usr2_reg(&self) -> u32 {
        self.spi_reg_base() + 0x20
    }

    fn spi_w0_reg(&self) -> u32 {
        self.spi_reg_base() + 0x58
    }

    fn spi_mosi_dlen_offs(&self) -> bool {
        false
    }

    fn spi_mosi_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x24
    }

    fn spi_miso_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x28
    }

    fn efuse_rd_reg_base(&self) -> u32 {
        EFUSE_BASE
    }

    fn chip_description(&self, port: &mut dyn RegisterPort) -> String {
        let major_rev = major_chip_version(port);
        let minor_rev = minor_chip_version(port);
        let chip_name = match pkg_version(port) {
            0 => "ESP32-S3 (QFN56)",
            1 => "ESP32-S3-PICO-1 (LGA56)",
            _ => "unknown ESP32-S3",
        };
        format!("{} (revision v{}.{})", chip_name, major_rev, minor_rev)
    }

    fn chip_features(&self, port: &mut dyn RegisterPort) -> String {
        let mut features = String::from("WiFi, BLE");

        let flash = match flash_cap(port) {
            0 => "",
            1 => "Embedded Flash 8MB",
            2 => "Embedded Flash 4MB",
            _ => "Unknown Embedded Flash",
        };
        if !flash.is_empty() {
            features.push_str(&format!(", {}", flash));
            let vendor = flash_vendor(port);
            if !vendor.is_empty() {
                features.push_str(&format!(" ({})", vendor));
            }
        }

        let psram = match psram_cap(port) {
            0 => "",
            1 => "Embedded PSRAM 8MB",
            2 => "Embedded PSRAM 2MB",
            _ => "Unknown Embedded PSRAM",
        };
        if !psram.is_empty() {
            features.push_str(&format!(", {}", psram));
            let vendor = psram_vendor(port);
            if !vendor.is_empty() {
                features.push_str(&format!(" ({})", vendor));
            }
        }

        features
    }

    fn crystal_freq_mhz(&self, _port: &mut dyn RegisterPort, _baud: u32) -> u32 {
        // ESP32-S3's XTAL is fixed to 40MHz.
        40
    }

    fn esp_ram_block(&self, port: &mut dyn RegisterPort) -> u32 {
        esp_ram_block(self, port)
    }
}

/// Overrides the shared `0x1800` default when the native USB-OTG console is
/// in use, mirroring [`super::esp32s2::esp_ram_block`].
pub fn esp_ram_block(target: &Esp32S3, port: &mut dyn RegisterPort) -> u32 {
    if target.uart_no(port) == UARTDEV_BUF_NO_USB_OTG {
        USB_RAM_BLOCK
    } else {
        0x1800
    }
}
