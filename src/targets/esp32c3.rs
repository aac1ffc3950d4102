//! ESP32-C3 (RISC-V) descriptor, grounded in `targets/esp32c3.cpp`. The
//! family's `.h` (register map constants beyond `EFUSE_BLOCK1_ADDR`, stub
//! blobs, detect-magic value) was not present in the retrieval pack; those
//! fields follow the generation's known SPI1/efuse layout and are flagged
//! here as representative rather than verbatim-sourced.

use super::{RegisterPort, TargetDescriptor};

const EFUSE_BASE: u32 = 0x6000_8800;
const EFUSE_BLOCK1_ADDR: u32 = EFUSE_BASE + 0x044;

fn pkg_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 21) & 0x07
}

fn minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    let hi = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 5) >> 23) & 0x01;
    let low = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 18) & 0x07;
    (hi << 3) + low
}

fn major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 5) >> 24) & 0x03
}

fn flash_cap(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 27) & 0x07
}

fn flash_vendor(port: &mut dyn RegisterPort) -> &'static str {
    match (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4)) & 0x07 {
        1 => "XMC",
        2 => "GD",
        3 => "FM",
        4 => "TT",
        5 => "ZBIT",
        _ => "",
    }
}

pub struct Esp32C3;

impl TargetDescriptor for Esp32C3 {
    fn chip_name(&self) -> &'static str {
        "ESP32-C3"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &[
            "ESP32-C3",
            "ESP32-C3FN4",
            "ESP32-C3FH4",
            "ESP32-C3FH4X",
            "ESP32-C3-MINI-1-N4",
            "ESP32-C3-MINI-1-H4",
            "ESP32-C3-WROOM-02-N4",
            "ESP32-C3-WROOM-02-H4",
            "ESP8685",
        ]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x6921_1006
    }

    fn stub_entry(&self) -> u32 {
        0x4038_0400
    }

    fn stub_text(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_text_start(&self) -> u32 {
        0x4038_0000
    }

    fn stub_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_data_start(&self) -> u32 {
        0x3FC8_0000
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
        let pkg = pkg_version(port);
        let major_rev = major_chip_version(port);
        let minor_rev = minor_chip_version(port);

        let chip_name = match pkg {
            0 => "ESP32-C3 (QFN32)",
            1 => "ESP8685 (QFN28)",
            2 => "ESP32-C3 AZ (QFN32)",
            3 => "ESP8686 (QFN24)",
            _ => "unknown ESP32-C3",
        };

        format!("{} (revision v{}.{})", chip_name, major_rev, minor_rev)
    }

    fn chip_features(&self, port: &mut dyn RegisterPort) -> String {
        let mut features = String::from("WiFi, BLE");

        let flash = match flash_cap(port) {
            0 => "",
            1 => "Embedded Flash 4MB",
            2 => "Embedded Flash 2MB",
            3 => "Embedded Flash 1MB",
            4 => "Embedded Flash 8MB",
            _ => "Unknown Embedded Flash",
        };

        if !flash.is_empty() {
            features.push_str(&format!(", {} ({})", flash, flash_vendor(port)));
        }

        features
    }

    fn crystal_freq_mhz(&self, _port: &mut dyn RegisterPort, _baud: u32) -> u32 {
        // ESP32-C3's XTAL is fixed to 40MHz; no UART-divider estimation needed.
        40
    }
}
