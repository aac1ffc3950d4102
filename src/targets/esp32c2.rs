//! ESP32-C2 descriptor, grounded in `targets/esp32c2.cpp`.

use super::{RegisterPort, TargetDescriptor};

const EFUSE_BASE: u32 = 0x6000_8800;
const EFUSE_BLOCK1_ADDR: u32 = EFUSE_BASE + 0x044;
const EFUSE_BLOCK2_ADDR: u32 = EFUSE_BASE + 0x040;

const UART_CLKDIV_REG: u32 = 0x6000_0014;
const UART_CLKDIV_MASK: u32 = 0xF_FFFF;
const XTAL_CLK_DIVIDER: u32 = 1;

fn pkg_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK2_ADDR + 4) >> 22) & 0x07
}

fn minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK2_ADDR + 4) >> 16) & 0xF
}

fn major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK2_ADDR + 4) >> 20) & 0x3
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
        5 => "ZBIT",
        _ => "",
    }
}

pub struct Esp32C2;

impl TargetDescriptor for Esp32C2 {
    fn chip_name(&self) -> &'static str {
        "ESP32-C2"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &[
            "ESP8684",
            "ESP8684H2",
            "ESP8684H4",
            "ESP8684-MINI-1-H2",
            "ESP8684-MINI-1-H4",
            "ESP8684-WROOM-03-H2",
            "ESP8684-WROOM-03-H4",
        ]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x6F51_306F
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
        0x3FCA_0000
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
        let chip_name = match pkg_version(port) {
            0 | 1 => "ESP32-C2",
            _ => "unknown ESP32-C2",
        };
        let major_rev = major_chip_version(port);
        let minor_rev = minor_chip_version(port);
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

    fn crystal_freq_mhz(&self, port: &mut dyn RegisterPort, baud: u32) -> u32 {
        let uart_div = port.read_reg(UART_CLKDIV_REG) & UART_CLKDIV_MASK;
        super::estimate_xtal_freq(uart_div, baud, XTAL_CLK_DIVIDER)
    }
}
