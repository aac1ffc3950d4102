//! ESP32-S2 descriptor, grounded in `targets/esp32s2.cpp`.

use super::{RegisterPort, TargetDescriptor};

const EFUSE_BASE: u32 = 0x3F41_A000;
const EFUSE_BLOCK1_ADDR: u32 = EFUSE_BASE + 0x044;
const EFUSE_BLOCK2_ADDR: u32 = EFUSE_BASE + 0x05C;

const UARTDEV_BUF_NO: u32 = 0x3FFF_FD14;
const UARTDEV_BUF_NO_USB_OTG: u32 = 2;
const USB_RAM_BLOCK: u32 = 0x800;

fn pkg_version(port: &mut dyn RegisterPort) -> u32 {
    port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4) & 0x0F
}

fn minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    let hi = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 20) & 0x01;
    let low = (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 4) >> 4) & 0x07;
    (hi << 3) + low
}

fn major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 18) & 0x03
}

fn flash_cap(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 21) & 0x0F
}

fn psram_cap(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 28) & 0x0F
}

fn block2_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK2_ADDR + 4 * 4) >> 4) & 0x07
}

pub struct Esp32S2;

impl Esp32S2 {
    fn uart_no(&self, port: &mut dyn RegisterPort) -> u32 {
        port.read_reg(UARTDEV_BUF_NO) & 0xFF
    }
}

impl TargetDescriptor for Esp32S2 {
    fn chip_name(&self) -> &'static str {
        "ESP32-S2"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &["ESP32-S2", "ESP32-S2FH2", "ESP32-S2FH4", "ESP32-S2FNR2", "ESP32-S2R2"]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x000_07C25
    }

    fn stub_entry(&self) -> u32 {
        0x4002_8000
    }

    fn stub_text(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_text_start(&self) -> u32 {
        0x4002_2000
    }

    fn stub_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_data_start(&self) -> u32 {
        0x3FFF_E000
    }

    fn esp_ram_block(&self, port: &mut dyn RegisterPort) -> u32 {
        esp_ram_block(self, port)
    }

    fn spi_reg_base(&self) -> u32 {
        0x3F40_2000
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
        let flash = flash_cap(port);
        let psram = psram_cap(port);
        let major_rev = major_chip_version(port);
        let minor_rev = minor_chip_version(port);

        let chip_name = match flash + psram * 100 {
            0 => "ESP32-S2",
            1 => "ESP32-S2FH2",
            2 => "ESP32-S2FH4",
            102 => "ESP32-S2FNR2",
            100 => "ESP32-S2R2",
            _ => "unknown ESP32-S2",
        };

        format!("{} (revision v{}.{})", chip_name, major_rev, minor_rev)
    }

    fn chip_features(&self, port: &mut dyn RegisterPort) -> String {
        let mut features = String::from("WiFi");

        features.push_str(", ");
        features.push_str(match flash_cap(port) {
            0 => "No Embedded Flash",
            1 => "Embedded Flash 2MB",
            2 => "Embedded Flash 4MB",
            _ => "Unknown Embedded Flash",
        });

        features.push_str(", ");
        features.push_str(match psram_cap(port) {
            0 => "No Embedded PSRAM",
            1 => "Embedded PSRAM 2MB",
            2 => "Embedded PSRAM 4MB",
            _ => "Unknown Embedded PSRAM",
        });

        features.push_str(", ");
        features.push_str(match block2_version(port) {
            0 => "No calibration in BLK2 of efuse",
            1 => "ADC and temperature sensor calibration in BLK2 of efuse V1",
            2 => "ADC and temperature sensor calibration in BLK2 of efuse V2",
            _ => "Unknown Calibration in BLK2",
        });

        features
    }

    fn crystal_freq_mhz(&self, _port: &mut dyn RegisterPort, _baud: u32) -> u32 {
        // ESP32-S2's XTAL is fixed to 40MHz.
        40
    }
}

/// Overrides the shared `0x1800` default: this family's native USB-OTG
/// console needs a smaller RAM-stub transfer block.
pub fn esp_ram_block(target: &Esp32S2, port: &mut dyn RegisterPort) -> u32 {
    if target.uart_no(port) == UARTDEV_BUF_NO_USB_OTG {
        USB_RAM_BLOCK
    } else {
        0x1800
    }
}
