//! ESP8266 descriptor, grounded in `targets/esp8266.cpp`. Unlike every other
//! family here the ROM bootloader predates the unified efuse-word layout;
//! chip identity comes from two raw 64-bit efuse halves assembled from four
//! registers rather than from a single `EFUSE_RD_REG_BASE`-relative word.

use super::{RegisterPort, TargetDescriptor};

const UART_CLKDIV_REG: u32 = 0x6000_0014;
const UART_CLKDIV_MASK: u32 = 0xF_FFFF;
// The ESP8266's APB bus runs at 2x the crystal frequency, unlike the Xtensa
// ESP32 family where bus frequency equals crystal frequency directly.
const XTAL_CLK_DIVIDER: u32 = 2;

fn efuses_0_63(port: &mut dyn RegisterPort) -> u64 {
    let mut result = (port.read_reg(0x3FF0_0054) as u64) << 32;
    result |= port.read_reg(0x3FF0_0050) as u64;
    result
}

fn efuses_64_127(port: &mut dyn RegisterPort) -> u64 {
    let mut result = (port.read_reg(0x3FF0_005C) as u64) << (96 - 64);
    result |= (port.read_reg(0x3FF0_0058) as u64) << (64 - 64);
    result
}

fn flash_size(efuses_0_63: u64, efuses_64_127: u64) -> u32 {
    let r0_4 = efuses_0_63 & (1 << 4) != 0;
    let r3_25 = efuses_64_127 & (1 << (121 - 64)) != 0;
    let r3_26 = efuses_64_127 & (1 << (122 - 64)) != 0;
    let r3_27 = efuses_64_127 & (1 << (123 - 64)) != 0;

    if r0_4 && !r3_25 {
        if !r3_27 && !r3_26 {
            return 1;
        } else if !r3_27 && r3_26 {
            return 2;
        }
    }
    if !r0_4 && r3_25 {
        if !r3_27 && !r3_26 {
            return 2;
        } else if !r3_27 && r3_26 {
            return 4;
        }
    }
    0
}

pub struct Esp8266;

impl Esp8266 {
    fn description(&self, port: &mut dyn RegisterPort) -> String {
        let e0 = efuses_0_63(port);
        let e1 = efuses_64_127(port);
        let is_8285 = (e0 & (1 << 4) != 0) || (e1 & (1 << (80 - 64)) != 0);

        if !is_8285 {
            return "ESP8266EX".to_string();
        }

        let max_temp = e0 & (1 << 5) != 0;
        match flash_size(e0, e1) {
            1 => {
                if max_temp {
                    "ESP8285H08"
                } else {
                    "ESP8285N08"
                }
            }
            2 => {
                if max_temp {
                    "ESP8285H16"
                } else {
                    "ESP8285N16"
                }
            }
            _ => "ESP8285",
        }
        .to_string()
    }
}

impl TargetDescriptor for Esp8266 {
    fn chip_name(&self) -> &'static str {
        "ESP8266"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &[
            "ESP8266",
            "ESP8266EX",
            "ESP8285N08",
            "ESP8285H16",
            "ESP-WROOM-02D-N2",
            "ESP-WROOM-02U-N2",
        ]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0xFFF0_C101
    }

    fn stub_entry(&self) -> u32 {
        0x4010_0000
    }

    fn stub_text(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_text_start(&self) -> u32 {
        0x4010_0000
    }

    fn stub_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_data_start(&self) -> u32 {
        0x3FFE_8000
    }

    fn esp_ram_block(&self, _port: &mut dyn RegisterPort) -> u32 {
        0x800
    }

    fn spi_reg_base(&self) -> u32 {
        0x6000_0200
    }

    fn spi_usr_reg(&self) -> u32 {
        self.spi_reg_base() + 0x1C
    }

    fn spi_usr1_reg(&self) -> u32 {
        self.spi_reg_base() + 0x20
    }

    fn spi_usr2_reg(&self) -> u32 {
        self.spi_reg_base() + 0x24
    }

    fn spi_w0_reg(&self) -> u32 {
        self.spi_reg_base() + 0x40
    }

    fn spi_mosi_dlen_offs(&self) -> bool {
        false
    }

    fn spi_mosi_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x18
    }

    fn spi_miso_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x18
    }

    fn efuse_rd_reg_base(&self) -> u32 {
        0x3FF0_0050
    }

    fn chip_description(&self, port: &mut dyn RegisterPort) -> String {
        self.description(port)
    }

    fn chip_features(&self, port: &mut dyn RegisterPort) -> String {
        let mut features = String::from("WiFi");
        if self.description(port).to_ascii_uppercase().contains("ESP8285") {
            features.push_str(", Embedded Flash");
        }
        features
    }

    fn crystal_freq_mhz(&self, port: &mut dyn RegisterPort, baud: u32) -> u32 {
        let uart_div = port.read_reg(UART_CLKDIV_REG) & UART_CLKDIV_MASK;
        super::estimate_xtal_freq(uart_div, baud, XTAL_CLK_DIVIDER)
    }
}
