//! ESP32 (Xtensa) descriptor, grounded verbatim in `targets/esp32.h`/`esp32.cpp`.

use base64::Engine;

use super::{read_efuse, RegisterPort, TargetDescriptor};

const STUB_TEXT_B64: &str = "CAD0PxwA9D8AAPQ/AMD8PxAA9D82QQAh+v/AIAA4AkH5/8AgACgEICB0nOIGBQAAAEH1/4H2/8AgAKgEiAigoHTgCAALImYC54b0/yHx/8AgADkCHfAAAKDr/T8Ya/0/hIAAAEBAAABYq/0/pOv9PzZBALH5/yCgdBARIKXIAJYaBoH2/5KhAZCZEZqYwCAAuAmR8/+goHSaiMAgAJIYAJCQ9BvJwMD0wCAAwlgAmpvAIACiSQDAIACSGACB6v+QkPSAgPSHmUeB5f+SoQGQmRGamMAgAMgJoeX/seP/h5wXxgEAfOiHGt7GCADAIACJCsAgALkJRgIAwCAAuQrAIACJCZHX/5qIDAnAIACSWAAd8AAA+CD0P/gw9D82QQCR/f/AIACICYCAJFZI/5H6/8AgAIgJgIAkVkj/HfAAAAAQIPQ/ACD0PwAAAAg2QQAQESCl/P8h+v8MCMAgAIJiAJH6/4H4/8AgAJJoAMAgAJgIVnn/wCAAiAJ88oAiMCAgBB3wAAAAAEA2QQAQESDl+/8Wav+B7P+R+//AIACSaADAIACYCFZ5/x3wAAAMQP0/////AAQg9D82QQAh/P84QhaDBhARIGX4/xb6BQz4DAQ3qA2YIoCZEIKgAZBIg0BAdBARICX6/xARICXz/4giDBtAmBGQqwHMFICrAbHt/7CZELHs/8AgAJJrAJHO/8AgAKJpAMAgAKgJVnr/HAkMGkCag5AzwJqIOUKJIh3wAAAskgBANkEAoqDAgf3/4AgAHfAAADZBAIKgwK0Ch5IRoqDbgff/4AgAoqDcRgQAAAAAgqDbh5IIgfL/4AgAoqDdgfD/4AgAHfA2QQA6MsYCAACiAgAbIhARIKX7/zeS8R3wAAAAfNoFQNguBkCc2gVAHNsFQDYhIaLREIH6/+AIAEYLAAAADBRARBFAQ2PNBL0BrQKB9f/gCACgoHT8Ws0EELEgotEQgfH/4AgASiJAM8BWA/0iogsQIrAgoiCy0RCB7P/gCACtAhwLEBEgpff/LQOGAAAioGMd8AAA/GcAQNCSAEAIaABANkEhYqEHwGYRGmZZBiwKYtEQDAVSZhqB9//gCAAMGECIEUe4AkZFAK0GgdT/4AgAhjQAAJKkHVBzwOCZERqZQHdjiQnNB70BIKIggc3/4AgAkqQd4JkRGpmgoHSICYyqDAiCZhZ9CIYWAAAAkqQd4JkREJmAgmkAEBEgJer/vQetARARIKXt/xARICXp/80HELEgYKYggbv/4AgAkqQd4JkRGpmICXAigHBVgDe1sJKhB8CZERqZmAmAdcCXtwJG3P+G5v8MCIJGbKKkGxCqoIHK/+AIAFYK/7KiC6IGbBC7sBARIKWQAPfqEvZHD7KiDRC7sHq7oksAG3eG8f9867eawWZHCIImGje4Aoe1nCKiCxAisGC2IK0CgZv/4AgAEBEgpd//rQIcCxARICXj/xARIKXe/ywKgbH/4AgAHfAIIPQ/cOL6P0gkBkDwIgZANmEAEBEg5cr/EKEggfv/4AgAPQoMEvwqiAGSogCQiBCJARARIKXP/5Hy/6CiAcAgAIIpAKCIIMAgAIJpALIhAKHt/4Hu/+AIAKAjgx3wAAD/DwAANkEAgTv/DBmSSAAwnEGZKJH7/zkYKTgwMLSaIiozMDxBDAIpWDlIEBEgJfj/LQqMGiKgxR3wAABQLQZANkEAQSz/WDRQM2MWYwRYFFpTUFxBRgEAEBEgZcr/iESmGASIJIel7xARIKXC/xZq/6gUzQO9AoHx/+AIAKCgdIxKUqDEUmQFWBQ6VVkUWDQwVcBZNB3wAADA/D9PSEFJqOv9P3DgC0AU4AtADAD0PzhA9D///wAAjIAAABBAAACs6/0/vOv9PwTA/D8IwPw/BOz9PxQA9D/w//8AqOv9PwzA/D8kQP0/fGgAQOxnAEBYhgBAbCoGQDgyBkAULAZAzCwGQEwsBkA0hQBAzJAAQHguBkAw7wVAWJIAQEyCAEA2wQAh3v8MCiJhCEKgAIHu/+AIACHZ/zHa/8YAAEkCSyI3MvgQESBlw/8MS6LBIBARIOXG/yKhARARICXC/1GR/pAiESolMc//sc//wCAAWQIheP4MDAxaMmIAgdz/4AgAMcr/QqEBwCAAKAMsCkAiIMAgACkDgTH/4AgAgdX/4AgAIcP/wCAAKALMuhzDMCIQIsL4DBMgo4MMC4HO/+AIAPG8/wwdwqABsqAB4qEAQN0RAMwRgLsBoqAAgcf/4AgAIbX/YcT+KlVy1ivAIAAoBRZy/8AgADgFDAQMEsAgAEkFIkEQIgMBDCgiQRGCUQlJUSaSBxw0RxIdxgcAIgMDQgMCgCIRQCIgZkIQKCPAIAAoAilRBgEAHCIiUQkQESCls/8Mi6LBEBARIGW3/4IDAyIDAoCIESCIICGY/yAg9IeyHKKgwBARICWy/6Kg7hARIKWx/xARICWw/0bb/wAAIgMBHDQnNDT2IhhG2wAAACLCLyAgdPZCcEGJ/0AioCgCoAIAIsL+ICB0HBQntAJG0gBBhP9AIqAoAqACAELCMEBAdLZUyYbMACxJDAQioMCXGAKGygBJUQxyrQQQESDlqv+tBBARIGWq/xARIOWo/xARIKWo/wyLosEQIsL/EBEg5av/ViL9RigADBJWaC6CYQ+Bev/gCACI8aAog0a1ACaIBQwSRrMAAEgjKDMghCCAgLRWyP4QESBlx/8qRJwaxvf/AKCsQYFu/+AIAFYq/SLS8CCkwMwiBogAAKCA9FYY/oYEAKCg9YnxgWb/4AgAiPFW2vqAIsAMGACIESCkwCc44QYEAAAAoKxBgV3/4AgAVur4ItLwIKTAVqL+xnYAAAwEIqDAJogCBpUADAQtBEaTACa49QZpAAwSJrgCBo0AuDOoIwwEEBEgJaL/oCSDhogADBlmuFyIQyCpEQwEIqDCh7oCBoYAuFOiIwKSYQ4QESAlwf+Y4aCUg4YNAAwZZrgxiEMgqREMBCKgwoe6AkZ7ACgzuFOoIyBIgpnhEBEgJb7/ITT+DAiY4YliItIrSSKgmIMtCcZuAJEu/gwEogkAIqDGR5oCRm0ASCOCyPAioMCHlAEoWQwEkqDvRgIASqOiChgbRKCZMIck8oIDBUIDBICIEUCIIEIDBgBEEYBEIIIDB4CIAUCIIICZwIKgwQwEkCiTxlkAgRb+IqDGkggATQkWmRWYOAwEIqDIRxkCBlMAKFiSSABGTgAciQwEDBKXGAIGTgD4c+hj2FPIQ7gzqCOBCf/gCAAMCE0KoCiDBkcAAAAMEiZIAsZBAKgjDAuBAP/gCAAGIAAAAACAkDQMBCKgwEcZAgY9AICEQYuzfPzGDgCoO4nxmeG5wcnRgfr+4AgAuMGI8SgrSBuoC5jhyNFAQhAmAg3AIADYCiAsMNAiECBEIMAgAEkKG5myyxCHOcDGlP9mSAJGk/8MBCKgwIYmAAwSJrgCxiEAIdb+iFNII4kCIdX+SQIMAgYdALHR/gwE2AsMGoLI8J0ELQSAKpPQmoMgmRAioMZHmWDBy/5NCegMIqDJhz5TgPAUIqDAVq8ELQmGAgAAKpOYaUsimQSdCiD+wCpNhzLtFqnd+QxJC8Z0/wwSZogYIbv+giIAjBiCoMgMBEkCIbf+SQIMEoAkgwwERgEAAAwEIqD/IKB0EBEgZXj/QKB0EBEgpXf/EBEgZXb/VvK8IgMBHCQnNB/2MgJG8P4iwv0gIHQM9Ce0Asbs/kGm/kAioCgCoAIAAEKg0kcST0Kg1EcSdwbm/ogzoqJxwKoRSCOJ8YGq/uAIACGb/pGc/sAgACgCiPEgNDXAIhGQIhAgIyCAIoIMCkCywoGh/uAIAKKj6IGe/uAIAMbU/gAA2FPIQ7gzqCMQESCle/8G0P4AsgMDIgMCgLsRILsgssvwosMYEBEg5Zf/Bsn+ACIDA0IDAoAiEUAiIEGI/SLC8Ig0gCJjFpKwiBSKgoCMQUYCAInxEBEg5WD/iPGYRKYZBJgkl6jrEBEgJVn/Fmr/qBTNArLDGIGA/uAIAIw6MqDEOVQ4FCozORQ4NCAjwCk0hq/+IgMDggMCQsMYgCIRODaAIiAiwvBWwwn2UgKGJQAioMlGKgAxY/6BaP3oAylx4IjAiWGIJ60Jh7IBDDqZ4anR6cEQESDlWP+o0YFa/qkB6MGhWf7dCL0EwsEc8sEYifGBYv7gCAC4J80KqHGY4aC7wLknoCLAuAOqRKhhiPGquwwKuQPAqYOAu8Cg0HTMmuLbgK0N4KmDFuoBrQiJ8ZnhydEQESDlhv+I8ZjhyNGJA0YBAAAADBydDIyyODaMc8A/McAzwJaz9dZ8ACKgxylWBnv+VpyeKDYWQp4ioMgG+/+oI1aanYFB/uAIAKKiccCqEYE6/uAIAIE+/uAIAIZv/gAAKDMWcpsMCoE4/uAIAKKj6IEy/uAIAOACAAZo/h3wAAAANkEAnQKCoMAoA4eZD8wyDBKGBwAMAikDfOKGDwAmEgcmIhiGAwAAAIKg24ApI4eZKgwiKQN88kYIAAAAIqDcJ5kKDBIpAy0IBgQAAACCoN188oeZBgwSKQMioNsd8AAA";
const STUB_DATA_B64: &str = "DMD8P9jnC0Br6AtAA+0LQPLoC0CL6AtA8ugLQFHpC0Ae6gtAkOoLQDnqC0CB5wtAtukLQBDqC0B06QtAtOoLQJ7pC0C06gtAWegLQLboC0Dy6AtAUekLQHHoC0Bk6wtAxewLQKTmC0Dn7AtApOYLQKTmC0Ck5gtApOYLQKTmC0Ck5gtApOYLQKTmC0AL6wtApOYLQOXrC0DF7AtA";

const UART_CLKDIV_REG: u32 = 0x3FF4_0014;
const UART_CLKDIV_MASK: u32 = 0xF_FFFF;
const XTAL_CLK_DIVIDER: u32 = 1;
const APB_CTL_DATE_ADDR: u32 = 0x3FF6_6000 + 0x7C;
const APB_CTL_DATE_S: u32 = 31;
const APB_CTL_DATE_V: u32 = 0x1;

pub struct Esp32;

impl Esp32 {
    fn pkg_version(&self, port: &mut dyn RegisterPort) -> u32 {
        let efuse_3 = read_efuse(self, port, 3);
        let mut v = (efuse_3 >> 9) & 0x07;
        v += ((efuse_3 >> 2) & 0x1) << 3;
        v
    }

    fn major_chip_version(&self, port: &mut dyn RegisterPort) -> u32 {
        let rev_bit0 = (read_efuse(self, port, 3) >> 15) & 0x1;
        let rev_bit1 = (read_efuse(self, port, 5) >> 20) & 0x1;
        let apb_ctl_date = port.read_reg(APB_CTL_DATE_ADDR);
        let rev_bit2 = (apb_ctl_date >> APB_CTL_DATE_S) & APB_CTL_DATE_V;
        match (rev_bit2 << 2) | (rev_bit1 << 1) | rev_bit0 {
            0 => 0,
            1 => 1,
            3 => 2,
            7 => 3,
            _ => 0,
        }
    }

    fn minor_chip_version(&self, port: &mut dyn RegisterPort) -> u32 {
        (read_efuse(self, port, 5) >> 24) & 0x3
    }
}

impl TargetDescriptor for Esp32 {
    fn chip_name(&self) -> &'static str {
        "ESP32"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &["ESP32"]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x00F0_1D83
    }

    fn stub_entry(&self) -> u32 {
        1_074_521_560
    }

    fn stub_text(&self) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(STUB_TEXT_B64)
            .expect("embedded stub text is valid base64")
    }

    fn stub_text_start(&self) -> u32 {
        1_074_520_064
    }

    fn stub_data(&self) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(STUB_DATA_B64)
            .expect("embedded stub data is valid base64")
    }

    fn stub_data_start(&self) -> u32 {
        1_073_605_544
    }

    fn spi_reg_base(&self) -> u32 {
        0x3FF4_2000
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
        self.spi_reg_base() + 0x80
    }

    fn spi_mosi_dlen_offs(&self) -> bool {
        true
    }

    fn spi_mosi_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x28
    }

    fn spi_miso_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x2C
    }

    fn efuse_rd_reg_base(&self) -> u32 {
        0x3FF5_A000
    }

    fn chip_description(&self, port: &mut dyn RegisterPort) -> String {
        let pkg_version = self.pkg_version(port);
        let major_rev = self.major_chip_version(port);
        let minor_rev = self.minor_chip_version(port);
        let rev3 = major_rev == 3;
        let single_core = read_efuse(self, port, 3) & 1 != 0;

        let mut chip_name = match pkg_version {
            0 => {
                if single_core {
                    "ESP32-S0WDQ6"
                } else {
                    "ESP32-D0WDQ6"
                }
            }
            1 => {
                if single_core {
                    "ESP32-S0WD"
                } else {
                    "ESP32-D0WD"
                }
            }
            2 => "ESP32-D2WD",
            4 => "ESP32-U4WDH",
            5 => {
                if rev3 {
                    "ESP32-PICO-V3"
                } else {
                    "ESP32-PICO-D4"
                }
            }
            6 => "ESP32-PICO-V3-02",
            7 => "ESP32-D0WDR2-V3",
            _ => "unknown ESP32",
        }
        .to_string();

        if chip_name.to_ascii_uppercase().contains("ESP32-D0WD") {
            chip_name.push_str("-V3");
        }

        format!("{} (revision v{}.{})", chip_name, major_rev, minor_rev)
    }

    fn chip_features(&self, port: &mut dyn RegisterPort) -> String {
        let mut features = String::from("WiFi");
        let word3 = read_efuse(self, port, 3);

        if word3 & (1 << 1) == 0 {
            features.push_str(", BT");
        }

        if word3 & (1 << 0) != 0 {
            features.push_str(", Single Core");
        } else {
            features.push_str(", Dual Core");
        }

        if word3 & (1 << 13) != 0 {
            if word3 & (1 << 12) != 0 {
                features.push_str(", 160MHz");
            } else {
                features.push_str(", 240MHz");
            }
        }

        let pkg_version = self.pkg_version(port);
        if matches!(pkg_version, 2 | 4 | 5 | 6) {
            features.push_str(", Embedded Flash");
        }
        if pkg_version == 6 {
            features.push_str(", Embedded PSRAM");
        }

        let word4 = read_efuse(self, port, 4);
        if (word4 >> 8) & 0x1F != 0 {
            features.push_str(", VRef calibration in efuse");
        }

        if (word3 >> 14) & 0x1 != 0 {
            features.push_str(", BLK3 partially reserved");
        }

        let word6 = read_efuse(self, port, 6);
        features.push_str(", Coding Scheme ");
        features.push_str(match word6 & 0x3 {
            0 => "None",
            1 => "3/4",
            2 => "Repeat (UNSUPPORTED)",
            3 => "Invalid",
            _ => "Unknown",
        });

        features
    }

    fn crystal_freq_mhz(&self, port: &mut dyn RegisterPort, baud: u32) -> u32 {
        let uart_div = port.read_reg(UART_CLKDIV_REG) & UART_CLKDIV_MASK;
        super::estimate_xtal_freq(uart_div, baud, XTAL_CLK_DIVIDER)
    }
}
