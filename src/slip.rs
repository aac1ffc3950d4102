//! SLIP framing and the 8-byte bootloader command header (SPEC_FULL §4.1).
//!
//! https://docs.espressif.com/projects/esptool/en/latest/esp32/advanced-topics/serial-protocol.html

const FRAME_DELIMITER: u8 = 0xC0;
const ESC: u8 = 0xDB;
const ESC_END: u8 = 0xDC;
const ESC_ESC: u8 = 0xDD;

const HEADER_LEN: usize = 8;

/// A parsed inbound reply frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlipReply {
    pub valid: bool,
    pub command: u8,
    pub value: u32,
    pub data: Vec<u8>,
}

/// Escapes `payload` per the raw SLIP substitution rules, without delimiters.
pub fn escape(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    for &b in payload {
        match b {
            FRAME_DELIMITER => {
                out.push(ESC);
                out.push(ESC_END);
            }
            ESC => {
                out.push(ESC);
                out.push(ESC_ESC);
            }
            _ => out.push(b),
        }
    }
    out
}

/// Reverses [`escape`]. Returns `None` if an escape byte is followed by
/// anything other than `ESC_END`/`ESC_ESC` (a malformed escape aborts the frame).
pub fn unescape(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.iter().copied();
    while let Some(b) = iter.next() {
        if b == ESC {
            match iter.next() {
                Some(ESC_END) => out.push(FRAME_DELIMITER),
                Some(ESC_ESC) => out.push(ESC),
                _ => return None,
            }
        } else {
            out.push(b);
        }
    }
    Some(out)
}

/// Wraps `payload` (already escaped by the caller, or raw if it contains no
/// delimiter/escape bytes) in `0xC0` frame delimiters.
fn wrap(escaped: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped.len() + 2);
    out.push(FRAME_DELIMITER);
    out.extend_from_slice(escaped);
    out.push(FRAME_DELIMITER);
    out
}

/// Full raw-SLIP round trip: escape `payload` and wrap it in delimiters.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    wrap(&escape(payload))
}

/// Finds the first `0xC0 ... 0xC0` span in `framed` (discarding any leading
/// noise bytes, per §4.1's re-sync rule), unescapes its interior, and returns
/// the decoded payload. Returns `None` if no complete frame or a malformed
/// escape is found.
pub fn decode_frame(framed: &[u8]) -> Option<Vec<u8>> {
    let start = framed.iter().position(|&b| b == FRAME_DELIMITER)?;
    let end_rel = framed[start + 1..].iter().position(|&b| b == FRAME_DELIMITER)?;
    let body = &framed[start + 1..start + 1 + end_rel];
    unescape(body)
}

/// Computes the XOR-fold checksum used for `MEM_DATA`/`FLASH_DATA` payloads:
/// seed `0xEF`, XOR every byte.
pub fn esp_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0xEF, |acc, &b| acc ^ b)
}

/// Builds one framed outbound command: 8-byte header (direction, opcode,
/// little-endian length, little-endian checksum) followed by `payload`.
pub fn encode_command(opcode: u8, payload: &[u8], checksum: u32) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN + payload.len());
    header.push(0x00); // direction: outbound
    header.push(opcode);
    let len = payload.len() as u16;
    header.extend_from_slice(&len.to_le_bytes());
    header.extend_from_slice(&checksum.to_le_bytes());
    header.extend_from_slice(payload);
    encode_frame(&header)
}

/// Interprets already raw-decoded bytes (no delimiters, unescaped) as a
/// command reply: 8-byte header plus data.
pub fn parse_reply(decoded: &[u8]) -> SlipReply {
    if decoded.len() < HEADER_LEN {
        return SlipReply::default();
    }
    if decoded[0] != 0x01 {
        return SlipReply::default();
    }
    let data_size = u16::from_le_bytes([decoded[2], decoded[3]]) as usize;
    if decoded.len() != HEADER_LEN + data_size {
        return SlipReply::default();
    }
    SlipReply {
        valid: true,
        command: decoded[1],
        value: u32::from_le_bytes([decoded[4], decoded[5], decoded[6], decoded[7]]),
        data: decoded[HEADER_LEN..].to_vec(),
    }
}

/// Convenience combining [`decode_frame`] and [`parse_reply`], mirroring the
/// original tool's `slip_parse` which operated on a frame that still carried
/// its `0xC0` delimiters.
pub fn slip_parse(framed: &[u8]) -> SlipReply {
    match decode_frame(framed) {
        Some(decoded) => parse_reply(&decoded),
        None => SlipReply::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_arbitrary_bytes() {
        for sample in [
            vec![],
            vec![0x00],
            vec![0xC0, 0xDB, 0xC0, 0xDB, 0xDB],
            (0u8..=255).collect::<Vec<u8>>(),
        ] {
            let encoded = escape(&sample);
            assert_eq!(unescape(&encoded).unwrap(), sample);
        }
    }

    #[test]
    fn frame_boundary_ignores_leading_noise() {
        let payload = vec![1, 2, 3, 0xC0, 0xDB, 4];
        let framed = encode_frame(&payload);
        let mut noisy = vec![0xAA, 0x00, 0xFF];
        noisy.extend_from_slice(&framed);
        assert_eq!(decode_frame(&noisy).unwrap(), payload);
    }

    #[test]
    fn malformed_escape_aborts_frame() {
        // 0xDB followed by a byte that is neither 0xDC nor 0xDD.
        let framed = [0xC0, 0xDB, 0x01, 0xC0];
        assert_eq!(decode_frame(&framed), None);
    }

    #[test]
    fn checksum_formula() {
        assert_eq!(esp_checksum(&[0x01, 0x02, 0x03]), 0xEF);
        assert_eq!(esp_checksum(&[]), 0xEF);
    }

    #[test]
    fn scenario_sync_encode() {
        let mut payload = vec![0x07, 0x07, 0x12, 0x20];
        payload.extend(std::iter::repeat(0x55).take(32));
        let framed = encode_command(0x08, &payload, 0);
        assert_eq!(
            &framed[..9],
            &[0xC0, 0x00, 0x08, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(*framed.last().unwrap(), 0xC0);
        assert_eq!(framed.len(), 2 + 8 + 36);
    }

    #[test]
    fn scenario_parse_reply() {
        let framed = [
            0xC0, 0x01, 0x0A, 0x04, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44, 0xC0,
        ];
        let reply = slip_parse(&framed);
        assert_eq!(
            reply,
            SlipReply {
                valid: true,
                command: 0x0A,
                value: 0xDDCCBBAA,
                data: vec![0x11, 0x22, 0x33, 0x44],
            }
        );
    }

    #[test]
    fn invalid_direction_byte_is_rejected() {
        let framed = [0xC0, 0x00, 0x0A, 0x00, 0x00, 0, 0, 0, 0, 0xC0];
        assert!(!slip_parse(&framed).valid);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let framed = [0xC0, 0x01, 0x0A, 0xC0];
        assert!(!slip_parse(&framed).valid);
    }
}
