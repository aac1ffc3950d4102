use std::io;

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested serial device could not be opened or configured.
    #[error("serial port unavailable: {0}")]
    PortUnavailable(#[from] io::Error),

    /// No target responded to the sync burst on any port/reset-strategy combination.
    #[error("no device responded to the sync sequence")]
    SyncTimeout,

    /// The value read from the chip-detect magic register did not match any
    /// registered [`crate::targets::TargetDescriptor`].
    #[error("unrecognized chip magic value: 0x{0:08x}")]
    UnknownChip(u32),

    /// A reply frame failed the SLIP/command framing contract (§4.1).
    #[error("malformed or missing reply frame")]
    ProtocolFrameInvalid,

    /// The device reported a non-zero status byte for a command that should have
    /// succeeded.
    #[error("device reported non-zero status 0x{0:02x} for command 0x{1:02x}")]
    DeviceStatusNonZero(u8, u8),

    /// An outbound checksum did not match what the device expected to see
    /// (surfaced only in loopback/self tests; the wire checksum is trusted once sent).
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A device-reported MD5 digest did not match the host-computed digest.
    #[error("MD5 mismatch at offset 0x{0:08x}")]
    Md5Mismatch(u32),

    /// The RAM stub failed to load or did not send the `OHAI` handshake.
    #[error("stub upload failed")]
    StubUploadFailed,

    /// The device did not respond at the new baud rate after a `CHANGE_BAUD` command.
    #[error("failed to change baud rate to {0}")]
    RebaudFailed(u32),

    /// A flash-write macro-block failed all of its write+verify attempts.
    #[error("flash write exhausted retries for block [0x{offset:08x}, 0x{end:08x})")]
    FlashWriteExhausted { offset: u32, end: u32 },

    /// The SPI peripheral's `USR` command bit never cleared.
    #[error("SPI controller did not complete the user command in time")]
    SpiControllerStuck,

    /// `auto_connect`/flash operations were attempted without a resolved target.
    #[error("session is not connected to a target")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, Error>;
