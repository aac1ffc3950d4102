//! Flash read/write/verify pipelines, grounded in `esp_serial.cpp`'s
//! `readFlash`/`flashData`/`flashUpload`/`verifyFlashPr`/`verifyFlash`.

pub mod read;
pub mod write;

pub use read::read_flash;
pub use write::{flash_upload, verify_flash};
