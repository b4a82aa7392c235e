pub mod cli_interface;
pub mod disk;
pub mod fs;
pub mod mkfs;
pub mod shell;
pub mod utils;
pub use disk::{BlockDevice, FileDisk, MemDisk};
pub use fs::*;
pub use mkfs::format;
