//! our on-disk filesystem layout
pub mod address;
pub mod block_tracker;
pub mod debug;
pub mod error;
pub mod inode;
pub mod layout;
pub mod superblock;
mod fs_api_impl;
mod fs_layout;
pub use address::*;
pub use block_tracker::*;
pub use debug::*;
pub use error::*;
pub use fs_layout::*;
pub use inode::*;
pub use layout::*;
pub use superblock::*;

pub const FS_MAGIC: u32 = 0xf0f0_3410;
pub const BLOCK_SIZE: usize = 4096;
/// on-disk size of one inode record
pub const INODE_SIZE: usize = 40;
pub const INODES_PER_BLOCK: u32 = (BLOCK_SIZE / INODE_SIZE) as u32;
pub const POINTERS_PER_INODE: usize = 5;
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / std::mem::size_of::<u32>();
/// inumber 0 never names an inode
pub const NO_INODE: u32 = 0;
/// largest byte length one inode can address
pub const MAX_FILE_SIZE: u64 = ((POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE) as u64;

/// one raw block, the unit every device read and write moves
pub type Block = [u8; BLOCK_SIZE];
