//! This module contains functions to calculate the geometry of a formatted device

use crate::fs::INODES_PER_BLOCK;

/// calculate how many blocks the inode table takes, ten percent rounded up
/// # Arguments
/// - `nblocks`: the number of blocks on the device
/// # Example
/// ```
/// use simplefs::utils::fs_size_calculator::inode_blocks;
/// assert_eq!(inode_blocks(20), 2);
/// assert_eq!(inode_blocks(21), 3);
/// assert_eq!(inode_blocks(1), 1);
/// ```
pub const fn inode_blocks(nblocks: u32) -> u32 {
    nblocks.div_ceil(10)
}

/// calculate how many inodes fit in the inode table
/// # Example
/// ```
/// use simplefs::utils::fs_size_calculator::inode_count;
/// use simplefs::fs::INODES_PER_BLOCK;
/// assert_eq!(inode_count(20), 2 * INODES_PER_BLOCK);
/// ```
pub const fn inode_count(nblocks: u32) -> u32 {
    inode_blocks(nblocks) * INODES_PER_BLOCK
}

/// the first block number that may hold file data or an indirect page,
/// given the length of the inode table
/// # Example
/// ```
/// use simplefs::utils::fs_size_calculator::{first_data_block, inode_blocks};
/// assert_eq!(first_data_block(inode_blocks(20)), 3);
/// ```
pub const fn first_data_block(inode_blocks: u32) -> u32 {
    inode_blocks + 1
}
