//! create our filesystem on a block device
use byte_unit::Byte;
use log::info;

use crate::{
    disk::BlockDevice,
    fs::{FsError, FsResult, InodeBlock, SuperBlock, BLOCK_SIZE},
};

/// write a fresh superblock and an all-invalid inode table,
/// given a device that is not mounted
/// # Params
/// - `disk`: the device to format; a mounted device is owned by its
///   [FileSystem](crate::FileSystem) and cannot be passed here
///
/// # Return
/// the [SuperBlock] that was written; the device is left unmounted
pub fn format<D: BlockDevice>(disk: &mut D) -> FsResult<SuperBlock> {
    let nblocks = disk.block_count();
    let superblock = SuperBlock::new(nblocks)?;
    // at least one data block must remain after the inode table
    if nblocks < 2 || superblock.first_data_block() >= nblocks {
        return Err(FsError::DeviceTooSmall(nblocks));
    }

    disk.write_block(0, &superblock.to_block()?)?;
    let empty_table = InodeBlock::empty().to_block()?;
    for table_block in 1..=superblock.ninodeblocks {
        disk.write_block(table_block, &empty_table)?;
    }
    disk.flush()?;

    info!(
        "formatted {} ({} blocks): {} inode blocks, {} inodes",
        Byte::from_bytes(nblocks as u128 * BLOCK_SIZE as u128).get_appropriate_unit(true),
        nblocks,
        superblock.ninodeblocks,
        superblock.ninodes
    );
    Ok(superblock)
}
