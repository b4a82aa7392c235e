//! scan a device and report how its inodes and blocks are organized

use std::{fmt, time::SystemTime};

use crate::{disk::BlockDevice, utils::time_util};

use super::{
    collect_blocks, inumber_at, read_superblock, FileSystem, FsResult, InodeBlock, InodeBlocks,
    SuperBlock, BLOCK_SIZE,
};

/// What [debug] found on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugReport {
    pub superblock: SuperBlock,
    /// live inodes, in inumber order
    pub inodes: Vec<InodeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeReport {
    pub inumber: u32,
    pub size: u32,
    pub created_at: i64,
    pub blocks: InodeBlocks,
}

impl InodeReport {
    /// when the inode was created
    pub fn created(&self) -> SystemTime {
        time_util::to_system_time(self.created_at)
    }
}

/// Walk the superblock and every valid inode, range-checking each pointer.
///
/// Works on unmounted devices; a pointer outside the data region aborts the
/// scan with [FsError::Corrupt](super::FsError::Corrupt) instead of being reported.
pub fn debug<D: BlockDevice>(disk: &mut D) -> FsResult<DebugReport> {
    let superblock = read_superblock(disk)?;
    let mut inodes = Vec::new();
    let mut block = [0u8; BLOCK_SIZE];
    for table_block in 1..=superblock.ninodeblocks.min(disk.block_count().saturating_sub(1)) {
        disk.read_block(table_block, &mut block)?;
        let page = InodeBlock::from_block(&block)?;
        for (slot, inode) in page.iter().filter(|(_, inode)| inode.is_valid()) {
            let inumber = inumber_at(table_block, slot);
            inodes.push(InodeReport {
                inumber,
                size: inode.size,
                created_at: inode.created_at,
                blocks: collect_blocks(disk, &superblock, inumber, inode)?,
            });
        }
    }
    Ok(DebugReport { superblock, inodes })
}

impl<D: BlockDevice> FileSystem<D> {
    /// [debug] the mounted device
    pub fn debug(&mut self) -> FsResult<DebugReport> {
        debug(self.disk_mut())
    }
}

fn write_blocks(f: &mut fmt::Formatter<'_>, label: &str, blocks: &[u32]) -> fmt::Result {
    write!(f, "    {label}:")?;
    for block in blocks {
        write!(f, " {block}")?;
    }
    writeln!(f)
}

impl fmt::Display for DebugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "superblock:")?;
        writeln!(f, "    magic number is valid")?;
        writeln!(f, "    {} blocks", self.superblock.nblocks)?;
        writeln!(f, "    {} inode blocks", self.superblock.ninodeblocks)?;
        writeln!(f, "    {} inodes", self.superblock.ninodes)?;
        for inode in &self.inodes {
            writeln!(f, "inode {}:", inode.inumber)?;
            writeln!(f, "    size: {} bytes", inode.size)?;
            writeln!(f, "    created: {}", inode.created_at)?;
            write_blocks(f, "direct blocks", &inode.blocks.direct)?;
            if let Some(indirect) = inode.blocks.indirect {
                writeln!(f, "    indirect block: {indirect}")?;
                write_blocks(f, "indirect data blocks", &inode.blocks.indirect_data)?;
            }
        }
        Ok(())
    }
}
