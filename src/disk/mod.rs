//! block devices the filesystem can live on
use std::io::{self, ErrorKind};

use crate::fs::{Block, BLOCK_SIZE};

mod file_disk;
mod mem_disk;
pub use file_disk::FileDisk;
pub use mem_disk::MemDisk;

/// fixed-size block I/O, the only thing the layout engine needs from storage
pub trait BlockDevice {
    /// number of addressable blocks, numbered from 0
    fn block_count(&self) -> u32;

    /// read block `number` into `block`
    fn read_block(&mut self, number: u32, block: &mut Block) -> io::Result<()>;

    /// overwrite block `number` with `block`
    fn write_block(&mut self, number: u32, block: &Block) -> io::Result<()>;

    /// push buffered writes down to the backing store
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_block(&mut self, number: u32, block: &mut Block) -> io::Result<()> {
        (**self).read_block(number, block)
    }

    fn write_block(&mut self, number: u32, block: &Block) -> io::Result<()> {
        (**self).write_block(number, block)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// how many blocks were moved through a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    pub reads: u64,
    pub writes: u64,
}

/// byte range of block `number` on a device of `block_count` blocks
pub(crate) fn block_range(number: u32, block_count: u32) -> io::Result<std::ops::Range<usize>> {
    if number >= block_count {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("block {number} is beyond the end of a {block_count} block device"),
        ));
    }
    let start = number as usize * BLOCK_SIZE;
    Ok(start..start + BLOCK_SIZE)
}
