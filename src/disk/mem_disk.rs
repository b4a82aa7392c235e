use std::io;

use super::{block_range, BlockDevice, DiskStats};
use crate::fs::{Block, BLOCK_SIZE};

/// a device living entirely in memory, gone when dropped
#[derive(Debug, Clone)]
pub struct MemDisk {
    data: Vec<u8>,
    block_count: u32,
    stats: DiskStats,
}

impl MemDisk {
    /// a zero-filled device of `block_count` blocks
    pub fn new(block_count: u32) -> Self {
        MemDisk {
            data: vec![0; block_count as usize * BLOCK_SIZE],
            block_count,
            stats: DiskStats::default(),
        }
    }

    pub fn stats(&self) -> DiskStats {
        self.stats
    }

    /// raw bytes of the whole device
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, number: u32, block: &mut Block) -> io::Result<()> {
        let range = block_range(number, self.block_count)?;
        block.copy_from_slice(&self.data[range]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write_block(&mut self, number: u32, block: &Block) -> io::Result<()> {
        let range = block_range(number, self.block_count)?;
        self.data[range].copy_from_slice(block);
        self.stats.writes += 1;
        Ok(())
    }
}
