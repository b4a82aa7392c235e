//! byte offset → pointer slot translation

use super::{BLOCK_SIZE, POINTERS_PER_BLOCK, POINTERS_PER_INODE};

/// Which pointer slot covers a byte of a file, and where in that block the byte sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAddress {
    /// `slot` indexes the inode's direct pointers
    Direct { slot: usize, offset: usize },
    /// `slot` indexes the inode's indirect pointer page
    Indirect { slot: usize, offset: usize },
    /// past the last addressable byte
    Beyond,
}

impl BlockAddress {
    /// byte position inside the resolved block, 0 for [BlockAddress::Beyond]
    pub fn offset_in_block(&self) -> usize {
        match self {
            BlockAddress::Direct { offset, .. } | BlockAddress::Indirect { offset, .. } => *offset,
            BlockAddress::Beyond => 0,
        }
    }

    /// bytes from this address to the end of its block
    pub fn remaining_in_block(&self) -> usize {
        match self {
            BlockAddress::Beyond => 0,
            _ => BLOCK_SIZE - self.offset_in_block(),
        }
    }
}

/// resolve byte `offset` of a file
pub fn resolve(offset: u64) -> BlockAddress {
    let index = offset / BLOCK_SIZE as u64;
    let in_block = (offset % BLOCK_SIZE as u64) as usize;
    if index < POINTERS_PER_INODE as u64 {
        BlockAddress::Direct {
            slot: index as usize,
            offset: in_block,
        }
    } else if index < (POINTERS_PER_INODE + POINTERS_PER_BLOCK) as u64 {
        BlockAddress::Indirect {
            slot: (index - POINTERS_PER_INODE as u64) as usize,
            offset: in_block,
        }
    } else {
        BlockAddress::Beyond
    }
}
