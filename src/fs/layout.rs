//! typed views of the block kinds that are not self-describing:
//! inode-table pages and indirect pointer pages

use crate::utils::traits::FixedLayout;

use super::{Block, FsResult, Inode, BLOCK_SIZE, INODES_PER_BLOCK, INODE_SIZE, POINTERS_PER_BLOCK};

/// where inode `inumber` lives: (table block number, slot within the block)
///
/// `inumber` must be at least 1
pub fn inode_location(inumber: u32) -> (u32, usize) {
    let index = inumber - 1;
    (
        1 + index / INODES_PER_BLOCK,
        (index % INODES_PER_BLOCK) as usize,
    )
}

/// the inumber stored at `slot` of table block `block`
pub fn inumber_at(block: u32, slot: usize) -> u32 {
    (block - 1) * INODES_PER_BLOCK + slot as u32 + 1
}

/// one page of the inode table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeBlock {
    inodes: Vec<Inode>,
}

impl InodeBlock {
    /// a page where every slot is invalid
    pub fn empty() -> Self {
        InodeBlock {
            inodes: vec![Inode::default(); INODES_PER_BLOCK as usize],
        }
    }

    pub fn from_block(block: &Block) -> FsResult<Self> {
        let inodes = block
            .chunks_exact(INODE_SIZE)
            .take(INODES_PER_BLOCK as usize)
            .map(|record| Inode::decode(record).map(|(inode, _)| inode))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(InodeBlock { inodes })
    }

    pub fn to_block(&self) -> FsResult<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        for (inode, record) in self.inodes.iter().zip(block.chunks_exact_mut(INODE_SIZE)) {
            inode.encode_into(record)?;
        }
        Ok(block)
    }

    pub fn get(&self, slot: usize) -> &Inode {
        &self.inodes[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Inode {
        &mut self.inodes[slot]
    }

    /// (slot, inode) pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Inode)> {
        self.inodes.iter().enumerate()
    }

    /// lowest slot holding an invalid inode
    pub fn first_free_slot(&self) -> Option<usize> {
        self.inodes.iter().position(|inode| !inode.is_valid())
    }
}

/// an indirect page: block numbers of further data blocks, 0 for unused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBlock {
    pointers: Vec<u32>,
}

impl PointerBlock {
    pub fn empty() -> Self {
        PointerBlock {
            pointers: vec![0; POINTERS_PER_BLOCK],
        }
    }

    pub fn from_block(block: &Block) -> Self {
        let pointers = block
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        PointerBlock { pointers }
    }

    pub fn to_block(&self) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        for (pointer, bytes) in self.pointers.iter().zip(block.chunks_exact_mut(4)) {
            bytes.copy_from_slice(&pointer.to_le_bytes());
        }
        block
    }

    pub fn get(&self, slot: usize) -> u32 {
        self.pointers[slot]
    }

    pub fn set(&mut self, slot: usize, block: u32) {
        self.pointers[slot] = block;
    }

    /// non-zero pointers, in slot order
    pub fn used(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().filter(|b| *b != 0)
    }
}
