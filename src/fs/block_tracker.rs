use bitvec::prelude::*;
use log::warn;

/// In-memory record of which blocks are allocated, one bit per device block.
///
/// Never written to disk: a mount rebuilds it by scanning the inode table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreeBlockTracker {
    used: BitVec<u8, Lsb0>,
    /// blocks `0..reserved` (superblock and inode table) are never free
    reserved: u32,
    next_free: Option<usize>,
}

impl FreeBlockTracker {
    /// every block free except the first `reserved`
    pub fn new(nblocks: u32, reserved: u32) -> Self {
        let reserved = reserved.min(nblocks);
        let mut used = BitVec::<u8, Lsb0>::repeat(false, nblocks as usize);
        used[..reserved as usize].fill(true);
        let mut tracker = FreeBlockTracker {
            used,
            reserved,
            next_free: None,
        };
        tracker.next_free = tracker.next_free_block();
        tracker
    }

    /// number of blocks covered, equal to the device size
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// check if block is in use, blocks past the device end count as used
    pub fn is_used(&self, block: u32) -> bool {
        self.used.get(block as usize).as_deref().unwrap_or(&true) == &true
    }

    /// calculate the number of free blocks
    pub fn free_blocks(&self) -> usize {
        self.used.count_zeros()
    }

    pub fn used_blocks(&self) -> usize {
        self.used.count_ones()
    }

    /// record `block` as referenced, used while scanning at mount
    pub fn mark_used(&mut self, block: u32) {
        if (block as usize) < self.used.len() {
            self.used.set(block as usize, true);
        }
        if self.next_free == Some(block as usize) {
            self.next_free = self.next_free_block();
        }
    }

    /// allocate the lowest free block
    pub fn allocate(&mut self) -> Option<u32> {
        self.next_free.map(|index| {
            self.used.set(index, true);
            self.next_free = self.next_free_block();
            index as u32
        })
    }

    /// return `block` to the free pool
    pub fn release(&mut self, block: u32) {
        if block < self.reserved || block as usize >= self.used.len() {
            warn!("refusing to release block {block}, it is not a data block");
            return;
        }
        self.used.set(block as usize, false);
        if self.next_free.map_or(true, |next| (block as usize) < next) {
            self.next_free = Some(block as usize);
        }
    }

    fn next_free_block(&self) -> Option<usize> {
        self.used.first_zero()
    }
}
