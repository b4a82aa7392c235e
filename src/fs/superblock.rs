use serde::{Deserialize, Serialize};

use crate::utils::{
    digest, fs_size_calculator,
    traits::{DigestInSelf, FixedLayout},
};

use super::{Block, FsError, FsResult, BLOCK_SIZE, FS_MAGIC};

/// The superblock of this filesystem, always block 0
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperBlock {
    /// magic number
    pub magic: u32,
    /// total blocks on the device
    pub nblocks: u32,
    /// blocks reserved for the inode table, starting at block 1
    pub ninodeblocks: u32,
    pub ninodes: u32,
    /// to verify the integrity of the fields above
    pub digest: [u8; 32],
}

impl SuperBlock {
    /// geometry for a device of `nblocks` blocks, digest included
    pub fn new(nblocks: u32) -> FsResult<Self> {
        let mut superblock = SuperBlock {
            magic: FS_MAGIC,
            nblocks,
            ninodeblocks: fs_size_calculator::inode_blocks(nblocks),
            ninodes: fs_size_calculator::inode_count(nblocks),
            digest: [0u8; 32],
        };
        superblock.digest()?;
        Ok(superblock)
    }

    /// first block number past the inode table
    pub fn first_data_block(&self) -> u32 {
        fs_size_calculator::first_data_block(self.ninodeblocks)
    }

    /// whether `block` may be referenced by an inode pointer
    pub fn is_data_block(&self, block: u32) -> bool {
        block >= self.first_data_block() && block < self.nblocks
    }

    /// whether `inumber` lies in `[1, ninodes]`
    pub fn is_valid_inumber(&self, inumber: u32) -> bool {
        inumber >= 1 && inumber <= self.ninodes
    }
}

/// block 0 (de)serialization
impl SuperBlock {
    /// encode with a freshly computed digest
    pub fn to_block(&self) -> FsResult<Block> {
        let mut sealed = self.clone();
        sealed.digest()?;
        let mut block = [0u8; BLOCK_SIZE];
        sealed.encode_into(&mut block)?;
        Ok(block)
    }

    /// decode and check magic number and digest, in that order
    pub fn from_block(block: &Block) -> FsResult<Self> {
        let magic = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        if magic != FS_MAGIC {
            return Err(FsError::BadMagic(magic));
        }
        let (mut superblock, _) = SuperBlock::decode(block)?;
        if !superblock.verify_digest()? {
            return Err(FsError::CorruptSuperblock(
                "missing or invalid digest after the magic number".into(),
            ));
        }
        Ok(superblock)
    }

    /// check the stored geometry against the device it was read from
    pub fn check_geometry(&self, device_blocks: u32) -> FsResult<()> {
        if self.nblocks != device_blocks {
            return Err(FsError::CorruptSuperblock(format!(
                "superblock describes {} blocks, device has {}",
                self.nblocks, device_blocks
            )));
        }
        if self.ninodeblocks != fs_size_calculator::inode_blocks(self.nblocks)
            || self.ninodes != fs_size_calculator::inode_count(self.nblocks)
        {
            return Err(FsError::CorruptSuperblock(format!(
                "{} inode blocks / {} inodes do not match a {} block device",
                self.ninodeblocks, self.ninodes, self.nblocks
            )));
        }
        Ok(())
    }
}

impl DigestInSelf for SuperBlock {
    fn digest(&mut self) -> anyhow::Result<()> {
        self.digest = [0u8; 32];
        self.digest = digest::digest(self)?;
        Ok(())
    }

    fn verify_digest(&mut self) -> anyhow::Result<bool> {
        let stored = self.digest;
        self.digest()?;
        let ok = stored == self.digest;
        self.digest = stored;
        Ok(ok)
    }
}

impl FixedLayout for SuperBlock {}
