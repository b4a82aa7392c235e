//! what a mounted filesystem looks like in memory

use std::fmt;

use log::{info, warn};

use crate::disk::BlockDevice;

use super::{
    inode_location, Block, FreeBlockTracker, FsError, FsResult, Inode, InodeBlock, PointerBlock,
    SuperBlock, BLOCK_SIZE,
};

/// A mounted device. It has the following layout:
/// - superblock, block 0
/// - inode table, blocks `1..=ninodeblocks`
/// - data blocks and indirect pointer pages, everything after
///
/// Owns the device for as long as it is mounted, together with the cached
/// superblock and the free block tracker rebuilt at mount time.
/// [FileSystem::unmount] hands the device back.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    disk: D,
    superblock: SuperBlock,
    free_blocks: FreeBlockTracker,
}

/// A failed mount, carrying the device back to the caller
pub struct MountError<D> {
    pub error: FsError,
    pub disk: D,
}

impl<D> MountError<D> {
    pub fn into_parts(self) -> (FsError, D) {
        (self.error, self.disk)
    }
}

impl<D> fmt::Debug for MountError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<D> fmt::Display for MountError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mount failed: {}", self.error)
    }
}

impl<D> From<MountError<D>> for FsError {
    fn from(value: MountError<D>) -> Self {
        value.error
    }
}

/// Every block one inode references, validated against the data region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InodeBlocks {
    /// non-zero direct pointers, in slot order
    pub direct: Vec<u32>,
    /// the pointer page, if any
    pub indirect: Option<u32>,
    /// non-zero pointers inside the pointer page, in slot order
    pub indirect_data: Vec<u32>,
}

impl InodeBlocks {
    pub fn all(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct
            .iter()
            .chain(self.indirect.iter())
            .chain(self.indirect_data.iter())
            .copied()
    }
}

/// read and check block 0
pub fn read_superblock<D: BlockDevice>(disk: &mut D) -> FsResult<SuperBlock> {
    let mut block = [0u8; BLOCK_SIZE];
    disk.read_block(0, &mut block)?;
    SuperBlock::from_block(&block)
}

/// collect the blocks `inode` references, reading its pointer page if it has one
///
/// Any pointer outside `[ninodeblocks + 1, nblocks)` is reported as [FsError::Corrupt].
pub fn collect_blocks<D: BlockDevice>(
    disk: &mut D,
    superblock: &SuperBlock,
    inumber: u32,
    inode: &Inode,
) -> FsResult<InodeBlocks> {
    let check = |block: u32| {
        if superblock.is_data_block(block) {
            Ok(block)
        } else {
            Err(FsError::Corrupt { inumber, block })
        }
    };
    let direct = inode
        .direct_blocks()
        .into_iter()
        .map(check)
        .collect::<FsResult<Vec<_>>>()?;
    if !inode.has_indirect() {
        return Ok(InodeBlocks {
            direct,
            ..InodeBlocks::default()
        });
    }

    let indirect = check(inode.indirect)?;
    let mut block = [0u8; BLOCK_SIZE];
    disk.read_block(indirect, &mut block)?;
    let indirect_data = PointerBlock::from_block(&block)
        .used()
        .map(check)
        .collect::<FsResult<Vec<_>>>()?;
    Ok(InodeBlocks {
        direct,
        indirect: Some(indirect),
        indirect_data,
    })
}

/// mount and unmount
impl<D: BlockDevice> FileSystem<D> {
    /// validate the device and rebuild the free block tracker
    /// # Return
    /// the mounted [FileSystem], or a [MountError] giving the device back
    pub fn mount(mut disk: D) -> Result<Self, MountError<D>> {
        match Self::scan(&mut disk) {
            Ok((superblock, free_blocks)) => {
                info!(
                    "mounted: {} blocks, {} inodes, {} blocks free",
                    superblock.nblocks,
                    superblock.ninodes,
                    free_blocks.free_blocks()
                );
                Ok(FileSystem {
                    disk,
                    superblock,
                    free_blocks,
                })
            }
            Err(error) => {
                warn!("mount failed: {error}");
                Err(MountError { error, disk })
            }
        }
    }

    /// Free space is derived, not stored: start with everything free except
    /// the superblock and inode table, then mark every block a valid inode
    /// references. Costs one read per inode block plus one per pointer page.
    fn scan(disk: &mut D) -> FsResult<(SuperBlock, FreeBlockTracker)> {
        let superblock = read_superblock(disk)?;
        superblock.check_geometry(disk.block_count())?;

        let mut free_blocks =
            FreeBlockTracker::new(superblock.nblocks, superblock.first_data_block());
        let mut block = [0u8; BLOCK_SIZE];
        let mut live = 0;
        for table_block in 1..=superblock.ninodeblocks {
            disk.read_block(table_block, &mut block)?;
            let page = InodeBlock::from_block(&block)?;
            for (slot, inode) in page.iter().filter(|(_, inode)| inode.is_valid()) {
                let inumber = super::inumber_at(table_block, slot);
                for used in collect_blocks(disk, &superblock, inumber, inode)?.all() {
                    free_blocks.mark_used(used);
                }
                live += 1;
            }
        }
        info!(
            "scanned {} inode blocks: {live} live inodes, {} blocks in use",
            superblock.ninodeblocks,
            free_blocks.used_blocks()
        );
        Ok((superblock, free_blocks))
    }

    /// flush and hand the device back, dropping the free block tracker
    pub fn unmount(mut self) -> D {
        if let Err(e) = self.disk.flush() {
            warn!("flush on unmount failed: {e}");
        }
        info!("unmounted");
        self.disk
    }
}

/// get [SuperBlock] and free space of this filesystem
impl<D: BlockDevice> FileSystem<D> {
    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.free_blocks()
    }

    #[inline]
    pub fn is_block_used(&self, block: u32) -> bool {
        self.free_blocks.is_used(block)
    }

    #[inline]
    pub(crate) fn free_blocks_mut(&mut self) -> &mut FreeBlockTracker {
        &mut self.free_blocks
    }

    #[inline]
    pub(crate) fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }
}

/// [Inode] operations
impl<D: BlockDevice> FileSystem<D> {
    /// the table page holding `inumber`, with its slot
    pub(crate) fn inode_page(&mut self, inumber: u32) -> FsResult<(u32, usize, InodeBlock)> {
        if !self.superblock.is_valid_inumber(inumber) {
            return Err(FsError::InvalidInumber(inumber));
        }
        let (table_block, slot) = inode_location(inumber);
        let page = InodeBlock::from_block(&self.read_block(table_block)?)?;
        Ok((table_block, slot, page))
    }

    /// a live inode, failing for out-of-range or unused inumbers
    pub(crate) fn find_inode(&mut self, inumber: u32) -> FsResult<Inode> {
        let (_, slot, page) = self.inode_page(inumber)?;
        let inode = *page.get(slot);
        if !inode.is_valid() {
            return Err(FsError::InvalidInode(inumber));
        }
        Ok(inode)
    }

    pub(crate) fn save_inode(&mut self, inumber: u32, inode: &Inode) -> FsResult<()> {
        let (table_block, slot, mut page) = self.inode_page(inumber)?;
        *page.get_mut(slot) = *inode;
        self.write_block(table_block, &page.to_block()?)
    }

    /// reject pointers that leave the data region
    pub(crate) fn check_pointer(&self, inumber: u32, block: u32) -> FsResult<u32> {
        if self.superblock.is_data_block(block) {
            Ok(block)
        } else {
            Err(FsError::Corrupt { inumber, block })
        }
    }

    pub(crate) fn inode_blocks(&mut self, inumber: u32, inode: &Inode) -> FsResult<InodeBlocks> {
        collect_blocks(&mut self.disk, &self.superblock, inumber, inode)
    }
}

/// raw block access
impl<D: BlockDevice> FileSystem<D> {
    pub(crate) fn read_block(&mut self, number: u32) -> FsResult<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        self.disk.read_block(number, &mut block)?;
        Ok(block)
    }

    pub(crate) fn write_block(&mut self, number: u32, block: &Block) -> FsResult<()> {
        Ok(self.disk.write_block(number, block)?)
    }
}
