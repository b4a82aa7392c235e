use log::{debug, info, warn};

use crate::disk::BlockDevice;

use super::{
    address::{resolve, BlockAddress},
    inumber_at, FileSystem, FsError, FsResult, Inode, InodeBlock, PointerBlock, BLOCK_SIZE,
};

/// inode table operations
impl<D: BlockDevice> FileSystem<D> {
    /// allocate the lowest-numbered free inode
    /// # Return
    /// the new inumber, never 0, or [FsError::InodeTableFull]
    pub fn create(&mut self) -> FsResult<u32> {
        for table_block in 1..=self.superblock().ninodeblocks {
            let mut page = InodeBlock::from_block(&self.read_block(table_block)?)?;
            let Some(slot) = page.first_free_slot() else {
                continue;
            };
            let inumber = inumber_at(table_block, slot);

            // a pointer page left behind by a deleted file is wiped before the
            // slot forgets it, unless the block has been handed out again since
            let stale = page.get(slot).indirect;
            if stale != 0 && self.superblock().is_data_block(stale) && !self.is_block_used(stale) {
                debug!("zeroing stale pointer page {stale} of inode {inumber}");
                self.write_block(stale, &[0u8; BLOCK_SIZE])?;
            }

            *page.get_mut(slot) = Inode::new();
            self.write_block(table_block, &page.to_block()?)?;
            info!("created inode {inumber}");
            return Ok(inumber);
        }
        warn!("create failed: all {} inodes in use", self.superblock().ninodes);
        Err(FsError::InodeTableFull)
    }

    /// free `inumber` and every block it references
    ///
    /// Block contents are left as they are; only the inode slot and the free
    /// block tracker change.
    pub fn delete(&mut self, inumber: u32) -> FsResult<()> {
        let (table_block, slot, mut page) = self.inode_page(inumber)?;
        let inode = *page.get(slot);
        if !inode.is_valid() {
            return Err(FsError::InvalidInode(inumber));
        }
        // validate every pointer before touching anything
        let blocks = self.inode_blocks(inumber, &inode)?;

        page.get_mut(slot).invalidate();
        self.write_block(table_block, &page.to_block()?)?;
        let mut released = 0;
        for block in blocks.all() {
            self.free_blocks_mut().release(block);
            released += 1;
        }
        info!("deleted inode {inumber}, released {released} blocks");
        Ok(())
    }

    /// byte length of `inumber`
    pub fn getsize(&mut self, inumber: u32) -> FsResult<u32> {
        Ok(self.find_inode(inumber)?.size)
    }
}

/// read and write file data
impl<D: BlockDevice> FileSystem<D> {
    /// copy bytes starting at `offset` into `buf`
    /// # Return
    /// the number of bytes copied, short when the file ends first,
    /// 0 when `offset` is at or past the end of the file
    pub fn read(&mut self, inumber: u32, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let inode = self.find_inode(inumber)?;
        let size = inode.size as u64;
        if offset >= size {
            return Ok(0);
        }
        let wanted = (buf.len() as u64).min(size - offset) as usize;

        let mut pointers = None;
        let mut done = 0;
        while done < wanted {
            let address = resolve(offset + done as u64);
            let chunk = address.remaining_in_block().min(wanted - done);
            if chunk == 0 {
                break;
            }
            let target = &mut buf[done..done + chunk];
            match self.mapped_block(inumber, &inode, address, &mut pointers)? {
                Some(block) => {
                    let data = self.read_block(block)?;
                    let start = address.offset_in_block();
                    target.copy_from_slice(&data[start..start + chunk]);
                }
                // never written, reads as zeros
                None => target.fill(0),
            }
            done += chunk;
        }
        Ok(done)
    }

    /// copy `data` into the file starting at `offset`, allocating blocks on first touch
    /// # Return
    /// the number of bytes written; short when the disk fills up or the file
    /// reaches its largest addressable size
    ///
    /// On error the inode is left as it was and blocks allocated by this call
    /// go back to the free block tracker.
    pub fn write(&mut self, inumber: u32, data: &[u8], offset: u64) -> FsResult<usize> {
        let mut inode = self.find_inode(inumber)?;
        let mut allocated = Vec::new();
        match self.write_blocks(inumber, &mut inode, data, offset, &mut allocated) {
            Ok(written) => Ok(written),
            Err(e) => {
                warn!(
                    "inode {inumber}: write failed, releasing {} new blocks: {e}",
                    allocated.len()
                );
                for block in allocated {
                    self.free_blocks_mut().release(block);
                }
                Err(e)
            }
        }
    }

    fn write_blocks(
        &mut self,
        inumber: u32,
        inode: &mut Inode,
        data: &[u8],
        offset: u64,
        allocated: &mut Vec<u32>,
    ) -> FsResult<usize> {
        let mut pointers = None;
        let mut pointers_dirty = false;
        let mut written = 0;

        while written < data.len() {
            let position = offset + written as u64;
            let address = resolve(position);
            if address == BlockAddress::Beyond {
                warn!("inode {inumber}: write stopped at byte {position}, the largest file size");
                break;
            }
            let chunk = address.remaining_in_block().min(data.len() - written);
            let Some((block, fresh)) =
                self.block_for_write(inumber, inode, address, &mut pointers, allocated)?
            else {
                warn!("inode {inumber}: disk full after writing {written} bytes");
                break;
            };
            // a new indirect data block always lands in the pointer page
            pointers_dirty |= fresh && matches!(address, BlockAddress::Indirect { .. });

            let start = address.offset_in_block();
            let mut contents = if fresh || chunk == BLOCK_SIZE {
                [0u8; BLOCK_SIZE]
            } else {
                self.read_block(block)?
            };
            contents[start..start + chunk].copy_from_slice(&data[written..written + chunk]);
            self.write_block(block, &contents)?;
            written += chunk;
        }

        if pointers_dirty {
            if let Some(page) = &pointers {
                self.write_block(inode.indirect, &page.to_block())?;
            }
        }
        if written > 0 {
            let end = (offset + written as u64) as u32;
            inode.size = inode.size.max(end);
            self.save_inode(inumber, inode)?;
        }
        Ok(written)
    }

    /// the block backing `address`, or [None] for a hole
    fn mapped_block(
        &mut self,
        inumber: u32,
        inode: &Inode,
        address: BlockAddress,
        pointers: &mut Option<PointerBlock>,
    ) -> FsResult<Option<u32>> {
        let block = match address {
            BlockAddress::Direct { slot, .. } => inode.direct[slot],
            BlockAddress::Indirect { slot, .. } => {
                if !inode.has_indirect() {
                    return Ok(None);
                }
                if pointers.is_none() {
                    let page = self.read_block(self.check_pointer(inumber, inode.indirect)?)?;
                    *pointers = Some(PointerBlock::from_block(&page));
                }
                pointers.as_ref().map_or(0, |page| page.get(slot))
            }
            BlockAddress::Beyond => 0,
        };
        if block == 0 {
            return Ok(None);
        }
        self.check_pointer(inumber, block).map(Some)
    }

    /// the block backing `address`, allocating it (and the pointer page) if needed;
    /// every new block is pushed onto `allocated`
    /// # Return
    /// `(block, freshly allocated)`, or [None] when the disk is full
    fn block_for_write(
        &mut self,
        inumber: u32,
        inode: &mut Inode,
        address: BlockAddress,
        pointers: &mut Option<PointerBlock>,
        allocated: &mut Vec<u32>,
    ) -> FsResult<Option<(u32, bool)>> {
        match address {
            BlockAddress::Direct { slot, .. } => {
                if inode.direct[slot] != 0 {
                    let block = self.check_pointer(inumber, inode.direct[slot])?;
                    return Ok(Some((block, false)));
                }
                let Some(block) = self.free_blocks_mut().allocate() else {
                    return Ok(None);
                };
                debug!("inode {inumber}: direct slot {slot} -> block {block}");
                allocated.push(block);
                inode.direct[slot] = block;
                Ok(Some((block, true)))
            }
            BlockAddress::Indirect { slot, .. } => {
                if pointers.is_none() {
                    if inode.has_indirect() {
                        let page = self.read_block(self.check_pointer(inumber, inode.indirect)?)?;
                        *pointers = Some(PointerBlock::from_block(&page));
                    } else {
                        // the page is only worth taking together with a data block
                        if self.free_block_count() < 2 {
                            return Ok(None);
                        }
                        let Some(page) = self.free_blocks_mut().allocate() else {
                            return Ok(None);
                        };
                        debug!("inode {inumber}: pointer page -> block {page}");
                        allocated.push(page);
                        inode.indirect = page;
                        *pointers = Some(PointerBlock::empty());
                    }
                }
                let page = pointers.get_or_insert_with(PointerBlock::empty);
                if page.get(slot) != 0 {
                    let block = self.check_pointer(inumber, page.get(slot))?;
                    return Ok(Some((block, false)));
                }
                let Some(block) = self.free_blocks_mut().allocate() else {
                    return Ok(None);
                };
                debug!("inode {inumber}: indirect slot {slot} -> block {block}");
                allocated.push(block);
                page.set(slot, block);
                Ok(Some((block, true)))
            }
            BlockAddress::Beyond => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disk::MemDisk, mkfs::format, MAX_FILE_SIZE, POINTERS_PER_INODE};

    fn mounted(nblocks: u32) -> FileSystem<MemDisk> {
        let mut disk = MemDisk::new(nblocks);
        format(&mut disk).unwrap();
        FileSystem::mount(disk).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 4096) as u8).collect()
    }

    #[test]
    fn test_twenty_block_scenario() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        assert_eq!(inumber, 1);

        let data = pattern(10000);
        assert_eq!(fs.write(inumber, &data, 0).unwrap(), 10000);
        let mut read = vec![0u8; 10000];
        assert_eq!(fs.read(inumber, &mut read, 0).unwrap(), 10000);
        assert_eq!(read, data);
        assert!(fs.getsize(inumber).unwrap() >= 10000);

        fs.delete(inumber).unwrap();
        assert_eq!(fs.create().unwrap(), 1);
    }

    #[test]
    fn test_create_is_first_fit() {
        let mut fs = mounted(20);
        let created: Vec<u32> = (0..5).map(|_| fs.create().unwrap()).collect();
        assert_eq!(created, vec![1, 2, 3, 4, 5]);
        fs.delete(2).unwrap();
        fs.delete(4).unwrap();
        assert_eq!(fs.create().unwrap(), 2);
        assert_eq!(fs.create().unwrap(), 4);
        assert_eq!(fs.create().unwrap(), 6);
    }

    #[test]
    fn test_inode_table_exhaustion() {
        let mut fs = mounted(20);
        let ninodes = fs.superblock().ninodes;
        for expected in 1..=ninodes {
            assert_eq!(fs.create().unwrap(), expected);
        }
        assert!(matches!(fs.create(), Err(FsError::InodeTableFull)));
        fs.delete(17).unwrap();
        assert_eq!(fs.create().unwrap(), 17);
        assert!(matches!(fs.create(), Err(FsError::InodeTableFull)));
    }

    #[test]
    fn test_getsize() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        assert_eq!(fs.getsize(inumber).unwrap(), 0);
        assert!(matches!(fs.getsize(0), Err(FsError::InvalidInumber(0))));
        assert!(matches!(fs.getsize(2), Err(FsError::InvalidInode(2))));
        let past_end = fs.superblock().ninodes + 1;
        assert!(matches!(
            fs.getsize(past_end),
            Err(FsError::InvalidInumber(_))
        ));
    }

    #[test]
    fn test_delete_invalid_leaves_tracker_alone() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        fs.write(inumber, &pattern(5000), 0).unwrap();
        let free = fs.free_block_count();

        assert!(matches!(fs.delete(0), Err(FsError::InvalidInumber(0))));
        assert!(matches!(fs.delete(9999), Err(FsError::InvalidInumber(9999))));
        assert!(matches!(fs.delete(2), Err(FsError::InvalidInode(2))));
        assert_eq!(fs.free_block_count(), free);

        fs.delete(inumber).unwrap();
        assert_eq!(fs.free_block_count(), free + 2);
        assert!(matches!(
            fs.delete(inumber),
            Err(FsError::InvalidInode(_))
        ));
        assert_eq!(fs.free_block_count(), free + 2);
    }

    #[test]
    fn test_read_past_end_returns_nothing() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(fs.read(inumber, &mut buf, 0).unwrap(), 0);
        fs.write(inumber, b"abc", 0).unwrap();
        assert_eq!(fs.read(inumber, &mut buf, 3).unwrap(), 0);
        assert_eq!(fs.read(inumber, &mut buf, 1000).unwrap(), 0);
        assert!(matches!(
            fs.read(inumber + 1, &mut buf, 0),
            Err(FsError::InvalidInode(_))
        ));
    }

    #[test]
    fn test_short_read() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        fs.write(inumber, b"hello world", 0).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(fs.read(inumber, &mut buf, 6).unwrap(), 5);
        assert_eq!(&buf[..5], b"world");
    }

    #[test]
    fn test_read_in_pieces_across_blocks() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let data = pattern(3 * BLOCK_SIZE + 123);
        fs.write(inumber, &data, 0).unwrap();

        let mut collected = Vec::new();
        let mut buf = [0u8; 1000];
        let mut offset = 0;
        loop {
            let n = fs.read(inumber, &mut buf, offset).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
            offset += n as u64;
        }
        assert_eq!(collected, data);
    }

    #[test]
    fn test_overwrite_in_middle_keeps_neighbours() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let mut data = pattern(2 * BLOCK_SIZE);
        fs.write(inumber, &data, 0).unwrap();
        let free = fs.free_block_count();

        fs.write(inumber, b"XYZ", 4094).unwrap();
        data[4094..4097].copy_from_slice(b"XYZ");
        let mut read = vec![0u8; data.len()];
        fs.read(inumber, &mut read, 0).unwrap();
        assert_eq!(read, data);
        assert_eq!(fs.getsize(inumber).unwrap(), 2 * BLOCK_SIZE as u32);
        assert_eq!(fs.free_block_count(), free);
    }

    #[test]
    fn test_write_through_indirect_page() {
        let mut fs = mounted(40);
        let inumber = fs.create().unwrap();
        let data = pattern(8 * BLOCK_SIZE + 17);
        assert_eq!(fs.write(inumber, &data, 0).unwrap(), data.len());

        // 9 data blocks and the pointer page
        assert_eq!(fs.free_block_count(), 40 - 5 - 10);
        let mut read = vec![0u8; data.len()];
        assert_eq!(fs.read(inumber, &mut read, 0).unwrap(), data.len());
        assert_eq!(read, data);

        // survives a remount
        let mut fs = FileSystem::mount(fs.unmount()).unwrap();
        let mut read = vec![0u8; data.len()];
        assert_eq!(fs.read(inumber, &mut read, 0).unwrap(), data.len());
        assert_eq!(read, data);

        fs.delete(inumber).unwrap();
        assert_eq!(fs.free_block_count(), 40 - 5);
    }

    #[test]
    fn test_disk_full_gives_partial_write() {
        // 20 blocks: superblock, 2 inode blocks, 17 data blocks
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let data = pattern(30 * BLOCK_SIZE);
        // 5 direct, then the page, then 11 more through it
        let written = fs.write(inumber, &data, 0).unwrap();
        assert_eq!(written, 16 * BLOCK_SIZE);
        assert_eq!(fs.free_block_count(), 0);
        assert_eq!(fs.getsize(inumber).unwrap(), written as u32);

        let other = fs.create().unwrap();
        assert_eq!(fs.write(other, b"no room", 0).unwrap(), 0);
        assert_eq!(fs.getsize(other).unwrap(), 0);

        let mut read = vec![0u8; written];
        assert_eq!(fs.read(inumber, &mut read, 0).unwrap(), written);
        assert_eq!(read[..], data[..written]);
    }

    #[test]
    fn test_pointer_page_needs_room_for_data() {
        // 10 blocks: superblock, 1 inode block, 8 data blocks
        let mut fs = mounted(10);
        let filler = fs.create().unwrap();
        fs.write(filler, &pattern(2 * BLOCK_SIZE), 0).unwrap();
        let inumber = fs.create().unwrap();
        let data = pattern(7 * BLOCK_SIZE);
        // 6 blocks left: 5 direct, and one is not enough for page plus data
        assert_eq!(fs.write(inumber, &data, 0).unwrap(), 5 * BLOCK_SIZE);
        assert_eq!(fs.free_block_count(), 1);
        assert_eq!(fs.find_inode(inumber).unwrap().indirect, 0);
    }

    #[test]
    fn test_write_past_largest_file_size() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        assert_eq!(fs.write(inumber, b"x", MAX_FILE_SIZE).unwrap(), 0);
        assert_eq!(fs.getsize(inumber).unwrap(), 0);
        assert_eq!(fs.free_block_count(), 17);
    }

    #[test]
    fn test_write_straddling_largest_file_size() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        assert_eq!(fs.write(inumber, b"ab", MAX_FILE_SIZE - 1).unwrap(), 1);
        assert_eq!(fs.getsize(inumber).unwrap() as u64, MAX_FILE_SIZE);
        // pointer page plus the last data block
        assert_eq!(fs.free_block_count(), 15);

        let mut buf = [0u8; 2];
        assert_eq!(fs.read(inumber, &mut buf, MAX_FILE_SIZE - 1).unwrap(), 1);
        assert_eq!(buf[0], b'a');
        assert_eq!(fs.read(inumber, &mut buf, MAX_FILE_SIZE).unwrap(), 0);
    }

    #[test]
    fn test_write_leaving_a_hole_reads_zeros() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let offset = 2 * BLOCK_SIZE as u64 + 10;
        fs.write(inumber, b"tail", offset).unwrap();
        assert_eq!(fs.getsize(inumber).unwrap(), offset as u32 + 4);
        // only the touched block is allocated
        assert_eq!(fs.free_block_count(), 16);
        let inode = fs.find_inode(inumber).unwrap();
        assert_eq!(inode.direct[..3], [0, 0, 3]);

        let mut buf = vec![0xffu8; offset as usize + 4];
        assert_eq!(fs.read(inumber, &mut buf, 0).unwrap(), buf.len());
        assert!(buf[..offset as usize].iter().all(|b| *b == 0));
        assert_eq!(&buf[offset as usize..], b"tail");
    }

    #[test]
    fn test_reused_blocks_do_not_leak_old_contents() {
        let mut fs = mounted(20);
        let first = fs.create().unwrap();
        fs.write(first, &vec![0xaau8; BLOCK_SIZE], 0).unwrap();
        fs.delete(first).unwrap();

        let second = fs.create().unwrap();
        fs.write(second, b"ab", 10).unwrap();
        let mut buf = [0xffu8; 12];
        assert_eq!(fs.read(second, &mut buf, 0).unwrap(), 12);
        assert_eq!(&buf[..10], &[0u8; 10]);
        assert_eq!(&buf[10..], b"ab");
    }

    #[test]
    fn test_create_zeroes_stale_pointer_page() {
        let mut fs = mounted(20);
        let first = fs.create().unwrap();
        fs.write(first, &pattern((POINTERS_PER_INODE + 1) * BLOCK_SIZE), 0)
            .unwrap();
        let page = fs.find_inode(first).unwrap().indirect;
        assert_ne!(page, 0);
        fs.delete(first).unwrap();
        assert!(!fs.is_block_used(page));

        assert_eq!(fs.create().unwrap(), first);
        assert_eq!(fs.read_block(page).unwrap(), [0u8; BLOCK_SIZE]);
        let inode = fs.find_inode(first).unwrap();
        assert_eq!(inode.indirect, 0);
        assert_eq!(inode.size, 0);
    }

    #[test]
    fn test_corrupt_pointer_is_reported_not_followed() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        fs.write(inumber, b"data", 0).unwrap();
        let mut inode = fs.find_inode(inumber).unwrap();
        inode.direct[0] = 500;
        fs.save_inode(inumber, &inode).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            fs.read(inumber, &mut buf, 0),
            Err(FsError::Corrupt { block: 500, .. })
        ));
        let free = fs.free_block_count();
        assert!(matches!(
            fs.delete(inumber),
            Err(FsError::Corrupt { block: 500, .. })
        ));
        assert_eq!(fs.free_block_count(), free);
        assert!(fs.getsize(inumber).is_ok());
    }

    #[test]
    fn test_failed_write_gives_back_new_blocks() {
        let mut fs = mounted(20);
        let inumber = fs.create().unwrap();
        let mut inode = fs.find_inode(inumber).unwrap();
        inode.direct[1] = 500;
        fs.save_inode(inumber, &inode).unwrap();
        assert_eq!(fs.free_block_count(), 17);

        assert!(matches!(
            fs.write(inumber, &pattern(2 * BLOCK_SIZE), 0),
            Err(FsError::Corrupt { block: 500, .. })
        ));
        assert_eq!(fs.free_block_count(), 17);
        assert!(!fs.is_block_used(3));
        let unchanged = fs.find_inode(inumber).unwrap();
        assert_eq!(unchanged.direct, [0, 500, 0, 0, 0]);
        assert_eq!(unchanged.size, 0);
    }
}
