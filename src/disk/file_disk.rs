use std::{
    fs::OpenOptions,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use log::{info, warn};
use memmap2::MmapMut;

use super::{block_range, BlockDevice, DiskStats};
use crate::fs::{Block, BLOCK_SIZE};

/// a device backed by an image file, mapped into memory
#[derive(Debug)]
pub struct FileDisk {
    path: PathBuf,
    mmap: MmapMut,
    block_count: u32,
    stats: DiskStats,
}

impl FileDisk {
    /// open the image at `path`, creating it if needed,
    /// and resize it to exactly `block_count` blocks
    /// # Return
    /// an [io::Result] type,\
    /// which contains a [FileDisk] instance if the operation is successful
    pub fn open<P>(path: P, block_count: u32) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        if block_count == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "a device needs at least one block",
            ));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        // new space reads as zeros
        file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;

        // Safety
        // the mapping is private to this value, and the file is opened
        // for read and write; nothing else in this process maps it
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        info!(
            "opened {} with {} blocks",
            path.as_ref().display(),
            block_count
        );
        Ok(FileDisk {
            path: path.as_ref().to_path_buf(),
            mmap,
            block_count,
            stats: DiskStats::default(),
        })
    }

    pub fn stats(&self) -> DiskStats {
        self.stats
    }
}

impl BlockDevice for FileDisk {
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, number: u32, block: &mut Block) -> io::Result<()> {
        let range = block_range(number, self.block_count)?;
        block.copy_from_slice(&self.mmap[range]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write_block(&mut self, number: u32, block: &Block) -> io::Result<()> {
        let range = block_range(number, self.block_count)?;
        self.mmap[range].copy_from_slice(block);
        self.stats.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.mmap.flush()
    }
}

impl Drop for FileDisk {
    fn drop(&mut self) {
        if let Err(e) = self.mmap.flush() {
            warn!("flushing {} failed: {e}", self.path.display());
        }
        info!(
            "{} disk block reads, {} disk block writes",
            self.stats.reads, self.stats.writes
        );
    }
}
