use thiserror::Error;

/// Everything that can go wrong inside the layout engine.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("filesystem is not mounted")]
    NotMounted,
    #[error("filesystem is already mounted")]
    AlreadyMounted,
    #[error("device of {0} blocks is too small to hold a filesystem")]
    DeviceTooSmall(u32),
    #[error("invalid magic number {0:#010x}, device does not hold this filesystem")]
    BadMagic(u32),
    #[error("superblock is corrupt: {0}")]
    CorruptSuperblock(String),
    #[error("inode {inumber} references block {block}, which is outside the data region")]
    Corrupt { inumber: u32, block: u32 },
    #[error("inumber {0} is out of range")]
    InvalidInumber(u32),
    #[error("inode {0} is not in use")]
    InvalidInode(u32),
    #[error("inode table is full")]
    InodeTableFull,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Layout(#[from] anyhow::Error),
}

pub type FsResult<T> = Result<T, FsError>;
