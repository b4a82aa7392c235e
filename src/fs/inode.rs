use serde::{Deserialize, Serialize};

use crate::utils::{self, traits::FixedLayout};

use super::POINTERS_PER_INODE;

/// One fixed-size inode record as it sits in an inode-table block
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inode {
    /// 1 when the slot holds a live file, 0 otherwise
    valid: u32,
    pub size: u32,
    /// unix seconds
    pub created_at: i64,
    pub direct: [u32; POINTERS_PER_INODE],
    /// block number of the pointer page, 0 when absent
    pub indirect: u32,
}

impl FixedLayout for Inode {}

impl Inode {
    /// a freshly created, empty file
    pub fn new() -> Self {
        Inode {
            valid: 1,
            created_at: utils::time_util::now(),
            ..Inode::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    /// mark the slot free, pointers are left as they are
    pub fn invalidate(&mut self) {
        self.valid = 0;
    }
}

/// This block is about the blocks an inode points at
impl Inode {
    /// direct blocks in use, in slot order
    pub fn direct_blocks(&self) -> Vec<u32> {
        self.direct.iter().copied().filter(|b| *b != 0).collect()
    }

    pub fn has_indirect(&self) -> bool {
        self.indirect != 0
    }
}
