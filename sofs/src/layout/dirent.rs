use bytemuck::{Pod, Zeroable};

use crate::consts::{DPC, MAX_NAME, NULL_INODE};

pub(super) const DPC_BYTES: usize = DPC * crate::consts::DIRENT_SIZE;

/// One directory entry (spec.md §3 "Directory entry").
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirEntry {
    pub name: [u8; MAX_NAME + 1],
    pub n_inode: u32,
}

const _: () = assert!(std::mem::size_of::<DirEntry>() == crate::consts::DIRENT_SIZE);

/// Display state of an entry's name, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// `n_inode != NULL_INODE`, name is the normal (non-tombstoned) name.
    InUse,
    /// First and last bytes of the name have been swapped by `REM`.
    DeletedButNamed,
    /// All-zero name, `n_inode == NULL_INODE`.
    Clean,
}

impl DirEntry {
    pub fn clean() -> Self {
        Self {
            name: [0u8; MAX_NAME + 1],
            n_inode: NULL_INODE,
        }
    }

    pub fn new(name: &str, n_inode: u32) -> Self {
        let mut entry = DirEntry::clean();
        entry.set_name(name);
        entry.n_inode = n_inode;
        entry
    }

    fn name_len(&self) -> usize {
        self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len())
    }

    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.name[..self.name_len()]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = [0u8; MAX_NAME + 1];
        let bytes = name.as_bytes();
        self.name[..bytes.len()].copy_from_slice(bytes);
    }

    pub fn state(&self) -> EntryState {
        if self.name.iter().all(|&b| b == 0) && self.n_inode == NULL_INODE {
            EntryState::Clean
        } else if self.n_inode == NULL_INODE {
            EntryState::DeletedButNamed
        } else {
            EntryState::InUse
        }
    }

    /// Swaps the first and last bytes of a non-empty name, per the `REM`
    /// tombstone transform (spec.md §4.9).
    pub fn tombstone(&mut self) {
        let len = self.name_len();
        if len >= 2 {
            self.name.swap(0, len - 1);
        }
        self.n_inode = NULL_INODE;
    }

    pub fn detach(&mut self) {
        *self = DirEntry::clean();
    }
}
