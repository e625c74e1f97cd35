use bytemuck::{Pod, Zeroable};

use crate::consts::{N_DIRECT, NULL_CLUSTER};

/// Low 9 bits of `mode`: classical `rwxrwxrwx` permission bits.
pub const PERM_MASK: u16 = 0o777;
/// `mode` type-and-free bits, grounded on the teacher's
/// `shared/syscall_interface::SyscallFileStat` layout (type nibble above the
/// permission bits, tested by masking).
pub const MODE_SYMLINK: u16 = 0x200;
pub const MODE_FILE: u16 = 0x400;
pub const MODE_DIR: u16 = 0x800;
pub const MODE_FREE: u16 = 0x1000;
const MODE_TYPE_MASK: u16 = MODE_SYMLINK | MODE_FILE | MODE_DIR;

/// A file type an inode can hold, for `allocInode`/consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    File,
    Dir,
    Symlink,
}

impl InodeType {
    pub fn mode_bit(self) -> u16 {
        match self {
            InodeType::File => MODE_FILE,
            InodeType::Dir => MODE_DIR,
            InodeType::Symlink => MODE_SYMLINK,
        }
    }
}

/// One inode record (spec.md §3 "Inode"). The `variant` field is `(aTime,
/// mTime)` when the inode is in use and `(prev, next)` when it is free,
/// keyed by `MODE_FREE` in `mode` — see `Inode::variant_as_times`/
/// `variant_as_links` for the typed accessors over that tagged union.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Inode {
    pub mode: u16,
    pub ref_count: u16,
    pub owner: u32,
    pub group: u32,
    pub size: u32,
    pub clu_count: u32,
    pub variant: [u32; 2],
    pub d: [u32; N_DIRECT],
    pub i1: u32,
    pub i2: u32,
}

const _: () = assert!(std::mem::size_of::<Inode>() == crate::consts::INODE_SIZE);

impl Inode {
    pub fn is_free(&self) -> bool {
        self.mode & MODE_FREE != 0
    }

    pub fn type_bits(&self) -> u16 {
        self.mode & MODE_TYPE_MASK
    }

    pub fn inode_type(&self) -> Option<InodeType> {
        match self.type_bits() {
            MODE_FILE => Some(InodeType::File),
            MODE_DIR => Some(InodeType::Dir),
            MODE_SYMLINK => Some(InodeType::Symlink),
            _ => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        !self.is_free() && self.type_bits() == MODE_DIR
    }

    pub fn permissions(&self) -> u16 {
        self.mode & PERM_MASK
    }

    /// `(aTime, mTime)`, valid only when the inode is in use.
    pub fn times(&self) -> (u32, u32) {
        (self.variant[0], self.variant[1])
    }

    pub fn set_times(&mut self, atime: u32, mtime: u32) {
        self.variant = [atime, mtime];
    }

    /// `(prev, next)` free-list links, valid only when the inode is free.
    pub fn free_links(&self) -> (u32, u32) {
        (self.variant[0], self.variant[1])
    }

    pub fn set_free_links(&mut self, prev: u32, next: u32) {
        self.variant = [prev, next];
    }

    /// All cluster references held directly or indirectly by this inode.
    pub fn content_refs(&self) -> impl Iterator<Item = u32> + '_ {
        self.d.iter().copied().chain([self.i1, self.i2])
    }

    pub fn clear_content_refs(&mut self) {
        self.d = [NULL_CLUSTER; N_DIRECT];
        self.i1 = NULL_CLUSTER;
        self.i2 = NULL_CLUSTER;
    }

    /// Resets this record to the zeroed, free-and-clean state used by the
    /// formatter and by `freeInode`/`cleanInode`.
    pub fn reset_free_clean(&mut self) {
        *self = Inode::zeroed();
        self.mode = MODE_FREE;
    }
}
