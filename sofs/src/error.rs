//! Flat error taxonomy (spec.md §7).
//!
//! The teacher's `shared/syscall_interface` crate models its own error
//! taxonomy as a `#[repr(u16)]` enum carrying a stable numeric code; SOFS's
//! taxonomy is the same shape, so it follows the same pattern, with
//! `thiserror` standing in for the hand-rolled `Display` impl the teacher
//! writes because it has no `std`.

use thiserror::Error;

/// Every error SOFS can report, with a stable numeric code (used verbatim
/// by the `mkfs` CLI's `cmd: error #<n> - <message>` diagnostic) and a
/// human-readable message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SofsError {
    // --- Argument errors ---
    #[error("invalid argument")]
    InvalidArgument = 1,
    #[error("no space left on device")]
    NoSpace,
    #[error("name too long")]
    NameTooLong,
    #[error("not a directory")]
    NotADirectory,
    #[error("no such directory entry")]
    NoSuchEntry,
    #[error("permission denied")]
    PermissionDenied,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("relative path passed where an absolute path was expected")]
    RelativePath,

    // --- Structural inconsistency errors ---
    #[error("inconsistent superblock header")]
    BadSuperblockHeader,
    #[error("inconsistent inode-table metadata")]
    BadInodeTableMetadata,
    #[error("inconsistent inode free-list shape")]
    BadInodeFreeList,
    #[error("inconsistent free inode shape")]
    BadFreeInodeShape,
    #[error("inconsistent data-zone metadata")]
    BadDataZoneMetadata,
    #[error("inconsistent free-cluster caches")]
    BadFreeClusterCaches,
    #[error("inconsistent free-cluster backbone")]
    BadFreeClusterBackbone,
    #[error("inconsistent cluster header")]
    BadClusterHeader,
    #[error("inconsistent in-use inode shape")]
    BadInUseInodeShape,
    #[error("inconsistent inode cluster-reference list")]
    BadInodeClusterRefs,
    #[error("inconsistent directory contents")]
    BadDirectoryContents,
    #[error("inconsistent directory entry")]
    BadDirectoryEntry,
    /// A content/indirection cluster's `stat` does not name the inode that
    /// is supposed to own it.
    #[error("cluster stat does not match owning inode")]
    ClusterStatMismatch,
    /// A cluster expected to be reachable from a free-list or cache was not
    /// found there.
    #[error("cluster not found in expected free list")]
    ClusterNotInList,
    /// A cluster was about to be inserted into a free list/cache that
    /// already contains it.
    #[error("cluster already present in free list")]
    ClusterAlreadyInList,
    /// A cluster operation required an allocated cluster, but the cluster
    /// is in the free state.
    #[error("cluster is not allocated")]
    ClusterNotAllocated,

    // --- I/O errors ---
    #[error("device is not open")]
    DeviceNotOpen,
    #[error("block read failed")]
    ReadFailed,
    #[error("block write failed")]
    WriteFailed,
    #[error("seek failed")]
    SeekFailed,
    /// An accessor slot was used without a prior successful `load`, or was
    /// used after entering the sticky-error state.
    #[error("buffer-cache client used inconsistently")]
    LibBad,
}

pub type Result<T> = core::result::Result<T, SofsError>;

impl SofsError {
    /// Stable numeric code surfaced by the `mkfs` CLI as `error #<n>`.
    pub fn code(self) -> u16 {
        self as u16
    }
}
