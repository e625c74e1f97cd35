//! Geometry constants for the on-disk layout.
//!
//! These are implementation choices for the relationships spec.md pins down
//! symbolically (e.g. `IPB = BLOCK_SIZE / sizeof(Inode)`); see `SPEC_FULL.md`
//! §3 for the derivation of each value below.

/// Size in bytes of a block, the unit of I/O.
pub const BLOCK_SIZE: usize = 512;
/// Number of contiguous blocks forming one cluster, the allocation unit of
/// the data zone.
pub const BLOCKS_PER_CLUSTER: usize = 8;
/// Size in bytes of a cluster.
pub const CLUSTER_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_CLUSTER;

/// Size in bytes of a cluster's `{prev, next, stat}` header.
pub const CLUSTER_HEADER_SIZE: usize = 12;
/// Bytes of information per cluster, i.e. the body available after the
/// header.
pub const BSLPC: usize = CLUSTER_SIZE - CLUSTER_HEADER_SIZE;

/// On-disk size of one inode record.
pub const INODE_SIZE: usize = 64;
/// Inodes per block.
pub const IPB: usize = BLOCK_SIZE / INODE_SIZE;

/// On-disk size of one directory entry.
pub const DIRENT_SIZE: usize = 64;
/// Directory entries per cluster. `BSLPC` does not divide evenly by
/// `DIRENT_SIZE`; the trailing bytes are unused padding, consistent with
/// invariant I5's "body is unspecified" allowance.
pub const DPC: usize = BSLPC / DIRENT_SIZE;
/// Maximum length in bytes of a base name, excluding the trailing NUL.
pub const MAX_NAME: usize = 59;

/// Cluster references (LCNs, as `u32`) that fit in one indirection cluster.
pub const RPC: usize = BSLPC / 4;
/// Direct cluster references held inline in an inode.
pub const N_DIRECT: usize = 7;
/// Largest valid cluster index addressable through an inode's direct,
/// single- and double-indirection references.
pub const MAX_FILE_CLUSTERS: usize = N_DIRECT + RPC + RPC * RPC;
/// Largest valid byte offset within a file (exclusive upper bound).
pub const MAX_FILE_SIZE: u64 = (MAX_FILE_CLUSTERS as u64) * (BSLPC as u64);

/// Capacity of each of the two in-superblock free-cluster caches.
pub const DZONE_CACHE_SIZE: usize = 50;

/// Magic number of a properly formatted volume.
pub const MAGIC_NUMBER: u32 = 0x65FE;
/// Magic number written while formatting is in progress, guaranteeing a
/// crash-interrupted format is unmountable.
pub const FORMAT_IN_PROGRESS_MAGIC: u32 = 0xFFFF;
/// Version number stamped into every superblock produced by this crate.
pub const VERSION_NUMBER: u32 = 0x2014;

/// Sentinel inode number meaning "no inode".
pub const NULL_INODE: u32 = u32::MAX;
/// Sentinel logical cluster number meaning "no cluster".
pub const NULL_CLUSTER: u32 = u32::MAX;
/// Sentinel physical block number meaning "no block".
pub const NULL_BLOCK: u32 = u32::MAX;

/// Unmount status: properly unmounted.
pub const MSTAT_PRU: u32 = 0;
/// Unmount status: not properly unmounted.
pub const MSTAT_NPRU: u32 = 1;

/// Default volume name stamped by the formatter when none is given.
pub const DEFAULT_VOLUME_NAME: &str = "SOFS14";
/// Size in bytes of the on-disk volume-name field, including the NUL.
pub const VOLUME_NAME_SIZE: usize = 24;
