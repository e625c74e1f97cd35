//! On-disk data types (spec.md §3/§6).
//!
//! Every type here is `#[repr(C)]` plus `bytemuck::{Pod, Zeroable}`, giving
//! a zero-copy view over the raw bytes a block/cluster read returns.
//! Grounded on the teacher's `shared/ext2_parser/src/lib.rs`, which
//! reinterprets raw bytes as `#[repr(C, packed)]` structs the same way, via
//! unsafe pointer casts; `bytemuck` (already part of the pack's dependency
//! surface, see `BL-CZY-dvida_oxide/kernel/Cargo.toml`) gets the same
//! reinterpretation without hand-written unsafe at every call site, which
//! matters here because (unlike the teacher's read-only parser) SOFS
//! mutates these views in place.

pub mod cluster;
pub mod dirent;
pub mod inode;
pub mod superblock;

pub use cluster::{Cluster, ClusterHeader};
pub use dirent::DirEntry;
pub use inode::Inode;
pub use superblock::{FreeClusterCache, SuperBlock};
