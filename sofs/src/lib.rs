//! SOFS: a small, teaching-grade on-disk file system (spec.md §1).
//!
//! Module layout follows spec.md §2's dependency order, leaves first: raw
//! on-disk types (`layout`), the buffer-cache client (`device`) and the
//! single-slot accessors built on it (`accessor`, composed in `volume`),
//! the consistency checkers (`checks`), then the allocators, walker,
//! access check and directory operations that sit on top of all of the
//! above (`ialloc`, `dalloc`, `walker`, `access`, `dirops`), and finally
//! the formatter (`format`) that drives the whole stack to produce a
//! fresh volume.

pub mod access;
pub mod accessor;
pub mod checks;
pub mod consts;
pub mod dalloc;
pub mod device;
pub mod dirops;
pub mod error;
pub mod format;
pub mod ialloc;
pub mod layout;
pub mod volume;
pub mod walker;

pub use device::{BlockDevice, FileBackend, Pbn};
pub use error::{Result, SofsError};
pub use volume::{Lcn, Volume};
