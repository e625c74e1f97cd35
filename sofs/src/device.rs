//! Buffer-cache client interface (spec.md §4.1/§6) and its minimal, hosted
//! reference implementation.
//!
//! The buffer cache proper — a byte-level buffered I/O channel — is an
//! external collaborator per spec.md §1; what SOFS owns is the trait the
//! core consumes and one thin implementation of it backed by a plain file,
//! enough to run the formatter and the allocators end to end. Grounded on
//! the teacher's `src/main.rs`, which already drives `std::fs` the way
//! every other part of this crate needs to.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::consts::{BLOCK_SIZE, CLUSTER_SIZE};
use crate::error::{Result, SofsError};

/// A physical block number, counting blocks from the start of the image.
pub type Pbn = u32;

/// The synchronous block-addressed interface the core consumes. Every
/// method is expected to either fully succeed or report a taxonomic error;
/// partial reads/writes are a defect of the implementation, not something
/// callers need to handle.
pub trait BlockDevice {
    fn close(&mut self) -> Result<()>;
    fn read_block(&mut self, pbn: Pbn, out: &mut [u8; BLOCK_SIZE]) -> Result<()>;
    fn write_block(&mut self, pbn: Pbn, data: &[u8; BLOCK_SIZE]) -> Result<()>;
    fn read_cluster(&mut self, first_block_pbn: Pbn, out: &mut [u8; CLUSTER_SIZE]) -> Result<()>;
    fn write_cluster(&mut self, first_block_pbn: Pbn, data: &[u8; CLUSTER_SIZE]) -> Result<()>;
}

/// Minimal `BlockDevice` over a plain file. Every call seeks and performs
/// one exact read/write; there is no caching here beyond the single-slot
/// accessors built on top (§4.2) — a real buffered I/O channel is out of
/// scope (spec.md §1).
pub struct FileBackend {
    file: Option<File>,
}

impl FileBackend {
    /// Opens an existing backing file. `path`'s length must already be a
    /// positive multiple of `BLOCK_SIZE`; the caller (the formatter, or a
    /// future mount operation) is responsible for checking that.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| SofsError::DeviceNotOpen)?;
        Ok(Self { file: Some(file) })
    }

    /// Total length of the backing file in bytes.
    pub fn byte_len(&mut self) -> Result<u64> {
        self.require()?
            .metadata()
            .map(|m| m.len())
            .map_err(|_| SofsError::SeekFailed)
    }

    fn require(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(SofsError::DeviceNotOpen)
    }

    fn seek_to(&mut self, byte_offset: u64) -> Result<()> {
        self.require()?
            .seek(SeekFrom::Start(byte_offset))
            .map(|_| ())
            .map_err(|_| SofsError::SeekFailed)
    }
}

impl BlockDevice for FileBackend {
    fn close(&mut self) -> Result<()> {
        self.file.take().ok_or(SofsError::DeviceNotOpen)?;
        Ok(())
    }

    fn read_block(&mut self, pbn: Pbn, out: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.seek_to(pbn as u64 * BLOCK_SIZE as u64)?;
        self.require()?
            .read_exact(out)
            .map_err(|_| SofsError::ReadFailed)
    }

    fn write_block(&mut self, pbn: Pbn, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.seek_to(pbn as u64 * BLOCK_SIZE as u64)?;
        self.require()?
            .write_all(data)
            .map_err(|_| SofsError::WriteFailed)
    }

    fn read_cluster(&mut self, first_block_pbn: Pbn, out: &mut [u8; CLUSTER_SIZE]) -> Result<()> {
        self.seek_to(first_block_pbn as u64 * BLOCK_SIZE as u64)?;
        self.require()?
            .read_exact(out)
            .map_err(|_| SofsError::ReadFailed)
    }

    fn write_cluster(&mut self, first_block_pbn: Pbn, data: &[u8; CLUSTER_SIZE]) -> Result<()> {
        self.seek_to(first_block_pbn as u64 * BLOCK_SIZE as u64)?;
        self.require()?
            .write_all(data)
            .map_err(|_| SofsError::WriteFailed)
    }
}
