//! Single-slot accessors (spec.md §4.2).
//!
//! A `Slot<T, N>` is *not* a cache in the performance sense: it is a
//! single-entry staging area that enforces "exactly one block/cluster of a
//! given kind is in memory at a time" and pairs every mutation with a
//! persist before the coordinate can change. Grounded on spec.md's own
//! design note ("model each slot as an owned record with a small state
//! machine"); the state machine is exactly `Unloaded`/`Loaded`/`Errored`.

use bytemuck::Pod;
use log::{debug, trace};

use crate::device::Pbn;
use crate::error::{Result, SofsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Unloaded,
    Loaded(Pbn),
    Errored(SofsError),
}

/// A single staging buffer of `N` raw bytes, reinterpreted as `&T`/`&mut T`
/// once loaded. `T` must be exactly `N` bytes (checked once in `new` via
/// `bytemuck`'s size requirements at the call site).
pub struct Slot<T: Pod, const N: usize> {
    state: SlotState,
    buf: [u8; N],
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod, const N: usize> Slot<T, N> {
    pub fn new() -> Self {
        assert_eq!(std::mem::size_of::<T>(), N, "slot type size must match buffer size");
        Self {
            state: SlotState::Unloaded,
            buf: [0u8; N],
            _marker: std::marker::PhantomData,
        }
    }

    fn check_errored(&self) -> Result<()> {
        if let SlotState::Errored(e) = self.state {
            return Err(e);
        }
        Ok(())
    }

    fn poison(&mut self, e: SofsError) -> SofsError {
        self.state = SlotState::Errored(e);
        e
    }

    /// Idempotent load: a no-op if `coord` is already loaded, otherwise a
    /// read that replaces the slot's contents.
    pub fn load(
        &mut self,
        coord: Pbn,
        read: impl FnOnce(Pbn, &mut [u8; N]) -> Result<()>,
    ) -> Result<()> {
        self.check_errored()?;
        if self.state == SlotState::Loaded(coord) {
            trace!("slot hit for pbn {coord}");
            return Ok(());
        }
        debug!("slot load for pbn {coord}");
        match read(coord, &mut self.buf) {
            Ok(()) => {
                self.state = SlotState::Loaded(coord);
                Ok(())
            }
            Err(e) => Err(self.poison(e)),
        }
    }

    /// Loads a freshly allocated, zeroed region at `coord` without
    /// performing a read, for callers that are about to overwrite every
    /// byte (e.g. the formatter initializing a brand-new block).
    pub fn load_blank(&mut self, coord: Pbn) -> Result<()> {
        self.check_errored()?;
        self.buf = [0u8; N];
        self.state = SlotState::Loaded(coord);
        Ok(())
    }

    pub fn get(&self) -> Result<&T> {
        self.check_errored()?;
        match self.state {
            SlotState::Loaded(_) => Ok(bytemuck::from_bytes(&self.buf)),
            SlotState::Unloaded => Err(SofsError::LibBad),
            SlotState::Errored(e) => Err(e),
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.check_errored()?;
        match self.state {
            SlotState::Loaded(_) => Ok(bytemuck::from_bytes_mut(&mut self.buf)),
            SlotState::Unloaded => Err(SofsError::LibBad),
            SlotState::Errored(e) => Err(e),
        }
    }

    /// Raw byte view of the slot, for callers that want to reinterpret the
    /// body under a different type (e.g. a cluster slot viewed as
    /// directory entries or as an LCN array).
    pub fn bytes(&self) -> Result<&[u8; N]> {
        self.check_errored()?;
        match self.state {
            SlotState::Loaded(_) => Ok(&self.buf),
            SlotState::Unloaded => Err(SofsError::LibBad),
            SlotState::Errored(e) => Err(e),
        }
    }

    pub fn bytes_mut(&mut self) -> Result<&mut [u8; N]> {
        self.check_errored()?;
        match self.state {
            SlotState::Loaded(_) => Ok(&mut self.buf),
            SlotState::Unloaded => Err(SofsError::LibBad),
            SlotState::Errored(e) => Err(e),
        }
    }

    /// Writes the slot back to its loaded coordinate. Storing without a
    /// prior successful load is `ELIBBAD` (spec.md §4.2).
    pub fn store(&mut self, write: impl FnOnce(Pbn, &[u8; N]) -> Result<()>) -> Result<()> {
        self.check_errored()?;
        let coord = match self.state {
            SlotState::Loaded(c) => c,
            _ => return Err(SofsError::LibBad),
        };
        debug!("slot store for pbn {coord}");
        write(coord, &self.buf).map_err(|e| self.poison(e))
    }

    pub fn coord(&self) -> Option<Pbn> {
        match self.state {
            SlotState::Loaded(c) => Some(c),
            _ => None,
        }
    }
}
