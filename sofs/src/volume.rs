//! Ties a `BlockDevice` to the four single-slot accessors of spec.md §4.2
//! and exposes the coordinate conversions of §4.2's "Auxiliary coordinate
//! conversions".

use crate::accessor::Slot;
use crate::consts::*;
use crate::device::{BlockDevice, Pbn};
use crate::error::{Result, SofsError};
use crate::layout::{Cluster, Inode, SuperBlock};

/// A logical cluster number, 0-based within the data zone.
pub type Lcn = u32;

/// One block's worth of inodes, viewed as a byte buffer slotted by block
/// index (spec.md §4.2 "one for a block of the inode table").
pub type InodeBlock = [Inode; IPB];

/// The running process's view of one open volume: the device plus the four
/// singleton slots. All mutation enters through these slots — allocators
/// and the file-cluster walker never touch `device` directly (spec.md §2
/// "Data flow").
pub struct Volume<D: BlockDevice> {
    pub device: D,
    sb: Slot<SuperBlock, BLOCK_SIZE>,
    itab: Slot<InodeBlock, BLOCK_SIZE>,
    /// A cluster interpreted as an array of LCNs: used for `i1`, the outer
    /// `i2` array, and any inner single-indirection array reached through
    /// `i2`, one at a time (spec.md §4.2).
    indirect: Slot<Cluster, CLUSTER_SIZE>,
    /// A cluster interpreted as raw bytes / directory entries, or a fresh
    /// indirection cluster being initialized.
    leaf: Slot<Cluster, CLUSTER_SIZE>,
}

impl<D: BlockDevice> Volume<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            sb: Slot::new(),
            itab: Slot::new(),
            indirect: Slot::new(),
            leaf: Slot::new(),
        }
    }

    // --- coordinate conversions (spec.md §4.2) ---

    /// `(blockIndex, offsetInBlock)` for inode number `n`.
    pub fn inode_coord(n: u32) -> (Pbn, usize) {
        (n / IPB as u32, (n as usize) % IPB)
    }

    /// `(clustInd, offset)` for byte position `p` within a file.
    pub fn byte_coord(p: u64) -> (u32, usize) {
        ((p / BSLPC as u64) as u32, (p % BSLPC as u64) as usize)
    }

    fn cluster_pbn(&self, lcn: Lcn) -> Result<Pbn> {
        let sb = self.sb.get()?;
        if lcn >= sb.d_zone_total {
            return Err(SofsError::InvalidArgument);
        }
        Ok(sb.d_zone_start + lcn * BLOCKS_PER_CLUSTER as u32)
    }

    // --- superblock slot ---

    pub fn load_superblock(&mut self) -> Result<()> {
        let device = &mut self.device;
        self.sb.load(0, |pbn, buf| device.read_block(pbn, buf))
    }

    pub fn superblock(&self) -> Result<&SuperBlock> {
        self.sb.get()
    }

    pub fn superblock_mut(&mut self) -> Result<&mut SuperBlock> {
        self.sb.get_mut()
    }

    pub fn store_superblock(&mut self) -> Result<()> {
        let device = &mut self.device;
        self.sb.store(|pbn, buf| device.write_block(pbn, buf))
    }

    /// Initializes the superblock slot with a blank record at block 0,
    /// without reading the (possibly garbage) backing file. Used only by
    /// the formatter.
    pub fn blank_superblock(&mut self) -> Result<()> {
        self.sb.load_blank(0)
    }

    // --- inode-table slot ---

    pub fn inode_total(&self) -> Result<u32> {
        Ok(self.superblock()?.i_total)
    }

    fn inode_block_pbn(&self, block_index: u32) -> Result<Pbn> {
        let sb = self.sb.get()?;
        Ok(sb.i_table_start + block_index)
    }

    pub fn load_inode_block(&mut self, n: u32) -> Result<()> {
        let (block_index, _) = Self::inode_coord(n);
        let pbn = self.inode_block_pbn(block_index)?;
        let device = &mut self.device;
        self.itab.load(pbn, |pbn, buf| device.read_block(pbn, buf))
    }

    pub fn blank_inode_block(&mut self, block_index: u32) -> Result<()> {
        let pbn = self.inode_block_pbn(block_index)?;
        self.itab.load_blank(pbn)
    }

    pub fn inode(&self, n: u32) -> Result<&Inode> {
        let (_, off) = Self::inode_coord(n);
        Ok(&self.itab.get()?[off])
    }

    pub fn inode_mut(&mut self, n: u32) -> Result<&mut Inode> {
        let (_, off) = Self::inode_coord(n);
        Ok(&mut self.itab.get_mut()?[off])
    }

    pub fn store_inode_block(&mut self) -> Result<()> {
        let device = &mut self.device;
        self.itab.store(|pbn, buf| device.write_block(pbn, buf))
    }

    // --- indirection-cluster slot (array of LCNs) ---

    pub fn load_indirect(&mut self, lcn: Lcn) -> Result<()> {
        let pbn = self.cluster_pbn(lcn)?;
        let device = &mut self.device;
        self.indirect.load(pbn, |pbn, buf| device.read_cluster(pbn, buf))
    }

    pub fn blank_indirect(&mut self, lcn: Lcn) -> Result<()> {
        let pbn = self.cluster_pbn(lcn)?;
        self.indirect.load_blank(pbn)
    }

    pub fn indirect(&self) -> Result<&Cluster> {
        self.indirect.get()
    }

    pub fn indirect_mut(&mut self) -> Result<&mut Cluster> {
        self.indirect.get_mut()
    }

    pub fn store_indirect(&mut self) -> Result<()> {
        let device = &mut self.device;
        self.indirect.store(|pbn, buf| device.write_cluster(pbn, buf))
    }

    // --- leaf-content-cluster slot ---

    pub fn load_leaf(&mut self, lcn: Lcn) -> Result<()> {
        let pbn = self.cluster_pbn(lcn)?;
        let device = &mut self.device;
        self.leaf.load(pbn, |pbn, buf| device.read_cluster(pbn, buf))
    }

    pub fn blank_leaf(&mut self, lcn: Lcn) -> Result<()> {
        let pbn = self.cluster_pbn(lcn)?;
        self.leaf.load_blank(pbn)
    }

    pub fn leaf(&self) -> Result<&Cluster> {
        self.leaf.get()
    }

    pub fn leaf_mut(&mut self) -> Result<&mut Cluster> {
        self.leaf.get_mut()
    }

    pub fn store_leaf(&mut self) -> Result<()> {
        let device = &mut self.device;
        self.leaf.store(|pbn, buf| device.write_cluster(pbn, buf))
    }
}
