use bytemuck::{Pod, Zeroable};

use crate::consts::{DZONE_CACHE_SIZE, VOLUME_NAME_SIZE};

/// One of the two 50-slot in-superblock free-cluster buffers (spec.md
/// §3 "Reference cache"). For the retrieval cache `cache_idx` is the index
/// of the next cluster to hand out (`DZONE_CACHE_SIZE` means empty); for
/// the insertion cache it is the index of the next free slot (`0` means
/// empty).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct FreeClusterCache {
    pub cache_idx: u32,
    pub cache: [u32; DZONE_CACHE_SIZE],
}

impl FreeClusterCache {
    pub const fn empty_retrieval() -> Self {
        Self {
            cache_idx: DZONE_CACHE_SIZE as u32,
            cache: [crate::consts::NULL_CLUSTER; DZONE_CACHE_SIZE],
        }
    }

    pub const fn empty_insertion() -> Self {
        Self {
            cache_idx: 0,
            cache: [crate::consts::NULL_CLUSTER; DZONE_CACHE_SIZE],
        }
    }
}

/// Block 0 of the image, padded to exactly `BLOCK_SIZE` bytes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SuperBlock {
    pub magic: u32,
    pub version: u32,
    pub name: [u8; VOLUME_NAME_SIZE],
    pub n_total: u32,
    pub m_stat: u32,

    pub i_table_start: u32,
    pub i_table_size: u32,
    pub i_total: u32,
    pub i_free: u32,
    pub i_head: u32,
    pub i_tail: u32,

    pub d_zone_start: u32,
    pub d_zone_total: u32,
    pub d_zone_free: u32,
    pub d_zone_retriev: FreeClusterCache,
    pub d_zone_insert: FreeClusterCache,
    pub d_head: u32,
    pub d_tail: u32,

    pub _reserved: [u8; 20],
}

const _: () = assert!(std::mem::size_of::<SuperBlock>() == crate::consts::BLOCK_SIZE);

impl SuperBlock {
    pub fn volume_name(&self) -> &str {
        let nul = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..nul]).unwrap_or("")
    }

    pub fn set_volume_name(&mut self, name: &str) {
        self.name = [0u8; VOLUME_NAME_SIZE];
        let truncated = &name.as_bytes()[..name.len().min(VOLUME_NAME_SIZE - 1)];
        self.name[..truncated.len()].copy_from_slice(truncated);
    }
}
