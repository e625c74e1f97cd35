use bytemuck::{Pod, Zeroable};

use crate::consts::{BSLPC, CLUSTER_HEADER_SIZE, RPC};

/// The `{prev, next, stat}` header present at the start of every cluster
/// (spec.md §3 "Data cluster" / §6 "Cluster layout").
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ClusterHeader {
    pub prev: u32,
    pub next: u32,
    pub stat: u32,
}

const _: () = assert!(std::mem::size_of::<ClusterHeader>() == CLUSTER_HEADER_SIZE);

/// A whole cluster: header plus `BSLPC` bytes of body, the body
/// reinterpreted per use as raw bytes, directory entries, or an array of
/// cluster references. All three views share the same underlying bytes
/// (spec.md "Union-typed cluster body" design note).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Cluster {
    pub header: ClusterHeader,
    pub body: [u8; BSLPC],
}

const _: () = assert!(std::mem::size_of::<Cluster>() == crate::consts::CLUSTER_SIZE);

impl Cluster {
    pub fn zeroed_with_header(header: ClusterHeader) -> Self {
        let mut c = Cluster::zeroed();
        c.header = header;
        c
    }

    /// View the body as an array of `RPC` cluster references (an
    /// indirection cluster).
    pub fn refs(&self) -> &[u32; RPC] {
        bytemuck::from_bytes(&self.body[..RPC * 4])
    }

    pub fn refs_mut(&mut self) -> &mut [u32; RPC] {
        bytemuck::from_bytes_mut(&mut self.body[..RPC * 4])
    }

    /// View the body as an array of directory entries.
    pub fn dirents(&self) -> &[super::DirEntry] {
        bytemuck::cast_slice(&self.body[..super::dirent::DPC_BYTES])
    }

    pub fn dirents_mut(&mut self) -> &mut [super::DirEntry] {
        bytemuck::cast_slice_mut(&mut self.body[..super::dirent::DPC_BYTES])
    }
}
