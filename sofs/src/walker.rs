//! File-cluster indirection walker (spec.md §4.6).
//!
//! The teacher's `shared/ext2_parser` handles its own two indirection
//! levels as separate, near-duplicate functions rather than one generic
//! recursive walker; `handle_direct`/`handle_single`/`handle_double` below
//! follow that shape instead of folding all three into a single generic.

use crate::consts::*;
use crate::dalloc;
use crate::device::BlockDevice;
use crate::error::Result;
use crate::error::SofsError;
use crate::volume::{Lcn, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Read the current reference without allocating or freeing anything.
    Get,
    /// Allocate the leaf (and any missing indirection clusters on the
    /// path to it) if not already present.
    Alloc,
    /// Free the leaf if present, leaving any now-possibly-empty
    /// indirection clusters in place.
    Free,
    /// Free the leaf if present, and collapse any indirection cluster
    /// left fully empty by doing so (used by `clean_inode`).
    FreeAndClean,
}

enum Location {
    Direct(usize),
    Single(usize),
    Double { outer: usize, inner: usize },
}

fn locate(clust_ind: u32) -> Location {
    let clust_ind = clust_ind as usize;
    if clust_ind < N_DIRECT {
        Location::Direct(clust_ind)
    } else if clust_ind < N_DIRECT + RPC {
        Location::Single(clust_ind - N_DIRECT)
    } else {
        let rest = clust_ind - N_DIRECT - RPC;
        Location::Double {
            outer: rest / RPC,
            inner: rest % RPC,
        }
    }
}

/// Resolves the cluster reference for `clust_ind` within `n_inode`'s
/// content, applying `op`. Returns the resulting (for GET/ALLOC) or freed
/// (for FREE/FREE_AND_CLEAN) LCN, or `NULL_CLUSTER` when there was nothing
/// to free or nothing allocated yet to GET.
pub fn handle_file_cluster<D: BlockDevice>(
    vol: &mut Volume<D>,
    n_inode: u32,
    clust_ind: u32,
    op: Op,
) -> Result<Lcn> {
    if clust_ind as usize >= MAX_FILE_CLUSTERS {
        return Err(SofsError::InvalidArgument);
    }
    match locate(clust_ind) {
        Location::Direct(idx) => handle_direct(vol, n_inode, idx, op),
        Location::Single(idx) => handle_single(vol, n_inode, idx, op),
        Location::Double { outer, inner } => handle_double(vol, n_inode, outer, inner, op),
    }
}

/// Applies `op` to every cluster index from `from` up to the farthest one
/// ever populated (derived from the inode's current `size`), walking from
/// the farthest index down to `from`. Descending order is what lets a
/// FREE_AND_CLEAN collapse an indirection cluster as soon as its last leaf
/// is cleared, regardless of which leaf happened to be last.
pub fn handle_file_clusters<D: BlockDevice>(
    vol: &mut Volume<D>,
    n_inode: u32,
    from: u32,
    op: Op,
) -> Result<()> {
    vol.load_inode_block(n_inode)?;
    let size = vol.inode(n_inode)?.size as u64;
    if size == 0 {
        return Ok(());
    }
    let farthest = ((size - 1) / BSLPC as u64) as u32;
    if from > farthest {
        return Ok(());
    }
    let mut idx = farthest;
    loop {
        handle_file_cluster(vol, n_inode, idx, op)?;
        if idx == from {
            break;
        }
        idx -= 1;
    }
    Ok(())
}

fn handle_direct<D: BlockDevice>(vol: &mut Volume<D>, n_inode: u32, idx: usize, op: Op) -> Result<Lcn> {
    vol.load_inode_block(n_inode)?;
    let current = vol.inode(n_inode)?.d[idx];

    match op {
        Op::Get => Ok(current),
        Op::Alloc => {
            if current != NULL_CLUSTER {
                return Ok(current);
            }
            let new_lcn = dalloc::alloc_data_cluster(vol, n_inode)?;
            vol.load_inode_block(n_inode)?;
            let inode = vol.inode_mut(n_inode)?;
            inode.d[idx] = new_lcn;
            inode.clu_count += 1;
            vol.store_inode_block()?;
            Ok(new_lcn)
        }
        Op::Free | Op::FreeAndClean => {
            if current == NULL_CLUSTER {
                return Ok(NULL_CLUSTER);
            }
            dalloc::free_data_cluster(vol, current)?;
            vol.load_inode_block(n_inode)?;
            let inode = vol.inode_mut(n_inode)?;
            inode.d[idx] = NULL_CLUSTER;
            inode.clu_count -= 1;
            vol.store_inode_block()?;
            Ok(NULL_CLUSTER)
        }
    }
}

fn handle_single<D: BlockDevice>(vol: &mut Volume<D>, n_inode: u32, idx: usize, op: Op) -> Result<Lcn> {
    vol.load_inode_block(n_inode)?;
    let mut i1 = vol.inode(n_inode)?.i1;

    if i1 == NULL_CLUSTER {
        match op {
            Op::Get | Op::Free | Op::FreeAndClean => return Ok(NULL_CLUSTER),
            Op::Alloc => {
                let new_i1 = dalloc::alloc_data_cluster(vol, n_inode)?;
                vol.blank_indirect(new_i1)?;
                vol.indirect_mut()?.refs_mut().fill(NULL_CLUSTER);
                vol.store_indirect()?;
                i1 = new_i1;
                vol.load_inode_block(n_inode)?;
                let inode = vol.inode_mut(n_inode)?;
                inode.i1 = new_i1;
                inode.clu_count += 1;
                vol.store_inode_block()?;
            }
        }
    }

    vol.load_indirect(i1)?;
    let current = vol.indirect()?.refs()[idx];

    let leaf = match op {
        Op::Get => current,
        Op::Alloc => {
            if current != NULL_CLUSTER {
                current
            } else {
                let new_lcn = dalloc::alloc_data_cluster(vol, n_inode)?;
                vol.load_indirect(i1)?;
                vol.indirect_mut()?.refs_mut()[idx] = new_lcn;
                vol.store_indirect()?;
                vol.load_inode_block(n_inode)?;
                vol.inode_mut(n_inode)?.clu_count += 1;
                vol.store_inode_block()?;
                new_lcn
            }
        }
        Op::Free | Op::FreeAndClean => {
            if current == NULL_CLUSTER {
                NULL_CLUSTER
            } else {
                dalloc::free_data_cluster(vol, current)?;
                vol.load_indirect(i1)?;
                vol.indirect_mut()?.refs_mut()[idx] = NULL_CLUSTER;
                vol.store_indirect()?;
                vol.load_inode_block(n_inode)?;
                vol.inode_mut(n_inode)?.clu_count -= 1;
                vol.store_inode_block()?;
                NULL_CLUSTER
            }
        }
    };

    if op == Op::FreeAndClean {
        vol.load_indirect(i1)?;
        let empty = vol.indirect()?.refs().iter().all(|&r| r == NULL_CLUSTER);
        if empty {
            dalloc::free_data_cluster(vol, i1)?;
            vol.load_inode_block(n_inode)?;
            let inode = vol.inode_mut(n_inode)?;
            inode.i1 = NULL_CLUSTER;
            inode.clu_count -= 1;
            vol.store_inode_block()?;
        }
    }

    Ok(leaf)
}

fn handle_double<D: BlockDevice>(
    vol: &mut Volume<D>,
    n_inode: u32,
    outer: usize,
    inner: usize,
    op: Op,
) -> Result<Lcn> {
    vol.load_inode_block(n_inode)?;
    let mut i2 = vol.inode(n_inode)?.i2;

    if i2 == NULL_CLUSTER {
        match op {
            Op::Get | Op::Free | Op::FreeAndClean => return Ok(NULL_CLUSTER),
            Op::Alloc => {
                let new_i2 = dalloc::alloc_data_cluster(vol, n_inode)?;
                vol.blank_indirect(new_i2)?;
                vol.indirect_mut()?.refs_mut().fill(NULL_CLUSTER);
                vol.store_indirect()?;
                i2 = new_i2;
                vol.load_inode_block(n_inode)?;
                let inode = vol.inode_mut(n_inode)?;
                inode.i2 = new_i2;
                inode.clu_count += 1;
                vol.store_inode_block()?;
            }
        }
    }

    vol.load_indirect(i2)?;
    let mut mid = vol.indirect()?.refs()[outer];

    if mid == NULL_CLUSTER {
        match op {
            Op::Get | Op::Free | Op::FreeAndClean => return Ok(NULL_CLUSTER),
            Op::Alloc => {
                let new_mid = dalloc::alloc_data_cluster(vol, n_inode)?;
                vol.blank_indirect(new_mid)?;
                vol.indirect_mut()?.refs_mut().fill(NULL_CLUSTER);
                vol.store_indirect()?;
                vol.load_indirect(i2)?;
                vol.indirect_mut()?.refs_mut()[outer] = new_mid;
                vol.store_indirect()?;
                mid = new_mid;
                vol.load_inode_block(n_inode)?;
                vol.inode_mut(n_inode)?.clu_count += 1;
                vol.store_inode_block()?;
            }
        }
    }

    vol.load_indirect(mid)?;
    let current = vol.indirect()?.refs()[inner];

    let leaf = match op {
        Op::Get => current,
        Op::Alloc => {
            if current != NULL_CLUSTER {
                current
            } else {
                let new_lcn = dalloc::alloc_data_cluster(vol, n_inode)?;
                vol.load_indirect(mid)?;
                vol.indirect_mut()?.refs_mut()[inner] = new_lcn;
                vol.store_indirect()?;
                vol.load_inode_block(n_inode)?;
                vol.inode_mut(n_inode)?.clu_count += 1;
                vol.store_inode_block()?;
                new_lcn
            }
        }
        Op::Free | Op::FreeAndClean => {
            if current == NULL_CLUSTER {
                NULL_CLUSTER
            } else {
                dalloc::free_data_cluster(vol, current)?;
                vol.load_indirect(mid)?;
                vol.indirect_mut()?.refs_mut()[inner] = NULL_CLUSTER;
                vol.store_indirect()?;
                vol.load_inode_block(n_inode)?;
                vol.inode_mut(n_inode)?.clu_count -= 1;
                vol.store_inode_block()?;
                NULL_CLUSTER
            }
        }
    };

    if op == Op::FreeAndClean {
        vol.load_indirect(mid)?;
        let mid_empty = vol.indirect()?.refs().iter().all(|&r| r == NULL_CLUSTER);
        if mid_empty {
            dalloc::free_data_cluster(vol, mid)?;
            vol.load_indirect(i2)?;
            vol.indirect_mut()?.refs_mut()[outer] = NULL_CLUSTER;
            vol.store_indirect()?;
            vol.load_inode_block(n_inode)?;
            let inode = vol.inode_mut(n_inode)?;
            inode.clu_count -= 1;
            vol.store_inode_block()?;

            vol.load_indirect(i2)?;
            let i2_empty = vol.indirect()?.refs().iter().all(|&r| r == NULL_CLUSTER);
            if i2_empty {
                dalloc::free_data_cluster(vol, i2)?;
                vol.load_inode_block(n_inode)?;
                let inode = vol.inode_mut(n_inode)?;
                inode.i2 = NULL_CLUSTER;
                inode.clu_count -= 1;
                vol.store_inode_block()?;
            }
        }
    }

    Ok(leaf)
}
