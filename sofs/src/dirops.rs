//! Directory-entry remove/detach (spec.md §4.9).

use crate::access;
use crate::consts::*;
use crate::device::BlockDevice;
use crate::error::{Result, SofsError};
use crate::ialloc;
use crate::layout::dirent::EntryState;
use crate::volume::Volume;
use crate::walker::{self, Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOp {
    /// Tombstone the entry (swap first/last name byte), drop one link from
    /// the target, and reclaim it once its refcount hits zero.
    Rem,
    /// Blank the entry outright without touching the target's refcount or
    /// content (used when re-parenting an entry rather than deleting it).
    Detach,
}

/// Finds `name` among `dir_inode`'s entries. Returns the target inode
/// number and the entry's `(clustInd, slot index within that cluster)`.
pub fn lookup_entry<D: BlockDevice>(
    vol: &mut Volume<D>,
    dir_inode: u32,
    name: &str,
) -> Result<(u32, u32, usize)> {
    vol.load_inode_block(dir_inode)?;
    let size = vol.inode(dir_inode)?.size as u64;
    let total_clusters = ((size + BSLPC as u64 - 1) / BSLPC as u64) as u32;

    for clust_ind in 0..total_clusters {
        let lcn = walker::handle_file_cluster(vol, dir_inode, clust_ind, Op::Get)?;
        if lcn == NULL_CLUSTER {
            continue;
        }
        vol.load_leaf(lcn)?;
        let dirents = vol.leaf()?.dirents();
        for (i, entry) in dirents.iter().enumerate() {
            if entry.state() == EntryState::InUse && entry.name() == name {
                return Ok((entry.n_inode, clust_ind, i));
            }
        }
    }
    Err(SofsError::NoSuchEntry)
}

/// Removes or detaches `name` from `dir_inode`. `REM` requires the caller
/// to hold `W` and `X` on the directory, tombstones the entry, drops a
/// link from the target (two for a subdirectory, to also account for its
/// own `..`), refuses a non-empty directory, and reclaims the target
/// inode once its refcount reaches zero. `DETACH` only blanks the slot.
pub fn remove_or_detach<D: BlockDevice>(
    vol: &mut Volume<D>,
    dir_inode: u32,
    name: &str,
    op: RemoveOp,
    uid: u32,
    gid: u32,
) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME || name.contains('/') {
        return Err(SofsError::InvalidArgument);
    }
    if name == "." || name == ".." {
        return Err(SofsError::InvalidArgument);
    }

    vol.load_inode_block(dir_inode)?;
    {
        let dir = vol.inode(dir_inode)?;
        if dir.is_free() || !dir.is_dir() {
            return Err(SofsError::NotADirectory);
        }
    }
    access::access_granted(vol, dir_inode, uid, gid, access::W | access::X)?;

    let (entry_inode, clust_ind, slot_idx) = lookup_entry(vol, dir_inode, name)?;

    vol.load_inode_block(entry_inode)?;
    let entry_is_dir = vol.inode(entry_inode)?.is_dir();

    if op == RemoveOp::Rem && entry_is_dir {
        require_empty(vol, entry_inode)?;
    }

    let lcn = walker::handle_file_cluster(vol, dir_inode, clust_ind, Op::Get)?;
    vol.load_leaf(lcn)?;
    {
        let entry = &mut vol.leaf_mut()?.dirents_mut()[slot_idx];
        match op {
            RemoveOp::Rem => entry.tombstone(),
            RemoveOp::Detach => entry.detach(),
        }
    }
    vol.store_leaf()?;

    if op == RemoveOp::Detach {
        return Ok(());
    }

    if entry_is_dir {
        vol.load_inode_block(dir_inode)?;
        vol.inode_mut(dir_inode)?.ref_count -= 1;
        vol.store_inode_block()?;
    }

    vol.load_inode_block(entry_inode)?;
    let ref_count_now = {
        let inode = vol.inode_mut(entry_inode)?;
        inode.ref_count -= 1;
        inode.ref_count
    };
    vol.store_inode_block()?;

    if ref_count_now == 0 {
        walker::handle_file_clusters(vol, entry_inode, 0, Op::Free)?;
        ialloc::free_inode(vol, entry_inode)?;
    }
    Ok(())
}


fn require_empty<D: BlockDevice>(vol: &mut Volume<D>, dir_inode: u32) -> Result<()> {
    vol.load_inode_block(dir_inode)?;
    let size = vol.inode(dir_inode)?.size as u64;
    let total_clusters = ((size + BSLPC as u64 - 1) / BSLPC as u64) as u32;

    for ci in 0..total_clusters {
        let lcn = walker::handle_file_cluster(vol, dir_inode, ci, Op::Get)?;
        if lcn == NULL_CLUSTER {
            continue;
        }
        vol.load_leaf(lcn)?;
        for (i, e) in vol.leaf()?.dirents().iter().enumerate() {
            let is_dot = ci == 0 && (i == 0 || i == 1);
            if !is_dot && e.state() == EntryState::InUse {
                return Err(SofsError::DirectoryNotEmpty);
            }
        }
    }
    Ok(())
}
