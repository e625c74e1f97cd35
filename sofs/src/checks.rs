//! Consistency checkers (spec.md §4.7). Each function is a "quick check":
//! cheap enough to run after every mutating operation, not an exhaustive
//! scrub of the whole volume.

use crate::consts::*;
use crate::device::BlockDevice;
use crate::error::{Result, SofsError};
use crate::layout::inode::InodeType;
use crate::layout::Inode;
use crate::layout::DirEntry;
use crate::layout::dirent::EntryState;
use crate::volume::Volume;

/// Runs the superblock, inode-table and data-zone checks, in that order.
/// Grounded on spec.md §4.7's "after any alloc or free, the checker must
/// pass" invariant — callers run this after a mutating call completes.
pub fn check_all<D: BlockDevice>(vol: &mut Volume<D>) -> Result<()> {
    check_superblock_header(vol)?;
    check_inode_table_metadata(vol)?;
    check_datazone_metadata(vol)?;
    Ok(())
}

pub fn check_superblock_header<D: BlockDevice>(vol: &mut Volume<D>) -> Result<()> {
    vol.load_superblock()?;
    let sb = vol.superblock()?;
    if sb.magic != MAGIC_NUMBER || sb.version != VERSION_NUMBER {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.name.iter().position(|&b| b == 0).is_none() {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.m_stat != MSTAT_PRU && sb.m_stat != MSTAT_NPRU {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.i_table_start != 1 {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.d_zone_start != 1 + sb.i_table_size {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.n_total != 1 + sb.i_table_size + sb.d_zone_total * BLOCKS_PER_CLUSTER as u32 {
        return Err(SofsError::BadSuperblockHeader);
    }
    if sb.i_total != sb.i_table_size * IPB as u32 {
        return Err(SofsError::BadSuperblockHeader);
    }
    Ok(())
}

/// Walks the inode free list, checking its length against `iFree` and the
/// shape of every free inode it visits (I2/I3).
pub fn check_inode_table_metadata<D: BlockDevice>(vol: &mut Volume<D>) -> Result<()> {
    vol.load_superblock()?;
    let (i_free, i_head, i_tail, i_total) = {
        let sb = vol.superblock()?;
        (sb.i_free, sb.i_head, sb.i_tail, sb.i_total)
    };

    if i_free == 0 {
        if i_head != NULL_INODE || i_tail != NULL_INODE {
            return Err(SofsError::BadInodeFreeList);
        }
        return Ok(());
    }

    let mut count = 0u32;
    let mut cur = i_head;
    let mut prev_expected = NULL_INODE;
    loop {
        if cur == NULL_INODE || cur >= i_total {
            return Err(SofsError::BadInodeFreeList);
        }
        vol.load_inode_block(cur)?;
        let inode = *vol.inode(cur)?;
        check_free_inode_shape(&inode)?;
        let (prev, next) = inode.free_links();
        if prev != prev_expected {
            return Err(SofsError::BadInodeFreeList);
        }
        count += 1;
        if count > i_total {
            return Err(SofsError::BadInodeFreeList);
        }
        if next == NULL_INODE {
            if cur != i_tail {
                return Err(SofsError::BadInodeFreeList);
            }
            break;
        }
        prev_expected = cur;
        cur = next;
    }

    if count != i_free {
        return Err(SofsError::BadInodeTableMetadata);
    }
    Ok(())
}

/// A free inode, clean or dirty (spec.md §4.7 "Free inode (clean/dirty)").
pub fn check_free_inode_shape(inode: &Inode) -> Result<()> {
    if !inode.is_free() {
        return Err(SofsError::BadFreeInodeShape);
    }
    if inode.type_bits() != 0 || inode.permissions() != 0 || inode.ref_count != 0 {
        return Err(SofsError::BadFreeInodeShape);
    }
    let dirty = inode.clu_count != 0 || inode.content_refs().any(|r| r != NULL_CLUSTER);
    if !dirty && (inode.owner != 0 || inode.group != 0 || inode.size != 0) {
        return Err(SofsError::BadFreeInodeShape);
    }
    Ok(())
}

/// An in-use inode: legal type, sane refcount floor, and every referenced
/// cluster structurally allocated and owned by this inode (I7).
pub fn check_inuse_inode_shape<D: BlockDevice>(vol: &mut Volume<D>, n: u32) -> Result<()> {
    vol.load_inode_block(n)?;
    let inode = *vol.inode(n)?;
    if inode.is_free() {
        return Err(SofsError::BadInUseInodeShape);
    }
    let ty = inode.inode_type().ok_or(SofsError::BadInUseInodeShape)?;
    let min_refs = if ty == InodeType::Dir { 2 } else { 1 };
    if inode.ref_count < min_refs {
        return Err(SofsError::BadInUseInodeShape);
    }
    for r in inode.content_refs() {
        if r == NULL_CLUSTER {
            continue;
        }
        vol.load_leaf(r)?;
        let header = vol.leaf()?.header;
        if header.prev != NULL_CLUSTER || header.next != NULL_CLUSTER {
            return Err(SofsError::BadInodeClusterRefs);
        }
        if header.stat != n {
            return Err(SofsError::ClusterStatMismatch);
        }
    }
    Ok(())
}

/// Walks the backbone from `dHead`, checking its length against the
/// portion of `dZoneFree` it accounts for (I4) and cross-checking the two
/// in-superblock caches for overlap (I6).
pub fn check_datazone_metadata<D: BlockDevice>(vol: &mut Volume<D>) -> Result<()> {
    vol.load_superblock()?;
    let (d_free, d_head, d_tail, d_total, retriev, insert) = {
        let sb = vol.superblock()?;
        (
            sb.d_zone_free,
            sb.d_head,
            sb.d_tail,
            sb.d_zone_total,
            sb.d_zone_retriev,
            sb.d_zone_insert,
        )
    };

    let retriev_len = DZONE_CACHE_SIZE as u32 - retriev.cache_idx;
    let insert_len = insert.cache_idx;

    let mut backbone_len = 0u32;
    if d_head != NULL_CLUSTER {
        let mut cur = d_head;
        let mut prev_expected = NULL_CLUSTER;
        loop {
            if cur >= d_total {
                return Err(SofsError::BadFreeClusterBackbone);
            }
            vol.load_leaf(cur)?;
            let header = vol.leaf()?.header;
            if header.stat != NULL_INODE {
                return Err(SofsError::BadFreeClusterBackbone);
            }
            if header.prev != prev_expected {
                return Err(SofsError::BadFreeClusterBackbone);
            }
            backbone_len += 1;
            if backbone_len > d_total {
                return Err(SofsError::BadFreeClusterBackbone);
            }
            if header.next == NULL_CLUSTER {
                if cur != d_tail {
                    return Err(SofsError::BadFreeClusterBackbone);
                }
                break;
            }
            prev_expected = cur;
            cur = header.next;
        }
    } else if d_tail != NULL_CLUSTER {
        return Err(SofsError::BadFreeClusterBackbone);
    }

    if retriev_len + insert_len + backbone_len != d_free {
        return Err(SofsError::BadDataZoneMetadata);
    }

    for &r in &retriev.cache[retriev.cache_idx as usize..] {
        if insert.cache[..insert.cache_idx as usize].contains(&r) {
            return Err(SofsError::BadFreeClusterCaches);
        }
    }
    Ok(())
}

/// Directory contents: `.`/`..` present at slots 0/1 of the first cluster,
/// and every in-use entry has a legal name and a non-null inode number
/// (spec.md §4.7 "Directory contents").
pub fn check_directory_contents<D: BlockDevice>(vol: &mut Volume<D>, n: u32) -> Result<()> {
    vol.load_inode_block(n)?;
    let inode = *vol.inode(n)?;
    if !inode.is_dir() {
        return Err(SofsError::NotADirectory);
    }
    let size = inode.size as u64;
    let total_clusters = ((size + BSLPC as u64 - 1) / BSLPC as u64) as u32;

    for clust_ind in 0..total_clusters {
        let lcn = crate::walker::handle_file_cluster(vol, n, clust_ind, crate::walker::Op::Get)?;
        if lcn == NULL_CLUSTER {
            continue;
        }
        vol.load_leaf(lcn)?;
        let dirents: Vec<DirEntry> = vol.leaf()?.dirents().to_vec();
        for (i, e) in dirents.iter().enumerate() {
            match e.state() {
                EntryState::Clean | EntryState::DeletedButNamed => {}
                EntryState::InUse => {
                    if clust_ind == 0 && i == 0 && e.name() != "." {
                        return Err(SofsError::BadDirectoryContents);
                    }
                    if clust_ind == 0 && i == 1 && e.name() != ".." {
                        return Err(SofsError::BadDirectoryContents);
                    }
                    if e.name().is_empty() || e.name().len() > MAX_NAME || e.name().contains('/') {
                        return Err(SofsError::BadDirectoryEntry);
                    }
                    if e.n_inode == NULL_INODE {
                        return Err(SofsError::BadDirectoryEntry);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dalloc::{alloc_data_cluster, free_data_cluster};
    use crate::ialloc::{alloc_inode, free_inode};
    use crate::test_support::formatted_volume;

    #[test]
    fn freshly_formatted_volume_passes_all_checks() {
        let (_file, mut vol) = formatted_volume(200, None);
        check_all(&mut vol).unwrap();
        check_directory_contents(&mut vol, 0).unwrap();
    }

    #[test]
    fn corrupted_magic_fails_superblock_check() {
        let (_file, mut vol) = formatted_volume(100, None);
        vol.load_superblock().unwrap();
        vol.superblock_mut().unwrap().magic = 0xDEAD;
        vol.store_superblock().unwrap();
        let err = check_superblock_header(&mut vol).unwrap_err();
        assert_eq!(err, SofsError::BadSuperblockHeader);
    }

    #[test]
    fn inode_table_metadata_survives_alloc_and_free_cycles() {
        let (_file, mut vol) = formatted_volume(100, None);
        let mut allocated = Vec::new();
        for _ in 0..5 {
            allocated.push(alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap());
        }
        check_inode_table_metadata(&mut vol).unwrap();
        for n in allocated {
            vol.load_inode_block(n).unwrap();
            vol.inode_mut(n).unwrap().ref_count = 0;
            vol.store_inode_block().unwrap();
            free_inode(&mut vol, n).unwrap();
        }
        check_inode_table_metadata(&mut vol).unwrap();
    }

    #[test]
    fn datazone_metadata_survives_alloc_and_free_cycles() {
        let (_file, mut vol) = formatted_volume(200, None);
        let mut allocated = Vec::new();
        for _ in 0..5 {
            allocated.push(alloc_data_cluster(&mut vol, 1).unwrap());
        }
        check_datazone_metadata(&mut vol).unwrap();
        for lcn in allocated {
            free_data_cluster(&mut vol, lcn).unwrap();
        }
        check_datazone_metadata(&mut vol).unwrap();
    }

    #[test]
    fn inuse_inode_with_mismatched_cluster_stat_is_rejected() {
        let (_file, mut vol) = formatted_volume(100, None);
        let n = alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap();
        let lcn = crate::walker::handle_file_cluster(&mut vol, n, 0, crate::walker::Op::Alloc).unwrap();
        vol.load_leaf(lcn).unwrap();
        vol.leaf_mut().unwrap().header.stat = n + 1;
        vol.store_leaf().unwrap();
        let err = check_inuse_inode_shape(&mut vol, n).unwrap_err();
        assert_eq!(err, SofsError::ClusterStatMismatch);
    }

    #[test]
    fn root_directory_has_dot_and_dotdot_at_slots_zero_and_one() {
        let (_file, mut vol) = formatted_volume(100, None);
        vol.load_inode_block(0).unwrap();
        let lcn = crate::walker::handle_file_cluster(&mut vol, 0, 0, crate::walker::Op::Get).unwrap();
        vol.load_leaf(lcn).unwrap();
        let dirents = vol.leaf().unwrap().dirents();
        assert_eq!(dirents[0].name(), ".");
        assert_eq!(dirents[1].name(), "..");
        check_directory_contents(&mut vol, 0).unwrap();
    }
}
