//! Inode allocator (spec.md §4.4).

use crate::consts::*;
use crate::device::BlockDevice;
use crate::error::{Result, SofsError};
use crate::layout::inode::InodeType;
use crate::volume::Volume;

/// Pops the head of the free-inode list, stamps it in-use as `ty` owned by
/// `(uid, gid)`, and returns its number.
pub fn alloc_inode<D: BlockDevice>(
    vol: &mut Volume<D>,
    ty: InodeType,
    uid: u32,
    gid: u32,
    now: u32,
) -> Result<u32> {
    vol.load_superblock()?;
    if vol.superblock()?.i_free == 0 {
        return Err(SofsError::NoSpace);
    }

    let n = vol.superblock()?.i_head;
    vol.load_inode_block(n)?;
    if !vol.inode(n)?.is_free() {
        return Err(SofsError::BadFreeInodeShape);
    }
    let (_, next) = vol.inode(n)?.free_links();

    if next == NULL_INODE {
        vol.superblock_mut()?.i_tail = NULL_INODE;
    } else {
        // Unlinking the new head may require a different inode-table block
        // than `n`'s; the single inode-table slot is simply reloaded for
        // it, evicting `n`'s (unmodified so far) block.
        vol.load_inode_block(next)?;
        let (_, next_next) = vol.inode(next)?.free_links();
        vol.inode_mut(next)?.set_free_links(NULL_INODE, next_next);
        vol.store_inode_block()?;
    }
    vol.superblock_mut()?.i_head = next;

    vol.load_inode_block(n)?;
    {
        let inode = vol.inode_mut(n)?;
        inode.mode = ty.mode_bit();
        inode.ref_count = 0;
        inode.owner = uid;
        inode.group = gid;
        inode.size = 0;
        inode.clu_count = 0;
        inode.set_times(now, now);
        inode.clear_content_refs();
    }
    vol.store_inode_block()?;

    let sb = vol.superblock_mut()?;
    sb.i_free -= 1;
    vol.store_superblock()?;

    Ok(n)
}

/// Returns an in-use, zero-refcount inode to the free-inode list. Content
/// clusters are left untouched (dirty); `clean_inode` reclaims them lazily
/// the next time this slot is reused, per spec.md §4.4's deferred-cleanup
/// resolution.
pub fn free_inode<D: BlockDevice>(vol: &mut Volume<D>, n: u32) -> Result<()> {
    if n == 0 {
        return Err(SofsError::InvalidArgument);
    }
    vol.load_superblock()?;
    if n >= vol.superblock()?.i_total {
        return Err(SofsError::InvalidArgument);
    }
    vol.load_inode_block(n)?;
    {
        let inode = vol.inode(n)?;
        if inode.is_free() || inode.inode_type().is_none() || inode.ref_count != 0 {
            return Err(SofsError::BadInUseInodeShape);
        }
    }

    let i_tail = vol.superblock()?.i_tail;
    let was_empty = vol.superblock()?.i_free == 0;

    {
        let inode = vol.inode_mut(n)?;
        inode.mode = crate::layout::inode::MODE_FREE;
        inode.set_free_links(i_tail, NULL_INODE);
    }
    vol.store_inode_block()?;

    if was_empty {
        let sb = vol.superblock_mut()?;
        sb.i_head = n;
        sb.i_tail = n;
    } else {
        vol.load_inode_block(i_tail)?;
        let (prev, _) = vol.inode(i_tail)?.free_links();
        vol.inode_mut(i_tail)?.set_free_links(prev, n);
        vol.store_inode_block()?;
        vol.superblock_mut()?.i_tail = n;
    }

    let sb = vol.superblock_mut()?;
    sb.i_free += 1;
    vol.store_superblock()?;
    Ok(())
}

/// Reclaims a free-and-dirty inode's leftover content clusters and zeroes
/// its size/clu_count/references, leaving it free-and-clean.
pub fn clean_inode<D: BlockDevice>(vol: &mut Volume<D>, n: u32) -> Result<()> {
    vol.load_superblock()?;
    vol.load_inode_block(n)?;
    if !vol.inode(n)?.is_free() {
        return Err(SofsError::BadFreeInodeShape);
    }

    crate::walker::handle_file_clusters(vol, n, 0, crate::walker::Op::FreeAndClean)?;

    vol.load_inode_block(n)?;
    {
        let inode = vol.inode_mut(n)?;
        inode.clear_content_refs();
        inode.clu_count = 0;
        inode.size = 0;
        inode.owner = 0;
        inode.group = 0;
    }
    vol.store_inode_block()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::formatted_volume;

    #[test]
    fn alloc_free_clean_round_trip() {
        let (_file, mut vol) = formatted_volume(200, None);
        let i_free_before = vol.superblock().unwrap().i_free;

        let n = alloc_inode(&mut vol, InodeType::File, 1, 2, 42).unwrap();
        assert_ne!(n, 0, "inode 0 is reserved for the root directory");
        assert_eq!(vol.superblock().unwrap().i_free, i_free_before - 1);

        vol.load_inode_block(n).unwrap();
        {
            let inode = vol.inode_mut(n).unwrap();
            assert!(!inode.is_free());
            inode.ref_count = 0;
        }
        vol.store_inode_block().unwrap();

        free_inode(&mut vol, n).unwrap();
        assert_eq!(vol.superblock().unwrap().i_free, i_free_before);

        vol.load_inode_block(n).unwrap();
        assert!(vol.inode(n).unwrap().is_free());

        clean_inode(&mut vol, n).unwrap();
        vol.load_inode_block(n).unwrap();
        let inode = vol.inode(n).unwrap();
        assert_eq!(inode.size, 0);
        assert_eq!(inode.clu_count, 0);
        crate::checks::check_all(&mut vol).unwrap();
    }

    #[test]
    fn free_inode_zero_is_invalid_argument() {
        let (_file, mut vol) = formatted_volume(100, None);
        let err = free_inode(&mut vol, 0).unwrap_err();
        assert_eq!(err, SofsError::InvalidArgument);
    }

    #[test]
    fn free_inode_still_referenced_is_rejected() {
        let (_file, mut vol) = formatted_volume(100, None);
        let n = alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap();
        vol.load_inode_block(n).unwrap();
        vol.inode_mut(n).unwrap().ref_count = 1;
        vol.store_inode_block().unwrap();

        let err = free_inode(&mut vol, n).unwrap_err();
        assert_eq!(err, SofsError::BadInUseInodeShape);
    }

    #[test]
    fn exhausting_inodes_returns_no_space() {
        let (_file, mut vol) = formatted_volume(40, Some(8));
        loop {
            match alloc_inode(&mut vol, InodeType::File, 0, 0, 0) {
                Ok(_) => continue,
                Err(SofsError::NoSpace) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        crate::checks::check_all(&mut vol).unwrap();
    }
}
