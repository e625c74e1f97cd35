//! Access check (spec.md §4.8).

use crate::device::BlockDevice;
use crate::error::{Result, SofsError};
use crate::volume::Volume;

pub const R: u8 = 0o4;
pub const W: u8 = 0o2;
pub const X: u8 = 0o1;

/// Classical nine-bit owner/group/other check with the root bypass: uid 0
/// is always granted `R`/`W`; `X` still requires at least one executable
/// bit to be set anywhere in the mode (spec.md §4.8, §1 "identity model").
pub fn access_granted<D: BlockDevice>(
    vol: &mut Volume<D>,
    n_inode: u32,
    uid: u32,
    gid: u32,
    mask: u8,
) -> Result<()> {
    if mask == 0 || mask & !(R | W | X) != 0 {
        return Err(SofsError::InvalidArgument);
    }
    vol.load_inode_block(n_inode)?;
    let inode = vol.inode(n_inode)?;
    if inode.is_free() || inode.inode_type().is_none() {
        return Err(SofsError::BadInUseInodeShape);
    }
    let perms = inode.permissions();

    if uid == 0 {
        let any_x = perms & 0o111 != 0;
        if mask & X != 0 && !any_x {
            return Err(SofsError::PermissionDenied);
        }
        return Ok(());
    }

    let triad = if inode.owner == uid {
        (perms >> 6) & 0o7
    } else if inode.group == gid {
        (perms >> 3) & 0o7
    } else {
        perms & 0o7
    };

    if (mask as u16) & !triad != 0 {
        return Err(SofsError::PermissionDenied);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ialloc::alloc_inode;
    use crate::layout::inode::InodeType;
    use crate::test_support::formatted_volume;

    fn setup(mode_perm: u16, owner: u32, group: u32) -> (tempfile::NamedTempFile, Volume<crate::device::FileBackend>, u32) {
        let (file, mut vol) = formatted_volume(100, None);
        let n = alloc_inode(&mut vol, InodeType::File, owner, group, 0).unwrap();
        vol.load_inode_block(n).unwrap();
        vol.inode_mut(n).unwrap().mode =
            crate::layout::inode::MODE_FILE | (mode_perm & crate::layout::inode::PERM_MASK);
        vol.store_inode_block().unwrap();
        (file, vol, n)
    }

    #[test]
    fn owner_group_other_triads() {
        // mode 0o640, owner=10/group=20.
        let (_file, mut vol, n) = setup(0o640, 10, 20);

        access_granted(&mut vol, n, 10, 20, R).unwrap();
        access_granted(&mut vol, n, 10, 20, W).unwrap();
        assert_eq!(access_granted(&mut vol, n, 10, 20, X).unwrap_err(), SofsError::PermissionDenied);

        access_granted(&mut vol, n, 99, 20, R).unwrap();
        assert_eq!(access_granted(&mut vol, n, 99, 20, W).unwrap_err(), SofsError::PermissionDenied);

        assert_eq!(access_granted(&mut vol, n, 99, 99, R).unwrap_err(), SofsError::PermissionDenied);
        assert_eq!(access_granted(&mut vol, n, 99, 99, W).unwrap_err(), SofsError::PermissionDenied);
        assert_eq!(access_granted(&mut vol, n, 99, 99, X).unwrap_err(), SofsError::PermissionDenied);
    }

    #[test]
    fn root_bypasses_rw_but_not_x_without_any_exec_bit() {
        let (_file, mut vol, n) = setup(0o640, 10, 20);
        access_granted(&mut vol, n, 0, 0, R).unwrap();
        access_granted(&mut vol, n, 0, 0, W).unwrap();
        assert_eq!(access_granted(&mut vol, n, 0, 0, X).unwrap_err(), SofsError::PermissionDenied);
    }

    #[test]
    fn root_gets_x_if_any_triad_has_it() {
        let (_file, mut vol, n) = setup(0o641, 10, 20);
        access_granted(&mut vol, n, 0, 0, X).unwrap();
    }
}
