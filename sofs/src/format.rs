//! Formatter (spec.md §4.3 / `mkfs`).

use std::path::Path;

use bytemuck::Zeroable;
use log::info;

use crate::consts::*;
use crate::device::{BlockDevice, FileBackend};
use crate::error::{Result, SofsError};
use crate::layout::superblock::FreeClusterCache;
use crate::layout::{ClusterHeader, DirEntry, Inode};
use crate::volume::Volume;

/// User-controllable knobs, mirroring `mkfs`'s `-n`/`-i`/`-z` flags.
pub struct FormatOptions {
    pub volume_name: String,
    /// `None` defaults to `nTotal / 8`.
    pub inode_count: Option<u32>,
    /// Zero every free-zone cluster's body, not just its header.
    pub zero_mode: bool,
}

/// Lays out a fresh SOFS volume on `path`, an existing file whose length
/// must already be a positive multiple of `BLOCK_SIZE`. Follows spec.md
/// §4.3's eight steps: skeleton superblock under a sentinel magic, root
/// inode, the rest of the inode table free, the root directory cluster,
/// the free-cluster backbone, commit the real magic, then a full
/// consistency check.
pub fn format_volume(
    path: &Path,
    opts: &FormatOptions,
    uid: u32,
    gid: u32,
    now: u32,
) -> Result<()> {
    let byte_len = std::fs::metadata(path)
        .map_err(|_| SofsError::DeviceNotOpen)?
        .len();
    if byte_len == 0 || byte_len % BLOCK_SIZE as u64 != 0 {
        return Err(SofsError::InvalidArgument);
    }
    let n_total = (byte_len / BLOCK_SIZE as u64) as u32;

    let itotal_requested = opts.inode_count.unwrap_or(n_total / 8).max(1);
    let i_blk_total_initial = ((itotal_requested as u64 + IPB as u64 - 1) / IPB as u64) as u32;
    if i_blk_total_initial + 1 >= n_total {
        return Err(SofsError::InvalidArgument);
    }
    let n_clust_total = (n_total - 1 - i_blk_total_initial) / BLOCKS_PER_CLUSTER as u32;
    if n_clust_total < 1 {
        return Err(SofsError::InvalidArgument);
    }
    let i_blk_total = n_total - 1 - n_clust_total * BLOCKS_PER_CLUSTER as u32;
    if i_blk_total == 0 {
        return Err(SofsError::InvalidArgument);
    }
    let i_total = i_blk_total * IPB as u32;

    info!(
        "formatting: nTotal={n_total} iBlkTotal={i_blk_total} iTotal={i_total} nClustTotal={n_clust_total}"
    );

    let device = FileBackend::open(path)?;
    let mut vol = Volume::new(device);

    // Step 1/2: skeleton superblock, magic intentionally wrong until the
    // whole layout below has been committed.
    vol.blank_superblock()?;
    {
        let sb = vol.superblock_mut()?;
        sb.magic = FORMAT_IN_PROGRESS_MAGIC;
        sb.version = VERSION_NUMBER;
        sb.set_volume_name(&opts.volume_name);
        sb.n_total = n_total;
        sb.m_stat = MSTAT_PRU;
        sb.i_table_start = 1;
        sb.i_table_size = i_blk_total;
        sb.i_total = i_total;
        sb.i_free = i_total - 1;
        sb.i_head = if i_total > 1 { 1 } else { NULL_INODE };
        sb.i_tail = if i_total > 1 { i_total - 1 } else { NULL_INODE };
        sb.d_zone_start = 1 + i_blk_total;
        sb.d_zone_total = n_clust_total;
        sb.d_zone_free = n_clust_total - 1;
        sb.d_zone_retriev = FreeClusterCache::empty_retrieval();
        sb.d_zone_insert = FreeClusterCache::empty_insertion();
        sb.d_head = if n_clust_total > 1 { 1 } else { NULL_CLUSTER };
        sb.d_tail = if n_clust_total > 1 { n_clust_total - 1 } else { NULL_CLUSTER };
    }
    vol.store_superblock()?;

    // Step 3: inode table. Inode 0 is the root directory; every other
    // inode, across every block of the table, starts free and linked.
    for block_index in 0..i_blk_total {
        vol.blank_inode_block(block_index)?;
        for off in 0..IPB as u32 {
            let n = block_index * IPB as u32 + off;
            if n >= i_total {
                break;
            }
            if n == 0 {
                let inode = vol.inode_mut(0)?;
                *inode = Inode::zeroed();
                inode.mode = MODE_DIR_BITS;
                inode.ref_count = 2;
                inode.owner = uid;
                inode.group = gid;
                inode.size = (DPC * DIRENT_SIZE) as u32;
                inode.clu_count = 1;
                inode.set_times(now, now);
                inode.clear_content_refs();
                inode.d[0] = 0;
                continue;
            }
            let inode = vol.inode_mut(n)?;
            inode.reset_free_clean();
            let prev = if n == 1 { NULL_INODE } else { n - 1 };
            let next = if n == i_total - 1 { NULL_INODE } else { n + 1 };
            inode.set_free_links(prev, next);
        }
        vol.store_inode_block()?;
    }

    // Step 4: LCN 0 is the root directory's sole cluster, holding `.` and
    // `..`, both pointing at inode 0.
    vol.blank_leaf(0)?;
    {
        let cluster = vol.leaf_mut()?;
        cluster.header = ClusterHeader {
            prev: NULL_CLUSTER,
            next: NULL_CLUSTER,
            stat: 0,
        };
        let dirents = cluster.dirents_mut();
        for e in dirents.iter_mut() {
            *e = DirEntry::clean();
        }
        dirents[0] = DirEntry::new(".", 0);
        dirents[1] = DirEntry::new("..", 0);
    }
    vol.store_leaf()?;

    // Step 5: the rest of the data zone forms the initial free-cluster
    // backbone, LCN 1 .. nClustTotal - 1.
    for lcn in 1..n_clust_total {
        vol.blank_leaf(lcn)?;
        let prev = if lcn == 1 { NULL_CLUSTER } else { lcn - 1 };
        let next = if lcn == n_clust_total - 1 { NULL_CLUSTER } else { lcn + 1 };
        let cluster = vol.leaf_mut()?;
        cluster.header = ClusterHeader {
            prev,
            next,
            stat: NULL_INODE,
        };
        if opts.zero_mode {
            cluster.body = [0u8; BSLPC];
        }
        vol.store_leaf()?;
    }

    // Step 6: commit the real magic now that the layout is fully written.
    vol.load_superblock()?;
    vol.superblock_mut()?.magic = MAGIC_NUMBER;
    vol.store_superblock()?;

    // Step 7: the volume must pass its own consistency checks before
    // formatting is considered to have succeeded.
    crate::checks::check_all(&mut vol)?;

    vol.device.close()?;
    Ok(())
}

const MODE_DIR_BITS: u16 = crate::layout::inode::MODE_DIR | 0o777;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::formatted_volume;

    #[test]
    fn formats_small_volume_and_passes_checks() {
        let (_file, mut vol) = formatted_volume(100, None);
        crate::checks::check_all(&mut vol).unwrap();

        vol.load_inode_block(0).unwrap();
        let root = *vol.inode(0).unwrap();
        assert!(root.is_dir());
        assert_eq!(root.ref_count, 2);
        assert_eq!(root.d[0], 0);

        vol.load_leaf(0).unwrap();
        let dirents = vol.leaf().unwrap().dirents();
        assert_eq!(dirents[0].name(), ".");
        assert_eq!(dirents[0].n_inode, 0);
        assert_eq!(dirents[1].name(), "..");
        assert_eq!(dirents[1].n_inode, 0);
    }

    #[test]
    fn rejects_file_not_a_multiple_of_block_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(&[0u8; 100]).unwrap();
        file.flush().unwrap();

        let opts = FormatOptions {
            volume_name: "X".to_string(),
            inode_count: None,
            zero_mode: false,
        };
        let err = format_volume(file.path(), &opts, 0, 0, 0).unwrap_err();
        assert_eq!(err, SofsError::InvalidArgument);
    }

    #[test]
    fn zero_mode_clears_free_cluster_bodies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(&vec![0xAAu8; 100 * BLOCK_SIZE]).unwrap();
        file.flush().unwrap();

        let opts = FormatOptions {
            volume_name: "Z".to_string(),
            inode_count: None,
            zero_mode: true,
        };
        format_volume(file.path(), &opts, 0, 0, 0).unwrap();

        let device = FileBackend::open(file.path()).unwrap();
        let mut vol = Volume::new(device);
        vol.load_leaf(1).unwrap();
        assert!(vol.leaf().unwrap().body.iter().all(|&b| b == 0));
    }
}
