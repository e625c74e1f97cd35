//! Property tests for the invariants spec.md §8 lists as P1-P7.

use proptest::prelude::*;
use sofs::access::{access_granted, R, W, X};
use sofs::checks::{check_all, check_inode_table_metadata, check_datazone_metadata};
use sofs::consts::{BLOCK_SIZE, NULL_CLUSTER};
use sofs::dalloc::{alloc_data_cluster, free_data_cluster};
use sofs::dirops::{remove_or_detach, RemoveOp};
use sofs::error::SofsError;
use sofs::format::{format_volume, FormatOptions};
use sofs::ialloc::{alloc_inode, free_inode};
use sofs::layout::inode::InodeType;
use sofs::walker::{handle_file_cluster, Op};
use sofs::{FileBackend, Volume};
use std::io::Write as _;

fn volume(blocks: u32) -> (tempfile::NamedTempFile, Volume<FileBackend>) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0u8; blocks as usize * BLOCK_SIZE]).unwrap();
    file.flush().unwrap();
    let opts = FormatOptions {
        volume_name: "PROP".to_string(),
        inode_count: None,
        zero_mode: false,
    };
    format_volume(file.path(), &opts, 0, 0, 1_700_000_000).unwrap();
    let device = FileBackend::open(file.path()).unwrap();
    (file, Volume::new(device))
}

#[derive(Debug, Clone, Copy)]
enum InodeOp {
    Alloc,
    Free,
}

proptest! {
    /// P1: any freshly formatted volume passes every consistency check.
    #[test]
    fn p1_format_then_check(blocks in 16u32..400, inode_count in prop::option::of(4u32..64)) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; blocks as usize * BLOCK_SIZE]).unwrap();
        file.flush().unwrap();
        let opts = FormatOptions { volume_name: "PROP".to_string(), inode_count, zero_mode: false };
        if format_volume(file.path(), &opts, 0, 0, 1_700_000_000).is_ok() {
            let device = FileBackend::open(file.path()).unwrap();
            let mut vol = Volume::new(device);
            check_all(&mut vol).unwrap();
        }
    }

    /// P2: after any sequence of alloc/free, `iFree` and the free-list
    /// length agree, and the list is acyclic from `iHead` to `iTail`.
    #[test]
    fn p2_inode_free_list_stays_consistent(ops in prop::collection::vec(prop::sample::select(&[InodeOp::Alloc, InodeOp::Free][..]), 1..60)) {
        let (_file, mut vol) = volume(300);
        let mut live = Vec::new();
        for op in ops {
            match op {
                InodeOp::Alloc => {
                    if let Ok(n) = alloc_inode(&mut vol, InodeType::File, 0, 0, 0) {
                        vol.load_inode_block(n).unwrap();
                        vol.inode_mut(n).unwrap().ref_count = 1;
                        vol.store_inode_block().unwrap();
                        live.push(n);
                    }
                }
                InodeOp::Free => {
                    if let Some(n) = live.pop() {
                        vol.load_inode_block(n).unwrap();
                        vol.inode_mut(n).unwrap().ref_count = 0;
                        vol.store_inode_block().unwrap();
                        free_inode(&mut vol, n).unwrap();
                    }
                }
            }
        }
        check_inode_table_metadata(&mut vol).unwrap();
    }

    /// P3: after any sequence of alloc/free, `dZoneFree` equals the sum of
    /// the two cache lengths and the backbone length, with no overlap.
    #[test]
    fn p3_data_zone_caches_stay_consistent(ops in prop::collection::vec(prop::sample::select(&[InodeOp::Alloc, InodeOp::Free][..]), 1..200)) {
        let (_file, mut vol) = volume(1500);
        let mut live = Vec::new();
        for op in ops {
            match op {
                InodeOp::Alloc => {
                    if let Ok(lcn) = alloc_data_cluster(&mut vol, 1) {
                        live.push(lcn);
                    }
                }
                InodeOp::Free => {
                    if let Some(lcn) = live.pop() {
                        free_data_cluster(&mut vol, lcn).unwrap();
                    }
                }
            }
        }
        check_datazone_metadata(&mut vol).unwrap();
    }

    /// P4: alloc immediately followed by free restores `iFree`/`dZoneFree`.
    #[test]
    fn p4_alloc_then_free_is_a_no_op_on_totals(reps in 1usize..40) {
        let (_file, mut vol) = volume(400);
        let i_free_before = vol.superblock().unwrap().i_free;
        let d_free_before = vol.superblock().unwrap().d_zone_free;
        for _ in 0..reps {
            let n = alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap();
            vol.load_inode_block(n).unwrap();
            vol.inode_mut(n).unwrap().ref_count = 0;
            vol.store_inode_block().unwrap();
            free_inode(&mut vol, n).unwrap();

            let lcn = alloc_data_cluster(&mut vol, 1).unwrap();
            free_data_cluster(&mut vol, lcn).unwrap();
        }
        prop_assert_eq!(vol.superblock().unwrap().i_free, i_free_before);
        prop_assert_eq!(vol.superblock().unwrap().d_zone_free, d_free_before);
    }

    /// P5: handleFileCluster(ALLOC) then handleFileCluster(FREE) restores
    /// `cluCount` and clears the slot.
    #[test]
    fn p5_alloc_then_free_file_cluster_restores_clu_count(clust_ind in 0u32..2500) {
        let (_file, mut vol) = volume(2000);
        let n = alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap();
        vol.load_inode_block(n).unwrap();
        let clu_count_before = vol.inode(n).unwrap().clu_count;

        let lcn = handle_file_cluster(&mut vol, n, clust_ind, Op::Alloc).unwrap();
        prop_assert_ne!(lcn, NULL_CLUSTER);
        prop_assert_eq!(handle_file_cluster(&mut vol, n, clust_ind, Op::Free).unwrap(), NULL_CLUSTER);

        vol.load_inode_block(n).unwrap();
        prop_assert_eq!(vol.inode(n).unwrap().clu_count, clu_count_before);
    }

    /// P6: accessGranted is a pure function of its inputs.
    #[test]
    fn p6_access_granted_is_pure(mode_perm in 0o0u16..0o777, owner in 0u32..5, group in 0u32..5, uid in 0u32..5, gid in 0u32..5, mask in 1u8..8) {
        let (_file, mut vol) = volume(100);
        let n = alloc_inode(&mut vol, InodeType::File, owner, group, 0).unwrap();
        vol.load_inode_block(n).unwrap();
        vol.inode_mut(n).unwrap().mode = sofs::layout::inode::MODE_FILE | mode_perm;
        vol.store_inode_block().unwrap();

        let mask = mask & (R | W | X);
        prop_assume!(mask != 0);

        let first = access_granted(&mut vol, n, uid, gid, mask);
        let second = access_granted(&mut vol, n, uid, gid, mask);
        prop_assert_eq!(first, second);
    }

    /// P7: removing a non-directory entry with refCount 1 frees its inode
    /// and clusters, and the volume stays consistent.
    #[test]
    fn p7_remove_last_link_releases_inode_and_clusters(n_clusters in 0u32..5) {
        let (_file, mut vol) = volume(2000);
        let f = alloc_inode(&mut vol, InodeType::File, 0, 0, 0).unwrap();
        vol.load_inode_block(f).unwrap();
        {
            let inode = vol.inode_mut(f).unwrap();
            inode.ref_count = 1;
            inode.size = n_clusters * 4084;
        }
        vol.store_inode_block().unwrap();
        for ci in 0..n_clusters {
            handle_file_cluster(&mut vol, f, ci, Op::Alloc).unwrap();
        }

        let lcn = handle_file_cluster(&mut vol, 0, 0, Op::Get).unwrap();
        vol.load_leaf(lcn).unwrap();
        {
            let dirents = vol.leaf_mut().unwrap().dirents_mut();
            let slot = dirents.iter_mut().find(|e| e.state() == sofs::layout::dirent::EntryState::Clean).unwrap();
            *slot = sofs::layout::DirEntry::new("x", f);
        }
        vol.store_leaf().unwrap();

        remove_or_detach(&mut vol, 0, "x", RemoveOp::Rem, 0, 0).unwrap();

        vol.load_inode_block(f).unwrap();
        prop_assert!(vol.inode(f).unwrap().is_free());
        check_all(&mut vol).unwrap();
        let err = sofs::dirops::lookup_entry(&mut vol, 0, "x").unwrap_err();
        prop_assert_eq!(err, SofsError::NoSuchEntry);
    }
}
