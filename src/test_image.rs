//! 测试用的内存块设备和镜像构造函数

use crate::block::BlockDevice;
use crate::consts::*;
use crate::error::Result;
use crate::types::{
    ocfs2_dinode, ocfs2_extent_block, ocfs2_extent_list_header, ocfs2_extent_rec, ExtentList,
    InodeFlags,
};
use alloc::vec;
use alloc::vec::Vec;

/// 内存块设备
pub(crate) struct MemDevice {
    block_size: u32,
    storage: Vec<u8>,
}

impl MemDevice {
    pub(crate) fn new(block_size: u32, total_blocks: u64) -> Self {
        Self {
            block_size,
            storage: vec![0u8; (total_blocks * block_size as u64) as usize],
        }
    }

    pub(crate) fn block_mut(&mut self, blkno: u64) -> &mut [u8] {
        let bs = self.block_size as usize;
        let start = blkno as usize * bs;
        &mut self.storage[start..start + bs]
    }
}

impl BlockDevice for MemDevice {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        self.storage.len() as u64 / self.block_size as u64
    }

    fn read_blocks(&mut self, blkno: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
        let start = (blkno * self.block_size as u64) as usize;
        let len = (count * self.block_size) as usize;
        buf[..len].copy_from_slice(&self.storage[start..start + len]);
        Ok(len)
    }
}

fn extent_list(depth: u16, count: u16, recs: &[ocfs2_extent_rec]) -> ExtentList {
    ExtentList {
        header: ocfs2_extent_list_header {
            l_tree_depth: depth,
            l_count: count,
            l_next_free_rec: recs.len() as u16,
        },
        recs: recs.to_vec(),
    }
}

/// 写入一个 extent block
pub(crate) fn write_extent_block(
    dev: &mut MemDevice,
    blkno: u64,
    depth: u16,
    recs: &[ocfs2_extent_rec],
) {
    let count = ((dev.block_size as usize
        - OCFS2_EXTENT_BLOCK_LIST_OFFSET
        - OCFS2_EXTENT_LIST_HEADER_SIZE)
        / OCFS2_EXTENT_REC_SIZE) as u16;
    let eb = ocfs2_extent_block {
        h_signature: *OCFS2_EXTENT_BLOCK_SIGNATURE,
        h_blkno: blkno,
        ..Default::default()
    };

    let buf = dev.block_mut(blkno);
    buf.fill(0);
    eb.write_to(buf).unwrap();
    extent_list(depth, count, recs)
        .write_to(&mut buf[OCFS2_EXTENT_BLOCK_LIST_OFFSET..])
        .unwrap();
}

/// 写入一个带内联 extent 列表的普通 inode
pub(crate) fn write_inode(
    dev: &mut MemDevice,
    blkno: u64,
    clusters: u32,
    depth: u16,
    recs: &[ocfs2_extent_rec],
) {
    let count = ((dev.block_size as usize
        - OCFS2_DINODE_ID2_OFFSET
        - OCFS2_EXTENT_LIST_HEADER_SIZE)
        / OCFS2_EXTENT_REC_SIZE) as u16;
    let dinode = ocfs2_dinode {
        i_signature: *OCFS2_INODE_SIGNATURE,
        i_clusters: clusters,
        i_links_count: 1,
        i_flags: InodeFlags::VALID,
        i_blkno: blkno,
        ..Default::default()
    };

    let buf = dev.block_mut(blkno);
    buf.fill(0);
    dinode.write_to(buf).unwrap();
    extent_list(depth, count, recs)
        .write_to(&mut buf[OCFS2_DINODE_ID2_OFFSET..])
        .unwrap();
}
