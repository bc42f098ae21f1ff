//! Extent 树遍历
//!
//! [`ExtentWalker`] 把一棵 extent 树按先序展开成记录序列：每条内部记录先于
//! 它所指向子树中的记录被访问。[`ExtentMap::load`](super::ExtentMap::load)
//! 依赖这个顺序，让叶子记录逐步取代覆盖它们的内部记录。
//!
//! [`DiskExtentWalker`] 从块设备读取 extent block，遍历时校验签名、
//! 自身块号、深度和记录数。

use crate::block::{BlockDev, BlockDevice};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::geometry::Geometry;
use crate::types::{ocfs2_extent_block, ocfs2_extent_rec, ExtentList};
use alloc::vec;
use alloc::vec::Vec;

/// 一次记录访问
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentVisit {
    /// 当前记录
    pub rec: ocfs2_extent_rec,
    /// 记录所在列表的树深度（叶子为 0）
    pub tree_depth: u16,
    /// 此前已访问过的叶子记录的簇数之和
    pub ccount: u32,
    /// 记录所在块（inode 或 extent block）的块号
    pub ref_blkno: u64,
    /// 记录在所在列表中的下标
    pub ref_recno: usize,
}

/// 访问回调的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// 继续遍历
    Continue,
    /// 立即停止遍历
    Abort,
}

/// Extent 树遍历器
pub trait ExtentWalker {
    /// 先序遍历所有记录
    ///
    /// 回调返回 [`WalkControl::Abort`] 时提前结束并返回 `Ok(())`；
    /// 只有遍历自身的失败（I/O、结构损坏）才返回错误。
    fn walk(&mut self, visit: &mut dyn FnMut(&ExtentVisit) -> WalkControl) -> Result<()>;
}

/// 从块设备读取 extent block 的遍历器
pub struct DiskExtentWalker<'a, D: BlockDevice> {
    bdev: &'a mut BlockDev<D>,
    geometry: Geometry,
    root: &'a ExtentList,
    root_blkno: u64,
    buf: Vec<u8>,
}

impl<'a, D: BlockDevice> DiskExtentWalker<'a, D> {
    /// 创建遍历器
    ///
    /// # 参数
    ///
    /// * `bdev` - 块设备
    /// * `geometry` - 几何参数，块大小须与设备一致
    /// * `root` - inode 内联的根 extent 列表
    /// * `root_blkno` - inode 所在块号
    pub fn new(
        bdev: &'a mut BlockDev<D>,
        geometry: Geometry,
        root: &'a ExtentList,
        root_blkno: u64,
    ) -> Self {
        Self {
            bdev,
            geometry,
            root,
            root_blkno,
            buf: vec![0u8; geometry.block_size() as usize],
        }
    }

    /// 读入并校验一个 extent block，返回其中的列表
    fn read_extent_block(&mut self, blkno: u64, expected_depth: u16) -> Result<ExtentList> {
        if blkno <= OCFS2_SUPER_BLOCK_BLKNO || blkno >= self.bdev.total_blocks() {
            log::warn!("[WALKER] extent block number {} out of range", blkno);
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent block number out of range",
            ));
        }

        self.bdev.read_block(blkno, &mut self.buf)?;

        let eb = ocfs2_extent_block::from_bytes(&self.buf)?;
        if !eb.is_valid() {
            log::warn!("[WALKER] bad extent block signature at {}", blkno);
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Bad extent block signature",
            ));
        }
        if eb.h_blkno != blkno {
            log::warn!(
                "[WALKER] extent block {} claims to be at {}",
                blkno,
                eb.h_blkno
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent block number mismatch",
            ));
        }

        let list = ExtentList::parse(
            &self.buf[OCFS2_EXTENT_BLOCK_LIST_OFFSET..],
            self.geometry.extent_recs_per_eb(),
        )?;
        if list.header.l_tree_depth != expected_depth {
            log::warn!(
                "[WALKER] extent block {} has depth {}, expected {}",
                blkno,
                list.header.l_tree_depth,
                expected_depth
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent block depth mismatch",
            ));
        }

        Ok(list)
    }

    fn walk_list(
        &mut self,
        list: &ExtentList,
        ref_blkno: u64,
        ccount: &mut u32,
        visit: &mut dyn FnMut(&ExtentVisit) -> WalkControl,
    ) -> Result<WalkControl> {
        let depth = list.header.l_tree_depth;

        for (ref_recno, rec) in list.recs.iter().enumerate() {
            let v = ExtentVisit {
                rec: *rec,
                tree_depth: depth,
                ccount: *ccount,
                ref_blkno,
                ref_recno,
            };
            if visit(&v) == WalkControl::Abort {
                return Ok(WalkControl::Abort);
            }

            if list.header.is_leaf() {
                *ccount = ccount.saturating_add(rec.e_clusters);
                continue;
            }

            let child = self.read_extent_block(rec.e_blkno, depth - 1)?;
            if self.walk_list(&child, rec.e_blkno, ccount, visit)? == WalkControl::Abort {
                return Ok(WalkControl::Abort);
            }
        }

        Ok(WalkControl::Continue)
    }
}

impl<D: BlockDevice> ExtentWalker for DiskExtentWalker<'_, D> {
    fn walk(&mut self, visit: &mut dyn FnMut(&ExtentVisit) -> WalkControl) -> Result<()> {
        let root = self.root;
        if root.header.l_tree_depth > OCFS2_MAX_TREE_DEPTH {
            log::warn!(
                "[WALKER] inode {} has tree depth {}",
                self.root_blkno,
                root.header.l_tree_depth
            );
            return Err(Error::new(ErrorKind::Corrupted, "Extent tree too deep"));
        }

        let mut ccount = 0;
        self.walk_list(root, self.root_blkno, &mut ccount, visit)?;
        log::trace!(
            "[WALKER] inode {} walked, {} leaf clusters",
            self.root_blkno,
            ccount
        );
        Ok(())
    }
}
