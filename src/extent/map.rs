//! Extent map
//!
//! 一个 inode 的 extent 树在内存中的区间缓存：簇偏移 -> 物理块号。
//!
//! # 条目与深度
//!
//! 每个条目记录来源记录所在的树深度。叶子记录深度为 0，内部节点记录的深度
//! 更大、覆盖范围更粗。遍历是先序的，内部记录先于它下面的叶子到达，
//! 因此插入时按深度决定谁取代谁：
//!
//! - 已有条目更深（更粗）：被新记录切开，只保留新记录之外的部分
//! - 深度相同：必须是同一条记录，否则是冲突
//! - 已有条目更浅（更细）：新记录不能覆盖它
//!
//! # 不变量
//!
//! - 条目按 `e_cpos` 排序且两两不重叠
//! - 每个条目 `e_clusters > 0`，且结束位置不超过插入时的 `total_clusters`
//! - 插入失败时映射保持原样：所有替换条目先构造好，再一次性改动树

use super::walker::{ExtentVisit, ExtentWalker, WalkControl};
use crate::error::{Error, ErrorKind, Result};
use crate::geometry::Geometry;
use crate::types::ocfs2_extent_rec;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Bound;

/// Extent map 条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentMapEntry {
    /// extent 记录
    pub rec: ocfs2_extent_rec,
    /// 记录所在的树深度（叶子为 0）
    pub tree_depth: u16,
}

/// Extent map
#[derive(Debug, Clone)]
pub struct ExtentMap {
    geometry: Geometry,
    total_clusters: u32,
    extents: BTreeMap<u32, ExtentMapEntry>,
}

impl ExtentMap {
    /// 创建空的 extent map
    ///
    /// # 参数
    ///
    /// * `geometry` - 文件系统几何参数
    /// * `total_clusters` - inode 的簇数，插入的记录不能越过它
    pub fn new(geometry: Geometry, total_clusters: u32) -> Self {
        Self {
            geometry,
            total_clusters,
            extents: BTreeMap::new(),
        }
    }

    /// 几何参数
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// 当前簇数上限
    pub fn total_clusters(&self) -> u32 {
        self.total_clusters
    }

    /// 修改簇数上限
    ///
    /// 不会删除越界的条目；缩小时由调用者接着调用 [`truncate`](Self::truncate)
    pub fn set_total_clusters(&mut self, total_clusters: u32) {
        self.total_clusters = total_clusters;
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    /// 是否没有条目
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// 按 `e_cpos` 升序遍历条目
    pub fn iter(&self) -> impl Iterator<Item = &ExtentMapEntry> + '_ {
        self.extents.values()
    }

    /// 所有条目覆盖的簇数之和
    pub fn mapped_clusters(&self) -> u64 {
        self.iter().map(|ent| ent.rec.e_clusters as u64).sum()
    }

    /// 查询区间 `[cpos, cpos + clusters)` 的排他上界
    fn query_end(cpos: u32, clusters: u32) -> Bound<u32> {
        let end = cpos as u64 + clusters as u64;
        if end > u32::MAX as u64 {
            Bound::Unbounded
        } else {
            Bound::Excluded(end as u32)
        }
    }

    /// 查找与 `[cpos, cpos + clusters)` 相交的最后一个条目
    ///
    /// `clusters` 为 0 时只会命中严格包含 `cpos` 内部的条目
    pub(crate) fn search(&self, cpos: u32, clusters: u32) -> Option<&ExtentMapEntry> {
        self.extents
            .range((Bound::Unbounded, Self::query_end(cpos, clusters)))
            .next_back()
            .map(|(_, ent)| ent)
            .filter(|ent| ent.rec.end() > cpos as u64)
    }

    /// 按 `e_cpos` 升序返回所有与 `[cpos, cpos + clusters)` 相交的条目
    fn search_all(&self, cpos: u32, clusters: u32) -> Vec<ExtentMapEntry> {
        let mut hits: Vec<ExtentMapEntry> = self
            .extents
            .range((Bound::Unbounded, Self::query_end(cpos, clusters)))
            .rev()
            .map(|(_, ent)| *ent)
            .take_while(|ent| ent.rec.end() > cpos as u64)
            .collect();
        hits.reverse();
        hits
    }

    /// 插入一条来自深度 `tree_depth` 的记录
    ///
    /// # 错误
    ///
    /// - `InvalidArgument` - 记录为空，或越过 `total_clusters`
    /// - `InvalidExtentLookup` - 与同深度的不同记录重叠，或与更浅的条目重叠，
    ///   或切分出的右侧剩余部分块号溢出
    ///
    /// 出错时映射不变。与同深度的相同记录重叠视为重复插入，直接成功。
    pub fn insert(&mut self, rec: &ocfs2_extent_rec, tree_depth: u16) -> Result<()> {
        if rec.e_clusters == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Zero-length extent record",
            ));
        }

        if rec.end() > self.total_clusters as u64 {
            log::debug!(
                "[EXTENT_MAP] record ({}, {}, {}) ends beyond {} clusters",
                rec.e_cpos,
                rec.e_clusters,
                rec.e_blkno,
                self.total_clusters
            );
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent record beyond inode clusters",
            ));
        }

        let new_ent = ExtentMapEntry {
            rec: *rec,
            tree_depth,
        };

        let overlapped = self.search_all(rec.e_cpos, rec.e_clusters);
        let (Some(first), Some(last)) = (overlapped.first(), overlapped.last()) else {
            self.extents.insert(rec.e_cpos, new_ent);
            return Ok(());
        };

        for old in &overlapped {
            if old.tree_depth == tree_depth {
                if old.rec == *rec {
                    return Ok(());
                }
                log::warn!(
                    "[EXTENT_MAP] conflicting records at depth {}: ({}, {}, {}) vs ({}, {}, {})",
                    tree_depth,
                    old.rec.e_cpos,
                    old.rec.e_clusters,
                    old.rec.e_blkno,
                    rec.e_cpos,
                    rec.e_clusters,
                    rec.e_blkno
                );
                return Err(Error::new(
                    ErrorKind::InvalidExtentLookup,
                    "Conflicting extent records at the same depth",
                ));
            }
            if old.tree_depth < tree_depth {
                log::warn!(
                    "[EXTENT_MAP] depth {} record at {} overlaps depth {} entry at {}",
                    tree_depth,
                    rec.e_cpos,
                    old.tree_depth,
                    old.rec.e_cpos
                );
                return Err(Error::new(
                    ErrorKind::InvalidExtentLookup,
                    "Extent record overlaps a more specific entry",
                ));
            }
        }

        // 左侧剩余部分沿用原起始块
        let left = (first.rec.e_cpos < rec.e_cpos).then(|| ExtentMapEntry {
            rec: ocfs2_extent_rec::new(
                first.rec.e_cpos,
                rec.e_cpos - first.rec.e_cpos,
                first.rec.e_blkno,
            ),
            tree_depth: first.tree_depth,
        });

        // 右侧剩余部分的起始块前移被新记录挡在前面的那段簇数。
        // 最后一个条目起点不早于新记录时没有这样的簇，起始块保持不变。
        let right = if last.rec.end() > rec.end() {
            let skipped = rec.e_cpos.saturating_sub(last.rec.e_cpos);
            let blkno = last
                .rec
                .e_blkno
                .checked_add(self.geometry.clusters_to_blocks(skipped))
                .ok_or_else(|| {
                    log::warn!(
                        "[EXTENT_MAP] remainder of ({}, {}, {}) overflows the block range",
                        last.rec.e_cpos,
                        last.rec.e_clusters,
                        last.rec.e_blkno
                    );
                    Error::new(
                        ErrorKind::InvalidExtentLookup,
                        "Split remainder block number out of range",
                    )
                })?;
            Some(ExtentMapEntry {
                rec: ocfs2_extent_rec::new(
                    rec.end() as u32,
                    (last.rec.end() - rec.end()) as u32,
                    blkno,
                ),
                tree_depth: last.tree_depth,
            })
        } else {
            None
        };

        for old in &overlapped {
            self.extents.remove(&old.rec.e_cpos);
        }
        if let Some(left) = left {
            self.extents.insert(left.rec.e_cpos, left);
        }
        self.extents.insert(rec.e_cpos, new_ent);
        if let Some(right) = right {
            self.extents.insert(right.rec.e_cpos, right);
        }

        log::trace!(
            "[EXTENT_MAP] depth {} record ({}, {}, {}) superseded {} entries",
            tree_depth,
            rec.e_cpos,
            rec.e_clusters,
            rec.e_blkno,
            overlapped.len()
        );
        Ok(())
    }

    /// 查找包含 `cpos` 的记录
    pub fn lookup(&self, cpos: u32) -> Option<&ocfs2_extent_rec> {
        self.lookup_entry(cpos).map(|ent| &ent.rec)
    }

    /// 查找包含 `cpos` 的条目（带深度）
    pub fn lookup_entry(&self, cpos: u32) -> Option<&ExtentMapEntry> {
        self.search(cpos, 1)
    }

    /// 查找包含 `cpos` 的条目，返回可原地缩短它的句柄
    pub fn lookup_mut(&mut self, cpos: u32) -> Option<ExtentRecMut<'_>> {
        let key = self.search(cpos, 1)?.rec.e_cpos;
        self.extents.get_mut(&key).map(|entry| ExtentRecMut { entry })
    }

    /// 删除所有起点 >= `new_clusters` 的条目
    ///
    /// 跨越新边界的条目保留原长度，由调用者通过
    /// [`lookup_mut`](Self::lookup_mut) 自行缩短
    pub fn truncate(&mut self, new_clusters: u32) {
        let removed = self.extents.split_off(&new_clusters);
        if !removed.is_empty() {
            log::debug!(
                "[EXTENT_MAP] truncate to {} clusters dropped {} entries",
                new_clusters,
                removed.len()
            );
        }
    }

    /// 丢弃所有条目
    pub fn free(&mut self) {
        self.extents.clear();
    }

    /// 遍历整棵 extent 树构建 extent map
    ///
    /// 遍历或插入的任何错误都会丢弃已构建的部分并返回该错误
    pub fn load(
        geometry: Geometry,
        total_clusters: u32,
        walker: &mut dyn ExtentWalker,
    ) -> Result<Self> {
        let mut map = Self::new(geometry, total_clusters);
        let mut insert_err = None;

        let mut visit = |v: &ExtentVisit| match map.insert(&v.rec, v.tree_depth) {
            Ok(()) => WalkControl::Continue,
            Err(e) => {
                log::warn!(
                    "[EXTENT_MAP] rejecting record {} of block {}: {}",
                    v.ref_recno,
                    v.ref_blkno,
                    e
                );
                insert_err = Some(e);
                WalkControl::Abort
            }
        };
        walker.walk(&mut visit)?;

        if let Some(e) = insert_err {
            return Err(e);
        }

        log::debug!(
            "[EXTENT_MAP] loaded {} entries covering {} of {} clusters",
            map.len(),
            map.mapped_clusters(),
            total_clusters
        );
        Ok(map)
    }

    /// 以 debug 级别输出所有条目
    pub fn dump(&self) {
        log::debug!("[EXTENT_MAP] EXTENTS:");
        let mut ccount: u64 = 0;
        for ent in self.iter() {
            log::debug!(
                "[EXTENT_MAP] ({:08}, {:08}, {:08}) | + {:08} = {:08} / {:08}",
                ent.rec.e_cpos,
                ent.rec.e_clusters,
                ent.rec.e_blkno,
                ccount,
                ccount + ent.rec.e_clusters as u64,
                self.total_clusters
            );
            ccount += ent.rec.e_clusters as u64;
        }
        log::debug!("[EXTENT_MAP] TOTAL: {}", self.total_clusters);
    }
}

/// [`ExtentMap::lookup_mut`] 返回的条目句柄
pub struct ExtentRecMut<'a> {
    entry: &'a mut ExtentMapEntry,
}

impl ExtentRecMut<'_> {
    /// 条目中的记录
    pub fn rec(&self) -> &ocfs2_extent_rec {
        &self.entry.rec
    }

    /// 条目的树深度
    pub fn tree_depth(&self) -> u16 {
        self.entry.tree_depth
    }

    /// 把条目缩短到 `clusters` 个簇
    ///
    /// 只能缩短，不能清零也不能增长
    pub fn shrink_to(&mut self, clusters: u32) -> Result<()> {
        if clusters == 0 || clusters > self.entry.rec.e_clusters {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent can only shrink to a non-zero length",
            ));
        }
        self.entry.rec.e_clusters = clusters;
        Ok(())
    }
}
