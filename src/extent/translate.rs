//! 逻辑位置 -> 物理位置翻译

use super::ExtentMap;
use crate::error::{Error, ErrorKind, Result};

impl ExtentMap {
    /// 把逻辑簇翻译成物理簇
    ///
    /// # 参数
    ///
    /// * `v_cpos` - 文件内簇偏移
    /// * `count` - 调用者打算访问的簇数，只用于范围检查
    ///
    /// # 返回
    ///
    /// `(p_cpos, remaining)`：`v_cpos` 对应的物理簇，以及所在条目从
    /// `v_cpos` 起还剩的簇数
    ///
    /// # 错误
    ///
    /// - `InvalidExtentLookup` - 请求越过 `total_clusters`
    /// - `ExtentNotFound` - `v_cpos` 落在空洞里
    pub fn translate_clusters(&self, v_cpos: u32, count: u32) -> Result<(u32, u32)> {
        if v_cpos as u64 + count as u64 > self.total_clusters() as u64 {
            return Err(Error::new(
                ErrorKind::InvalidExtentLookup,
                "Cluster range beyond inode clusters",
            ));
        }

        let ent = self.search(v_cpos, 1).ok_or(Error::new(
            ErrorKind::ExtentNotFound,
            "No extent maps this cluster",
        ))?;
        if !ent.rec.contains(v_cpos) {
            return Err(Error::new(
                ErrorKind::InvalidExtentLookup,
                "Extent entry does not contain cluster",
            ));
        }

        let coff = v_cpos - ent.rec.e_cpos;
        let p_cpos = self
            .geometry()
            .blocks_to_clusters(ent.rec.e_blkno)
            .checked_add(coff)
            .ok_or(Error::new(
                ErrorKind::InvalidExtentLookup,
                "Physical cluster out of range",
            ))?;

        Ok((p_cpos, ent.rec.e_clusters - coff))
    }

    /// 把逻辑块翻译成物理块
    ///
    /// # 参数
    ///
    /// * `v_blkno` - 文件内块偏移
    /// * `count` - 调用者打算访问的块数，按簇向上取整后做范围检查
    ///
    /// # 返回
    ///
    /// `(p_blkno, remaining)`：`v_blkno` 对应的物理块，以及所在条目从
    /// `v_blkno` 起还剩的块数
    ///
    /// # 错误
    ///
    /// 与 [`translate_clusters`](Self::translate_clusters) 相同
    pub fn translate_blocks(&self, v_blkno: u64, count: u32) -> Result<(u64, u64)> {
        let g = self.geometry();
        let bpc = g.blocks_per_cluster() as u64;

        let cpos = v_blkno / bpc;
        let clusters = (count as u64).div_ceil(bpc);
        if cpos + clusters > self.total_clusters() as u64 {
            return Err(Error::new(
                ErrorKind::InvalidExtentLookup,
                "Block range beyond inode clusters",
            ));
        }
        let cpos = cpos as u32;

        let ent = self.search(cpos, 1).ok_or(Error::new(
            ErrorKind::ExtentNotFound,
            "No extent maps this block",
        ))?;
        if !ent.rec.contains(cpos) {
            return Err(Error::new(
                ErrorKind::InvalidExtentLookup,
                "Extent entry does not contain block",
            ));
        }

        let boff = g.clusters_to_blocks(cpos - ent.rec.e_cpos) + v_blkno % bpc;
        let p_blkno = ent.rec.e_blkno.checked_add(boff).ok_or(Error::new(
            ErrorKind::InvalidExtentLookup,
            "Physical block out of range",
        ))?;

        Ok((p_blkno, g.clusters_to_blocks(ent.rec.e_clusters) - boff))
    }
}
