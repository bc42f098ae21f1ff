//! 块/簇几何换算
//!
//! OCFS2 的分配单位是簇，I/O 单位是块，两者都是 2 的幂，
//! 因此所有换算都是移位运算。

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};

/// 文件系统几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    blocksize_bits: u32,
    clustersize_bits: u32,
}

impl Geometry {
    /// 创建几何参数
    ///
    /// # 参数
    ///
    /// * `blocksize_bits` - log2(块大小)，块大小须在 512..=4096 之间
    /// * `clustersize_bits` - log2(簇大小)，簇大小须在 4K..=1M 之间且不小于块大小
    pub fn new(blocksize_bits: u32, clustersize_bits: u32) -> Result<Self> {
        let block_ok = (OCFS2_MIN_BLOCKSIZE.trailing_zeros()..=OCFS2_MAX_BLOCKSIZE.trailing_zeros())
            .contains(&blocksize_bits);
        if !block_ok {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Block size out of range",
            ));
        }

        let cluster_ok = (OCFS2_MIN_CLUSTERSIZE.trailing_zeros()
            ..=OCFS2_MAX_CLUSTERSIZE.trailing_zeros())
            .contains(&clustersize_bits);
        if !cluster_ok || clustersize_bits < blocksize_bits {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Cluster size out of range",
            ));
        }

        Ok(Self {
            blocksize_bits,
            clustersize_bits,
        })
    }

    /// 块大小（字节）
    pub const fn block_size(&self) -> u32 {
        1 << self.blocksize_bits
    }

    /// 簇大小（字节）
    pub const fn cluster_size(&self) -> u32 {
        1 << self.clustersize_bits
    }

    /// 每簇块数
    pub const fn blocks_per_cluster(&self) -> u32 {
        1 << (self.clustersize_bits - self.blocksize_bits)
    }

    /// 簇数 -> 块数
    pub const fn clusters_to_blocks(&self, clusters: u32) -> u64 {
        (clusters as u64) << (self.clustersize_bits - self.blocksize_bits)
    }

    /// 块数 -> 簇数（向下取整）
    ///
    /// 结果截断为 u32，簇号在磁盘上就是 32 位
    pub const fn blocks_to_clusters(&self, blocks: u64) -> u32 {
        (blocks >> (self.clustersize_bits - self.blocksize_bits)) as u32
    }

    /// inode 内联 extent 列表能容纳的记录数
    pub const fn extent_recs_per_inode(&self) -> u16 {
        let size = self.block_size() as usize
            - OCFS2_DINODE_ID2_OFFSET
            - OCFS2_EXTENT_LIST_HEADER_SIZE;
        (size / OCFS2_EXTENT_REC_SIZE) as u16
    }

    /// 一个 extent block 能容纳的记录数
    pub const fn extent_recs_per_eb(&self) -> u16 {
        let size = self.block_size() as usize
            - OCFS2_EXTENT_BLOCK_LIST_OFFSET
            - OCFS2_EXTENT_LIST_HEADER_SIZE;
        (size / OCFS2_EXTENT_REC_SIZE) as u16
    }

    /// 强制 extent 树长到给定高度所需的单簇 extent 数
    ///
    /// n >= t^h，t 为每个 extent block 的记录数，再加 1 保证溢出到下一层。
    /// 文件扩展工具按此数量逐簇插入，使每条记录都无法合并。
    pub fn clusters_for_tree_height(&self, height: u32) -> Result<u64> {
        if height > OCFS2_MAX_TREE_HEIGHT {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Tree height must be within 0..=6",
            ));
        }

        let per_eb = self.extent_recs_per_eb() as u64;
        per_eb
            .checked_pow(height)
            .and_then(|n| n.checked_add(1))
            .ok_or(Error::new(
                ErrorKind::InvalidArgument,
                "Tree height too large for cluster count",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_conversions() {
        // 512 字节块，4K 簇
        let g = Geometry::new(9, 12).unwrap();
        assert_eq!(g.block_size(), 512);
        assert_eq!(g.cluster_size(), 4096);
        assert_eq!(g.blocks_per_cluster(), 8);
        assert_eq!(g.clusters_to_blocks(3), 24);
        assert_eq!(g.blocks_to_clusters(24), 3);
        assert_eq!(g.blocks_to_clusters(31), 3);
        assert_eq!(g.blocks_to_clusters(32), 4);

        // 块与簇大小相同
        let g = Geometry::new(12, 12).unwrap();
        assert_eq!(g.blocks_per_cluster(), 1);
        assert_eq!(g.clusters_to_blocks(205), 205);
        assert_eq!(g.blocks_to_clusters(205), 205);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(Geometry::new(8, 12).is_err());
        assert!(Geometry::new(13, 13).is_err());
        assert!(Geometry::new(12, 11).is_err());
        assert!(Geometry::new(12, 21).is_err());
        assert!(Geometry::new(12, 20).is_ok());

        let err = Geometry::new(9, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_record_capacities() {
        let g = Geometry::new(12, 12).unwrap();
        // (4096 - 0xC0 - 0x10) / 16
        assert_eq!(g.extent_recs_per_inode(), 243);
        // (4096 - 0x30 - 0x10) / 16
        assert_eq!(g.extent_recs_per_eb(), 252);

        let g = Geometry::new(9, 12).unwrap();
        assert_eq!(g.extent_recs_per_inode(), 19);
        assert_eq!(g.extent_recs_per_eb(), 28);
    }

    #[test]
    fn test_clusters_for_tree_height() {
        let g = Geometry::new(9, 12).unwrap();
        assert_eq!(g.clusters_for_tree_height(0).unwrap(), 2);
        assert_eq!(g.clusters_for_tree_height(1).unwrap(), 29);
        assert_eq!(g.clusters_for_tree_height(2).unwrap(), 28 * 28 + 1);
        assert!(g.clusters_for_tree_height(7).is_err());
    }
}
