//! OCFS2 磁盘数据结构定义
//!
//! 这个模块包含了直接对应磁盘格式的数据结构。
//!
//! ## 设计原则
//!
//! 1. **磁盘格式结构** - 保留 C 风格命名（便于对照 ocfs2_fs.h）
//! 2. **解析方式** - 使用 `byteorder` 按小端逐字段读取，不依赖结构体内存布局
//! 3. **辅助方法** - 提供 Rust 风格的访问器和工具函数

#![allow(non_camel_case_types)] // 允许C风格命名

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use alloc::vec::Vec;
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

//=============================================================================
// Extent 记录
//=============================================================================

/// Extent 记录
///
/// 对应 ocfs2_fs.h 中的 `ocfs2_extent_rec`，磁盘上固定 16 字节：
///
/// ```text
/// 0x00  u32 e_cpos       文件内偏移（簇）
/// 0x04  u32 e_clusters   覆盖的簇数
/// 0x08  u64 e_blkno      物理起始块号
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ocfs2_extent_rec {
    /// 文件内偏移（簇）
    pub e_cpos: u32,
    /// 覆盖的簇数
    pub e_clusters: u32,
    /// 物理起始块号
    pub e_blkno: u64,
}

impl ocfs2_extent_rec {
    /// 创建新的 extent 记录
    pub const fn new(e_cpos: u32, e_clusters: u32, e_blkno: u64) -> Self {
        Self {
            e_cpos,
            e_clusters,
            e_blkno,
        }
    }

    /// 记录覆盖范围的结束位置（不包含）
    ///
    /// 使用 u64 表示，`e_cpos + e_clusters` 可能超过 u32
    pub const fn end(&self) -> u64 {
        self.e_cpos as u64 + self.e_clusters as u64
    }

    /// 是否包含给定簇
    pub const fn contains(&self, cpos: u32) -> bool {
        self.e_cpos <= cpos && (cpos as u64) < self.end()
    }

    /// 与 `[cpos, cpos + clusters)` 是否相交
    ///
    /// 与树上的区间查找使用相同的比较规则
    pub const fn intersects(&self, cpos: u32, clusters: u32) -> bool {
        let q_end = cpos as u64 + clusters as u64;
        !(q_end <= self.e_cpos as u64 || cpos as u64 >= self.end())
    }

    /// 从磁盘字节解析
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < OCFS2_EXTENT_REC_SIZE {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent record data too short",
            ));
        }

        Ok(Self {
            e_cpos: LittleEndian::read_u32(&buf[0x00..]),
            e_clusters: LittleEndian::read_u32(&buf[0x04..]),
            e_blkno: LittleEndian::read_u64(&buf[0x08..]),
        })
    }

    /// 写入磁盘字节
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < OCFS2_EXTENT_REC_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent record buffer too short",
            ));
        }

        LittleEndian::write_u32(&mut buf[0x00..], self.e_cpos);
        LittleEndian::write_u32(&mut buf[0x04..], self.e_clusters);
        LittleEndian::write_u64(&mut buf[0x08..], self.e_blkno);
        Ok(())
    }
}

//=============================================================================
// Extent 列表
//=============================================================================

/// Extent 列表头
///
/// 对应 `ocfs2_extent_list` 的头部（16 字节），后面紧跟 `l_count` 条记录：
///
/// ```text
/// 0x00  u16 l_tree_depth     从此处往下的树深度，0 表示叶子
/// 0x02  u16 l_count          记录槽位总数
/// 0x04  u16 l_next_free_rec  下一个空闲槽位（即有效记录数）
/// 0x06  u16 l_reserved1
/// 0x08  u64 l_reserved2
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ocfs2_extent_list_header {
    /// 树深度
    pub l_tree_depth: u16,
    /// 记录槽位总数
    pub l_count: u16,
    /// 有效记录数
    pub l_next_free_rec: u16,
}

impl ocfs2_extent_list_header {
    /// 是否是叶子列表
    pub const fn is_leaf(&self) -> bool {
        self.l_tree_depth == 0
    }

    /// 从磁盘字节解析
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < OCFS2_EXTENT_LIST_HEADER_SIZE {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent list header too short",
            ));
        }

        Ok(Self {
            l_tree_depth: LittleEndian::read_u16(&buf[0x00..]),
            l_count: LittleEndian::read_u16(&buf[0x02..]),
            l_next_free_rec: LittleEndian::read_u16(&buf[0x04..]),
        })
    }

    /// 写入磁盘字节（保留字段清零）
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < OCFS2_EXTENT_LIST_HEADER_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent list buffer too short",
            ));
        }

        LittleEndian::write_u16(&mut buf[0x00..], self.l_tree_depth);
        LittleEndian::write_u16(&mut buf[0x02..], self.l_count);
        LittleEndian::write_u16(&mut buf[0x04..], self.l_next_free_rec);
        buf[0x06..OCFS2_EXTENT_LIST_HEADER_SIZE].fill(0);
        Ok(())
    }
}

/// 解析后的 extent 列表（只保留有效记录）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtentList {
    /// 列表头
    pub header: ocfs2_extent_list_header,
    /// 前 `l_next_free_rec` 条记录
    pub recs: Vec<ocfs2_extent_rec>,
}

impl ExtentList {
    /// 从磁盘字节解析 extent 列表
    ///
    /// # 参数
    ///
    /// * `buf` - 从列表头开始的数据
    /// * `max_recs` - 该位置最多能容纳的记录数（inode 内联或 extent block）
    ///
    /// # 错误
    ///
    /// `l_count` 超过容量、`l_next_free_rec` 超过 `l_count`、
    /// 或数据不足以容纳有效记录时返回 `Corrupted`
    pub fn parse(buf: &[u8], max_recs: u16) -> Result<Self> {
        let header = ocfs2_extent_list_header::from_bytes(buf)?;

        if header.l_count > max_recs {
            log::warn!(
                "[EXTENT_LIST] l_count {} exceeds capacity {}",
                header.l_count,
                max_recs
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent list count exceeds capacity",
            ));
        }

        if header.l_next_free_rec > header.l_count {
            log::warn!(
                "[EXTENT_LIST] l_next_free_rec {} exceeds l_count {}",
                header.l_next_free_rec,
                header.l_count
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent list next_free_rec exceeds count",
            ));
        }

        let used = header.l_next_free_rec as usize;
        let needed = OCFS2_EXTENT_LIST_HEADER_SIZE + used * OCFS2_EXTENT_REC_SIZE;
        if buf.len() < needed {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent list data too short",
            ));
        }

        let recs = buf[OCFS2_EXTENT_LIST_HEADER_SIZE..needed]
            .chunks_exact(OCFS2_EXTENT_REC_SIZE)
            .map(ocfs2_extent_rec::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, recs })
    }

    /// 写入磁盘字节
    ///
    /// `header.l_next_free_rec` 以 `recs.len()` 为准
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if self.recs.len() > self.header.l_count as usize {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "More records than list slots",
            ));
        }

        let needed = OCFS2_EXTENT_LIST_HEADER_SIZE + self.recs.len() * OCFS2_EXTENT_REC_SIZE;
        if buf.len() < needed {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent list buffer too short",
            ));
        }

        let header = ocfs2_extent_list_header {
            l_next_free_rec: self.recs.len() as u16,
            ..self.header
        };
        header.write_to(buf)?;

        for (rec, slot) in self.recs.iter().zip(
            buf[OCFS2_EXTENT_LIST_HEADER_SIZE..needed].chunks_exact_mut(OCFS2_EXTENT_REC_SIZE),
        ) {
            rec.write_to(slot)?;
        }
        Ok(())
    }
}

//=============================================================================
// Extent block
//=============================================================================

/// Extent block 头部
///
/// 对应 `ocfs2_extent_block`，`h_list` 位于偏移 0x30：
///
/// ```text
/// 0x00  u8[8] h_signature      "EXBLK01"
/// 0x08  u64   h_reserved1
/// 0x10  s16   h_suballoc_node
/// 0x12  u16   h_suballoc_bit
/// 0x14  u32   h_reserved2
/// 0x18  u64   h_blkno          自身所在块号
/// 0x20  u64   h_reserved3
/// 0x28  u64   h_next_leaf_blk
/// 0x30  ocfs2_extent_list h_list
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ocfs2_extent_block {
    /// 签名
    pub h_signature: [u8; OCFS2_SIGNATURE_LEN],
    /// 所属节点的子分配器
    pub h_suballoc_node: i16,
    /// 子分配器中的位偏移
    pub h_suballoc_bit: u16,
    /// 自身所在块号
    pub h_blkno: u64,
    /// 下一个叶子块
    pub h_next_leaf_blk: u64,
}

impl ocfs2_extent_block {
    /// 签名是否有效
    pub fn is_valid(&self) -> bool {
        &self.h_signature == OCFS2_EXTENT_BLOCK_SIGNATURE
    }

    /// 从磁盘字节解析
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < OCFS2_EXTENT_BLOCK_LIST_OFFSET {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Extent block data too short",
            ));
        }

        let mut h_signature = [0u8; OCFS2_SIGNATURE_LEN];
        h_signature.copy_from_slice(&buf[..OCFS2_SIGNATURE_LEN]);

        Ok(Self {
            h_signature,
            h_suballoc_node: LittleEndian::read_i16(&buf[0x10..]),
            h_suballoc_bit: LittleEndian::read_u16(&buf[0x12..]),
            h_blkno: LittleEndian::read_u64(&buf[0x18..]),
            h_next_leaf_blk: LittleEndian::read_u64(&buf[0x28..]),
        })
    }

    /// 写入磁盘字节（保留字段清零）
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < OCFS2_EXTENT_BLOCK_LIST_OFFSET {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent block buffer too short",
            ));
        }

        buf[..OCFS2_EXTENT_BLOCK_LIST_OFFSET].fill(0);
        buf[..OCFS2_SIGNATURE_LEN].copy_from_slice(&self.h_signature);
        LittleEndian::write_i16(&mut buf[0x10..], self.h_suballoc_node);
        LittleEndian::write_u16(&mut buf[0x12..], self.h_suballoc_bit);
        LittleEndian::write_u64(&mut buf[0x18..], self.h_blkno);
        LittleEndian::write_u64(&mut buf[0x28..], self.h_next_leaf_blk);
        Ok(())
    }
}

//=============================================================================
// Inode
//=============================================================================

bitflags! {
    /// Inode 标志
    ///
    /// 对应 ocfs2_fs.h 中的 `OCFS2_*_FL`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InodeFlags: u32 {
        /// inode 有效
        const VALID       = 0x0000_0001;
        /// 在孤儿列表上
        const ORPHANED    = 0x0000_0004;
        /// 系统 inode
        const SYSTEM      = 0x0000_0010;
        /// Superblock
        const SUPER_BLOCK = 0x0000_0020;
        /// 节点本地分配位图
        const LOCAL_ALLOC = 0x0000_0040;
        /// 分配位图
        const BITMAP      = 0x0000_0080;
        /// 节点日志
        const JOURNAL     = 0x0000_0100;
        /// DLM 区域
        const DLM         = 0x0000_0200;
        /// 链式分配器
        const CHAIN       = 0x0000_0400;
    }
}

impl InodeFlags {
    /// id2 联合体中存放的不是 extent 列表的 inode 类型
    pub const NO_EXTENT_LIST: Self = Self::SUPER_BLOCK
        .union(Self::LOCAL_ALLOC)
        .union(Self::CHAIN)
        .union(Self::BITMAP);
}

/// Inode（dinode）头部
///
/// 对应 `ocfs2_dinode` 中本库关心的字段：
///
/// ```text
/// 0x00  u8[8] i_signature    "INODE01"
/// 0x08  u32   i_generation
/// 0x14  u32   i_clusters     簇数
/// 0x18  u32   i_uid
/// 0x1C  u32   i_gid
/// 0x20  u64   i_size
/// 0x28  u16   i_mode
/// 0x2A  u16   i_links_count
/// 0x2C  u32   i_flags
/// 0x50  u64   i_blkno        自身所在块号
/// 0x58  u64   i_last_eb_blk
/// 0xC0  id2                  普通 inode 的 extent 列表
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ocfs2_dinode {
    /// 签名
    pub i_signature: [u8; OCFS2_SIGNATURE_LEN],
    /// generation 号
    pub i_generation: u32,
    /// 簇数
    pub i_clusters: u32,
    /// 属主 UID
    pub i_uid: u32,
    /// 属组 GID
    pub i_gid: u32,
    /// 文件大小（字节）
    pub i_size: u64,
    /// 文件模式
    pub i_mode: u16,
    /// 链接数
    pub i_links_count: u16,
    /// 标志
    pub i_flags: InodeFlags,
    /// 自身所在块号
    pub i_blkno: u64,
    /// 最后一个 extent block
    pub i_last_eb_blk: u64,
}

impl ocfs2_dinode {
    /// 签名是否有效
    pub fn is_valid(&self) -> bool {
        &self.i_signature == OCFS2_INODE_SIGNATURE
    }

    /// id2 中是否是 extent 列表
    pub fn has_extent_list(&self) -> bool {
        !self.i_flags.intersects(InodeFlags::NO_EXTENT_LIST)
    }

    /// 从磁盘字节解析
    ///
    /// 未知的标志位被保留下来，不视为错误
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < OCFS2_DINODE_HEADER_SIZE {
            return Err(Error::new(ErrorKind::Corrupted, "Inode data too short"));
        }

        let mut i_signature = [0u8; OCFS2_SIGNATURE_LEN];
        i_signature.copy_from_slice(&buf[..OCFS2_SIGNATURE_LEN]);

        Ok(Self {
            i_signature,
            i_generation: LittleEndian::read_u32(&buf[0x08..]),
            i_clusters: LittleEndian::read_u32(&buf[0x14..]),
            i_uid: LittleEndian::read_u32(&buf[0x18..]),
            i_gid: LittleEndian::read_u32(&buf[0x1C..]),
            i_size: LittleEndian::read_u64(&buf[0x20..]),
            i_mode: LittleEndian::read_u16(&buf[0x28..]),
            i_links_count: LittleEndian::read_u16(&buf[0x2A..]),
            i_flags: InodeFlags::from_bits_retain(LittleEndian::read_u32(&buf[0x2C..])),
            i_blkno: LittleEndian::read_u64(&buf[0x50..]),
            i_last_eb_blk: LittleEndian::read_u64(&buf[0x58..]),
        })
    }

    /// 写入磁盘字节（只写本结构覆盖的字段）
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < OCFS2_DINODE_HEADER_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Inode buffer too short",
            ));
        }

        buf[..OCFS2_SIGNATURE_LEN].copy_from_slice(&self.i_signature);
        LittleEndian::write_u32(&mut buf[0x08..], self.i_generation);
        LittleEndian::write_u32(&mut buf[0x14..], self.i_clusters);
        LittleEndian::write_u32(&mut buf[0x18..], self.i_uid);
        LittleEndian::write_u32(&mut buf[0x1C..], self.i_gid);
        LittleEndian::write_u64(&mut buf[0x20..], self.i_size);
        LittleEndian::write_u16(&mut buf[0x28..], self.i_mode);
        LittleEndian::write_u16(&mut buf[0x2A..], self.i_links_count);
        LittleEndian::write_u32(&mut buf[0x2C..], self.i_flags.bits());
        LittleEndian::write_u64(&mut buf[0x50..], self.i_blkno);
        LittleEndian::write_u64(&mut buf[0x58..], self.i_last_eb_blk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_extent_rec_layout() {
        let mut buf = [0u8; 16];
        let rec = ocfs2_extent_rec::new(0x0102_0304, 0x10, 0x1122_3344_5566_7788);
        rec.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[4..8], &[0x10, 0, 0, 0]);
        assert_eq!(buf[8], 0x88);
        assert_eq!(buf[15], 0x11);
        assert_eq!(ocfs2_extent_rec::from_bytes(&buf).unwrap(), rec);
    }

    #[test]
    fn test_extent_rec_ranges() {
        let rec = ocfs2_extent_rec::new(10, 10, 500);
        assert_eq!(rec.end(), 20);
        assert!(rec.contains(10));
        assert!(rec.contains(19));
        assert!(!rec.contains(20));
        assert!(!rec.contains(9));

        assert!(rec.intersects(5, 6));
        assert!(!rec.intersects(5, 5));
        assert!(rec.intersects(19, 100));
        assert!(!rec.intersects(20, 1));

        // 末尾不会在 u32 上溢出
        let tail = ocfs2_extent_rec::new(u32::MAX - 1, 2, 0);
        assert_eq!(tail.end(), u32::MAX as u64 + 1);
        assert!(tail.contains(u32::MAX));
    }

    #[test]
    fn test_extent_list_parse() {
        let mut buf = vec![0u8; 16 + 4 * 16];
        let list = ExtentList {
            header: ocfs2_extent_list_header {
                l_tree_depth: 1,
                l_count: 4,
                l_next_free_rec: 0,
            },
            recs: vec![
                ocfs2_extent_rec::new(0, 8, 100),
                ocfs2_extent_rec::new(8, 8, 200),
            ],
        };
        list.write_to(&mut buf).unwrap();

        let parsed = ExtentList::parse(&buf, 4).unwrap();
        assert_eq!(parsed.header.l_tree_depth, 1);
        assert_eq!(parsed.header.l_next_free_rec, 2);
        assert!(!parsed.header.is_leaf());
        assert_eq!(parsed.recs, list.recs);
    }

    #[test]
    fn test_extent_list_rejects_bad_counts() {
        let mut buf = vec![0u8; 16 + 4 * 16];

        // l_count 超过容量
        let header = ocfs2_extent_list_header {
            l_tree_depth: 0,
            l_count: 5,
            l_next_free_rec: 1,
        };
        header.write_to(&mut buf).unwrap();
        let err = ExtentList::parse(&buf, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);

        // l_next_free_rec 超过 l_count
        let header = ocfs2_extent_list_header {
            l_tree_depth: 0,
            l_count: 2,
            l_next_free_rec: 3,
        };
        header.write_to(&mut buf).unwrap();
        let err = ExtentList::parse(&buf, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);

        // 数据不足
        let header = ocfs2_extent_list_header {
            l_tree_depth: 0,
            l_count: 4,
            l_next_free_rec: 4,
        };
        header.write_to(&mut buf).unwrap();
        let err = ExtentList::parse(&buf[..40], 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn test_extent_block_header() {
        let mut buf = vec![0u8; 512];
        let eb = ocfs2_extent_block {
            h_signature: *OCFS2_EXTENT_BLOCK_SIGNATURE,
            h_suballoc_node: -1,
            h_suballoc_bit: 7,
            h_blkno: 42,
            h_next_leaf_blk: 43,
        };
        eb.write_to(&mut buf).unwrap();

        let parsed = ocfs2_extent_block::from_bytes(&buf).unwrap();
        assert!(parsed.is_valid());
        assert_eq!(parsed, eb);

        buf[0] = b'X';
        assert!(!ocfs2_extent_block::from_bytes(&buf).unwrap().is_valid());
    }

    #[test]
    fn test_dinode_fields() {
        let mut buf = vec![0u8; 512];
        let di = ocfs2_dinode {
            i_signature: *OCFS2_INODE_SIGNATURE,
            i_clusters: 20,
            i_size: 20 * 4096,
            i_mode: 0o100644,
            i_links_count: 1,
            i_flags: InodeFlags::VALID,
            i_blkno: 17,
            ..Default::default()
        };
        di.write_to(&mut buf).unwrap();

        assert_eq!(LittleEndian::read_u32(&buf[0x14..]), 20);
        assert_eq!(LittleEndian::read_u64(&buf[0x50..]), 17);

        let parsed = ocfs2_dinode::from_bytes(&buf).unwrap();
        assert!(parsed.is_valid());
        assert!(parsed.has_extent_list());
        assert_eq!(parsed, di);
    }

    #[test]
    fn test_dinode_without_extent_list() {
        let di = ocfs2_dinode {
            i_flags: InodeFlags::VALID | InodeFlags::SYSTEM | InodeFlags::CHAIN,
            ..Default::default()
        };
        assert!(!di.has_extent_list());

        let journal = ocfs2_dinode {
            i_flags: InodeFlags::VALID | InodeFlags::SYSTEM | InodeFlags::JOURNAL,
            ..Default::default()
        };
        assert!(journal.has_extent_list());
    }
}
