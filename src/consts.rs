//! OCFS2 常量定义
//!
//! 这个模块包含了本库用到的 OCFS2 磁盘格式常量：
//! - 块/簇大小限制
//! - 对象签名
//! - dinode / extent block 中各字段的偏移

//=============================================================================
// 基础常量
//=============================================================================

/// 最小块大小（512 字节）
pub const OCFS2_MIN_BLOCKSIZE: u32 = 512;

/// 最大块大小（4096 字节）
pub const OCFS2_MAX_BLOCKSIZE: u32 = 4096;

/// 最小簇大小（4 KiB）
pub const OCFS2_MIN_CLUSTERSIZE: u32 = 4096;

/// 最大簇大小（1 MiB）
pub const OCFS2_MAX_CLUSTERSIZE: u32 = 1024 * 1024;

/// Superblock 所在块号
pub const OCFS2_SUPER_BLOCK_BLKNO: u64 = 2;

//=============================================================================
// 对象签名
//=============================================================================

/// 签名字段长度
pub const OCFS2_SIGNATURE_LEN: usize = 8;

/// Inode 签名
pub const OCFS2_INODE_SIGNATURE: &[u8; 8] = b"INODE01\0";

/// Extent block 签名
pub const OCFS2_EXTENT_BLOCK_SIGNATURE: &[u8; 8] = b"EXBLK01\0";

//=============================================================================
// Extent 列表
//=============================================================================

/// extent 记录大小（字节）
pub const OCFS2_EXTENT_REC_SIZE: usize = 16;

/// extent 列表头大小（字节），补齐到一条记录的大小
pub const OCFS2_EXTENT_LIST_HEADER_SIZE: usize = 16;

/// extent 树允许的最大深度
///
/// 用于遍历时拒绝损坏的深度字段，避免无界递归
pub const OCFS2_MAX_TREE_DEPTH: u16 = 8;

/// 文件扩展工具允许构造的最大树高
pub const OCFS2_MAX_TREE_HEIGHT: u32 = 6;

//=============================================================================
// 字段偏移
//=============================================================================

/// dinode 中 id2 联合体的偏移（普通 inode 的 extent 列表位于此处）
pub const OCFS2_DINODE_ID2_OFFSET: usize = 0xC0;

/// extent block 中 h_list 的偏移
pub const OCFS2_EXTENT_BLOCK_LIST_OFFSET: usize = 0x30;

/// dinode 头部解析所需的最小长度
pub const OCFS2_DINODE_HEADER_SIZE: usize = OCFS2_DINODE_ID2_OFFSET;
