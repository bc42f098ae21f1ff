//! ocfs2_core: OCFS2 metadata core for checking and repair tools
//!
//! 这是一个纯 Rust 的 OCFS2 元数据库，为 fsck、调试器和扩展工具提供：
//! - **extent map**：把 inode 的 extent 树加载成内存区间映射并做逻辑 -> 物理翻译
//! - **icount**：按 inode 块号统计引用次数的稀疏计数器
//! - 只读的块设备访问和磁盘结构解析
//!
//! # 示例
//!
//! ```rust,ignore
//! use ocfs2_core::{BlockDev, BlockDevice, CachedInode, FsConfig, Geometry, Result};
//!
//! fn first_block(device: MyDevice, inode_blkno: u64) -> Result<u64> {
//!     let mut bdev = BlockDev::with_config(device, &FsConfig::default())?;
//!     let geometry = Geometry::new(12, 12)?;
//!
//!     let mut ci = CachedInode::read(&mut bdev, geometry, inode_blkno)?;
//!     ci.load_extent_map(&mut bdev)?;
//!
//!     let map = ci.extent_map().unwrap();
//!     let (p_blkno, _) = map.translate_blocks(0, 1)?;
//!     Ok(p_blkno)
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`fatal`] - 不可恢复错误的处理策略
//! - [`block`] - 块设备抽象和 I/O 操作
//! - [`cache`] - 块读缓存
//! - [`consts`] - 常量定义
//! - [`types`] - 磁盘数据结构
//! - [`geometry`] - 块/簇换算
//! - [`extent`] - extent 树遍历与 extent map
//! - [`fs`] - 缓存的 inode
//! - [`bitmap`] - 位图操作
//! - [`icount`] - inode 引用计数

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 致命错误策略
pub mod fatal;

/// 块设备抽象
pub mod block;

/// 块缓存
pub mod cache;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 块/簇几何
pub mod geometry;

/// Extent 树与 extent map
pub mod extent;

/// 缓存的 inode
pub mod fs;

/// 位图操作
pub mod bitmap;

/// Inode 引用计数
pub mod icount;

#[cfg(test)]
mod test_image;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};
pub use fatal::{default_fatal_handler, FatalError, FatalHandler};

// 块设备
pub use block::{BlockDev, BlockDevice};

// Cache
pub use cache::{BlockCache, CacheStats, DEFAULT_CACHE_SIZE};

// 几何与磁盘结构
pub use geometry::Geometry;
pub use types::{ocfs2_dinode, ocfs2_extent_rec, ExtentList, InodeFlags};

// Extent
pub use extent::{
    DiskExtentWalker, ExtentMap, ExtentMapEntry, ExtentRecMut, ExtentVisit, ExtentWalker,
    WalkControl,
};

// Inode
pub use fs::{CachedInode, FsConfig};

// 计数
pub use bitmap::SparseBitmap;
pub use icount::Icount;
