//! Extent 树模块
//!
//! OCFS2 用 extent 树记录文件的簇分配：inode 内联根列表，内部节点和叶子
//! 存放在 extent block 中。本模块只读地把整棵树加载成内存里的区间映射，
//! 并提供逻辑位置到物理位置的翻译。
//!
//! # 主要组件
//!
//! - [`ExtentMap`] - 按簇偏移排序的区间映射
//! - [`ExtentWalker`] / [`DiskExtentWalker`] - 先序遍历 extent 树
//! - `translate_clusters` / `translate_blocks` - 逻辑 -> 物理翻译
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use ocfs2_core::extent::{DiskExtentWalker, ExtentMap};
//!
//! let mut walker = DiskExtentWalker::new(&mut bdev, geometry, &root_list, inode_blkno);
//! let map = ExtentMap::load(geometry, dinode.i_clusters, &mut walker)?;
//! let (p_blkno, remaining) = map.translate_blocks(v_blkno, 1)?;
//! ```

mod map;
mod translate;
mod walker;

pub use map::{ExtentMap, ExtentMapEntry, ExtentRecMut};
pub use walker::{DiskExtentWalker, ExtentVisit, ExtentWalker, WalkControl};
