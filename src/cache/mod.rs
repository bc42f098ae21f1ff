//! 块缓存模块
//!
//! # 主要组件
//!
//! - [`BlockCache`] - 块读缓存，使用 lru crate 提供 LRU 驱逐
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 设计原理
//!
//! 本库只读取磁盘元数据，缓存只需要按块号索引并在满时驱逐最久未使用的块。
//! 访问顺序的维护完全交给 `lru::LruCache`。
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use ocfs2_core::cache::{BlockCache, DEFAULT_CACHE_SIZE};
//!
//! let mut cache = BlockCache::new(DEFAULT_CACHE_SIZE, 4096);
//! if cache.read_block(100).is_none() {
//!     device.read_blocks(100, 1, &mut buf)?;
//!     cache.insert(100, &buf);
//! }
//! ```
//!
//! # 内存分配要求
//!
//! 本模块依赖 `alloc` crate，需要用户提供全局分配器。

mod block_cache;

pub use block_cache::{BlockCache, CacheStats, DEFAULT_CACHE_SIZE};
