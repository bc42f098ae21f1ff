//! 块读缓存实现
//!
//! 只读场景下的块缓存：没有脏块，也就没有写回。
//! inode 块和 extent block 在一次检查过程中会被反复读取（同一个 extent block
//! 可能被多个遍历重复访问），缓存它们可以省掉大部分物理读。

use alloc::vec::Vec;
use core::num::NonZeroUsize;
use lru::LruCache;

/// 默认缓存块数量
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// 总访问次数
    pub total_accesses: u64,
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 被 LRU 驱逐的块数
    pub evictions: u64,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }
}

/// 块缓存
///
/// `lru::LruCache` 负责访问顺序和满时驱逐，这里只追加统计和块大小检查。
pub struct BlockCache {
    /// LRU缓存核心：块号 -> 块数据
    cache: LruCache<u64, Vec<u8>>,

    /// 块大小（字节）
    block_size: usize,

    /// 统计信息
    stats: CacheStats,
}

impl BlockCache {
    /// 创建块缓存
    ///
    /// # 参数
    ///
    /// * `capacity` - 最多缓存的块数（0 按 1 处理）
    /// * `block_size` - 块大小
    pub fn new(capacity: usize, block_size: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            block_size,
            stats: CacheStats::default(),
        }
    }

    /// 查找缓存块，命中时将其移到最近使用
    pub fn read_block(&mut self, blkno: u64) -> Option<&[u8]> {
        self.stats.total_accesses += 1;
        match self.cache.get(&blkno) {
            Some(data) => {
                self.stats.hits += 1;
                Some(data.as_slice())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// 放入一个块，满时驱逐最久未使用的块
    ///
    /// 数据按块大小截断
    pub fn insert(&mut self, blkno: u64, data: &[u8]) {
        let len = data.len().min(self.block_size);
        if let Some((evicted, _)) = self.cache.push(blkno, data[..len].to_vec()) {
            if evicted != blkno {
                self.stats.evictions += 1;
            }
        }
    }

    /// 丢弃一个块，返回它是否在缓存中
    pub fn invalidate(&mut self, blkno: u64) -> bool {
        self.cache.pop(&blkno).is_some()
    }

    /// 清空缓存
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// 当前缓存的块数
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// 缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 缓存容量（块数）
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// 统计信息
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
