//! 配置类型

use crate::cache::DEFAULT_CACHE_SIZE;

/// 文件系统访问配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// 块缓存大小（块数），0 表示不缓存
    pub bcache_size: u32,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            bcache_size: DEFAULT_CACHE_SIZE as u32,
        }
    }
}
