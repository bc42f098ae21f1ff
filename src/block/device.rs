//! 块设备核心类型

use crate::cache::BlockCache;
use crate::error::{Error, ErrorKind, Result};
use crate::fs::FsConfig;

/// 块设备接口
///
/// 实现此 trait 以提供底层块设备访问。检查和修复工具默认只读打开设备，
/// 因此这里只要求读接口。
///
/// # 示例
///
/// ```rust,ignore
/// use ocfs2_core::{BlockDevice, Result};
///
/// struct ImageFile {
///     // ...
/// }
///
/// impl BlockDevice for ImageFile {
///     fn block_size(&self) -> u32 {
///         4096
///     }
///
///     fn total_blocks(&self) -> u64 {
///         1 << 20
///     }
///
///     fn read_blocks(&mut self, blkno: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
///         // 从镜像文件读取
///         Ok(count as usize * 4096)
///     }
/// }
/// ```
pub trait BlockDevice {
    /// 块大小（字节）
    fn block_size(&self) -> u32;

    /// 总块数
    fn total_blocks(&self) -> u64;

    /// 读取连续的块
    ///
    /// # 参数
    ///
    /// * `blkno` - 起始块号
    /// * `count` - 要读取的块数
    /// * `buf` - 目标缓冲区（大小至少为 count * block_size）
    ///
    /// # 返回
    ///
    /// 成功返回实际读取的字节数
    fn read_blocks(&mut self, blkno: u64, count: u32, buf: &mut [u8]) -> Result<usize>;
}

/// 块设备包装器
///
/// 在 [`BlockDevice`] 之上提供单块读取、可选的 LRU 读缓存和统计信息。
///
/// # 并发使用
///
/// BlockDev 本身不包含内部锁，每个工作线程持有自己的实例。
pub struct BlockDev<D> {
    /// 底层设备
    device: D,
    /// 逻辑读取次数（包括缓存命中）
    read_count: u64,
    /// 物理读取次数（实际设备操作）
    physical_read_count: u64,
    /// 块缓存（可选）
    pub(super) bcache: Option<BlockCache>,
}

impl<D: BlockDevice> BlockDev<D> {
    /// 创建新的块设备包装器（无缓存）
    pub fn new(device: D) -> Result<Self> {
        let block_size = device.block_size();
        if !block_size.is_power_of_two() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Block size must be a power of two",
            ));
        }

        Ok(Self {
            device,
            read_count: 0,
            physical_read_count: 0,
            bcache: None,
        })
    }

    /// 按配置创建块设备包装器
    ///
    /// `bcache_size` 为 0 时不启用缓存
    pub fn with_config(device: D, config: &FsConfig) -> Result<Self> {
        let mut bd = Self::new(device)?;
        if config.bcache_size > 0 {
            let block_size = bd.block_size() as usize;
            bd.bcache = Some(BlockCache::new(config.bcache_size as usize, block_size));
        }
        Ok(bd)
    }

    /// 获取底层设备的引用
    pub fn device(&self) -> &D {
        &self.device
    }

    /// 获取底层设备的可变引用
    ///
    /// 绕过缓存直接修改设备内容后，调用方需要自行 [`invalidate`](Self::invalidate)
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// 获取块大小
    pub fn block_size(&self) -> u32 {
        self.device.block_size()
    }

    /// 获取总块数
    pub fn total_blocks(&self) -> u64 {
        self.device.total_blocks()
    }

    /// 获取逻辑读取次数（包括缓存命中）
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// 获取物理读取次数（实际设备操作）
    pub fn physical_read_count(&self) -> u64 {
        self.physical_read_count
    }

    /// 获取缓存引用（未启用缓存时为 None）
    pub fn cache(&self) -> Option<&BlockCache> {
        self.bcache.as_ref()
    }

    /// 丢弃某个块的缓存副本
    pub fn invalidate(&mut self, blkno: u64) {
        if let Some(cache) = &mut self.bcache {
            cache.invalidate(blkno);
        }
    }

    // 内部辅助方法

    /// 增加读计数
    pub(super) fn inc_read_count(&mut self) {
        self.read_count += 1;
    }

    /// 增加物理读计数
    pub(super) fn inc_physical_read_count(&mut self) {
        self.physical_read_count += 1;
    }
}
