//! 块 I/O 操作实现

use super::{BlockDev, BlockDevice};
use crate::error::{Error, ErrorKind, Result};

impl<D: BlockDevice> BlockDev<D> {
    /// 读取单个块
    ///
    /// 如果启用了缓存，优先从缓存读取；缓存未命中则从设备读取并填充缓存。
    ///
    /// # 参数
    ///
    /// * `blkno` - 块号
    /// * `buf` - 目标缓冲区（大小至少为 block_size）
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数
    pub fn read_block(&mut self, blkno: u64, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.block_size() as usize;

        if buf.len() < block_size {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "buffer too small for block",
            ));
        }

        if blkno >= self.total_blocks() {
            log::warn!(
                "[BLOCK] read of block {} beyond device end {}",
                blkno,
                self.total_blocks()
            );
            return Err(Error::new(
                ErrorKind::Io,
                "Block number beyond end of device",
            ));
        }

        self.inc_read_count();

        if let Some(cache) = &mut self.bcache {
            if let Some(data) = cache.read_block(blkno) {
                buf[..block_size].copy_from_slice(data);
                return Ok(block_size);
            }
        }

        let read = self.device_mut().read_blocks(blkno, 1, &mut buf[..block_size])?;
        if read < block_size {
            return Err(Error::new(ErrorKind::Io, "Short read from device"));
        }
        self.inc_physical_read_count();

        if let Some(cache) = &mut self.bcache {
            cache.insert(blkno, &buf[..block_size]);
        }

        Ok(block_size)
    }
}
