//! Bitmap 字节级操作
//!
//! 位 `i` 存放在 `bitmap[i / 8]` 的第 `i % 8` 位（小端位序，与磁盘位图一致）。

use crate::error::{Error, ErrorKind, Result};

/// 测试位图中某一位是否被设置
///
/// 超出位图范围的位视为未设置
pub fn test_bit(bitmap: &[u8], index: u32) -> bool {
    let byte_index = (index / 8) as usize;
    let bit_offset = (index % 8) as u8;

    if byte_index >= bitmap.len() {
        return false;
    }

    (bitmap[byte_index] & (1 << bit_offset)) != 0
}

/// 设置位图中的某一位
///
/// # 返回
///
/// 成功返回 ()，如果索引超出范围返回错误
pub fn set_bit(bitmap: &mut [u8], index: u32) -> Result<()> {
    let byte_index = (index / 8) as usize;
    let bit_offset = (index % 8) as u8;

    if byte_index >= bitmap.len() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            "Bitmap index out of range",
        ));
    }

    bitmap[byte_index] |= 1 << bit_offset;
    Ok(())
}

/// 清除位图中的某一位
///
/// # 返回
///
/// 成功返回 ()，如果索引超出范围返回错误
pub fn clear_bit(bitmap: &mut [u8], index: u32) -> Result<()> {
    let byte_index = (index / 8) as usize;
    let bit_offset = (index % 8) as u8;

    if byte_index >= bitmap.len() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            "Bitmap index out of range",
        ));
    }

    bitmap[byte_index] &= !(1 << bit_offset);
    Ok(())
}

/// 在 `[start, end)` 中查找第一个被设置的位
///
/// 整字节为 0 时直接跳过，稀疏位图上的遍历因此主要取决于置位数量
pub fn find_first_one(bitmap: &[u8], start: u32, end: u32) -> Option<u32> {
    let max_bits = (bitmap.len() * 8) as u32;
    let end = end.min(max_bits);
    let mut i = start;

    while i < end {
        let byte = bitmap[(i / 8) as usize] >> (i % 8);
        if byte == 0 {
            // 跳到下一个字节边界
            i = (i / 8 + 1) * 8;
            continue;
        }
        let found = i + byte.trailing_zeros();
        return (found < end).then_some(found);
    }

    None
}
