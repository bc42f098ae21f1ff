//! 稀疏位图
//!
//! 按 64 位块号索引的位图，只为出现过置位的区间分配内存。
//! 每个分片覆盖 [`CHUNK_BITS`] 个连续位，分片变空时立即释放。

use super::ops::{clear_bit, find_first_one, set_bit, test_bit};
use alloc::boxed::Box;
use alloc::collections::btree_map;
use alloc::collections::BTreeMap;
use alloc::vec;

/// 每个分片的字节数
const CHUNK_BYTES: usize = 4096;

/// 每个分片覆盖的位数
pub const CHUNK_BITS: u64 = (CHUNK_BYTES * 8) as u64;

struct Chunk {
    bits: Box<[u8]>,
    ones: u32,
}

impl Chunk {
    fn new() -> Self {
        Self {
            bits: vec![0u8; CHUNK_BYTES].into_boxed_slice(),
            ones: 0,
        }
    }
}

/// 把位号拆成（分片号，分片内偏移）
const fn split(bit: u64) -> (u64, u32) {
    (bit / CHUNK_BITS, (bit % CHUNK_BITS) as u32)
}

/// 稀疏位图
#[derive(Default)]
pub struct SparseBitmap {
    chunks: BTreeMap<u64, Chunk>,
    ones: u64,
}

impl SparseBitmap {
    /// 创建空位图
    pub fn new() -> Self {
        Self::default()
    }

    /// 测试某一位
    pub fn test(&self, bit: u64) -> bool {
        let (idx, off) = split(bit);
        self.chunks
            .get(&idx)
            .is_some_and(|chunk| test_bit(&chunk.bits, off))
    }

    /// 设置某一位，返回设置前的值
    pub fn set(&mut self, bit: u64) -> bool {
        let (idx, off) = split(bit);
        let chunk = self.chunks.entry(idx).or_insert_with(Chunk::new);
        if test_bit(&chunk.bits, off) {
            return true;
        }
        if set_bit(&mut chunk.bits, off).is_ok() {
            chunk.ones += 1;
            self.ones += 1;
        }
        false
    }

    /// 清除某一位，返回清除前的值
    pub fn clear(&mut self, bit: u64) -> bool {
        let (idx, off) = split(bit);
        let Some(chunk) = self.chunks.get_mut(&idx) else {
            return false;
        };
        if !test_bit(&chunk.bits, off) {
            return false;
        }
        if clear_bit(&mut chunk.bits, off).is_ok() {
            chunk.ones -= 1;
            self.ones -= 1;
        }
        if chunk.ones == 0 {
            self.chunks.remove(&idx);
        }
        true
    }

    /// 被设置的位数
    pub fn count(&self) -> u64 {
        self.ones
    }

    /// 是否没有任何位被设置
    pub fn is_empty(&self) -> bool {
        self.ones == 0
    }

    /// 清除全部位并释放所有分片
    pub fn clear_all(&mut self) {
        self.chunks.clear();
        self.ones = 0;
    }

    /// 按升序遍历被设置的位
    pub fn iter(&self) -> SparseBitmapIter<'_> {
        SparseBitmapIter {
            chunks: self.chunks.iter(),
            current: None,
            next_off: 0,
        }
    }
}

/// [`SparseBitmap::iter`] 返回的迭代器
pub struct SparseBitmapIter<'a> {
    chunks: btree_map::Iter<'a, u64, Chunk>,
    current: Option<(u64, &'a Chunk)>,
    next_off: u32,
}

impl Iterator for SparseBitmapIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if let Some((idx, chunk)) = self.current {
                if let Some(off) = find_first_one(&chunk.bits, self.next_off, CHUNK_BITS as u32) {
                    self.next_off = off + 1;
                    return Some(idx * CHUNK_BITS + off as u64);
                }
            }
            let (idx, chunk) = self.chunks.next()?;
            self.current = Some((*idx, chunk));
            self.next_off = 0;
        }
    }
}
