//! Inode 引用计数
//!
//! 检查工具遍历目录树时，为每个 inode 块号记录被引用的次数，
//! 再与磁盘上的 `i_links_count` 对比。
//!
//! 绝大多数 inode 只被引用一次，因此计数分两层存放：
//!
//! - 计数为 1 的块号放在 [`SparseBitmap`] 里
//! - 计数 >= 2 的块号放在有序树里
//!
//! 任意时刻一个块号最多出现在其中一层；两层都没有即计数为 0。

use crate::bitmap::{SparseBitmap, SparseBitmapIter};
use crate::fatal::{default_fatal_handler, FatalError, FatalHandler};
use alloc::collections::btree_map;
use alloc::collections::BTreeMap;
use core::iter::Peekable;

/// Inode 引用计数器
pub struct Icount {
    single: SparseBitmap,
    multiple: BTreeMap<u64, u16>,
    fatal: FatalHandler,
}

impl Default for Icount {
    fn default() -> Self {
        Self::new()
    }
}

impl Icount {
    /// 创建空计数器，使用默认致命错误处理器
    pub fn new() -> Self {
        Self::with_fatal_handler(default_fatal_handler)
    }

    /// 创建空计数器，使用给定的致命错误处理器
    pub fn with_fatal_handler(fatal: FatalHandler) -> Self {
        Self {
            single: SparseBitmap::new(),
            multiple: BTreeMap::new(),
            fatal,
        }
    }

    /// 设置计数
    pub fn set(&mut self, blkno: u64, count: u16) {
        match count {
            0 => {
                self.single.clear(blkno);
                self.multiple.remove(&blkno);
            }
            1 => {
                self.single.set(blkno);
                self.multiple.remove(&blkno);
            }
            _ => {
                self.single.clear(blkno);
                self.multiple.insert(blkno, count);
            }
        }
    }

    /// 读取计数，未记录的块号为 0
    pub fn get(&self, blkno: u64) -> u16 {
        if self.single.test(blkno) {
            return 1;
        }
        self.multiple.get(&blkno).copied().unwrap_or(0)
    }

    /// 按增量调整计数
    ///
    /// 结果为负或超出 u16 时调用致命错误处理器，不会返回。
    pub fn delta(&mut self, blkno: u64, delta: i32) {
        if delta == 0 {
            return;
        }

        let prev = self.get(blkno);
        let next = prev as i64 + delta as i64;

        if next < 0 {
            log::error!(
                "[ICOUNT] count for {} would drop below zero ({} {:+})",
                blkno,
                prev,
                delta
            );
            (self.fatal)(&FatalError::NegativeCount {
                blkno,
                count: prev,
                delta,
            });
        }
        if next > u16::MAX as i64 {
            log::error!(
                "[ICOUNT] count for {} would overflow ({} {:+})",
                blkno,
                prev,
                delta
            );
            (self.fatal)(&FatalError::CountOverflow {
                blkno,
                count: prev,
                delta,
            });
        }

        self.set(blkno, next as u16);
    }

    /// 释放所有计数，计数器回到空状态
    pub fn free(&mut self) {
        log::debug!(
            "[ICOUNT] releasing {} single and {} multiple entries",
            self.single.count(),
            self.multiple.len()
        );
        self.single.clear_all();
        self.multiple.clear();
    }

    /// 计数非 0 的块号数量
    pub fn len(&self) -> usize {
        self.single.count() as usize + self.multiple.len()
    }

    /// 是否没有任何非 0 计数
    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multiple.is_empty()
    }

    /// 按块号升序遍历所有非 0 计数
    pub fn iter(&self) -> IcountIter<'_> {
        IcountIter {
            single: self.single.iter().peekable(),
            multiple: self.multiple.iter().peekable(),
        }
    }
}

/// [`Icount::iter`] 返回的迭代器，合并两层存储
pub struct IcountIter<'a> {
    single: Peekable<SparseBitmapIter<'a>>,
    multiple: Peekable<btree_map::Iter<'a, u64, u16>>,
}

impl Iterator for IcountIter<'_> {
    type Item = (u64, u16);

    fn next(&mut self) -> Option<(u64, u16)> {
        let take_single = match (self.single.peek(), self.multiple.peek()) {
            (Some(&s), Some(&(&m, _))) => s < m,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if take_single {
            self.single.next().map(|blkno| (blkno, 1))
        } else {
            self.multiple.next().map(|(&blkno, &count)| (blkno, count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_set_get() {
        let mut ic = Icount::new();
        assert_eq!(ic.get(100), 0);

        ic.set(100, 1);
        assert_eq!(ic.get(100), 1);
        assert!(ic.single.test(100));

        ic.set(100, 5);
        assert_eq!(ic.get(100), 5);
        assert!(!ic.single.test(100));

        ic.set(100, 0);
        assert_eq!(ic.get(100), 0);
        assert!(ic.is_empty());
    }

    #[test]
    fn test_delta_moves_between_tiers() {
        let mut ic = Icount::new();
        ic.delta(1234, 1);
        assert_eq!(ic.get(1234), 1);
        assert!(ic.single.test(1234));
        assert!(ic.multiple.is_empty());

        ic.delta(1234, 1);
        assert_eq!(ic.get(1234), 2);
        assert!(!ic.single.test(1234));
        assert_eq!(ic.multiple.get(&1234), Some(&2));

        ic.delta(1234, -1);
        assert_eq!(ic.get(1234), 1);
        assert!(ic.single.test(1234));
        assert!(ic.multiple.is_empty());

        ic.delta(1234, -1);
        assert_eq!(ic.get(1234), 0);
        assert!(ic.is_empty());
    }

    #[test]
    fn test_delta_clears_both_tiers() {
        let mut ic = Icount::new();
        ic.set(42, 3);
        ic.delta(42, -3);
        assert_eq!(ic.get(42), 0);
        assert!(!ic.single.test(42));
        assert!(ic.multiple.is_empty());
    }

    #[test]
    fn test_delta_zero_is_noop() {
        let mut ic = Icount::new();
        ic.delta(7, 0);
        assert!(ic.is_empty());
    }

    #[test]
    fn test_delta_to_max() {
        let mut ic = Icount::new();
        ic.set(9, u16::MAX - 1);
        ic.delta(9, 1);
        assert_eq!(ic.get(9), u16::MAX);
    }

    #[test]
    #[should_panic(expected = "fatal invariant violation")]
    fn test_delta_negative_is_fatal() {
        let mut ic = Icount::new();
        ic.delta(1234, -1);
    }

    #[test]
    #[should_panic(expected = "fatal invariant violation")]
    fn test_delta_overflow_is_fatal() {
        let mut ic = Icount::new();
        ic.set(1, u16::MAX);
        ic.delta(1, 1);
    }

    #[test]
    #[should_panic(expected = "custom handler")]
    fn test_custom_fatal_handler() {
        fn handler(err: &FatalError) -> ! {
            panic!("custom handler: {}", err)
        }
        let mut ic = Icount::with_fatal_handler(handler);
        ic.set(3, 2);
        ic.delta(3, -3);
    }

    #[test]
    fn test_iter_merges_tiers() {
        let mut ic = Icount::new();
        ic.set(50, 3);
        ic.set(10, 1);
        ic.set(30, 2);
        ic.set(40, 1);
        ic.set(1 << 40, 1);

        let all: Vec<(u64, u16)> = ic.iter().collect();
        assert_eq!(all, vec![(10, 1), (30, 2), (40, 1), (50, 3), (1 << 40, 1)]);
        assert_eq!(ic.len(), 5);
    }

    #[test]
    fn test_free() {
        let mut ic = Icount::new();
        ic.set(1, 1);
        ic.set(2, 2);
        ic.free();
        assert!(ic.is_empty());
        assert_eq!(ic.get(1), 0);
        assert_eq!(ic.get(2), 0);

        ic.delta(1, 1);
        assert_eq!(ic.get(1), 1);
    }
}
