//! 致命错误策略
//!
//! 整个工具族约定：内存分配失败和计数器不变量被破坏都不是可恢复错误。
//! 分配失败由全局分配器直接终止进程；不变量被破坏则交给这里的处理器，
//! 处理器不能返回。
//!
//! 默认处理器记录错误日志后 panic。嵌入方可以通过
//! [`Icount::with_fatal_handler`](crate::icount::Icount::with_fatal_handler)
//! 换成自己的处理器（例如打印诊断后 `process::exit`）。

use core::fmt;

/// 不变量被破坏的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// 计数被减到负数
    NegativeCount {
        /// 块号
        blkno: u64,
        /// 修改前的计数
        count: u16,
        /// 变化量
        delta: i32,
    },
    /// 计数超出 u16
    CountOverflow {
        /// 块号
        blkno: u64,
        /// 修改前的计数
        count: u16,
        /// 变化量
        delta: i32,
    },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::NegativeCount { blkno, count, delta } => write!(
                f,
                "while dropping icount from {} by {} for inode {}",
                count, delta, blkno
            ),
            FatalError::CountOverflow { blkno, count, delta } => write!(
                f,
                "while raising icount from {} by {} for inode {}",
                count, delta, blkno
            ),
        }
    }
}

/// 致命错误处理器，不能返回
pub type FatalHandler = fn(&FatalError) -> !;

/// 默认处理器：记录错误后 panic
pub fn default_fatal_handler(err: &FatalError) -> ! {
    log::error!("[FATAL] {}", err);
    panic!("fatal invariant violation: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::NegativeCount {
            blkno: 1234,
            count: 0,
            delta: -1,
        };
        assert_eq!(
            err.to_string(),
            "while dropping icount from 0 by -1 for inode 1234"
        );
    }

    #[test]
    #[should_panic(expected = "fatal invariant violation")]
    fn test_default_handler_panics() {
        default_fatal_handler(&FatalError::CountOverflow {
            blkno: 1,
            count: u16::MAX,
            delta: 1,
        });
    }
}
