//! 错误类型定义
//!
//! 提供 extent map、icount 以及磁盘结构解析的错误类型。
//!
//! 内存分配失败和计数器不变量被破坏不在这里表示：前者由全局分配器直接终止进程，
//! 后者交给 [`crate::fatal`] 中的致命错误处理器。

use core::fmt;

/// 操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 无效参数（范围超出 inode 的簇数等），不会修改任何状态
    InvalidArgument,
    /// extent 结构冲突：深度/内容不兼容的重叠记录，或查找结果跨越区间
    InvalidExtentLookup,
    /// 查询的簇/块落在空洞中
    ExtentNotFound,
    /// 磁盘元数据损坏
    Corrupted,
    /// I/O 错误
    Io,
    /// 内存不足
    ///
    /// 本库自身不产生此错误（分配失败由全局分配器终止），
    /// 供上层检查工具映射自己的失败时使用。
    NoMemory,
    /// 内部错误
    ///
    /// 本库自身不产生此错误，供上层检查工具使用。
    InternalFailure,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
