//! Inode 级 API
//!
//! - [`CachedInode`] - 从磁盘读入的 inode 副本，可挂载 extent map
//! - [`FsConfig`] - 访问配置

mod cached_inode;
mod types;

pub use cached_inode::CachedInode;
pub use types::FsConfig;
