//! 位图操作
//!
//! - [`ops`] - 字节切片上的位操作
//! - [`SparseBitmap`] - 以块号为索引的稀疏位图，用作引用计数的快速路径

pub mod ops;
mod sparse;

pub use sparse::{SparseBitmap, SparseBitmapIter, CHUNK_BITS};
