//! 块设备抽象
//!
//! 提供块设备接口和块级读取操作。
//! block/device.rs 定义设备接口和包装器，block/io.rs 提供经过缓存的单块读取。
//! inode 块和 extent block 都通过这里读入。

mod device;
mod io;

pub use device::{BlockDev, BlockDevice};
