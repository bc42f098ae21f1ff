//! 缓存的 inode
//!
//! 对应检查工具里的 "cached inode"：从磁盘读入的 inode 副本，
//! 可选地挂上一份 extent map。

use crate::{
    block::{BlockDev, BlockDevice},
    consts::*,
    error::{Error, ErrorKind, Result},
    extent::{DiskExtentWalker, ExtentMap, ExtentWalker},
    geometry::Geometry,
    types::{ocfs2_dinode, ExtentList, InodeFlags},
};
use alloc::vec;

/// 缓存的 inode
///
/// extent map 不会反向引用 inode，而是保存一份簇数副本；
/// 修改簇数必须经过 [`set_clusters`](Self::set_clusters) 才能保持两者一致。
///
/// # 示例
///
/// ```rust,ignore
/// let mut ci = CachedInode::read(&mut bdev, geometry, blkno)?;
/// ci.load_extent_map(&mut bdev)?;
/// let (p_cpos, _) = ci.extent_map().unwrap().translate_clusters(0, 1)?;
/// ci.drop_extent_map()?;
/// ```
#[derive(Debug, Clone)]
pub struct CachedInode {
    /// inode 所在块号
    blkno: u64,
    geometry: Geometry,
    dinode: ocfs2_dinode,
    /// 内联的根 extent 列表，特殊 inode 没有
    root: Option<ExtentList>,
    map: Option<ExtentMap>,
}

impl CachedInode {
    /// 从设备读取 inode
    ///
    /// # 错误
    ///
    /// - `InvalidArgument` - 块号落在 superblock 及之前，或设备块大小与几何参数不符
    /// - `Corrupted` - 签名错误、自身块号不符或内联 extent 列表损坏
    pub fn read<D: BlockDevice>(
        bdev: &mut BlockDev<D>,
        geometry: Geometry,
        blkno: u64,
    ) -> Result<Self> {
        if blkno <= OCFS2_SUPER_BLOCK_BLKNO {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Inode block number too small",
            ));
        }
        if bdev.block_size() != geometry.block_size() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Device block size does not match geometry",
            ));
        }

        let mut buf = vec![0u8; geometry.block_size() as usize];
        bdev.read_block(blkno, &mut buf)?;

        let dinode = ocfs2_dinode::from_bytes(&buf)?;
        if !dinode.is_valid() {
            log::warn!("[INODE] bad inode signature at block {}", blkno);
            return Err(Error::new(ErrorKind::Corrupted, "Bad inode signature"));
        }
        if dinode.i_blkno != blkno {
            log::warn!(
                "[INODE] inode at block {} claims to be at {}",
                blkno,
                dinode.i_blkno
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Inode block number mismatch",
            ));
        }

        let root = if dinode.has_extent_list() {
            Some(ExtentList::parse(
                &buf[OCFS2_DINODE_ID2_OFFSET..],
                geometry.extent_recs_per_inode(),
            )?)
        } else {
            None
        };

        Ok(Self {
            blkno,
            geometry,
            dinode,
            root,
            map: None,
        })
    }

    /// inode 所在块号
    pub fn blkno(&self) -> u64 {
        self.blkno
    }

    /// 磁盘 inode
    pub fn dinode(&self) -> &ocfs2_dinode {
        &self.dinode
    }

    /// 簇数
    pub fn clusters(&self) -> u32 {
        self.dinode.i_clusters
    }

    /// 链接数
    pub fn links_count(&self) -> u16 {
        self.dinode.i_links_count
    }

    /// 标志
    pub fn flags(&self) -> InodeFlags {
        self.dinode.i_flags
    }

    /// 内联的根 extent 列表
    pub fn extent_list(&self) -> Option<&ExtentList> {
        self.root.as_ref()
    }

    /// 已加载的 extent map
    pub fn extent_map(&self) -> Option<&ExtentMap> {
        self.map.as_ref()
    }

    /// 已加载的 extent map（可变）
    pub fn extent_map_mut(&mut self) -> Option<&mut ExtentMap> {
        self.map.as_mut()
    }

    /// 修改簇数，同步到已加载的 extent map
    ///
    /// 缩小时不会自动截断映射
    pub fn set_clusters(&mut self, clusters: u32) {
        self.dinode.i_clusters = clusters;
        if let Some(map) = self.map.as_mut() {
            map.set_total_clusters(clusters);
        }
    }

    fn check_can_load(&self) -> Result<&ExtentList> {
        if self.map.is_some() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "Extent map already loaded",
            ));
        }
        self.root.as_ref().ok_or(Error::new(
            ErrorKind::InvalidArgument,
            "Inode has no extent list",
        ))
    }

    /// 从设备遍历 extent 树并加载 extent map
    ///
    /// 失败时不挂载任何映射
    pub fn load_extent_map<D: BlockDevice>(&mut self, bdev: &mut BlockDev<D>) -> Result<()> {
        let root = self.check_can_load()?;
        let map = {
            let mut walker = DiskExtentWalker::new(bdev, self.geometry, root, self.blkno);
            ExtentMap::load(self.geometry, self.dinode.i_clusters, &mut walker)?
        };
        self.map = Some(map);
        Ok(())
    }

    /// 用给定的遍历器加载 extent map
    pub fn load_extent_map_with(&mut self, walker: &mut dyn ExtentWalker) -> Result<()> {
        self.check_can_load()?;
        let map = ExtentMap::load(self.geometry, self.dinode.i_clusters, walker)?;
        self.map = Some(map);
        Ok(())
    }

    /// 丢弃已加载的 extent map
    pub fn drop_extent_map(&mut self) -> Result<()> {
        let mut map = self.map.take().ok_or(Error::new(
            ErrorKind::InvalidArgument,
            "No extent map loaded",
        ))?;
        map.free();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::{ExtentVisit, WalkControl};
    use crate::test_image::{write_extent_block, write_inode, MemDevice};
    use crate::types::ocfs2_extent_rec;

    fn rec(cpos: u32, clusters: u32, blkno: u64) -> ocfs2_extent_rec {
        ocfs2_extent_rec::new(cpos, clusters, blkno)
    }

    fn geometry() -> Geometry {
        Geometry::new(9, 12).unwrap()
    }

    /// 深度为 1 的 inode：根 -> {eb 20, eb 21}
    fn image() -> BlockDev<MemDevice> {
        let mut dev = MemDevice::new(512, 64);
        write_inode(&mut dev, 10, 30, 1, &[rec(0, 20, 20), rec(20, 10, 21)]);
        write_extent_block(&mut dev, 20, 0, &[rec(0, 10, 100), rec(10, 10, 200)]);
        write_extent_block(&mut dev, 21, 0, &[rec(20, 10, 300)]);
        BlockDev::new(dev).unwrap()
    }

    #[test]
    fn test_read_inode() {
        let mut bdev = image();
        let ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        assert_eq!(ci.blkno(), 10);
        assert_eq!(ci.clusters(), 30);
        assert_eq!(ci.links_count(), 1);
        assert!(ci.flags().contains(InodeFlags::VALID));
        assert_eq!(ci.extent_list().unwrap().recs.len(), 2);
        assert!(ci.extent_map().is_none());
    }

    #[test]
    fn test_read_rejects_bad_input() {
        let mut bdev = image();
        let err = CachedInode::read(&mut bdev, geometry(), 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // 空块没有签名
        let err = CachedInode::read(&mut bdev, geometry(), 30).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);

        let g = Geometry::new(12, 12).unwrap();
        let err = CachedInode::read(&mut bdev, g, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_read_blkno_mismatch() {
        let mut dev = MemDevice::new(512, 64);
        write_inode(&mut dev, 10, 30, 0, &[]);
        let copy = dev.block_mut(10).to_vec();
        dev.block_mut(11).copy_from_slice(&copy);
        let mut bdev = BlockDev::new(dev).unwrap();

        let err = CachedInode::read(&mut bdev, geometry(), 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn test_load_and_translate() {
        let mut bdev = image();
        let mut ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        ci.load_extent_map(&mut bdev).unwrap();

        let map = ci.extent_map().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.mapped_clusters(), 30);
        assert_eq!(map.translate_blocks(8 * 12 + 1, 1).unwrap(), (217, 63));

        let err = ci.load_extent_map(&mut bdev).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        ci.drop_extent_map().unwrap();
        assert!(ci.extent_map().is_none());
        assert!(ci.drop_extent_map().is_err());
    }

    #[test]
    fn test_load_failure_leaves_no_map() {
        let mut bdev = image();
        let mut ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        bdev.device_mut().block_mut(21)[0] = 0;

        let err = ci.load_extent_map(&mut bdev).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
        assert!(ci.extent_map().is_none());
    }

    #[test]
    fn test_load_with_custom_walker() {
        struct OneRecord;
        impl ExtentWalker for OneRecord {
            fn walk(
                &mut self,
                visit: &mut dyn FnMut(&ExtentVisit) -> WalkControl,
            ) -> Result<()> {
                visit(&ExtentVisit {
                    rec: ocfs2_extent_rec::new(0, 4, 400),
                    tree_depth: 0,
                    ccount: 0,
                    ref_blkno: 10,
                    ref_recno: 0,
                });
                Ok(())
            }
        }

        let mut bdev = image();
        let mut ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        ci.load_extent_map_with(&mut OneRecord).unwrap();
        assert_eq!(ci.extent_map().unwrap().lookup(3).unwrap().e_blkno, 400);
    }

    #[test]
    fn test_set_clusters_syncs_map() {
        let mut bdev = image();
        let mut ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        ci.load_extent_map(&mut bdev).unwrap();

        ci.set_clusters(15);
        assert_eq!(ci.clusters(), 15);

        let map = ci.extent_map_mut().unwrap();
        assert_eq!(map.total_clusters(), 15);
        map.truncate(15);
        map.lookup_mut(14).unwrap().shrink_to(5).unwrap();
        assert_eq!(map.mapped_clusters(), 15);
        assert!(map.translate_clusters(15, 1).is_err());
    }

    #[test]
    fn test_inode_without_extent_list() {
        let mut dev = MemDevice::new(512, 64);
        write_inode(&mut dev, 10, 0, 0, &[]);
        let mut buf = dev.block_mut(10).to_vec();
        let mut dinode = ocfs2_dinode::from_bytes(&buf).unwrap();
        dinode.i_flags |= InodeFlags::SYSTEM | InodeFlags::BITMAP | InodeFlags::CHAIN;
        dinode.write_to(&mut buf).unwrap();
        dev.block_mut(10).copy_from_slice(&buf);
        let mut bdev = BlockDev::new(dev).unwrap();

        let mut ci = CachedInode::read(&mut bdev, geometry(), 10).unwrap();
        assert!(ci.extent_list().is_none());
        let err = ci.load_extent_map(&mut bdev).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
