// 该文件是 Goutu （构图） 项目的一部分。
// src/output/photo_store.rs - 照片保存
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  fmt::Display,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Local, TimeZone};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PhotoStoreError {
  #[error("无法创建目录 {0}: {1}")]
  CreateDirError(PathBuf, std::io::Error),
  #[error("图像编码或写入错误: {0}")]
  ImageError(#[from] image::ImageError),
}

pub trait PhotoStore {
  /// 保存照片并返回文件路径
  fn save(&self, image: &RgbImage) -> Result<PathBuf, PhotoStoreError>;
}

/// `photo_YYYYMMDD_HHMMSS.jpg`
pub fn photo_file_name<Tz>(time: &DateTime<Tz>) -> String
where
  Tz: TimeZone,
  Tz::Offset: Display,
{
  time.format("photo_%Y%m%d_%H%M%S.jpg").to_string()
}

/// 以本地时间命名，保存到指定目录；同一秒内的多次保存会互相覆盖
#[derive(Debug, Clone)]
pub struct DirectoryPhotoStore {
  dir: PathBuf,
}

impl DirectoryPhotoStore {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self {
      dir: dir.as_ref().to_path_buf(),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }
}

impl PhotoStore for DirectoryPhotoStore {
  fn save(&self, image: &RgbImage) -> Result<PathBuf, PhotoStoreError> {
    std::fs::create_dir_all(&self.dir)
      .map_err(|e| PhotoStoreError::CreateDirError(self.dir.clone(), e))?;

    let path = self.dir.join(photo_file_name(&Local::now()));
    image.save(&path)?;
    debug!("写入 {}x{} 照片: {}", image.width(), image.height(), path.display());

    Ok(path)
  }
}
