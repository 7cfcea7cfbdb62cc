// 该文件是 Goutu （构图） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::time::Instant;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::Frame};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

const READ_IMAGE_FILE_SCHEME: &str = "image";

/// 将一张静态图片作为帧源，`?repeat=true` 时反复输出同一帧
pub struct ImageFileInput {
  image: RgbImage,
  repeat: bool,
  index: u64,
  opened_at: Instant,
}

impl ImageFileInput {
  pub fn new(image: RgbImage, repeat: bool) -> Self {
    Self {
      image,
      repeat,
      index: 0,
      opened_at: Instant::now(),
    }
  }
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != READ_IMAGE_FILE_SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        READ_IMAGE_FILE_SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let repeat = url
      .query_pairs()
      .any(|(k, v)| k == "repeat" && (v == "true" || v == "1"));

    let path = url.path();
    info!("读取图像文件: {}", path);
    let image = ImageReader::open(path)?.decode()?;

    Ok(ImageFileInput::new(image.into_rgb8(), repeat))
  }
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = READ_IMAGE_FILE_SCHEME;
}

impl Iterator for ImageFileInput {
  type Item = Result<Frame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.index > 0 && !self.repeat {
      return None;
    }

    let frame = Frame {
      image: self.image.clone(),
      index: self.index,
      timestamp_ms: self.opened_at.elapsed().as_millis() as u64,
    };
    self.index += 1;
    Some(Ok(frame))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn write_image(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("still.png");
    RgbImage::from_pixel(16, 12, Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();
    path
  }

  #[test]
  fn single_shot_yields_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir);
    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file://", "image:", 1)).unwrap();

    let frames: Vec<_> = ImageFileInput::from_url(&url).unwrap().collect();
    assert_eq!(frames.len(), 1);
    let frame = frames[0].as_ref().unwrap();
    assert_eq!(frame.index, 0);
    assert_eq!(frame.image.dimensions(), (16, 12));
    assert_eq!(frame.image.get_pixel(3, 3), &Rgb([10, 20, 30]));
  }

  #[test]
  fn repeat_keeps_producing_frames() {
    let input = ImageFileInput::new(RgbImage::new(4, 4), true);
    let indices: Vec<u64> = input.take(3).map(|f| f.unwrap().index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let url = Url::parse("image:/nonexistent/still.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }
}
