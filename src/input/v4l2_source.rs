// 该文件是 Goutu （构图） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头输入
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

use std::{collections::HashMap, pin::Pin, time::Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use v4l::{
  FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, prelude::*, video::Capture,
};

use crate::{FromUrl, FromUrlWithScheme, input::Frame};

const V4L2_INPUT_SCHEME: &str = "v4l";
const V4L2_DEFAULT_WIDTH: u32 = 640;
const V4L2_DEFAULT_HEIGHT: u32 = 480;
const V4L2_BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum V4l2InputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法打开设备 {0}: {1}")]
  DeviceOpenError(String, std::io::Error),
  #[error("设备 I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("设备不支持 YUYV 格式，实际为 {0}")]
  UnsupportedFormat(String),
  #[error("YUYV 每 4 字节描述两个像素，宽度必须为偶数，实际为 {0}")]
  OddWidth(u32),
  #[error("缓冲区大小不符: 期望 {expected} 字节, 实际 {actual} 字节")]
  BufferSizeMismatch { expected: usize, actual: usize },
}

/// V4L2 摄像头，以 YUYV 采集并转换为 RGB
///
/// `Stream` 借用 `Device`，设备放在 `Pin<Box>` 中以保证地址不变。
pub struct V4l2Input {
  // 字段顺序决定析构顺序，stream 必须先于 device 释放
  stream: Stream<'static>,
  _device: Pin<Box<Device>>,
  width: u32,
  height: u32,
  index: u64,
  opened_at: Instant,
}

impl V4l2Input {
  pub fn open(path: &str, width: u32, height: u32) -> Result<Self, V4l2InputError> {
    info!("打开 V4L2 设备: {}", path);
    let device = Box::pin(
      Device::with_path(path).map_err(|e| V4l2InputError::DeviceOpenError(path.to_string(), e))?,
    );

    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(V4l2InputError::UnsupportedFormat(format.fourcc.to_string()));
    }
    if format.width % 2 != 0 {
      return Err(V4l2InputError::OddWidth(format.width));
    }
    info!("V4L2 采集格式: {}x{} YUYV", format.width, format.height);

    // SAFETY: device 被 Pin<Box> 固定在堆上，不会移动；
    // stream 与 device 存放在同一结构体中，并先于 device 析构
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(&*device);
      Stream::with_buffers(device_static, Type::VideoCapture, V4L2_BUFFER_COUNT)?
    };

    Ok(Self {
      stream,
      _device: device,
      width: format.width,
      height: format.height,
      index: 0,
      opened_at: Instant::now(),
    })
  }
}

impl FromUrl for V4l2Input {
  type Error = V4l2InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != V4L2_INPUT_SCHEME {
      return Err(V4l2InputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let width = query
      .get("width")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(V4L2_DEFAULT_WIDTH);
    let height = query
      .get("height")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(V4L2_DEFAULT_HEIGHT);

    Self::open(url.path(), width, height)
  }
}

impl FromUrlWithScheme for V4l2Input {
  const SCHEME: &'static str = V4L2_INPUT_SCHEME;
}

/// YUYV 4:2:2 转 RGB，每 4 字节描述两个像素
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, V4l2InputError> {
  if width % 2 != 0 {
    return Err(V4l2InputError::OddWidth(width));
  }
  let expected = (width * height * 2) as usize;
  if yuyv.len() < expected {
    return Err(V4l2InputError::BufferSizeMismatch {
      expected,
      actual: yuyv.len(),
    });
  }

  let mut rgb = Vec::with_capacity((width * height * 3) as usize);
  for chunk in yuyv[..expected].chunks_exact(4) {
    let u = f32::from(chunk[1]) - 128.0;
    let v = f32::from(chunk[3]) - 128.0;
    for y in [chunk[0], chunk[2]] {
      let y = f32::from(y);
      rgb.extend_from_slice(&[
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
      ]);
    }
  }

  let actual = rgb.len();
  RgbImage::from_raw(width, height, rgb).ok_or(V4l2InputError::BufferSizeMismatch {
    expected: (width * height * 3) as usize,
    actual,
  })
}

impl Iterator for V4l2Input {
  type Item = Result<Frame, V4l2InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let (buffer, meta) = match self.stream.next() {
      Ok(captured) => captured,
      Err(e) => return Some(Err(e.into())),
    };
    debug!("V4L2 帧 #{}: {} 字节", meta.sequence, meta.bytesused);

    let frame = yuyv_to_rgb(buffer, self.width, self.height).map(|image| Frame {
      image,
      index: self.index,
      timestamp_ms: self.opened_at.elapsed().as_millis() as u64,
    });
    self.index += 1;
    Some(frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn neutral_chroma_gives_grey_pixels() {
    let yuyv = [16, 128, 235, 128, 128, 128, 128, 128];
    let image = yuyv_to_rgb(&yuyv, 4, 1).unwrap();
    assert_eq!(image.get_pixel(0, 0).0, [16, 16, 16]);
    assert_eq!(image.get_pixel(1, 0).0, [235, 235, 235]);
    assert_eq!(image.get_pixel(3, 0).0, [128, 128, 128]);
  }

  #[test]
  fn odd_width_is_rejected() {
    let result = yuyv_to_rgb(&[128; 12], 3, 2);
    assert!(matches!(result, Err(V4l2InputError::OddWidth(3))));
  }

  #[test]
  fn short_buffer_is_rejected() {
    let result = yuyv_to_rgb(&[0; 6], 4, 1);
    assert!(matches!(
      result,
      Err(V4l2InputError::BufferSizeMismatch {
        expected: 8,
        actual: 6
      })
    ));
  }
}
