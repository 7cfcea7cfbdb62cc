// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/analysis.rs - 像素级画面分析
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

use image::{
  GrayImage, Luma, RgbImage,
  imageops::{self, FilterType},
};
use imageproc::edges::canny;

use crate::detection::Detection;

// 分析前将画面缩小到该宽度，控制每帧开销
const ANALYSIS_WIDTH: u32 = 320;
const CANNY_LOW_THRESHOLD: f32 = 50.0;
const CANNY_HIGH_THRESHOLD: f32 = 100.0;

/// 灰度化、缩放后的 Canny 边缘图，边缘像素为 255
pub(super) fn edge_map(frame: &RgbImage) -> GrayImage {
  let gray = imageops::grayscale(frame);
  if gray.width() < 3 || gray.height() < 3 {
    return GrayImage::new(gray.width(), gray.height());
  }

  let gray = if gray.width() > ANALYSIS_WIDTH {
    let height = (u64::from(gray.height()) * u64::from(ANALYSIS_WIDTH) / u64::from(gray.width()))
      .max(3) as u32;
    imageops::resize(&gray, ANALYSIS_WIDTH, height, FilterType::Triangle)
  } else {
    gray
  };

  canny(&gray, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD)
}

/// 清除检测框范围内的边缘
pub(super) fn mask_subject(edges: &mut GrayImage, subject: &Detection) {
  let (w, h) = (edges.width() as f32, edges.height() as f32);
  let x_min = (subject.left() * w).floor().max(0.0) as u32;
  let y_min = (subject.top() * h).floor().max(0.0) as u32;
  let x_max = ((subject.right() * w).ceil() as u32).min(edges.width());
  let y_max = ((subject.bottom() * h).ceil() as u32).min(edges.height());

  for y in y_min..y_max {
    for x in x_min..x_max {
      edges.put_pixel(x, y, Luma([0]));
    }
  }
}

/// 边缘像素的水平重心（归一化），没有边缘时返回 `None`
pub(super) fn edge_centroid_x(edges: &GrayImage) -> Option<f32> {
  let mut count = 0u64;
  let mut moment = 0f64;
  for (x, _, pixel) in edges.enumerate_pixels() {
    if pixel[0] > 0 {
      count += 1;
      moment += f64::from(x) + 0.5;
    }
  }

  if count == 0 {
    None
  } else {
    Some((moment / count as f64 / f64::from(edges.width())) as f32)
  }
}

#[cfg(test)]
pub(super) mod fixtures {
  use image::{Rgb, RgbImage};

  /// 上方明亮、下方暗的“天际线”画面
  pub fn horizon_at(width: u32, height: u32, row: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |_, y| {
      if y < row {
        Rgb([230, 230, 230])
      } else {
        Rgb([20, 40, 20])
      }
    })
  }

  /// 在 [x_from, x_to) 列范围内绘制棋盘格，其余为黑色
  pub fn checker_between(width: u32, height: u32, x_from: u32, x_to: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
      if x >= x_from && x < x_to && ((x / 8) + (y / 8)) % 2 == 0 {
        Rgb([255, 255, 255])
      } else {
        Rgb([0, 0, 0])
      }
    })
  }
}
