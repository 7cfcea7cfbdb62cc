// 该文件是 Goutu （构图） 项目的一部分。
// src/detection.rs - 归一化检测框与检测器接口
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};

/// 检测框字段越界
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
  #[error("检测框字段 {field} 超出 [0, 1] 范围: {value}")]
  OutOfRange { field: &'static str, value: f32 },
}

/// 单个人物检测框，全部字段均为相对帧尺寸的归一化值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  x: f32,
  y: f32,
  w: f32,
  h: f32,
}

fn check_unit(field: &'static str, value: f32) -> Result<f32, DetectionError> {
  // NaN 同样不满足该条件
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(DetectionError::OutOfRange { field, value })
  }
}

impl Detection {
  /// 以中心点和宽高构建检测框
  pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self, DetectionError> {
    Ok(Self {
      x: check_unit("x", x)?,
      y: check_unit("y", y)?,
      w: check_unit("w", w)?,
      h: check_unit("h", h)?,
    })
  }

  /// 以 [x_min, y_min, x_max, y_max] 形式构建检测框
  ///
  /// 四个角点都必须落在帧内，越出帧边缘的框不会被换算成看似合法的中心形式。
  pub fn from_corners(bbox: [f32; 4]) -> Result<Self, DetectionError> {
    let [x_min, y_min, x_max, y_max] = bbox;
    check_unit("x_min", x_min)?;
    check_unit("y_min", y_min)?;
    check_unit("x_max", x_max)?;
    check_unit("y_max", y_max)?;
    Self::new(
      (x_min + x_max) / 2.0,
      (y_min + y_max) / 2.0,
      x_max - x_min,
      y_max - y_min,
    )
  }

  pub fn x(&self) -> f32 {
    self.x
  }

  pub fn y(&self) -> f32 {
    self.y
  }

  pub fn w(&self) -> f32 {
    self.w
  }

  pub fn h(&self) -> f32 {
    self.h
  }

  pub fn top(&self) -> f32 {
    self.y - self.h / 2.0
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.h / 2.0
  }

  pub fn left(&self) -> f32 {
    self.x - self.w / 2.0
  }

  pub fn right(&self) -> f32 {
    self.x + self.w / 2.0
  }

  pub fn area(&self) -> f32 {
    self.w * self.h
  }
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("推理失败: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
  #[error("检测几何约定被破坏: {0}")]
  Geometry(#[from] DetectionError),
}

/// 人物检测器
///
/// 实现方需要已经完成类别过滤（仅保留人物）和置信度过滤，
/// 返回的检测框按置信度从高到低排列。
pub trait Detector {
  fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, DetectorError>;
}

/// 从帧中提取检测结果
///
/// 未配置检测器时返回空序列；检测失败时记录错误并按零检测处理。
pub fn extract_detections(detector: Option<&dyn Detector>, frame: &RgbImage) -> Vec<Detection> {
  let Some(detector) = detector else {
    return Vec::new();
  };

  match detector.detect(frame) {
    Ok(detections) => {
      debug!("检测到 {} 个人物", detections.len());
      detections
    }
    Err(e) => {
      error!("人物检测失败，本帧按无检测处理: {}", e);
      Vec::new()
    }
  }
}
