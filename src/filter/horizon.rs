// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/horizon.rs - 水平线校正
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

use std::ops::RangeInclusive;

use image::{GrayImage, RgbImage};
use imageproc::hough::{LineDetectionOptions, detect_lines};
use tracing::debug;

use crate::{
  detection::Detection,
  filter::{
    Complexity, Feedback, Filter, FilterInfo, Instruction,
    analysis::{edge_map, mask_subject},
  },
};

/// 水平线高度（归一化）的目标区间
const LEVEL_BAND: RangeInclusive<f32> = 0.40..=0.60;
/// 与水平方向的最大夹角，超出的直线不作为地平线
const MAX_TILT_DEGREES: u32 = 2;
/// 候选直线的最少投票数，相对边缘图宽度
const MIN_VOTE_RATIO: f32 = 0.4;
const SUPPRESSION_RADIUS: u32 = 8;

/// 检测画面中的地平线，引导镜头保持水平
#[derive(Debug, Clone)]
pub struct HorizonLevelerFilter {
  info: FilterInfo,
}

impl HorizonLevelerFilter {
  pub fn new(info: FilterInfo) -> Self {
    Self { info }
  }
}

/// 最接近水平的长直线在画面中线处的高度（归一化）
fn horizon_height(edges: &GrayImage) -> Option<f32> {
  let (width, height) = edges.dimensions();
  if edges.pixels().all(|p| p[0] == 0) {
    return None;
  }

  let options = LineDetectionOptions {
    // 票数阈值为 0 时每个累加单元都会被当作直线
    vote_threshold: ((width as f32 * MIN_VOTE_RATIO) as u32).max(1),
    suppression_radius: SUPPRESSION_RADIUS,
  };

  let line = detect_lines(edges, options)
    .into_iter()
    .filter(|line| line.angle_in_degrees.abs_diff(90) <= MAX_TILT_DEGREES)
    .min_by_key(|line| line.angle_in_degrees.abs_diff(90))?;

  // 法线式 r = x cos(θ) + y sin(θ)，θ 接近 90° 时 sin(θ) 不为零
  let theta = (line.angle_in_degrees as f32).to_radians();
  let center_x = width as f32 / 2.0;
  let y = (line.r - center_x * theta.cos()) / theta.sin();
  debug!("地平线: r = {}, 角度 = {}°, y = {:.1}", line.r, line.angle_in_degrees, y);

  Some(y / height as f32)
}

impl Filter for HorizonLevelerFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Ensures the camera is level and the horizon is not tilted."
  }

  fn evaluate(&self, frame: &RgbImage, detections: &[Detection]) -> Feedback {
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };

    let mut edges = edge_map(frame);
    mask_subject(&mut edges, person);

    match horizon_height(&edges) {
      // 地平线偏高说明镜头朝下
      Some(level) if level < *LEVEL_BAND.start() => Instruction::MoveUp.into(),
      Some(level) if level > *LEVEL_BAND.end() => Instruction::MoveDown.into(),
      _ => Instruction::Ready.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::{analysis::fixtures::horizon_at, subject_at};

  fn horizon() -> HorizonLevelerFilter {
    HorizonLevelerFilter::new(FilterInfo::new("horizon", Complexity::High))
  }

  #[test]
  fn horizon_through_the_middle_is_ready() {
    let frame = horizon_at(320, 240, 120);
    assert!(horizon().evaluate(&frame, &[subject_at(0.5)]).is_ready());
  }

  #[test]
  fn high_horizon_tilts_up() {
    let frame = horizon_at(320, 240, 48);
    assert_eq!(
      horizon().evaluate(&frame, &[subject_at(0.5)]),
      Feedback::from(Instruction::MoveUp)
    );
  }

  #[test]
  fn low_horizon_tilts_down() {
    let frame = horizon_at(320, 240, 192);
    assert_eq!(
      horizon().evaluate(&frame, &[subject_at(0.5)]),
      Feedback::from(Instruction::MoveDown)
    );
  }

  #[test]
  fn no_visible_horizon_is_ready() {
    let frame = RgbImage::from_pixel(320, 240, image::Rgb([128, 128, 128]));
    assert!(horizon().evaluate(&frame, &[subject_at(0.3)]).is_ready());
  }

  #[test]
  fn tiny_blank_frames_have_no_horizon() {
    for (w, h) in [(1, 1), (2, 2), (2, 5), (3, 3), (5, 4)] {
      let frame = RgbImage::new(w, h);
      assert_eq!(horizon_height(&edge_map(&frame)), None, "{w}x{h}");
      assert!(
        horizon().evaluate(&frame, &[subject_at(0.5)]).is_ready(),
        "{w}x{h}"
      );
    }
  }

  #[test]
  fn horizon_height_is_measured_at_the_line() {
    let edges = edge_map(&horizon_at(320, 240, 60));
    let level = horizon_height(&edges).unwrap();
    assert!((level - 0.25).abs() < 0.02, "level = {level}");
  }
}
