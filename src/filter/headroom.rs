// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/headroom.rs - 头顶留白
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

use image::RgbImage;

use crate::{
  detection::Detection,
  filter::{Complexity, Feedback, Filter, FilterInfo, Instruction},
};

/// 检测框上沿到画面顶部的理想距离
const HEADROOM_BAND: RangeInclusive<f32> = 0.05..=0.15;

#[derive(Debug, Clone)]
pub struct HeadroomFilter {
  info: FilterInfo,
}

impl HeadroomFilter {
  pub fn new(info: FilterInfo) -> Self {
    Self { info }
  }
}

impl Filter for HeadroomFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Maintains the ideal gap between the head and the top edge."
  }

  fn evaluate(&self, _frame: &RgbImage, detections: &[Detection]) -> Feedback {
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };
    let headroom = person.top();

    // 留白不足时上抬镜头，人物在画面中下移
    if headroom < *HEADROOM_BAND.start() {
      Instruction::MoveUp.into()
    } else if headroom > *HEADROOM_BAND.end() {
      Instruction::MoveDown.into()
    } else {
      Instruction::Ready.into()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn feedback_for(top: f32, h: f32) -> Feedback {
    let person = Detection::new(0.5, top + h / 2.0, 0.3, h).unwrap();
    HeadroomFilter::new(FilterInfo::new("headroom", Complexity::Low))
      .evaluate(&RgbImage::new(4, 4), &[person])
  }

  #[test]
  fn comfortable_headroom_is_ready() {
    assert!(feedback_for(0.1, 0.6).is_ready());
    assert!(feedback_for(0.06, 0.8).is_ready());
    assert!(feedback_for(0.14, 0.5).is_ready());
  }

  #[test]
  fn cramped_head_tilts_up() {
    assert_eq!(feedback_for(0.0, 0.9), Feedback::from(Instruction::MoveUp));
    assert_eq!(feedback_for(0.02, 0.6), Feedback::from(Instruction::MoveUp));
  }

  #[test]
  fn too_much_sky_tilts_down() {
    assert_eq!(feedback_for(0.3, 0.5), Feedback::from(Instruction::MoveDown));
  }
}
