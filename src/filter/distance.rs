// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/distance.rs - 拍摄距离
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

/// 期望的取景范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceTarget {
  /// 半身像
  Portrait,
  /// 全身像
  FullBody,
}

impl DistanceTarget {
  /// 检测框面积（占画面比例）的目标区间
  pub fn area_band(self) -> RangeInclusive<f32> {
    match self {
      DistanceTarget::Portrait => 0.20..=0.45,
      DistanceTarget::FullBody => 0.08..=0.20,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DistanceFilter {
  info: FilterInfo,
  target: DistanceTarget,
}

impl DistanceFilter {
  pub fn new(info: FilterInfo, target: DistanceTarget) -> Self {
    Self { info, target }
  }

  pub fn target(&self) -> DistanceTarget {
    self.target
  }
}

impl Filter for DistanceFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Guides the photographer to the correct distance (Portrait vs Full Body)."
  }

  fn evaluate(&self, _frame: &RgbImage, detections: &[Detection]) -> Feedback {
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };
    let area = person.area();
    let band = self.target.area_band();

    if area < *band.start() {
      Instruction::ComeCloser.into()
    } else if area > *band.end() {
      Instruction::StepBack.into()
    } else {
      Instruction::Ready.into()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn feedback_for(target: DistanceTarget, w: f32, h: f32) -> Feedback {
    let person = Detection::new(0.5, 0.5, w, h).unwrap();
    DistanceFilter::new(FilterInfo::new("distance", Complexity::Low), target)
      .evaluate(&RgbImage::new(4, 4), &[person])
  }

  #[test]
  fn portrait_band() {
    assert!(feedback_for(DistanceTarget::Portrait, 0.5, 0.6).is_ready());
    assert_eq!(
      feedback_for(DistanceTarget::Portrait, 0.2, 0.5),
      Feedback::from(Instruction::ComeCloser)
    );
    assert_eq!(
      feedback_for(DistanceTarget::Portrait, 0.8, 0.9),
      Feedback::from(Instruction::StepBack)
    );
  }

  #[test]
  fn full_body_band() {
    assert!(feedback_for(DistanceTarget::FullBody, 0.2, 0.7).is_ready());
    assert_eq!(
      feedback_for(DistanceTarget::FullBody, 0.1, 0.3),
      Feedback::from(Instruction::ComeCloser)
    );
    assert_eq!(
      feedback_for(DistanceTarget::FullBody, 0.5, 0.6),
      Feedback::from(Instruction::StepBack)
    );
  }
}
