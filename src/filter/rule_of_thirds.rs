// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/rule_of_thirds.rs - 三分法构图
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

use crate::{
  detection::Detection,
  filter::{Complexity, Feedback, Filter, FilterInfo, Instruction},
};

const THIRD_LINES: [f32; 2] = [1.0 / 3.0, 2.0 / 3.0];
const THIRD_TOLERANCE: f32 = 0.05;

/// 将人物对齐到左或右的三分线
#[derive(Debug, Clone)]
pub struct RuleOfThirdsFilter {
  info: FilterInfo,
}

impl RuleOfThirdsFilter {
  pub fn new(info: FilterInfo) -> Self {
    Self { info }
  }
}

impl Filter for RuleOfThirdsFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Aligns the subject with the vertical third lines (left or right)."
  }

  fn evaluate(&self, _frame: &RgbImage, detections: &[Detection]) -> Feedback {
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };
    let x_center = person.x();

    // 距离相同时取左三分线
    let [left, right] = THIRD_LINES;
    let target = if (x_center - right).abs() < (x_center - left).abs() {
      right
    } else {
      left
    };

    if x_center < target - THIRD_TOLERANCE {
      Instruction::MoveRight.into()
    } else if x_center > target + THIRD_TOLERANCE {
      Instruction::MoveLeft.into()
    } else {
      Instruction::Ready.into()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::subject_at;

  fn feedback_at(x: f32) -> Feedback {
    RuleOfThirdsFilter::new(FilterInfo::new("thirds", Complexity::Medium))
      .evaluate(&RgbImage::new(4, 4), &[subject_at(x)])
  }

  #[test]
  fn subject_on_either_third_is_ready() {
    for x in [0.30, 0.3333, 0.37, 0.63, 0.6667, 0.70] {
      assert!(feedback_at(x).is_ready(), "x = {x}");
    }
  }

  #[test]
  fn subject_is_guided_to_the_nearest_third() {
    assert_eq!(feedback_at(0.1), Feedback::from(Instruction::MoveRight));
    assert_eq!(feedback_at(0.45), Feedback::from(Instruction::MoveLeft));
    assert_eq!(feedback_at(0.55), Feedback::from(Instruction::MoveRight));
    assert_eq!(feedback_at(0.95), Feedback::from(Instruction::MoveLeft));
  }

  #[test]
  fn dead_center_goes_to_the_left_third() {
    assert_eq!(feedback_at(0.5), Feedback::from(Instruction::MoveLeft));
  }
}
