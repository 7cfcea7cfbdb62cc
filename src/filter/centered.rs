// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/centered.rs - 居中构图
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

const CENTER_TARGET: f32 = 0.5;
const CENTER_TOLERANCE: f32 = 0.05;

/// 将人物放在画面水平中央
#[derive(Debug, Clone)]
pub struct CenteredFilter {
  info: FilterInfo,
}

impl CenteredFilter {
  pub fn new(info: FilterInfo) -> Self {
    Self { info }
  }
}

impl Filter for CenteredFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Centers the subject in the frame."
  }

  fn evaluate(&self, _frame: &RgbImage, detections: &[Detection]) -> Feedback {
    // 只看第一个人物
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };
    let x_center = person.x();

    // 边界值 0.45 / 0.55 视为居中
    if x_center < CENTER_TARGET - CENTER_TOLERANCE {
      Instruction::MoveRight.into()
    } else if x_center > CENTER_TARGET + CENTER_TOLERANCE {
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

  fn centered() -> CenteredFilter {
    CenteredFilter::new(FilterInfo::new("MainCenterFilter", Complexity::Low))
  }

  fn feedback_at(x: f32) -> Feedback {
    centered().evaluate(&RgbImage::new(4, 4), &[subject_at(x)])
  }

  #[test]
  fn subject_in_the_middle_is_ready() {
    let frame = RgbImage::new(4, 4);
    let person = Detection::new(0.5, 0.5, 0.2, 0.6).unwrap();
    let feedback = centered().evaluate(&frame, &[person]);
    assert_eq!(feedback.instruction(), Some(Instruction::Ready));
    assert!(feedback.is_ready());
    assert_eq!(feedback.message(), "Ready! Shoot!");
  }

  #[test]
  fn subject_on_the_left_moves_right() {
    for x in [0.0, 0.1, 0.3, 0.449] {
      assert_eq!(feedback_at(x), Feedback::from(Instruction::MoveRight), "x = {x}");
    }
  }

  #[test]
  fn subject_on_the_right_moves_left() {
    for x in [0.551, 0.7, 0.9, 1.0] {
      assert_eq!(feedback_at(x), Feedback::from(Instruction::MoveLeft), "x = {x}");
    }
  }

  #[test]
  fn tolerance_band_is_inclusive() {
    for x in [0.45, 0.47, 0.5, 0.53, 0.55] {
      assert!(feedback_at(x).is_ready(), "x = {x}");
    }
  }

  #[test]
  fn no_subject_is_searching() {
    let feedback = centered().evaluate(&RgbImage::new(4, 4), &[]);
    assert_eq!(feedback, Feedback::searching());
    assert!(!feedback.is_ready());
  }

  #[test]
  fn evaluation_is_repeatable() {
    let filter = centered();
    let frame = RgbImage::new(4, 4);
    let detections = [subject_at(0.62)];
    let first = filter.evaluate(&frame, &detections);
    let second = filter.evaluate(&frame, &detections);
    assert_eq!(first, second);
  }

  #[test]
  fn only_the_first_subject_counts() {
    let filter = centered();
    let frame = RgbImage::new(4, 4);
    assert!(filter.evaluate(&frame, &[subject_at(0.5), subject_at(0.1)]).is_ready());
    assert_eq!(
      filter.evaluate(&frame, &[subject_at(0.3), subject_at(0.5)]),
      Feedback::from(Instruction::MoveRight)
    );
    assert_eq!(
      filter.evaluate(&frame, &[subject_at(0.7), subject_at(0.5)]),
      Feedback::from(Instruction::MoveLeft)
    );
  }
}
