// 该文件是 Goutu （构图） 项目的一部分。
// src/filter/symmetry.rs - 画面平衡
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
  filter::{
    Complexity, Feedback, Filter, FilterInfo, Instruction,
    analysis::{edge_centroid_x, edge_map},
  },
};

/// 视觉重心（归一化）的目标区间
const BALANCE_BAND: RangeInclusive<f32> = 0.42..=0.58;

/// 以边缘密度的水平重心衡量人物与背景的左右平衡
#[derive(Debug, Clone)]
pub struct SymmetryFilter {
  info: FilterInfo,
}

impl SymmetryFilter {
  pub fn new(info: FilterInfo) -> Self {
    Self { info }
  }
}

impl Filter for SymmetryFilter {
  fn name(&self) -> &str {
    &self.info.name
  }

  fn complexity(&self) -> Complexity {
    self.info.complexity
  }

  fn description(&self) -> &'static str {
    "Helps achieve visual balance between the subject and the background."
  }

  fn evaluate(&self, frame: &RgbImage, detections: &[Detection]) -> Feedback {
    let Some(person) = detections.first() else {
      return Feedback::searching();
    };

    // 没有纹理的画面只剩人物本身
    let balance = edge_centroid_x(&edge_map(frame)).unwrap_or(person.x());

    if balance < *BALANCE_BAND.start() {
      Instruction::MoveRight.into()
    } else if balance > *BALANCE_BAND.end() {
      Instruction::MoveLeft.into()
    } else {
      Instruction::Ready.into()
    }
  }
}
