// 该文件是 Goutu （构图） 项目的一部分。
// src/filter.rs - 构图规则
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

use std::{fmt, str::FromStr};

use image::RgbImage;
use thiserror::Error;

use crate::detection::{Detection, Detector, extract_detections};

mod analysis;
mod centered;
mod distance;
mod headroom;
mod horizon;
mod rule_of_thirds;
mod symmetry;

pub use self::centered::CenteredFilter;
pub use self::distance::{DistanceFilter, DistanceTarget};
pub use self::headroom::HeadroomFilter;
pub use self::horizon::HorizonLevelerFilter;
pub use self::rule_of_thirds::RuleOfThirdsFilter;
pub use self::symmetry::SymmetryFilter;

/// 规则复杂度，仅用于展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Complexity {
  Low,
  Medium,
  High,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterParseError {
  #[error("未知的复杂度: {0}（可选 low, medium, high）")]
  UnknownComplexity(String),
  #[error("未知的构图规则: {0}")]
  UnknownFilter(String),
}

impl FromStr for Complexity {
  type Err = FilterParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "low" => Ok(Complexity::Low),
      "medium" => Ok(Complexity::Medium),
      "high" => Ok(Complexity::High),
      _ => Err(FilterParseError::UnknownComplexity(s.to_string())),
    }
  }
}

impl fmt::Display for Complexity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Complexity::Low => "LOW",
      Complexity::Medium => "MEDIUM",
      Complexity::High => "HIGH",
    };
    f.write_str(s)
  }
}

/// 引导指令，每个指令对应固定的显示文本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
  MoveLeft,
  MoveRight,
  MoveUp,
  MoveDown,
  ComeCloser,
  StepBack,
  Ready,
  Searching,
}

impl Instruction {
  pub const fn as_str(self) -> &'static str {
    match self {
      Instruction::MoveLeft => "← Move Left",
      Instruction::MoveRight => "Move Right →",
      Instruction::MoveUp => "Tilt Up ↑",
      Instruction::MoveDown => "Tilt Down ↓",
      Instruction::ComeCloser => "Move Closer",
      Instruction::StepBack => "Step Back",
      Instruction::Ready => "Ready! Shoot!",
      Instruction::Searching => "Searching for person...",
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

pub const NO_FILTER_MESSAGE: &str = "No filter selected";

/// 单帧的构图反馈
///
/// 只能由 [`Instruction`] 构建，`ready` 当且仅当指令为 `Ready` 时为真。
/// 引擎未设置规则时使用 [`Feedback::no_filter`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
  instruction: Option<Instruction>,
}

impl Feedback {
  pub const fn no_filter() -> Self {
    Self { instruction: None }
  }

  pub const fn searching() -> Self {
    Self {
      instruction: Some(Instruction::Searching),
    }
  }

  pub fn instruction(&self) -> Option<Instruction> {
    self.instruction
  }

  pub fn message(&self) -> &'static str {
    match self.instruction {
      Some(instruction) => instruction.as_str(),
      None => NO_FILTER_MESSAGE,
    }
  }

  pub fn is_ready(&self) -> bool {
    self.instruction == Some(Instruction::Ready)
  }
}

impl From<Instruction> for Feedback {
  fn from(instruction: Instruction) -> Self {
    Self {
      instruction: Some(instruction),
    }
  }
}

/// 构图规则
///
/// 规则本身只根据检测几何（以及必要时的帧像素）给出反馈，
/// 检测器由调用方传入 [`Filter::apply`]，规则不直接访问检测器。
pub trait Filter {
  fn name(&self) -> &str;

  fn complexity(&self) -> Complexity;

  /// 展示用的规则说明
  fn description(&self) -> &'static str;

  /// 规则的判断逻辑，必须是纯函数
  fn evaluate(&self, frame: &RgbImage, detections: &[Detection]) -> Feedback;

  fn apply(&self, frame: &RgbImage, detector: Option<&dyn Detector>) -> Feedback {
    let detections = extract_detections(detector, frame);
    self.evaluate(frame, &detections)
  }
}

/// 规则的名称与复杂度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
  pub name: String,
  pub complexity: Complexity,
}

impl FilterInfo {
  pub fn new(name: impl Into<String>, complexity: Complexity) -> Self {
    Self {
      name: name.into(),
      complexity,
    }
  }
}

/// 可通过名称选择的规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
  Centered,
  RuleOfThirds,
  Headroom,
  Distance(DistanceTarget),
  HorizonLeveler,
  Symmetry,
}

impl FilterKind {
  pub fn build(self, info: FilterInfo) -> Box<dyn Filter> {
    match self {
      FilterKind::Centered => Box::new(CenteredFilter::new(info)),
      FilterKind::RuleOfThirds => Box::new(RuleOfThirdsFilter::new(info)),
      FilterKind::Headroom => Box::new(HeadroomFilter::new(info)),
      FilterKind::Distance(target) => Box::new(DistanceFilter::new(info, target)),
      FilterKind::HorizonLeveler => Box::new(HorizonLevelerFilter::new(info)),
      FilterKind::Symmetry => Box::new(SymmetryFilter::new(info)),
    }
  }
}

impl FromStr for FilterKind {
  type Err = FilterParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "centered" | "center" => Ok(FilterKind::Centered),
      "rule-of-thirds" | "thirds" => Ok(FilterKind::RuleOfThirds),
      "headroom" => Ok(FilterKind::Headroom),
      "distance" | "distance-portrait" => Ok(FilterKind::Distance(DistanceTarget::Portrait)),
      "distance-full-body" => Ok(FilterKind::Distance(DistanceTarget::FullBody)),
      "horizon" | "horizon-leveler" => Ok(FilterKind::HorizonLeveler),
      "symmetry" => Ok(FilterKind::Symmetry),
      _ => Err(FilterParseError::UnknownFilter(s.to_string())),
    }
  }
}

impl fmt::Display for FilterKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      FilterKind::Centered => "centered",
      FilterKind::RuleOfThirds => "rule-of-thirds",
      FilterKind::Headroom => "headroom",
      FilterKind::Distance(DistanceTarget::Portrait) => "distance-portrait",
      FilterKind::Distance(DistanceTarget::FullBody) => "distance-full-body",
      FilterKind::HorizonLeveler => "horizon",
      FilterKind::Symmetry => "symmetry",
    })
  }
}

/// 测试用的检测框构造
#[cfg(test)]
pub(crate) fn subject_at(x: f32) -> Detection {
  Detection::new(x, 0.5, 0.2, 0.6).unwrap()
}
