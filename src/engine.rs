// 该文件是 Goutu （构图） 项目的一部分。
// src/engine.rs - 构图引导主循环
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

//! 每一帧严格按以下顺序处理：
//!
//! 1. 从输入获取帧，失败或结束时停止；
//! 2. 保留一份未叠加任何提示的干净画面；
//! 3. 由当前规则给出反馈，未设置规则时为 "No filter selected"；
//! 4. 在显示画面上叠加提示，就绪时绘制绿色边框与拍照提示；
//! 5. 处理按键：`q` 退出，`w` 仅在就绪时保存干净画面。

use std::{
  fmt,
  path::PathBuf,
  sync::mpsc::{Receiver, TryRecvError},
};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  detection::Detector,
  filter::{Feedback, Filter},
  input::Frame,
  output::{Key, Overlay, OverlayError, PhotoStore, Screen},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
  Idle,
  Running,
  Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
  Quit,
  Interrupted,
  FrameLimit,
  EndOfStream,
  CaptureReadFailure(String),
}

impl fmt::Display for StopReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StopReason::Quit => f.write_str("用户退出"),
      StopReason::Interrupted => f.write_str("收到中断信号"),
      StopReason::FrameLimit => f.write_str("达到指定帧数"),
      StopReason::EndOfStream => f.write_str("输入结束"),
      StopReason::CaptureReadFailure(e) => write!(f, "读取帧失败: {}", e),
    }
  }
}

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub frames: u64,
  pub ready_frames: u64,
  pub photos: Vec<PathBuf>,
  pub rejected_captures: u64,
  pub failed_saves: u64,
  pub stop_reason: StopReason,
}

impl Session {
  fn new() -> Self {
    Self {
      frames: 0,
      ready_frames: 0,
      photos: Vec::new(),
      rejected_captures: 0,
      failed_saves: 0,
      stop_reason: StopReason::EndOfStream,
    }
  }
}

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("叠加层初始化失败: {0}")]
  OverlayError(#[from] OverlayError),
  #[error("显示失败: {0}")]
  DisplayError(Box<dyn std::error::Error + Send + Sync>),
}

pub struct Engine {
  detector: Option<Box<dyn Detector>>,
  filter: Option<Box<dyn Filter>>,
  overlay: Overlay,
  state: EngineState,
  interrupt: Option<Receiver<()>>,
  frame_limit: Option<u64>,
}

impl Engine {
  /// `detector` 为 `None` 时以无检测器模式运行
  pub fn new(detector: Option<Box<dyn Detector>>) -> Result<Self, EngineError> {
    if detector.is_none() {
      warn!("未加载检测器，所有规则都将报告未找到人物");
    }
    Ok(Self {
      detector,
      filter: None,
      overlay: Overlay::new()?,
      state: EngineState::Idle,
      interrupt: None,
      frame_limit: None,
    })
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  pub fn with_frame_limit(mut self, frame_limit: Option<u64>) -> Self {
    self.frame_limit = frame_limit;
    self
  }

  /// 替换当前规则，同一时刻只有一个规则生效
  pub fn set_filter(&mut self, filter: Box<dyn Filter>) {
    info!(
      "启用构图规则: {} ({}) - {}",
      filter.name(),
      filter.complexity(),
      filter.description()
    );
    self.filter = Some(filter);
  }

  pub fn filter(&self) -> Option<&dyn Filter> {
    self.filter.as_deref()
  }

  pub fn state(&self) -> EngineState {
    self.state
  }

  pub fn process_frame(&self, frame: &RgbImage) -> Feedback {
    match &self.filter {
      Some(filter) => filter.apply(frame, self.detector.as_deref()),
      None => Feedback::no_filter(),
    }
  }

  /// 在画面上叠加反馈
  pub fn annotate(&self, image: &mut RgbImage, feedback: &Feedback) {
    let description = self.filter.as_ref().map(|filter| filter.description());
    self.overlay.render(image, feedback, description);
  }

  pub fn run<I, E, S>(
    &mut self,
    input: I,
    screen: &mut S,
    store: &dyn PhotoStore,
  ) -> Result<Session, EngineError>
  where
    I: IntoIterator<Item = Result<Frame, E>>,
    E: fmt::Display,
    S: Screen,
    S::Error: std::error::Error + Send + Sync + 'static,
  {
    info!("开始构图引导...");
    self.state = EngineState::Running;
    let result = self.run_loop(input.into_iter(), screen, store);
    self.state = EngineState::Stopped;

    match &result {
      Ok(session) => info!(
        "引导结束（{}）：处理 {} 帧，就绪 {} 帧，保存 {} 张照片",
        session.stop_reason,
        session.frames,
        session.ready_frames,
        session.photos.len()
      ),
      Err(e) => error!("引导异常结束: {}", e),
    }
    result
  }

  fn run_loop<I, E, S>(
    &self,
    mut input: I,
    screen: &mut S,
    store: &dyn PhotoStore,
  ) -> Result<Session, EngineError>
  where
    I: Iterator<Item = Result<Frame, E>>,
    E: fmt::Display,
    S: Screen,
    S::Error: std::error::Error + Send + Sync + 'static,
  {
    let mut session = Session::new();

    loop {
      let frame = match input.next() {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
          error!("读取帧失败，停止引导: {}", e);
          session.stop_reason = StopReason::CaptureReadFailure(e.to_string());
          break;
        }
        None => {
          info!("输入结束");
          session.stop_reason = StopReason::EndOfStream;
          break;
        }
      };

      let clean = frame.image;
      let feedback = self.process_frame(&clean);
      debug!("第 {} 帧: {}", frame.index, feedback.message());

      let mut shown = clean.clone();
      self.annotate(&mut shown, &feedback);
      screen
        .show(&shown, &feedback)
        .map_err(|e| EngineError::DisplayError(Box::new(e)))?;

      session.frames += 1;
      if feedback.is_ready() {
        session.ready_frames += 1;
      }

      match screen.poll_key() {
        Some(Key::Quit) => {
          info!("收到退出按键");
          session.stop_reason = StopReason::Quit;
          break;
        }
        Some(Key::Capture) => Self::capture(&clean, &feedback, store, &mut session),
        Some(Key::Other(key)) => debug!("忽略按键: {}", key),
        None => {}
      }

      if self.interrupted() {
        warn!("中断信号接收，退出引导循环");
        session.stop_reason = StopReason::Interrupted;
        break;
      }

      if self.frame_limit.is_some_and(|limit| session.frames >= limit) {
        info!("达到指定帧数 {}, 退出引导循环", session.frames);
        session.stop_reason = StopReason::FrameLimit;
        break;
      }
    }

    Ok(session)
  }

  fn interrupted(&self) -> bool {
    match &self.interrupt {
      Some(rx) => match rx.try_recv() {
        Ok(()) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
      },
      None => false,
    }
  }

  fn capture(
    snapshot: &RgbImage,
    feedback: &Feedback,
    store: &dyn PhotoStore,
    session: &mut Session,
  ) {
    if !feedback.is_ready() {
      warn!("构图尚未就绪（{}），未拍照", feedback.message());
      session.rejected_captures += 1;
      return;
    }

    match store.save(snapshot) {
      Ok(path) => {
        info!("照片已保存: {}", path.display());
        session.photos.push(path);
      }
      Err(e) => {
        error!("照片保存失败: {}", e);
        session.failed_saves += 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::{Detection, DetectorError},
    filter::{Complexity, FilterInfo, FilterKind, Instruction, NO_FILTER_MESSAGE},
  };

  struct FixedDetector(Vec<Detection>);

  impl Detector for FixedDetector {
    fn detect(&self, _frame: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
      Ok(self.0.clone())
    }
  }

  fn centered() -> Box<dyn Filter> {
    FilterKind::Centered.build(FilterInfo::new("MainCenterFilter", Complexity::Low))
  }

  #[test]
  fn new_engine_is_idle_without_filter() {
    let engine = Engine::new(None).unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.filter().is_none());

    let feedback = engine.process_frame(&RgbImage::new(8, 8));
    assert_eq!(feedback.message(), NO_FILTER_MESSAGE);
    assert!(!feedback.is_ready());
  }

  #[test]
  fn null_detector_always_searches() {
    let mut engine = Engine::new(None).unwrap();
    engine.set_filter(centered());
    for _ in 0..3 {
      assert_eq!(
        engine.process_frame(&RgbImage::new(8, 8)),
        Feedback::searching()
      );
    }
  }

  #[test]
  fn centered_subject_is_ready() {
    let person = Detection::new(0.5, 0.5, 0.2, 0.6).unwrap();
    let mut engine = Engine::new(Some(Box::new(FixedDetector(vec![person])))).unwrap();
    engine.set_filter(centered());
    assert_eq!(
      engine.process_frame(&RgbImage::new(8, 8)),
      Feedback::from(Instruction::Ready)
    );
    assert_eq!(engine.filter().map(|f| f.name()), Some("MainCenterFilter"));
  }

  #[test]
  fn replacing_the_filter_keeps_one_active() {
    let person = Detection::new(0.1, 0.5, 0.2, 0.6).unwrap();
    let mut engine = Engine::new(Some(Box::new(FixedDetector(vec![person])))).unwrap();
    engine.set_filter(centered());
    engine.set_filter(
      FilterKind::RuleOfThirds.build(FilterInfo::new("thirds", Complexity::Medium)),
    );
    assert_eq!(engine.filter().map(|f| f.name()), Some("thirds"));
    assert_eq!(
      engine.process_frame(&RgbImage::new(8, 8)),
      Feedback::from(Instruction::MoveRight)
    );
  }
}
