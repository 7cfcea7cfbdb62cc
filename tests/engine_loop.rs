// 该文件是 Goutu （构图） 项目的一部分。
// tests/engine_loop.rs - 引导循环测试
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

use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  path::PathBuf,
  sync::mpsc,
};

use image::{Rgb, RgbImage};

use goutu::{
  detection::{Detection, Detector, DetectorError},
  engine::{Engine, EngineError, EngineState, StopReason},
  filter::{Complexity, Feedback, FilterInfo, FilterKind},
  input::Frame,
  output::{Key, PhotoStore, PhotoStoreError, Screen},
};

const FRAME_COLOR: Rgb<u8> = Rgb([40, 80, 120]);

/// 按帧序号依次给出人物中心 x 坐标，`None` 表示该帧没有人物
struct ScriptedDetector {
  positions: Vec<Option<f32>>,
  calls: Cell<usize>,
}

impl ScriptedDetector {
  fn new(positions: Vec<Option<f32>>) -> Self {
    Self {
      positions,
      calls: Cell::new(0),
    }
  }
}

impl Detector for ScriptedDetector {
  fn detect(&self, _frame: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    let index = self.calls.get();
    self.calls.set(index + 1);
    Ok(match self.positions.get(index).copied().flatten() {
      Some(x) => vec![Detection::new(x, 0.5, 0.2, 0.6)?],
      None => Vec::new(),
    })
  }
}

#[derive(Debug)]
struct ScreenBroken;

impl std::fmt::Display for ScreenBroken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("screen broken")
  }
}

impl std::error::Error for ScreenBroken {}

/// 记录显示内容，并在指定帧之后给出按键
#[derive(Default)]
struct FakeScreen {
  keys: VecDeque<Option<Key>>,
  shown: Vec<(RgbImage, Feedback)>,
  fail_on_show: bool,
}

impl FakeScreen {
  fn with_keys(keys: Vec<Option<Key>>) -> Self {
    Self {
      keys: keys.into(),
      ..Default::default()
    }
  }
}

impl Screen for FakeScreen {
  type Error = ScreenBroken;

  fn show(&mut self, frame: &RgbImage, feedback: &Feedback) -> Result<(), ScreenBroken> {
    if self.fail_on_show {
      return Err(ScreenBroken);
    }
    self.shown.push((frame.clone(), *feedback));
    Ok(())
  }

  fn poll_key(&mut self) -> Option<Key> {
    self.keys.pop_front().flatten()
  }
}

#[derive(Default)]
struct MemoryStore {
  saved: RefCell<Vec<RgbImage>>,
  fail: bool,
}

impl PhotoStore for MemoryStore {
  fn save(&self, image: &RgbImage) -> Result<PathBuf, PhotoStoreError> {
    if self.fail {
      return Err(PhotoStoreError::CreateDirError(
        PathBuf::from("/readonly"),
        std::io::Error::from(std::io::ErrorKind::PermissionDenied),
      ));
    }
    let mut saved = self.saved.borrow_mut();
    saved.push(image.clone());
    Ok(PathBuf::from(format!("photo_{}.jpg", saved.len())))
  }
}

fn frames(count: u64) -> impl Iterator<Item = Result<Frame, String>> {
  (0..count).map(|index| {
    Ok(Frame {
      image: RgbImage::from_pixel(320, 240, FRAME_COLOR),
      index,
      timestamp_ms: index * 33,
    })
  })
}

fn centered_engine(detector: Option<Box<dyn Detector>>) -> Engine {
  let mut engine = Engine::new(detector).unwrap();
  engine.set_filter(FilterKind::Centered.build(FilterInfo::new("MainCenterFilter", Complexity::Low)));
  engine
}

#[test]
fn capture_is_honored_only_when_ready() {
  let detector = ScriptedDetector::new(vec![Some(0.3), Some(0.5), Some(0.7)]);
  let mut engine = centered_engine(Some(Box::new(detector)));
  let mut screen = FakeScreen::with_keys(vec![
    Some(Key::Capture),
    Some(Key::Capture),
    Some(Key::Capture),
  ]);
  let store = MemoryStore::default();

  let session = engine.run(frames(3), &mut screen, &store).unwrap();

  assert_eq!(session.frames, 3);
  assert_eq!(session.ready_frames, 1);
  assert_eq!(session.rejected_captures, 2);
  assert_eq!(session.photos, vec![PathBuf::from("photo_1.jpg")]);
  assert_eq!(store.saved.borrow().len(), 1);
  assert_eq!(session.stop_reason, StopReason::EndOfStream);
  assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn saved_photo_is_the_clean_snapshot() {
  let detector = ScriptedDetector::new(vec![Some(0.5)]);
  let mut engine = centered_engine(Some(Box::new(detector)));
  let mut screen = FakeScreen::with_keys(vec![Some(Key::Capture)]);
  let store = MemoryStore::default();

  engine.run(frames(1), &mut screen, &store).unwrap();

  let saved = store.saved.borrow();
  assert!(saved[0].pixels().all(|p| *p == FRAME_COLOR));

  // 显示的画面带有绿色边框
  let (shown, feedback) = &screen.shown[0];
  assert!(feedback.is_ready());
  assert_eq!(*shown.get_pixel(0, 0), Rgb([0, 255, 0]));
}

#[test]
fn null_detector_never_becomes_ready() {
  let mut engine = centered_engine(None);
  let mut screen = FakeScreen::with_keys(vec![None, Some(Key::Capture), None, None]);
  let store = MemoryStore::default();

  let session = engine.run(frames(4), &mut screen, &store).unwrap();

  assert_eq!(session.ready_frames, 0);
  assert_eq!(session.rejected_captures, 1);
  assert!(store.saved.borrow().is_empty());
  assert!(
    screen
      .shown
      .iter()
      .all(|(_, feedback)| *feedback == Feedback::searching())
  );
}

#[test]
fn no_filter_reports_and_never_captures() {
  let mut engine = Engine::new(None).unwrap();
  let mut screen = FakeScreen::with_keys(vec![Some(Key::Capture)]);
  let store = MemoryStore::default();

  let session = engine.run(frames(2), &mut screen, &store).unwrap();

  assert_eq!(session.frames, 2);
  assert_eq!(screen.shown[0].1.message(), "No filter selected");
  assert_eq!(session.rejected_captures, 1);
  assert!(store.saved.borrow().is_empty());
}

#[test]
fn failed_save_keeps_the_loop_running() {
  let detector = ScriptedDetector::new(vec![Some(0.5); 3]);
  let mut engine = centered_engine(Some(Box::new(detector)));
  let mut screen = FakeScreen::with_keys(vec![Some(Key::Capture), None, None]);
  let store = MemoryStore {
    fail: true,
    ..Default::default()
  };

  let session = engine.run(frames(3), &mut screen, &store).unwrap();

  assert_eq!(session.failed_saves, 1);
  assert_eq!(session.frames, 3);
  assert!(session.photos.is_empty());
}

#[test]
fn quit_key_stops_immediately() {
  let mut engine = centered_engine(None);
  let mut screen = FakeScreen::with_keys(vec![None, Some(Key::Quit)]);
  let store = MemoryStore::default();

  let session = engine.run(frames(10), &mut screen, &store).unwrap();

  assert_eq!(session.frames, 2);
  assert_eq!(session.stop_reason, StopReason::Quit);
}

#[test]
fn read_failure_ends_the_session() {
  let input = frames(2).chain(std::iter::once(Err("device unplugged".to_string())));
  let input = input.chain(frames(5));
  let mut engine = centered_engine(None);
  let mut screen = FakeScreen::default();
  let store = MemoryStore::default();

  let session = engine.run(input, &mut screen, &store).unwrap();

  assert_eq!(session.frames, 2);
  assert_eq!(
    session.stop_reason,
    StopReason::CaptureReadFailure("device unplugged".to_string())
  );
}

#[test]
fn frame_limit_and_interrupt_stop_the_loop() {
  let mut engine = centered_engine(None).with_frame_limit(Some(3));
  let session = engine
    .run(frames(10), &mut FakeScreen::default(), &MemoryStore::default())
    .unwrap();
  assert_eq!(session.frames, 3);
  assert_eq!(session.stop_reason, StopReason::FrameLimit);

  let (tx, rx) = mpsc::channel();
  tx.send(()).unwrap();
  let mut engine = centered_engine(None).with_interrupt(rx);
  let session = engine
    .run(frames(10), &mut FakeScreen::default(), &MemoryStore::default())
    .unwrap();
  assert_eq!(session.frames, 1);
  assert_eq!(session.stop_reason, StopReason::Interrupted);
}

#[test]
fn display_failure_is_fatal() {
  let mut engine = centered_engine(None);
  let mut screen = FakeScreen {
    fail_on_show: true,
    ..Default::default()
  };

  let result = engine.run(frames(3), &mut screen, &MemoryStore::default());

  assert!(matches!(result, Err(EngineError::DisplayError(_))));
  assert_eq!(engine.state(), EngineState::Stopped);
}
