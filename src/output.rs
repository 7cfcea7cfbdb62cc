// 该文件是 Goutu （构图） 项目的一部分。
// src/output.rs - 显示与保存
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, filter::Feedback};

mod overlay;
pub use self::overlay::{Overlay, OverlayError};

mod photo_store;
pub use self::photo_store::{DirectoryPhotoStore, PhotoStore, PhotoStoreError, photo_file_name};

mod terminal_display;
pub use self::terminal_display::{TerminalDisplay, TerminalDisplayError};

#[cfg(feature = "gstreamer_output")]
mod gstreamer_display;
#[cfg(feature = "gstreamer_output")]
pub use self::gstreamer_display::{GStreamerDisplay, GStreamerDisplayError};

/// 用户按键意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
  /// `q`
  Quit,
  /// `w`
  Capture,
  Other(String),
}

impl Key {
  pub fn from_name(name: &str) -> Self {
    match name {
      "q" => Key::Quit,
      "w" => Key::Capture,
      other => Key::Other(other.to_string()),
    }
  }
}

/// 画面显示与按键输入
pub trait Screen {
  type Error;

  /// 显示已叠加提示的画面
  fn show(&mut self, frame: &RgbImage, feedback: &Feedback) -> Result<(), Self::Error>;

  /// 非阻塞地取出一个按键
  fn poll_key(&mut self) -> Option<Key>;
}

#[derive(Error, Debug)]
pub enum DisplayError {
  #[error("终端显示错误: {0}")]
  TerminalDisplayError(#[from] TerminalDisplayError),
  #[cfg(feature = "gstreamer_output")]
  #[error("GStreamer 显示错误: {0}")]
  GStreamerDisplayError(#[from] GStreamerDisplayError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum DisplayWrapper {
  Terminal(TerminalDisplay),
  #[cfg(feature = "gstreamer_output")]
  Window(GStreamerDisplay),
}

impl FromUrl for DisplayWrapper {
  type Error = DisplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      TerminalDisplay::SCHEME => Ok(DisplayWrapper::Terminal(TerminalDisplay::from_url(url)?)),
      #[cfg(feature = "gstreamer_output")]
      GStreamerDisplay::SCHEME => Ok(DisplayWrapper::Window(GStreamerDisplay::from_url(url)?)),
      other => Err(DisplayError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Screen for DisplayWrapper {
  type Error = DisplayError;

  fn show(&mut self, frame: &RgbImage, feedback: &Feedback) -> Result<(), Self::Error> {
    match self {
      DisplayWrapper::Terminal(display) => display.show(frame, feedback).map_err(DisplayError::from),
      #[cfg(feature = "gstreamer_output")]
      DisplayWrapper::Window(display) => display.show(frame, feedback).map_err(DisplayError::from),
    }
  }

  fn poll_key(&mut self) -> Option<Key> {
    match self {
      DisplayWrapper::Terminal(display) => display.poll_key(),
      #[cfg(feature = "gstreamer_output")]
      DisplayWrapper::Window(display) => display.poll_key(),
    }
  }
}
