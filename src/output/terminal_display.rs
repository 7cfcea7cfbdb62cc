// 该文件是 Goutu （构图） 项目的一部分。
// src/output/terminal_display.rs - 终端显示
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
  io::{BufRead, BufReader},
  sync::mpsc::{self, Receiver, TryRecvError},
  thread,
};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  filter::Feedback,
  output::{Key, Screen},
};

const TERMINAL_DISPLAY_SCHEME: &str = "terminal";

#[derive(Error, Debug)]
pub enum TerminalDisplayError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法启动按键读取线程: {0}")]
  SpawnError(std::io::Error),
}

/// 无窗口环境下的显示：提示变化时写日志，按键从标准输入逐行读取
pub struct TerminalDisplay {
  keys: Receiver<Key>,
  last_message: Option<&'static str>,
  keys_closed: bool,
}

impl TerminalDisplay {
  pub fn stdin() -> Result<Self, TerminalDisplayError> {
    Self::with_reader(BufReader::new(std::io::stdin()))
  }

  /// 每行的内容作为一个按键名称
  pub fn with_reader<R>(reader: R) -> Result<Self, TerminalDisplayError>
  where
    R: BufRead + Send + 'static,
  {
    let (tx, keys) = mpsc::channel();
    thread::Builder::new()
      .name("terminal-keys".to_string())
      .spawn(move || {
        for line in reader.lines() {
          let Ok(line) = line else { break };
          let name = line.trim();
          if name.is_empty() {
            continue;
          }
          if tx.send(Key::from_name(name)).is_err() {
            break;
          }
        }
      })
      .map_err(TerminalDisplayError::SpawnError)?;

    Ok(Self {
      keys,
      last_message: None,
      keys_closed: false,
    })
  }
}

impl FromUrl for TerminalDisplay {
  type Error = TerminalDisplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != TERMINAL_DISPLAY_SCHEME {
      return Err(TerminalDisplayError::SchemeMismatch);
    }
    info!("终端显示模式：输入 w 回车拍照，q 回车退出");
    Self::stdin()
  }
}

impl FromUrlWithScheme for TerminalDisplay {
  const SCHEME: &'static str = TERMINAL_DISPLAY_SCHEME;
}

impl Screen for TerminalDisplay {
  type Error = TerminalDisplayError;

  fn show(&mut self, frame: &RgbImage, feedback: &Feedback) -> Result<(), Self::Error> {
    let message = feedback.message();
    if self.last_message != Some(message) {
      info!("{}", message);
      self.last_message = Some(message);
    }
    debug!("显示 {}x{} 帧", frame.width(), frame.height());
    Ok(())
  }

  fn poll_key(&mut self) -> Option<Key> {
    match self.keys.try_recv() {
      Ok(key) => Some(key),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        if !self.keys_closed {
          warn!("标准输入已关闭，之后无法再接收按键");
          self.keys_closed = true;
        }
        None
      }
    }
  }
}
