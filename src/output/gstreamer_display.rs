// 该文件是 Goutu （构图） 项目的一部分。
// src/output/gstreamer_display.rs - GStreamer 窗口显示
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

//! # GStreamer 窗口显示
//!
//! `window://auto` 使用 `autovideosink`，也可以直接指定视频接收元素，
//! 例如 `window://ximagesink` 或 `window://waylandsink`。
//!
//! 窗口中的键盘事件以导航事件的形式沿管道上行，在 appsrc 的源端口处被截获，
//! 通过通道交给主循环。窗口被关闭时视为退出。

use std::sync::mpsc::{self, Receiver};

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  filter::Feedback,
  output::{Key, Screen},
};

const GSTREAMER_DISPLAY_SCHEME: &str = "window";

/// GStreamer 显示错误类型
#[derive(Error, Debug)]
pub enum GStreamerDisplayError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("GStreamer 错误: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer 布尔操作错误: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("找不到 appsrc 元素")]
  AppSrcNotFound,
  #[error("无法转换为 appsrc")]
  AppSrcConversionFailed,
  #[error("管道错误: {0}")]
  PipelineError(String),
  #[error("状态切换错误: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
  #[error("推送帧失败: {0:?}")]
  FlowError(gst::FlowError),
}

fn pipeline_description(sink: &str) -> String {
  format!(
    "appsrc name=src is-live=true do-timestamp=true format=time ! videoconvert ! {} sync=false",
    sink
  )
}

pub struct GStreamerDisplay {
  pipeline: gst::Pipeline,
  appsrc: gst_app::AppSrc,
  keys: Receiver<String>,
  frame_size: Option<(u32, u32)>,
  frame_count: u64,
  closed: bool,
}

impl FromUrl for GStreamerDisplay {
  type Error = GStreamerDisplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != GSTREAMER_DISPLAY_SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        GSTREAMER_DISPLAY_SCHEME,
        url.scheme()
      );
      return Err(GStreamerDisplayError::SchemeMismatch);
    }

    gst::init()?;

    let sink = match url.host_str() {
      None | Some("") | Some("auto") => "autovideosink",
      Some(sink) => sink,
    };
    let description = pipeline_description(sink);
    info!("GStreamer 显示管道: {}", description);

    let pipeline = gst::parse::launch(&description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerDisplayError::PipelineError("无法创建管道".to_string()))?;

    let appsrc = pipeline
      .by_name("src")
      .ok_or(GStreamerDisplayError::AppSrcNotFound)?
      .downcast::<gst_app::AppSrc>()
      .map_err(|_| GStreamerDisplayError::AppSrcConversionFailed)?;

    let (tx, keys) = mpsc::channel();
    let pad = appsrc
      .static_pad("src")
      .ok_or_else(|| GStreamerDisplayError::PipelineError("appsrc 没有 src 端口".to_string()))?;
    pad.add_probe(gst::PadProbeType::EVENT_UPSTREAM, move |_pad, info| {
      if let Some(gst::PadProbeData::Event(ref event)) = info.data
        && let Ok(gst_video::NavigationEvent::KeyPress { key, .. }) =
          gst_video::NavigationEvent::parse(event)
      {
        let _ = tx.send(key);
      }
      gst::PadProbeReturn::Ok
    });

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerDisplay {
      pipeline,
      appsrc,
      keys,
      frame_size: None,
      frame_count: 0,
      closed: false,
    })
  }
}

impl FromUrlWithScheme for GStreamerDisplay {
  const SCHEME: &'static str = GSTREAMER_DISPLAY_SCHEME;
}

impl Drop for GStreamerDisplay {
  fn drop(&mut self) {
    let _ = self.appsrc.end_of_stream();
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("停止 GStreamer 显示管道失败: {}", e);
    }
    info!("显示窗口关闭，共显示 {} 帧", self.frame_count);
  }
}

impl GStreamerDisplay {
  /// 帧尺寸变化时重新协商 caps
  fn ensure_caps(&mut self, width: u32, height: u32) {
    if self.frame_size == Some((width, height)) {
      return;
    }
    let caps = gst::Caps::builder("video/x-raw")
      .field("format", "RGB")
      .field("width", width as i32)
      .field("height", height as i32)
      .field("framerate", gst::Fraction::new(0, 1))
      .build();
    self.appsrc.set_caps(Some(&caps));
    self.frame_size = Some((width, height));
    debug!("显示 caps: {}x{}", width, height);
  }

  /// 窗口被关闭或管道出错时返回 true
  fn window_closed(&mut self) -> bool {
    if self.closed {
      return true;
    }
    let Some(bus) = self.pipeline.bus() else {
      return false;
    };
    while let Some(message) = bus.pop_filtered(&[gst::MessageType::Error, gst::MessageType::Eos]) {
      match message.view() {
        gst::MessageView::Error(err) => warn!("显示管道错误: {}", err.error()),
        _ => info!("显示管道结束"),
      }
      self.closed = true;
    }
    self.closed
  }
}

impl Screen for GStreamerDisplay {
  type Error = GStreamerDisplayError;

  fn show(&mut self, frame: &RgbImage, _feedback: &Feedback) -> Result<(), Self::Error> {
    self.ensure_caps(frame.width(), frame.height());

    let buffer = gst::Buffer::from_slice(frame.as_raw().clone());
    self
      .appsrc
      .push_buffer(buffer)
      .map_err(GStreamerDisplayError::FlowError)?;
    self.frame_count += 1;
    Ok(())
  }

  fn poll_key(&mut self) -> Option<Key> {
    if self.window_closed() {
      return Some(Key::Quit);
    }
    self.keys.try_recv().ok().map(|name| Key::from_name(&name))
  }
}
