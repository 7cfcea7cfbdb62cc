// 该文件是 Goutu （构图） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 输入
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

//! # GStreamer 视频输入
//!
//! 支持三类来源：
//!
//! - `gst://auto`：系统默认摄像头（`autovideosrc`）
//! - `gst://camera/dev/video0?width=1280&height=720&fps=30`：指定 V4L2 设备
//! - `gst://file/path/to/video.mp4`：视频文件
//!
//! 所有来源都可附加 `rotate=90|180|270` 旋转画面。管道末端统一转换为 RGB，
//! 帧尺寸由来源决定。
//!
//! ## 系统依赖
//!
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use std::{collections::HashMap, time::Instant};

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::Frame};

/// GStreamer 输入错误类型
#[derive(Error, Debug)]
pub enum GStreamerInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的输入来源: {0}")]
  UnknownSource(String),
  #[error("GStreamer 错误: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer 布尔操作错误: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("找不到 appsink 元素")]
  AppSinkNotFound,
  #[error("无法转换为 appsink")]
  AppSinkConversionFailed,
  #[error("无法从 caps 获取视频信息")]
  VideoInfoError,
  #[error("不支持的视频格式: {0:?}")]
  UnsupportedFormat(gst_video::VideoFormat),
  #[error("管道错误: {0}")]
  PipelineError(String),
  #[error("缓冲区大小不符: 期望 {expected} 字节, 实际 {actual} 字节")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("无法打开输入来源: {0}")]
  OpenError(String),
}

const GSTREAMER_INPUT_SCHEME: &str = "gst";
/// 等待管道进入播放状态的最长时间
const GSTREAMER_OPEN_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
enum PipelineItem {
  AutoSource,
  FileSource(String),
  CameraSource {
    camera: String,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
  },
  VideoFlip(&'static str),
  TargetFormat(&'static str),
}

impl PipelineItem {
  fn to_pipeline(&self) -> String {
    match self {
      PipelineItem::AutoSource => "autovideosrc".to_string(),
      PipelineItem::FileSource(path) => format!("filesrc location={} ! decodebin", path),
      PipelineItem::CameraSource {
        camera,
        width,
        height,
        fps,
      } => {
        let mut caps = vec!["video/x-raw".to_string()];
        if let Some(width) = width {
          caps.push(format!("width={}", width));
        }
        if let Some(height) = height {
          caps.push(format!("height={}", height));
        }
        if let Some(fps) = fps {
          caps.push(format!("framerate={}/1", fps));
        }
        format!("v4l2src device={} ! {}", camera, caps.join(","))
      }
      PipelineItem::VideoFlip(method) => format!("videoflip method={}", method),
      PipelineItem::TargetFormat(format) => {
        format!("videoconvert ! video/x-raw,format={}", format)
      }
    }
  }
}

/// GStreamer 输入管道构建器
pub struct GStreamerInputPipelineBuilder {
  items: Vec<PipelineItem>,
}

impl GStreamerInputPipelineBuilder {
  pub fn auto() -> Self {
    Self {
      items: vec![PipelineItem::AutoSource],
    }
  }

  pub fn camera(camera: &str, width: Option<u32>, height: Option<u32>, fps: Option<u32>) -> Self {
    Self {
      items: vec![PipelineItem::CameraSource {
        camera: camera.to_string(),
        width,
        height,
        fps,
      }],
    }
  }

  pub fn file(path: &str) -> Self {
    Self {
      items: vec![PipelineItem::FileSource(path.to_string())],
    }
  }

  pub fn rotate(mut self, degrees: &str) -> Self {
    let method = match degrees {
      "90" => Some("clockwise"),
      "180" => Some("rotate-180"),
      "270" => Some("counterclockwise"),
      _ => None,
    };
    match method {
      Some(method) => self.items.push(PipelineItem::VideoFlip(method)),
      None => warn!("忽略不支持的旋转角度: {}", degrees),
    }
    self
  }

  fn description(&self) -> String {
    let basic = self
      .items
      .iter()
      .map(PipelineItem::to_pipeline)
      .chain(std::iter::once(PipelineItem::TargetFormat("RGB").to_pipeline()))
      .collect::<Vec<String>>()
      .join(" ! ");
    format!("{} ! appsink max-buffers=2 drop=true name=sink", basic)
  }

  pub fn build(self) -> Result<GStreamerInput, GStreamerInputError> {
    gst::init()?;

    let description = self.description();
    info!("GStreamer 输入管道: {}", description);

    let pipeline = gst::parse::launch(&description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("无法创建管道".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    // 来源打不开时在这里报告，而不是等到拉取第一帧
    let started = match pipeline.set_state(gst::State::Playing) {
      Ok(_) => wait_until_playing(&pipeline),
      Err(_) => Err(open_failure(&pipeline, "无法切换到播放状态".to_string())),
    };
    if let Err(e) = started {
      let _ = pipeline.set_state(gst::State::Null);
      return Err(e);
    }

    Ok(GStreamerInput {
      pipeline,
      appsink,
      index: 0,
      opened_at: Instant::now(),
    })
  }
}

fn wait_until_playing(pipeline: &gst::Pipeline) -> Result<(), GStreamerInputError> {
  let (result, current, pending) =
    pipeline.state(gst::ClockTime::from_seconds(GSTREAMER_OPEN_TIMEOUT_SECS));
  match result {
    Ok(success) => {
      debug!("管道状态: {:?} ({:?})", current, success);
      // 即便状态切换成功，来源也可能已经在总线上报错
      match bus_error(pipeline) {
        Some(e) => Err(GStreamerInputError::OpenError(e)),
        None => Ok(()),
      }
    }
    Err(_) => Err(open_failure(
      pipeline,
      format!("状态切换失败，当前 {:?}，目标 {:?}", current, pending),
    )),
  }
}

/// 优先使用总线上的错误消息
fn open_failure(pipeline: &gst::Pipeline, fallback: String) -> GStreamerInputError {
  GStreamerInputError::OpenError(bus_error(pipeline).unwrap_or(fallback))
}

fn bus_error(pipeline: &gst::Pipeline) -> Option<String> {
  let message = pipeline.bus()?.pop_filtered(&[gst::MessageType::Error])?;
  match message.view() {
    gst::MessageView::Error(err) => Some(err.error().to_string()),
    _ => None,
  }
}

impl FromUrl for GStreamerInputPipelineBuilder {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != GSTREAMER_INPUT_SCHEME {
      return Err(GStreamerInputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let number = |key: &str| query.get(key).and_then(|v| v.parse::<u32>().ok());

    let builder = match url.host_str() {
      Some("auto") => Self::auto(),
      Some("camera") => Self::camera(url.path(), number("width"), number("height"), number("fps")),
      Some("file") => Self::file(url.path()),
      other => {
        return Err(GStreamerInputError::UnknownSource(
          other.unwrap_or_default().to_string(),
        ));
      }
    };

    Ok(match query.get("rotate") {
      Some(degrees) => builder.rotate(degrees),
      None => builder,
    })
  }
}

impl FromUrlWithScheme for GStreamerInputPipelineBuilder {
  const SCHEME: &'static str = GSTREAMER_INPUT_SCHEME;
}

/// GStreamer 视频输入，逐帧从 appsink 拉取 RGB 画面
pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  index: u64,
  opened_at: Instant,
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("停止 GStreamer 输入管道失败: {}", e);
    }
  }
}

impl Iterator for GStreamerInput {
  type Item = Result<Frame, GStreamerInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let sample = match self.appsink.pull_sample() {
      Ok(sample) => sample,
      Err(_) if self.appsink.is_eos() => {
        info!("GStreamer 输入结束");
        return None;
      }
      Err(e) => {
        return Some(Err(GStreamerInputError::PipelineError(format!(
          "拉取帧失败: {}",
          e
        ))));
      }
    };

    let frame = sample_to_image(&sample).map(|image| Frame {
      image,
      index: self.index,
      timestamp_ms: self.opened_at.elapsed().as_millis() as u64,
    });
    self.index += 1;
    Some(frame)
  }
}

fn sample_to_image(sample: &gst::Sample) -> Result<RgbImage, GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("帧中没有缓冲区".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("帧中没有 caps".to_string()))?;
  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;

  let bgr = match video_info.format() {
    gst_video::VideoFormat::Rgb => false,
    gst_video::VideoFormat::Bgr => true,
    other => return Err(GStreamerInputError::UnsupportedFormat(other)),
  };

  let map = buffer
    .map_readable()
    .map_err(|e| GStreamerInputError::PipelineError(format!("无法映射缓冲区: {}", e)))?;

  packed_rows_to_image(
    map.as_slice(),
    video_info.width(),
    video_info.height(),
    video_info.stride()[0] as usize,
    bgr,
  )
}

/// 按行跨度拷贝 24 位像素，跳过行尾对齐填充
fn packed_rows_to_image(
  data: &[u8],
  width: u32,
  height: u32,
  stride: usize,
  bgr: bool,
) -> Result<RgbImage, GStreamerInputError> {
  let row_bytes = width as usize * 3;
  let expected = stride * (height as usize).saturating_sub(1) + row_bytes;
  if stride < row_bytes || data.len() < expected {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  let mut image = RgbImage::new(width, height);
  for (y, row) in image.rows_mut().enumerate() {
    let src = &data[y * stride..y * stride + row_bytes];
    for (pixel, bytes) in row.zip(src.chunks_exact(3)) {
      pixel.0 = if bgr {
        [bytes[2], bytes[1], bytes[0]]
      } else {
        [bytes[0], bytes[1], bytes[2]]
      };
    }
  }
  Ok(image)
}
