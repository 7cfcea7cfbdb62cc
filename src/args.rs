// 该文件是 Goutu （构图） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use goutu::filter::{Complexity, FilterKind};

/// Goutu 实时构图引导
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 人物检测模型，例如 yolov8:model/yolov8n.onnx?size=640
  #[arg(long, value_name = "MODEL", default_value = "yolov8:model/yolov8n.onnx")]
  pub model: Url,

  /// 输入来源
  /// - gst://auto
  /// - gst://camera/dev/video0?width=1280&height=720
  /// - gst://file/path/to/video.mp4
  /// - v4l:///dev/video0?width=640&height=480
  /// - image:///path/to/photo.jpg?repeat=true
  #[arg(long, value_name = "SOURCE", default_value = "gst://auto")]
  pub input: Url,

  /// 显示方式：window://auto 或 terminal:
  #[arg(long, value_name = "DISPLAY", default_value = "window://auto")]
  pub display: Url,

  /// 照片保存目录
  #[arg(long, value_name = "DIR", default_value = "images")]
  pub output: PathBuf,

  /// 构图规则：centered, rule-of-thirds, headroom, distance-portrait,
  /// distance-full-body, horizon, symmetry
  #[arg(long, value_name = "FILTER", default_value = "centered")]
  pub filter: FilterKind,

  /// 规则名称
  #[arg(long, value_name = "NAME", default_value = "MainCenterFilter")]
  pub name: String,

  /// 规则复杂度：low, medium, high
  #[arg(long, value_name = "COMPLEXITY", default_value = "low")]
  pub complexity: Complexity,

  /// 处理指定帧数后退出
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let args = Args::parse_from(["goutu"]);
    assert_eq!(args.model.scheme(), "yolov8");
    assert_eq!(args.input.as_str(), "gst://auto");
    assert_eq!(args.display.scheme(), "window");
    assert_eq!(args.output, PathBuf::from("images"));
    assert_eq!(args.filter, FilterKind::Centered);
    assert_eq!(args.name, "MainCenterFilter");
    assert_eq!(args.complexity, Complexity::Low);
    assert_eq!(args.frame_number, None);
  }

  #[test]
  fn filter_and_limit_flags() {
    let args = Args::parse_from([
      "goutu",
      "--filter",
      "horizon",
      "--complexity",
      "high",
      "--display",
      "terminal:",
      "--frame-number",
      "30",
    ]);
    assert_eq!(args.filter, FilterKind::HorizonLeveler);
    assert_eq!(args.complexity, Complexity::High);
    assert_eq!(args.display.scheme(), "terminal");
    assert_eq!(args.frame_number, Some(30));
    assert!(Args::try_parse_from(["goutu", "--filter", "golden-ratio"]).is_err());
  }
}
