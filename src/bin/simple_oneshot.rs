// 该文件是 Goutu （构图） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图片的构图评估
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

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use url::Url;

use goutu::{
  FromUrl,
  engine::Engine,
  filter::{Complexity, FilterInfo, FilterKind},
  input::InputWrapper,
  model::load_detector_or_none,
};

/// 对单帧画面给出构图反馈
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 人物检测模型
  #[arg(long, value_name = "MODEL", default_value = "yolov8:model/yolov8n.onnx")]
  pub model: Url,
  /// 输入来源，例如 image:///path/to/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 构图规则
  #[arg(long, value_name = "FILTER", default_value = "centered")]
  pub filter: FilterKind,
  /// 保存叠加提示后的图片
  #[arg(long, value_name = "FILE")]
  pub output: Option<PathBuf>,
  /// 以 JSON 格式输出反馈
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);

  let mut input = InputWrapper::from_url(&args.input)
    .with_context(|| format!("无法打开输入来源 {}", args.input))?;
  let frame = input.next().ok_or_else(|| anyhow!("没有输入帧"))??;

  let mut engine = Engine::new(load_detector_or_none(&args.model))?;
  engine.set_filter(
    args
      .filter
      .build(FilterInfo::new(args.filter.to_string(), Complexity::Low)),
  );

  let now = std::time::Instant::now();
  let feedback = engine.process_frame(&frame.image);
  info!("评估完成，耗时: {:.2?}", now.elapsed());

  if let Some(path) = &args.output {
    let mut annotated = frame.image.clone();
    engine.annotate(&mut annotated, &feedback);
    annotated
      .save(path)
      .with_context(|| format!("无法保存图片 {}", path.display()))?;
    info!("已保存叠加结果: {}", path.display());
  }

  if args.json {
    let report = serde_json::json!({
      "filter": args.filter.to_string(),
      "instruction": feedback.message(),
      "ready": feedback.is_ready(),
      "width": frame.image.width(),
      "height": frame.image.height(),
    });
    println!("{}", report);
  } else {
    println!("{}", feedback.message());
  }

  Ok(())
}
