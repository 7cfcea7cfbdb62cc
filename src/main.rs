// 该文件是 Goutu （构图） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{sync::mpsc, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use goutu::{
  FromUrl,
  engine::Engine,
  filter::FilterInfo,
  input::InputWrapper,
  model::load_detector_or_none,
  output::{DirectoryPhotoStore, DisplayWrapper},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("显示方式: {}", args.display);
  info!("照片目录: {}", args.output.display());

  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理函数")?;

  let detector = load_detector_or_none(&args.model);
  let mut engine = Engine::new(detector)?
    .with_interrupt(rx)
    .with_frame_limit(args.frame_number);
  engine.set_filter(
    args
      .filter
      .build(FilterInfo::new(args.name.clone(), args.complexity)),
  );

  let input = InputWrapper::from_url(&args.input)
    .with_context(|| format!("无法打开输入来源 {}", args.input))?;
  let mut display = DisplayWrapper::from_url(&args.display)
    .with_context(|| format!("无法打开显示 {}", args.display))?;
  let store = DirectoryPhotoStore::new(&args.output);

  let session = engine.run(input, &mut display, &store)?;
  for photo in &session.photos {
    info!("已保存: {}", photo.display());
  }
  if session.rejected_captures > 0 || session.failed_saves > 0 {
    warn!(
      "未就绪时的拍照请求 {} 次，保存失败 {} 次",
      session.rejected_captures, session.failed_saves
    );
  }

  Ok(())
}
