// 该文件是 Goutu （构图） 项目的一部分。
// src/output/overlay.rs - 提示信息叠加
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

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;

use crate::filter::Feedback;

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const FEEDBACK_FONT_SIZE: f32 = 32.0;
const FEEDBACK_POSITION: (i32, i32) = (50, 30);
const DESCRIPTION_FONT_SIZE: f32 = 18.0;
const DESCRIPTION_MARGIN: i32 = 20;
const PROMPT_FONT_SIZE: f32 = 24.0;
const PROMPT_BOTTOM_OFFSET: i32 = 50;
const BORDER_WIDTH: u32 = 10;

const READY_COLOR: Rgb<u8> = Rgb([0, 255, 0]); // 绿色
const GUIDE_COLOR: Rgb<u8> = Rgb([255, 255, 0]); // 黄色
const DESCRIPTION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const CAPTURE_PROMPT: &str = "click on 'w' to take a picture";

#[derive(Error, Debug)]
pub enum OverlayError {
  #[error("无法加载嵌入的字体: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 在显示画面上绘制提示文字、规则说明以及就绪边框
pub struct Overlay {
  font: FontRef<'static>,
}

impl Overlay {
  pub fn new() -> Result<Self, OverlayError> {
    Ok(Self {
      font: FontRef::try_from_slice(FONT_DATA)?,
    })
  }

  pub fn render(&self, image: &mut RgbImage, feedback: &Feedback, description: Option<&str>) {
    let color = if feedback.is_ready() {
      READY_COLOR
    } else {
      GUIDE_COLOR
    };
    let (x, y) = FEEDBACK_POSITION;
    draw_text_mut(
      image,
      color,
      x,
      y,
      PxScale::from(FEEDBACK_FONT_SIZE),
      &self.font,
      feedback.message(),
    );

    if let Some(description) = description {
      let scale = PxScale::from(DESCRIPTION_FONT_SIZE);
      let (text_width, _) = text_size(scale, &self.font, description);
      let x = image.width() as i32 - text_width as i32 - DESCRIPTION_MARGIN;
      draw_text_mut(
        image,
        DESCRIPTION_COLOR,
        x,
        DESCRIPTION_MARGIN,
        scale,
        &self.font,
        description,
      );
    }

    if feedback.is_ready() {
      draw_border(image, BORDER_WIDTH, READY_COLOR);
      let y = image.height() as i32 - PROMPT_BOTTOM_OFFSET;
      draw_text_mut(
        image,
        READY_COLOR,
        x,
        y,
        PxScale::from(PROMPT_FONT_SIZE),
        &self.font,
        CAPTURE_PROMPT,
      );
    }
  }
}

fn draw_border(image: &mut RgbImage, width: u32, color: Rgb<u8>) {
  let (w, h) = image.dimensions();
  let b = width.min(w).min(h);
  if b == 0 {
    return;
  }

  let strips = [
    Rect::at(0, 0).of_size(w, b),
    Rect::at(0, (h - b) as i32).of_size(w, b),
    Rect::at(0, 0).of_size(b, h),
    Rect::at((w - b) as i32, 0).of_size(b, h),
  ];
  for strip in strips {
    draw_filled_rect_mut(image, strip, color);
  }
}
