// 该文件是 Goutu （构图） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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

use std::collections::HashMap;

use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::{debug, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectItem, DetectResult, Model, non_max_suppression},
};

const YOLOV8_SCHEME: &str = "yolov8";
const YOLOV8_CLASS_NUM: usize = 80;
const YOLOV8_INPUT_SIZE: usize = 640;
const YOLOV8_OBJECT_THRESH: f32 = 0.5;
const YOLOV8_IOU_THRESH: f32 = 0.7;

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型参数错误: {0}")]
  InvalidParameter(String),
  #[error("模型输出形状不符: {0:?}")]
  OutputShape(Vec<usize>),
  #[error("推理错误: {0}")]
  TractError(TractError),
}

impl From<std::io::Error> for Yolov8Error {
  fn from(err: std::io::Error) -> Self {
    Yolov8Error::ModelLoadError(err)
  }
}

impl From<TractError> for Yolov8Error {
  fn from(err: TractError) -> Self {
    Yolov8Error::TractError(err)
  }
}

pub struct Yolov8Builder {
  model_path: String,
  input_size: usize,
  conf_threshold: f32,
  iou_threshold: f32,
}

impl FromUrl for Yolov8Builder {
  type Error = Yolov8Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != YOLOV8_SCHEME {
      return Err(Yolov8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        YOLOV8_SCHEME
      )));
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();

    let mut builder = Yolov8Builder {
      model_path: url.path().to_string(),
      input_size: YOLOV8_INPUT_SIZE,
      conf_threshold: YOLOV8_OBJECT_THRESH,
      iou_threshold: YOLOV8_IOU_THRESH,
    };
    if let Some(size) = query.get("size") {
      builder.input_size = size
        .parse()
        .map_err(|_| Yolov8Error::InvalidParameter(format!("size={}", size)))?;
    }
    if let Some(conf) = query.get("conf") {
      builder.conf_threshold = parse_ratio("conf", conf)?;
    }
    if let Some(iou) = query.get("iou") {
      builder.iou_threshold = parse_ratio("iou", iou)?;
    }
    Ok(builder)
  }
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = YOLOV8_SCHEME;
}

fn parse_ratio(key: &str, value: &str) -> Result<f32, Yolov8Error> {
  value
    .parse::<f32>()
    .ok()
    .filter(|v| (0.0..=1.0).contains(v))
    .ok_or_else(|| Yolov8Error::InvalidParameter(format!("{}={}", key, value)))
}

impl Yolov8Builder {
  pub fn build(self) -> Result<Yolov8, Yolov8Error> {
    if self.model_path.is_empty() || self.input_size == 0 {
      return Err(Yolov8Error::ModelPathError(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path);
    let metadata = std::fs::metadata(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      metadata.len() as f64 / (1024.0 * 1024.0)
    );

    let size = self.input_size;
    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )?
      .into_optimized()?
      .into_runnable()?;
    info!("模型加载完成，输入尺寸 {}x{}", size, size);

    Ok(Yolov8 {
      plan,
      input_size: size,
      conf_threshold: self.conf_threshold,
      iou_threshold: self.iou_threshold,
    })
  }
}

pub struct Yolov8 {
  plan: TypedRunnableModel<TypedModel>,
  input_size: usize,
  conf_threshold: f32,
  iou_threshold: f32,
}

impl Yolov8 {
  /// 拉伸到模型输入尺寸，归一化为 NCHW 浮点张量
  fn preprocess(&self, image: &RgbImage) -> Tensor {
    let size = self.input_size as u32;
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    tract_ndarray::Array4::from_shape_fn(
      (1, 3, self.input_size, self.input_size),
      |(_, c, y, x)| f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0,
    )
    .into_tensor()
  }
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = self.preprocess(input);

    debug!("执行模型推理");
    let outputs = self.plan.run(tvec!(tensor.into()))?;
    let output = &outputs[0];

    // [1, 4 + 类别数, 锚点数]
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != 4 + YOLOV8_CLASS_NUM {
      return Err(Yolov8Error::OutputShape(shape));
    }
    let data = output.as_slice::<f32>()?;

    let mut items = decode_predictions(
      data,
      shape[2],
      self.input_size as f32,
      self.conf_threshold,
    );
    non_max_suppression(&mut items, self.iou_threshold);
    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}

/// 解码按通道排列的预测：前四行是中心点与宽高（输入像素），其后每行一个类别的分数
fn decode_predictions(
  data: &[f32],
  anchors: usize,
  input_size: f32,
  conf_threshold: f32,
) -> Vec<DetectItem> {
  let mut items = Vec::new();

  for i in 0..anchors {
    let (class_id, score) = (0..YOLOV8_CLASS_NUM)
      .map(|c| (c, data[(4 + c) * anchors + i]))
      .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score <= conf_threshold {
      continue;
    }

    let cx = data[i];
    let cy = data[anchors + i];
    let w = data[2 * anchors + i];
    let h = data[3 * anchors + i];

    let bbox = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
      .map(|v| (v / input_size).clamp(0.0, 1.0));
    if bbox[2] <= bbox[0] || bbox[3] <= bbox[1] {
      continue;
    }

    items.push(DetectItem {
      class_id: class_id as u32,
      score,
      bbox,
    });
  }

  items
}
