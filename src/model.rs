// 该文件是 Goutu （构图） 项目的一部分。
// src/model.rs - 模型
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
use tracing::{debug, error, info};
use url::Url;

use crate::detection::{Detection, Detector, DetectorError};

#[cfg(feature = "model_yolov8")]
mod yolov8;
#[cfg(feature = "model_yolov8")]
pub use self::yolov8::{Yolov8, Yolov8Builder, Yolov8Error};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

pub const PERSON_CLASS_ID: u32 = 0;
pub const PERSON_CONFIDENCE_THRESHOLD: f32 = 0.5;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，归一化
}

impl DetectItem {
  pub fn label(&self) -> &'static str {
    COCO_CLASSES
      .get(self.class_id as usize)
      .copied()
      .unwrap_or("unknown")
  }

  fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
  }

  pub fn iou(&self, other: &DetectItem) -> f32 {
    let x_min = self.bbox[0].max(other.bbox[0]);
    let y_min = self.bbox[1].max(other.bbox[1]);
    let x_max = self.bbox[2].min(other.bbox[2]);
    let y_max = self.bbox[3].min(other.bbox[3]);
    let inter = (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0);
    let union = self.area() + other.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

/// 按类别进行非极大值抑制，结果按置信度从高到低排列
pub fn non_max_suppression(items: &mut Vec<DetectItem>, iou_threshold: f32) {
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept = 0;
  for index in 0..items.len() {
    let suppressed = items[..kept].iter().any(|prev| {
      prev.class_id == items[index].class_id && prev.iou(&items[index]) > iou_threshold
    });
    if !suppressed {
      items.swap(kept, index);
      kept += 1;
    }
  }
  items.truncate(kept);
}

/// 将通用检测模型包装为人物检测器
pub struct PersonDetector<M> {
  model: M,
  class_id: u32,
  threshold: f32,
}

impl<M> PersonDetector<M> {
  pub fn new(model: M) -> Self {
    Self {
      model,
      class_id: PERSON_CLASS_ID,
      threshold: PERSON_CONFIDENCE_THRESHOLD,
    }
  }
}

impl<M> Detector for PersonDetector<M>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
    let result = self
      .model
      .infer(frame)
      .map_err(|e| DetectorError::Inference(Box::new(e)))?;
    debug!("模型输出 {} 个目标", result.len());

    result
      .items
      .iter()
      .filter(|item| item.class_id == self.class_id && item.score > self.threshold)
      .map(|item| Detection::from_corners(item.bbox).map_err(DetectorError::from))
      .collect()
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("不支持的模型方案: {0}")]
  SchemeMismatch(String),
  #[cfg(feature = "model_yolov8")]
  #[error("YOLOv8 模型错误: {0}")]
  Yolov8Error(#[from] Yolov8Error),
}

/// 按 URL 方案加载人物检测器
pub fn load_detector(url: &Url) -> Result<Box<dyn Detector>, ModelError> {
  #[cfg(feature = "model_yolov8")]
  {
    use crate::{FromUrl, FromUrlWithScheme};

    if url.scheme() == Yolov8Builder::SCHEME {
      let model = Yolov8Builder::from_url(url)?.build()?;
      return Ok(Box::new(PersonDetector::new(model)));
    }
  }
  Err(ModelError::SchemeMismatch(url.scheme().to_string()))
}

/// 加载失败时退化为无检测器模式，所有规则都将视为没有检测到人物
pub fn load_detector_or_none(url: &Url) -> Option<Box<dyn Detector>> {
  match load_detector(url) {
    Ok(detector) => {
      info!("检测模型加载完成: {}", url);
      Some(detector)
    }
    Err(e) => {
      error!("检测模型加载失败，以无检测器模式继续运行: {}", e);
      None
    }
  }
}
