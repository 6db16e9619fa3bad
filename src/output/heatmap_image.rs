// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/output/heatmap_image.rs - 保存热力图图像
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

use image::{GrayImage, Luma, imageops::FilterType};
use ndarray::Axis;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Image,
  model::OutputBundle,
  output::Render,
};

#[derive(Error, Debug)]
pub enum HeatmapImageError {
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("热力图形状无效: {0:?}")]
  InvalidShape(Vec<usize>),
}

/// `image:///path/to/heatmap.png`，保存所有关键点取最大值后的热力图
pub struct HeatmapImageOutput {
  path: String,
}

impl FromUrlWithScheme for HeatmapImageOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for HeatmapImageOutput {
  type Error = HeatmapImageError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(HeatmapImageError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(HeatmapImageOutput {
      path: uri.path().to_string(),
    })
  }
}

impl HeatmapImageOutput {
  pub fn new(path: impl Into<String>) -> Self {
    Self { path: path.into() }
  }

  /// 网格大小的灰度图，灰度值为各关键点得分的最大值
  pub fn heatmap_image(bundle: &OutputBundle) -> Result<GrayImage, HeatmapImageError> {
    let scores = bundle.heatmap_scores.view();
    if scores.ndim() != 3 {
      return Err(HeatmapImageError::InvalidShape(scores.shape().to_vec()));
    }
    let merged = scores.fold_axis(Axis(2), 0.0f32, |acc, &v| acc.max(v));
    let (height, width) = (merged.shape()[0], merged.shape()[1]);

    let mut image = GrayImage::new(width as u32, height as u32);
    for ((row, col), &score) in merged.indexed_iter().map(|(i, v)| ((i[0], i[1]), v)) {
      let value = (score.clamp(0.0, 1.0) * 255.0).round() as u8;
      image.put_pixel(col as u32, row as u32, Luma([value]));
    }
    Ok(image)
  }
}

impl Render<Image, OutputBundle> for HeatmapImageOutput {
  type Error = HeatmapImageError;

  fn render_result(&self, frame: &Image, result: &OutputBundle) -> Result<(), Self::Error> {
    let heatmap = Self::heatmap_image(result)?;
    let (width, height) = (frame.width() as u32, frame.height() as u32);
    if width == 0 || height == 0 {
      warn!("输入帧为空，按网格大小保存热力图");
      heatmap.save(&self.path)?;
    } else {
      image::imageops::resize(&heatmap, width, height, FilterType::Nearest).save(&self.path)?;
    }
    info!("热力图已保存: {}", self.path);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tensor::TensorRegistry;
  use image::GenericImageView;
  use ndarray::{ArrayD, IxDyn};

  fn bundle(registry: &TensorRegistry) -> OutputBundle {
    let mut scores = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 2]));
    scores[IxDyn(&[1, 2, 0])] = 1.0;
    scores[IxDyn(&[1, 2, 1])] = 0.2;
    scores[IxDyn(&[0, 0, 1])] = 0.5;
    OutputBundle {
      heatmap_scores: registry.track(scores),
      offsets: registry.track(ArrayD::zeros(IxDyn(&[2, 3, 4]))),
      displacement_fwd: registry.track(ArrayD::zeros(IxDyn(&[2, 3, 2]))),
      displacement_bwd: registry.track(ArrayD::zeros(IxDyn(&[2, 3, 2]))),
    }
  }

  #[test]
  fn merges_keypoints_by_max() {
    let registry = TensorRegistry::new();
    let image = HeatmapImageOutput::heatmap_image(&bundle(&registry)).unwrap();
    assert_eq!(image.dimensions(), (3, 2));
    assert_eq!(image.get_pixel(2, 1).0, [255]);
    assert_eq!(image.get_pixel(0, 0).0, [128]);
    assert_eq!(image.get_pixel(1, 0).0, [0]);
  }

  #[test]
  fn saves_at_frame_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("heatmap.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = HeatmapImageOutput::from_url(&url).unwrap();

    let registry = TensorRegistry::new();
    output
      .render_result(&Image::zeros(33, 65), &bundle(&registry))
      .unwrap();
    let saved = image::open(&path).unwrap();
    assert_eq!(saved.dimensions(), (65, 33));
  }
}
