// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::convert::Infallible;

use ndarray::Axis;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Image,
  model::{OutputBundle, PART_NAMES},
  output::Render,
};

/// 每个关键点热力图的峰值 `(score, row, col)`
pub fn keypoint_peaks(bundle: &OutputBundle) -> Vec<(f32, usize, usize)> {
  let scores = bundle.heatmap_scores.view();
  if scores.ndim() != 3 {
    return Vec::new();
  }
  scores
    .axis_iter(Axis(2))
    .map(|channel| {
      channel
        .indexed_iter()
        .fold((f32::MIN, 0, 0), |best, (index, &score)| {
          if score > best.0 {
            (score, index[0], index[1])
          } else {
            best
          }
        })
    })
    .collect()
}

/// `log://`，把输出形状和每个关键点的峰值写入日志
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = Infallible;

  fn from_url(_url: &Url) -> Result<Self, Self::Error> {
    Ok(LogOutput)
  }
}

impl Render<Image, OutputBundle> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &Image, result: &OutputBundle) -> Result<(), Self::Error> {
    let (grid_h, grid_w) = result.grid();
    info!(
      "输入 {}x{}，输出网格 {}x{}，关键点 {}",
      frame.width(),
      frame.height(),
      grid_w,
      grid_h,
      result.num_keypoints()
    );
    info!(
      "offsets {:?}, displacement_fwd {:?}, displacement_bwd {:?}",
      result.offsets.shape(),
      result.displacement_fwd.shape(),
      result.displacement_bwd.shape()
    );
    for (k, (score, row, col)) in keypoint_peaks(result).into_iter().enumerate() {
      let name = PART_NAMES.get(k).copied().unwrap_or("unknown");
      info!("  - {}: {:.3} @ ({}, {})", name, score, row, col);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tensor::TensorRegistry;
  use ndarray::{ArrayD, IxDyn};

  #[test]
  fn finds_peak_per_keypoint() {
    let registry = TensorRegistry::new();
    let mut scores = ArrayD::<f32>::zeros(IxDyn(&[3, 4, 2]));
    scores[IxDyn(&[2, 1, 0])] = 0.9;
    scores[IxDyn(&[0, 3, 1])] = 0.7;
    let bundle = OutputBundle {
      heatmap_scores: registry.track(scores),
      offsets: registry.track(ArrayD::zeros(IxDyn(&[3, 4, 4]))),
      displacement_fwd: registry.track(ArrayD::zeros(IxDyn(&[3, 4, 2]))),
      displacement_bwd: registry.track(ArrayD::zeros(IxDyn(&[3, 4, 2]))),
    };
    assert_eq!(keypoint_peaks(&bundle), vec![(0.9, 2, 1), (0.7, 0, 3)]);
    assert!(LogOutput.render_result(&Image::zeros(33, 49), &bundle).is_ok());
  }
}
