// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Image, model::OutputBundle};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod log_output;
pub use self::log_output::{LogOutput, keypoint_peaks};

#[cfg(feature = "save_image_file")]
mod heatmap_image;
#[cfg(feature = "save_image_file")]
pub use self::heatmap_image::{HeatmapImageError, HeatmapImageOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存热力图错误: {0}")]
  HeatmapImageError(#[from] HeatmapImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "save_image_file")]
  HeatmapImage(HeatmapImageOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput)),
      #[cfg(feature = "save_image_file")]
      HeatmapImageOutput::SCHEME => Ok(OutputWrapper::HeatmapImage(
        HeatmapImageOutput::from_url(url)?,
      )),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<Image, OutputBundle> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &Image, result: &OutputBundle) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => {
        output.render_result(frame, result).map_err(|e| match e {})
      }
      #[cfg(feature = "save_image_file")]
      OutputWrapper::HeatmapImage(output) => Ok(output.render_result(frame, result)?),
    }
  }
}
