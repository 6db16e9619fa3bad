// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/checkpoint.rs - 检查点目录布局
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

use std::path::{Path, PathBuf};

use url::Url;

use crate::{
  config::{Architecture, MobileNetMultiplier, ModelConfig, QuantBytes},
  resolution::OutputStride,
};

/// 官方发布的检查点根地址，仅用于拼接，不做下载
pub const POSENET_BASE_URL: &str = "https://storage.googleapis.com/tfjs-models/savedmodel/posenet/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
  architecture: Architecture,
  output_stride: OutputStride,
  multiplier: MobileNetMultiplier,
  quant_bytes: QuantBytes,
}

impl From<&ModelConfig> for Checkpoint {
  fn from(config: &ModelConfig) -> Self {
    Self {
      architecture: config.architecture,
      output_stride: config.output_stride,
      multiplier: config.multiplier,
      quant_bytes: config.quant_bytes,
    }
  }
}

impl Checkpoint {
  /// 相对于检查点根目录的目录，以 `/` 结尾
  ///
  /// - ResNet50: `resnet50/float/` 或 `resnet50/quant{q}/`
  /// - MobileNetV1: `mobilenet/float/{m}/` 或 `mobilenet/quant{q}/{m}/`
  pub fn dir(&self) -> String {
    let precision = match self.quant_bytes {
      QuantBytes::Four => "float".to_string(),
      q => format!("quant{}", q.get()),
    };
    match self.architecture {
      Architecture::ResNet50 => format!("resnet50/{}/", precision),
      Architecture::MobileNetV1 => {
        format!("mobilenet/{}/{}/", precision, self.multiplier.dir_name())
      }
    }
  }

  pub fn file_name(&self, extension: &str) -> String {
    format!("model-stride{}.{}", self.output_stride, extension)
  }

  pub fn relative_path(&self, extension: &str) -> String {
    format!("{}{}", self.dir(), self.file_name(extension))
  }

  /// 在给定根地址上拼接检查点地址，根地址需以 `/` 结尾
  pub fn resolve(&self, base: &Url, extension: &str) -> Result<Url, url::ParseError> {
    base.join(&self.relative_path(extension))
  }

  pub fn local_path(&self, root: &Path, extension: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(self.dir().split('/').filter(|s| !s.is_empty()));
    path.push(self.file_name(extension));
    path
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn checkpoint(
    architecture: Architecture,
    stride: OutputStride,
    multiplier: MobileNetMultiplier,
    quant_bytes: QuantBytes,
  ) -> Checkpoint {
    Checkpoint::from(&ModelConfig {
      architecture,
      output_stride: stride,
      multiplier,
      quant_bytes,
      ..ModelConfig::default()
    })
  }

  #[test]
  fn resnet_layout() {
    let c = checkpoint(
      Architecture::ResNet50,
      OutputStride::Stride32,
      MobileNetMultiplier::Full,
      QuantBytes::Four,
    );
    assert_eq!(c.relative_path("json"), "resnet50/float/model-stride32.json");
    let c = checkpoint(
      Architecture::ResNet50,
      OutputStride::Stride16,
      MobileNetMultiplier::Full,
      QuantBytes::Two,
    );
    assert_eq!(c.relative_path("json"), "resnet50/quant2/model-stride16.json");
  }

  #[test]
  fn mobilenet_layout() {
    let c = checkpoint(
      Architecture::MobileNetV1,
      OutputStride::Stride16,
      MobileNetMultiplier::ThreeQuarters,
      QuantBytes::Four,
    );
    assert_eq!(c.relative_path("json"), "mobilenet/float/075/model-stride16.json");
    let c = checkpoint(
      Architecture::MobileNetV1,
      OutputStride::Stride8,
      MobileNetMultiplier::Half,
      QuantBytes::One,
    );
    assert_eq!(c.relative_path("onnx"), "mobilenet/quant1/050/model-stride8.onnx");
  }

  #[test]
  fn resolves_against_base() {
    let c = checkpoint(
      Architecture::ResNet50,
      OutputStride::Stride32,
      MobileNetMultiplier::Full,
      QuantBytes::Four,
    );
    let base = Url::parse(POSENET_BASE_URL).unwrap();
    assert_eq!(
      c.resolve(&base, "json").unwrap().as_str(),
      "https://storage.googleapis.com/tfjs-models/savedmodel/posenet/resnet50/float/model-stride32.json"
    );
    assert_eq!(
      c.local_path(Path::new("/opt/models"), "onnx"),
      PathBuf::from("/opt/models/resnet50/float/model-stride32.onnx")
    );
  }
}
