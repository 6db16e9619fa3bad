// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/config.rs - 模型配置
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

use std::{fmt, str::FromStr};

use thiserror::Error;
use url::Url;

use crate::resolution::{InputResolution, OutputStride, Resolution, ValidationError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("未知的骨干网络架构: {0}")]
  UnknownArchitecture(String),
  #[error("{architecture} 不支持输出步长 {stride}")]
  UnsupportedStride { architecture: Architecture, stride: u32 },
  #[error("{architecture} 不支持宽度系数 {multiplier}")]
  UnsupportedMultiplier {
    architecture: Architecture,
    multiplier: MobileNetMultiplier,
  },
  #[error("无效的量化字节数: {0}, 仅支持 1、2、4")]
  InvalidQuantBytes(String),
  #[error("无效的宽度系数: {0}, 仅支持 0.50、0.75、1.0")]
  InvalidMultiplier(String),
  #[error("未知的配置参数: {0}")]
  UnknownParameter(String),
  #[error("参数错误: {0}")]
  Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Architecture {
  #[default]
  MobileNetV1,
  ResNet50,
}

impl Architecture {
  pub fn valid_strides(self) -> &'static [OutputStride] {
    match self {
      Architecture::MobileNetV1 => &[
        OutputStride::Stride8,
        OutputStride::Stride16,
        OutputStride::Stride32,
      ],
      Architecture::ResNet50 => &[OutputStride::Stride16, OutputStride::Stride32],
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Architecture::MobileNetV1 => write!(f, "MobileNetV1"),
      Architecture::ResNet50 => write!(f, "ResNet50"),
    }
  }
}

impl FromStr for Architecture {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "mobilenet" | "mobilenetv1" => Ok(Architecture::MobileNetV1),
      "resnet" | "resnet50" => Ok(Architecture::ResNet50),
      _ => Err(ConfigError::UnknownArchitecture(s.to_string())),
    }
  }
}

/// MobileNet 宽度系数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MobileNetMultiplier {
  Half,
  #[default]
  ThreeQuarters,
  Full,
}

impl MobileNetMultiplier {
  pub fn get(self) -> f32 {
    match self {
      MobileNetMultiplier::Half => 0.50,
      MobileNetMultiplier::ThreeQuarters => 0.75,
      MobileNetMultiplier::Full => 1.0,
    }
  }

  /// 检查点目录中的写法
  pub fn dir_name(self) -> &'static str {
    match self {
      MobileNetMultiplier::Half => "050",
      MobileNetMultiplier::ThreeQuarters => "075",
      MobileNetMultiplier::Full => "100",
    }
  }
}

impl fmt::Display for MobileNetMultiplier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.2}", self.get())
  }
}

impl FromStr for MobileNetMultiplier {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = s
      .trim()
      .parse::<f32>()
      .map_err(|_| ConfigError::InvalidMultiplier(s.to_string()))?;
    if value == 0.5 {
      Ok(MobileNetMultiplier::Half)
    } else if value == 0.75 {
      Ok(MobileNetMultiplier::ThreeQuarters)
    } else if value == 1.0 {
      Ok(MobileNetMultiplier::Full)
    } else {
      Err(ConfigError::InvalidMultiplier(s.to_string()))
    }
  }
}

/// 权重量化字节数，4 表示未量化的浮点检查点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuantBytes {
  One,
  Two,
  #[default]
  Four,
}

impl QuantBytes {
  pub fn get(self) -> u32 {
    match self {
      QuantBytes::One => 1,
      QuantBytes::Two => 2,
      QuantBytes::Four => 4,
    }
  }
}

impl FromStr for QuantBytes {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "1" => Ok(QuantBytes::One),
      "2" => Ok(QuantBytes::Two),
      "4" => Ok(QuantBytes::Four),
      _ => Err(ConfigError::InvalidQuantBytes(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
  pub architecture: Architecture,
  pub output_stride: OutputStride,
  pub input_resolution: InputResolution,
  pub multiplier: MobileNetMultiplier,
  pub quant_bytes: QuantBytes,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      architecture: Architecture::MobileNetV1,
      output_stride: OutputStride::Stride16,
      input_resolution: InputResolution::Square(257),
      multiplier: MobileNetMultiplier::ThreeQuarters,
      quant_bytes: QuantBytes::Four,
    }
  }
}

impl ModelConfig {
  /// ResNet50 的默认配置
  pub fn resnet50() -> Self {
    Self {
      architecture: Architecture::ResNet50,
      output_stride: OutputStride::Stride32,
      input_resolution: InputResolution::Square(257),
      multiplier: MobileNetMultiplier::Full,
      quant_bytes: QuantBytes::Four,
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self
      .architecture
      .valid_strides()
      .contains(&self.output_stride)
    {
      return Err(ConfigError::UnsupportedStride {
        architecture: self.architecture,
        stride: self.output_stride.get(),
      });
    }

    let multiplier_ok = match self.architecture {
      Architecture::ResNet50 => self.multiplier == MobileNetMultiplier::Full,
      Architecture::MobileNetV1 => {
        self.output_stride != OutputStride::Stride32 || self.multiplier == MobileNetMultiplier::Full
      }
    };
    if !multiplier_ok {
      return Err(ConfigError::UnsupportedMultiplier {
        architecture: self.architecture,
        multiplier: self.multiplier,
      });
    }

    self.input_resolution.try_to_valid(self.output_stride)?;

    Ok(())
  }

  pub fn resolution(&self) -> Resolution {
    self.input_resolution.to_valid(self.output_stride)
  }

  /// 从 URL 查询参数覆盖默认值
  ///
  /// 支持 `architecture`、`stride`、`resolution`、`multiplier`、`quant`。
  /// 架构为 ResNet50 时以 [`ModelConfig::resnet50`] 为基础。
  pub fn from_query(url: &Url) -> Result<Self, ConfigError> {
    let architecture = url
      .query_pairs()
      .find(|(k, _)| k == "architecture")
      .map(|(_, v)| v.parse::<Architecture>())
      .transpose()?
      .unwrap_or_default();

    let mut config = match architecture {
      Architecture::MobileNetV1 => ModelConfig::default(),
      Architecture::ResNet50 => ModelConfig::resnet50(),
    };

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "architecture" => {}
        "stride" => config.output_stride = value.parse()?,
        "resolution" => config.input_resolution = value.parse()?,
        "multiplier" => config.multiplier = value.parse()?,
        "quant" => config.quant_bytes = value.parse()?,
        other => return Err(ConfigError::UnknownParameter(other.to_string())),
      }
    }

    config.validate()?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    assert!(ModelConfig::default().validate().is_ok());
    assert!(ModelConfig::resnet50().validate().is_ok());
  }

  #[test]
  fn rejects_unsupported_combinations() {
    let config = ModelConfig {
      architecture: Architecture::ResNet50,
      output_stride: OutputStride::Stride8,
      ..ModelConfig::resnet50()
    };
    assert_eq!(config.validate(), Err(ConfigError::UnsupportedStride {
      architecture: Architecture::ResNet50,
      stride: 8
    }));

    let config = ModelConfig {
      output_stride: OutputStride::Stride32,
      multiplier: MobileNetMultiplier::Half,
      ..ModelConfig::default()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::UnsupportedMultiplier { .. })
    ));

    let config = ModelConfig {
      multiplier: MobileNetMultiplier::Half,
      ..ModelConfig::resnet50()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn parses_query_parameters() {
    let url = Url::parse("posenet:///models?architecture=resnet50&stride=16&resolution=600x400&quant=4")
      .unwrap();
    let config = ModelConfig::from_query(&url).unwrap();
    assert_eq!(config.architecture, Architecture::ResNet50);
    assert_eq!(config.output_stride, OutputStride::Stride16);
    assert_eq!(config.quant_bytes, QuantBytes::Four);
    assert_eq!(config.resolution(), Resolution {
      height: 401,
      width: 609
    });

    let url = Url::parse("posenet:///models?multiplier=0.5&stride=8").unwrap();
    let config = ModelConfig::from_query(&url).unwrap();
    assert_eq!(config.architecture, Architecture::MobileNetV1);
    assert_eq!(config.multiplier, MobileNetMultiplier::Half);

    let url = Url::parse("posenet:///models?color=red").unwrap();
    assert_eq!(
      ModelConfig::from_query(&url),
      Err(ConfigError::UnknownParameter("color".to_string()))
    );
    let url = Url::parse("posenet:///models?stride=24").unwrap();
    assert!(ModelConfig::from_query(&url).is_err());

    let url = Url::parse("posenet:///models?resolution=4294967290").unwrap();
    assert_eq!(
      ModelConfig::from_query(&url),
      Err(ConfigError::Validation(ValidationError::ResolutionTooLarge {
        requested: 4294967290,
        stride: 16
      }))
    );
  }

  #[test]
  fn parses_enums() {
    assert_eq!("MobileNet".parse::<Architecture>(), Ok(Architecture::MobileNetV1));
    assert!("vgg".parse::<Architecture>().is_err());
    assert_eq!("1.0".parse::<MobileNetMultiplier>(), Ok(MobileNetMultiplier::Full));
    assert!("0.6".parse::<MobileNetMultiplier>().is_err());
    assert_eq!("2".parse::<QuantBytes>(), Ok(QuantBytes::Two));
    assert!("3".parse::<QuantBytes>().is_err());
  }
}
