// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/weights.rs - 模型权重访问与加载
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

use std::{collections::HashMap, path::Path};

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::tensor::{Tensor, TensorRegistry};

const MOBILENET_SCOPE: &str = "MobilenetV1";

#[derive(Error, Debug)]
pub enum WeightError {
  #[error("权重中不存在变量: {0}")]
  MissingVariable(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("权重清单解析错误: {0}")]
  ManifestError(#[from] serde_json::Error),
  #[error("不支持的数据类型: {0}")]
  UnsupportedDtype(String),
  #[error("变量 {name} 数据长度不匹配: 期望 {expected} 字节, 剩余 {actual} 字节")]
  SizeMismatch {
    name: String,
    expected: usize,
    actual: usize,
  },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
  Model {
    #[serde(rename = "weightsManifest")]
    weights_manifest: Vec<ManifestGroup>,
  },
  Bare(Vec<ManifestGroup>),
}

#[derive(Debug, Deserialize)]
struct ManifestGroup {
  paths: Vec<String>,
  weights: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
  name: String,
  shape: Vec<usize>,
  dtype: String,
  #[serde(default)]
  quantization: Option<Quantization>,
}

#[derive(Debug, Deserialize)]
struct Quantization {
  dtype: String,
  scale: f32,
  min: f32,
}

/// 按层名访问的参数集合
///
/// 变量名形如 `MobilenetV1/{layer}/weights`，构造时不检查完整性，
/// 缺失的变量在查询时报错。
#[derive(Debug)]
pub struct WeightSet {
  variables: HashMap<String, Tensor>,
}

impl WeightSet {
  pub fn new(variables: HashMap<String, ArrayD<f32>>, registry: &TensorRegistry) -> Self {
    let variables = variables
      .into_iter()
      .map(|(name, data)| (name, registry.track(data)))
      .collect();
    Self { variables }
  }

  /// 读取 tfjs 格式的权重清单（`model.json` 或单独的清单文件）及其分片
  pub fn from_manifest<P: AsRef<Path>>(
    path: P,
    registry: &TensorRegistry,
  ) -> Result<Self, WeightError> {
    let path = path.as_ref();
    info!("加载权重清单: {}", path.display());
    let groups = match serde_json::from_slice::<ManifestFile>(&std::fs::read(path)?)? {
      ManifestFile::Model { weights_manifest } => weights_manifest,
      ManifestFile::Bare(groups) => groups,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut variables = HashMap::new();
    for group in groups {
      let mut buffer = Vec::new();
      for shard in &group.paths {
        buffer.extend(std::fs::read(dir.join(shard))?);
      }
      debug!("权重分组 {:?}: {} 字节", group.paths, buffer.len());

      let mut cursor = 0usize;
      for entry in &group.weights {
        let (data, consumed) = decode_entry(entry, &buffer[cursor..])?;
        cursor += consumed;
        variables.insert(entry.name.clone(), data);
      }
    }

    info!("权重加载完成，共 {} 个变量", variables.len());
    Ok(Self::new(variables, registry))
  }

  pub fn len(&self) -> usize {
    self.variables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.variables.is_empty()
  }

  fn variable(&self, layer_name: &str, kind: &str) -> Result<&Tensor, WeightError> {
    let name = format!("{}/{}/{}", MOBILENET_SCOPE, layer_name, kind);
    self
      .variables
      .get(&name)
      .ok_or(WeightError::MissingVariable(name))
  }

  pub fn weights(&self, layer_name: &str) -> Result<&Tensor, WeightError> {
    self.variable(layer_name, "weights")
  }

  pub fn depthwise_weights(&self, layer_name: &str) -> Result<&Tensor, WeightError> {
    self.variable(layer_name, "depthwise_weights")
  }

  pub fn depthwise_bias(&self, layer_name: &str) -> Result<&Tensor, WeightError> {
    self.variable(layer_name, "biases")
  }

  /// 与 [`WeightSet::depthwise_bias`] 指向同一变量
  pub fn conv_bias(&self, layer_name: &str) -> Result<&Tensor, WeightError> {
    self.depthwise_bias(layer_name)
  }

  pub fn dispose(self) {
    debug!("释放 {} 个权重变量", self.variables.len());
    drop(self.variables);
  }
}

fn decode_entry(entry: &ManifestEntry, bytes: &[u8]) -> Result<(ArrayD<f32>, usize), WeightError> {
  let count = entry.shape.iter().product::<usize>();
  let stored = match &entry.quantization {
    Some(q) => q.dtype.as_str(),
    None => entry.dtype.as_str(),
  };
  let width = match stored {
    "float32" | "int32" => 4,
    "uint16" => 2,
    "uint8" => 1,
    other => return Err(WeightError::UnsupportedDtype(other.to_string())),
  };
  let expected = count * width;
  if bytes.len() < expected {
    return Err(WeightError::SizeMismatch {
      name: entry.name.clone(),
      expected,
      actual: bytes.len(),
    });
  }
  let bytes = &bytes[..expected];

  let values: Vec<f32> = match (stored, &entry.quantization) {
    ("uint8", Some(q)) => bytes.iter().map(|&b| f32::from(b) * q.scale + q.min).collect(),
    ("uint16", Some(q)) => bytes
      .chunks_exact(2)
      .map(|c| f32::from(u16::from_le_bytes([c[0], c[1]])) * q.scale + q.min)
      .collect(),
    ("int32", _) => bytes
      .chunks_exact(4)
      .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
      .collect(),
    ("float32", _) => bytes
      .chunks_exact(4)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect(),
    (other, _) => return Err(WeightError::UnsupportedDtype(other.to_string())),
  };

  let data = ArrayD::from_shape_vec(IxDyn(&entry.shape), values).map_err(|_| {
    WeightError::SizeMismatch {
      name: entry.name.clone(),
      expected,
      actual: bytes.len(),
    }
  })?;
  Ok((data, expected))
}
