// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/graph.rs - 网络计算图抽象
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

use std::fmt;

use ndarray::{ArrayD, ArrayView4};
use thiserror::Error;

/// 计算图输入形状中的单个维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
  /// 任意大小（导出时为 -1 或符号维度）
  Any,
  Fixed(usize),
}

impl Dim {
  pub fn is_any(self) -> bool {
    matches!(self, Dim::Any)
  }
}

impl From<i64> for Dim {
  fn from(value: i64) -> Self {
    if value < 0 {
      Dim::Any
    } else {
      Dim::Fixed(value as usize)
    }
  }
}

impl fmt::Display for Dim {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Dim::Any => write!(f, "-1"),
      Dim::Fixed(n) => write!(f, "{}", n),
    }
  }
}

#[derive(Error, Debug)]
pub enum GraphError {
  #[cfg(feature = "onnx")]
  #[error("ONNX Runtime 错误: {0}")]
  Ort(#[from] ort::Error),
  #[error("模型路径错误: {0}")]
  ModelPath(String),
  #[error("计算图输入无效: {0}")]
  InvalidInput(String),
  #[error("计算图输出无效: {0}")]
  InvalidOutput(String),
  #[error("推理失败: {0}")]
  Execution(String),
}

/// 已加载的网络计算图
///
/// 输入为 NHWC 排布、批大小为 1 的浮点张量，输出按导出顺序返回。
pub trait GraphModel {
  /// 第一个输入的声明形状 `[batch, height, width, channels]`
  fn input_shape(&self) -> &[Dim];

  fn execute(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<ArrayD<f32>>, GraphError>;
}

impl<G: GraphModel + ?Sized> GraphModel for Box<G> {
  fn input_shape(&self) -> &[Dim] {
    (**self).input_shape()
  }

  fn execute(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<ArrayD<f32>>, GraphError> {
    (**self).execute(batch)
  }
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxGraph;
