// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
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

use thiserror::Error;

use crate::{
  frame::Image,
  graph::GraphError,
  resolution::{OutputStride, ValidationError},
  tensor::{MemoryInfo, ScopeError, Tensor, TensorRegistry},
};

/// PoseNet 关键点数量
pub const NUM_KEYPOINTS: usize = 17;

/// 热力图通道顺序对应的关键点名称
pub const PART_NAMES: [&str; NUM_KEYPOINTS] = [
  "nose",
  "leftEye",
  "rightEye",
  "leftEar",
  "rightEar",
  "leftShoulder",
  "rightShoulder",
  "leftElbow",
  "rightElbow",
  "leftWrist",
  "rightWrist",
  "leftHip",
  "rightHip",
  "leftKnee",
  "rightKnee",
  "leftAnkle",
  "rightAnkle",
];

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 当前存活的张量统计，不支持时返回 `None`
  fn memory(&self) -> Option<MemoryInfo> {
    None
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
  #[error("期望 {expected} 个输出, 实际为 {actual}")]
  OutputCount { expected: usize, actual: usize },
  #[error("输出 {index} 期望为 4 维张量, 实际形状 {shape:?}")]
  Rank { index: usize, shape: Vec<usize> },
  #[error("输出 {index} 的批维度必须为 1, 实际形状 {shape:?}")]
  Batch { index: usize, shape: Vec<usize> },
  #[error("批输入期望为 4 维张量, 实际形状 {0:?}")]
  InputRank(Vec<usize>),
  #[error("输入图像必须为 3 通道, 实际为 {0}")]
  Channels(usize),
}

#[derive(Error, Debug)]
pub enum BackboneError {
  #[error("模型配置错误: {0}")]
  Configuration(String),
  #[error("形状错误: {0}")]
  Shape(#[from] ShapeError),
  #[error("分辨率错误: {0}")]
  Validation(#[from] ValidationError),
  #[error("计算图错误: {0}")]
  Graph(#[from] GraphError),
  #[error("张量作用域错误: {0}")]
  Scope(#[from] ScopeError),
}

/// 骨干网络输出，四个张量共享同一输出网格 `(gridH, gridW)`
#[derive(Debug)]
pub struct OutputBundle {
  /// `[gridH, gridW, K]`，取值 [0, 1]
  pub heatmap_scores: Tensor,
  /// `[gridH, gridW, 2K]`
  pub offsets: Tensor,
  /// `[gridH, gridW, 2(K-1)]`
  pub displacement_fwd: Tensor,
  /// `[gridH, gridW, 2(K-1)]`
  pub displacement_bwd: Tensor,
}

impl OutputBundle {
  pub fn grid(&self) -> (usize, usize) {
    let shape = self.heatmap_scores.shape();
    (
      shape.first().copied().unwrap_or(0),
      shape.get(1).copied().unwrap_or(0),
    )
  }

  pub fn num_keypoints(&self) -> usize {
    self.heatmap_scores.shape().get(2).copied().unwrap_or(0)
  }

  pub fn dispose(self) {
    drop(self);
  }
}

/// 骨干网络的统一能力
pub trait Backbone {
  fn output_stride(&self) -> OutputStride;

  /// 本实例分配张量所用的注册表
  fn registry(&self) -> &TensorRegistry;

  /// 仅执行架构相关的归一化，返回 `[H, W, 3]` 浮点张量
  fn preprocess(&self, image: &Image) -> Result<Tensor, BackboneError>;

  fn predict(&self, image: &Image) -> Result<OutputBundle, BackboneError>;

  /// 释放计算图及参数，之后实例不可再用
  fn dispose(self)
  where
    Self: Sized;
}

mod adapter;
mod mobilenet;
mod posenet;
mod resnet;

pub use self::mobilenet::MobileNet;
pub use self::posenet::{BackboneModel, PoseNet, PoseNetBuilder, PoseNetError};
pub use self::resnet::ResNet;
