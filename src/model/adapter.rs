// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/model/adapter.rs - 骨干网络通用前后处理
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

use ndarray::{ArrayD, ArrayView1, Axis, Ix4};
use tracing::{debug, error};

use crate::{
  frame::{Image, RGB_CHANNELS},
  graph::{Dim, GraphModel},
  model::{BackboneError, OutputBundle, ShapeError},
  resolution::OutputStride,
  tensor::{Scope, Tensor, TensorId, TensorRegistry},
};

pub(crate) const NUM_RAW_OUTPUTS: usize = 4;

/// 架构相关的像素归一化
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Normalization {
  /// `pixel / divisor - shift`
  ScaleShift { divisor: f32, shift: f32 },
  /// 逐通道加上固定偏移（R, G, B）
  ChannelOffset([f32; RGB_CHANNELS]),
}

impl Normalization {
  fn apply(&self, input: &Tensor) -> ArrayD<f32> {
    match *self {
      Normalization::ScaleShift { divisor, shift } => input.view().mapv(|v| v / divisor - shift),
      Normalization::ChannelOffset(offsets) => {
        let offsets = ArrayView1::from(&offsets[..]);
        let mut out = input.view().to_owned();
        let last = Axis(out.ndim() - 1);
        for mut pixel in out.lanes_mut(last) {
          pixel += &offsets;
        }
        out
      }
    }
  }
}

/// 原始输出位置到规范输出的映射表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawOutputOrder {
  pub heatmaps: usize,
  pub offsets: usize,
  pub displacement_fwd: usize,
  pub displacement_bwd: usize,
}

impl RawOutputOrder {
  fn is_permutation(&self) -> bool {
    let mut seen = [false; NUM_RAW_OUTPUTS];
    for index in [
      self.heatmaps,
      self.offsets,
      self.displacement_fwd,
      self.displacement_bwd,
    ] {
      match seen.get_mut(index) {
        Some(slot) if !*slot => *slot = true,
        _ => return false,
      }
    }
    true
  }
}

/// 两种骨干网络共用的适配层，差异仅在归一化方式与输出顺序
pub(crate) struct Adapter<G> {
  name: &'static str,
  graph: G,
  output_stride: OutputStride,
  normalization: Normalization,
  order: RawOutputOrder,
  registry: TensorRegistry,
}

impl<G: GraphModel> Adapter<G> {
  pub fn new(
    name: &'static str,
    graph: G,
    output_stride: OutputStride,
    normalization: Normalization,
    order: RawOutputOrder,
    registry: TensorRegistry,
  ) -> Result<Self, BackboneError> {
    let shape = graph.input_shape();
    let spatial_any = shape.len() == 4 && shape[1].is_any() && shape[2].is_any();
    if !spatial_any {
      let shape = shape.iter().map(Dim::to_string).collect::<Vec<_>>();
      error!("{} 输入形状 [{}] 的空间维度必须均为 -1", name, shape.join(", "));
      return Err(BackboneError::Configuration(format!(
        "{} 输入形状 [{}] 的空间维度必须均为 -1",
        name,
        shape.join(", ")
      )));
    }
    if !order.is_permutation() {
      return Err(BackboneError::Configuration(format!(
        "{} 输出顺序表无效: {:?}",
        name, order
      )));
    }

    debug!("{} 骨干网络就绪，输出步长 {}", name, output_stride);
    Ok(Self {
      name,
      graph,
      output_stride,
      normalization,
      order,
      registry,
    })
  }

  pub fn output_stride(&self) -> OutputStride {
    self.output_stride
  }

  pub fn registry(&self) -> &TensorRegistry {
    &self.registry
  }

  pub fn graph(&self) -> &G {
    &self.graph
  }

  pub fn into_graph(self) -> G {
    self.graph
  }

  fn normalize(&self, scope: &mut Scope<'_>, image: &Image) -> Result<TensorId, BackboneError> {
    if image.channels() != RGB_CHANNELS {
      return Err(ShapeError::Channels(image.channels()).into());
    }
    let as_float = scope.track(image.to_float());
    let normalized = self.normalization.apply(scope.get(as_float)?);
    Ok(scope.track(normalized))
  }

  pub fn preprocess(&self, image: &Image) -> Result<Tensor, BackboneError> {
    let mut scope = Scope::new(self.name, &self.registry);
    let normalized = self.normalize(&mut scope, image)?;
    let [normalized] = scope.escape([normalized])?;
    Ok(normalized)
  }

  pub fn predict(&self, image: &Image) -> Result<OutputBundle, BackboneError> {
    let mut scope = Scope::new(self.name, &self.registry);

    let normalized = self.normalize(&mut scope, image)?;
    let batched = {
      let batch = scope.get(normalized)?.view().insert_axis(Axis(0)).to_owned();
      scope.track(batch)
    };

    let raw = {
      let batch = scope.get(batched)?;
      let batch = batch
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| ShapeError::InputRank(batch.shape().to_vec()))?;
      self.graph.execute(batch)?
    };
    // 先登记全部原始输出，校验失败时由作用域统一释放
    let raw = raw.into_iter().map(|r| scope.track(r)).collect::<Vec<_>>();
    if raw.len() != NUM_RAW_OUTPUTS {
      error!("{} 期望 {} 个输出, 实际为 {}", self.name, NUM_RAW_OUTPUTS, raw.len());
      return Err(
        ShapeError::OutputCount {
          expected: NUM_RAW_OUTPUTS,
          actual: raw.len(),
        }
        .into(),
      );
    }

    let mut squeezed = Vec::with_capacity(NUM_RAW_OUTPUTS);
    for (index, &id) in raw.iter().enumerate() {
      let array = squeeze_batch(scope.get(id)?, index)?;
      squeezed.push(scope.track(array));
    }

    let heatmaps = squeezed[self.order.heatmaps];
    let heatmap_scores = {
      let scores = scope.get(heatmaps)?.view().mapv(sigmoid);
      scope.track(scores)
    };

    let [heatmap_scores, offsets, displacement_fwd, displacement_bwd] = scope.escape([
      heatmap_scores,
      squeezed[self.order.offsets],
      squeezed[self.order.displacement_fwd],
      squeezed[self.order.displacement_bwd],
    ])?;

    debug!(
      "{} 输出: heatmap {:?}, offsets {:?}, fwd {:?}, bwd {:?}",
      self.name,
      heatmap_scores.shape(),
      offsets.shape(),
      displacement_fwd.shape(),
      displacement_bwd.shape()
    );

    Ok(OutputBundle {
      heatmap_scores,
      offsets,
      displacement_fwd,
      displacement_bwd,
    })
  }
}

fn squeeze_batch(raw: &Tensor, index: usize) -> Result<ArrayD<f32>, ShapeError> {
  let shape = raw.shape();
  if shape.len() != 4 {
    return Err(ShapeError::Rank {
      index,
      shape: shape.to_vec(),
    });
  }
  if shape[0] != 1 {
    return Err(ShapeError::Batch {
      index,
      shape: shape.to_vec(),
    });
  }
  Ok(raw.view().index_axis(Axis(0), 0).to_owned())
}

pub(crate) fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
