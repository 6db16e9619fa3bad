// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/model/resnet.rs - ResNet50 骨干网络
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

use tracing::info;

use crate::{
  frame::Image,
  graph::GraphModel,
  model::{
    Backbone, BackboneError, OutputBundle,
    adapter::{Adapter, Normalization, RawOutputOrder},
  },
  resolution::OutputStride,
  tensor::{Tensor, TensorRegistry},
};

/// ImageNet 通道均值（R, G, B）取负，不做缩放
const IMAGENET_MEAN_OFFSET: [f32; 3] = [-123.15, -115.90, -103.06];

/// 原始输出顺序: (displacementFwd, displacementBwd, offsets, heatmaps)
const RESNET_RAW_ORDER: RawOutputOrder = RawOutputOrder {
  displacement_fwd: 0,
  displacement_bwd: 1,
  offsets: 2,
  heatmaps: 3,
};

pub struct ResNet<G> {
  adapter: Adapter<G>,
}

impl<G: GraphModel> ResNet<G> {
  pub fn new(graph: G, output_stride: OutputStride) -> Result<Self, BackboneError> {
    Self::with_registry(graph, output_stride, TensorRegistry::new())
  }

  pub fn with_registry(
    graph: G,
    output_stride: OutputStride,
    registry: TensorRegistry,
  ) -> Result<Self, BackboneError> {
    let adapter = Adapter::new(
      "ResNet50",
      graph,
      output_stride,
      Normalization::ChannelOffset(IMAGENET_MEAN_OFFSET),
      RESNET_RAW_ORDER,
      registry,
    )?;
    Ok(Self { adapter })
  }

  pub fn graph(&self) -> &G {
    self.adapter.graph()
  }
}

impl<G: GraphModel> Backbone for ResNet<G> {
  fn output_stride(&self) -> OutputStride {
    self.adapter.output_stride()
  }

  fn registry(&self) -> &TensorRegistry {
    self.adapter.registry()
  }

  fn preprocess(&self, image: &Image) -> Result<Tensor, BackboneError> {
    self.adapter.preprocess(image)
  }

  fn predict(&self, image: &Image) -> Result<OutputBundle, BackboneError> {
    self.adapter.predict(image)
  }

  fn dispose(self) {
    info!("释放 ResNet50 计算图");
    drop(self.adapter.into_graph());
  }
}
