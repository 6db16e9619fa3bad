// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/model/posenet.rs - PoseNet 模型加载
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  checkpoint::Checkpoint,
  config::{Architecture, ConfigError, ModelConfig},
  frame::Image,
  graph::{GraphError, GraphModel},
  model::{Backbone, BackboneError, MobileNet, Model, OutputBundle, ResNet},
  resolution::{OutputStride, Resolution, assert_valid_resolution},
  tensor::{MemoryInfo, Tensor, TensorRegistry},
};

#[derive(Error, Debug)]
pub enum PoseNetError {
  #[error("模型配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("计算图错误: {0}")]
  Graph(#[from] GraphError),
  #[error("骨干网络错误: {0}")]
  Backbone(#[from] BackboneError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 由加载器使用的封闭骨干网络集合
pub enum BackboneModel<G> {
  MobileNet(MobileNet<G>),
  ResNet(ResNet<G>),
}

impl<G: GraphModel> BackboneModel<G> {
  pub fn new(
    architecture: Architecture,
    graph: G,
    output_stride: OutputStride,
    registry: TensorRegistry,
  ) -> Result<Self, BackboneError> {
    Ok(match architecture {
      Architecture::MobileNetV1 => {
        BackboneModel::MobileNet(MobileNet::with_registry(graph, output_stride, registry)?)
      }
      Architecture::ResNet50 => {
        BackboneModel::ResNet(ResNet::with_registry(graph, output_stride, registry)?)
      }
    })
  }

  pub fn architecture(&self) -> Architecture {
    match self {
      BackboneModel::MobileNet(_) => Architecture::MobileNetV1,
      BackboneModel::ResNet(_) => Architecture::ResNet50,
    }
  }
}

impl<G: GraphModel> Backbone for BackboneModel<G> {
  fn output_stride(&self) -> OutputStride {
    match self {
      BackboneModel::MobileNet(m) => m.output_stride(),
      BackboneModel::ResNet(m) => m.output_stride(),
    }
  }

  fn registry(&self) -> &TensorRegistry {
    match self {
      BackboneModel::MobileNet(m) => m.registry(),
      BackboneModel::ResNet(m) => m.registry(),
    }
  }

  fn preprocess(&self, image: &Image) -> Result<Tensor, BackboneError> {
    match self {
      BackboneModel::MobileNet(m) => m.preprocess(image),
      BackboneModel::ResNet(m) => m.preprocess(image),
    }
  }

  fn predict(&self, image: &Image) -> Result<OutputBundle, BackboneError> {
    match self {
      BackboneModel::MobileNet(m) => m.predict(image),
      BackboneModel::ResNet(m) => m.predict(image),
    }
  }

  fn dispose(self) {
    match self {
      BackboneModel::MobileNet(m) => m.dispose(),
      BackboneModel::ResNet(m) => m.dispose(),
    }
  }
}

/// 已加载的骨干网络及其固定输入分辨率
pub struct PoseNet<G> {
  backbone: BackboneModel<G>,
  input_resolution: Resolution,
}

impl<G: GraphModel> PoseNet<G> {
  pub fn from_graph(config: &ModelConfig, graph: G) -> Result<Self, PoseNetError> {
    config.validate()?;
    let input_resolution = config.resolution();
    let backbone = BackboneModel::new(
      config.architecture,
      graph,
      config.output_stride,
      TensorRegistry::new(),
    )?;
    info!(
      "{} 加载完成，输出步长 {}，输入分辨率 {}",
      config.architecture, config.output_stride, input_resolution
    );
    Ok(Self {
      backbone,
      input_resolution,
    })
  }

  pub fn architecture(&self) -> Architecture {
    self.backbone.architecture()
  }

  pub fn backbone(&self) -> &BackboneModel<G> {
    &self.backbone
  }

  /// 顺序为 (height, width)
  pub fn input_resolution(&self) -> Resolution {
    self.input_resolution
  }

  pub fn output_stride(&self) -> OutputStride {
    self.backbone.output_stride()
  }

  pub fn memory_info(&self) -> MemoryInfo {
    self.backbone.registry().memory()
  }

  /// 图像需已缩放到满足步长约束的分辨率
  pub fn predict(&self, image: &Image) -> Result<OutputBundle, BackboneError> {
    assert_valid_resolution(image.resolution(), self.output_stride())?;
    self.backbone.predict(image)
  }

  pub fn dispose(self) {
    self.backbone.dispose();
  }
}

impl<G: GraphModel> Model for PoseNet<G> {
  type Input = Image;
  type Output = OutputBundle;
  type Error = BackboneError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.predict(input)
  }

  fn memory(&self) -> Option<MemoryInfo> {
    Some(self.memory_info())
  }
}

/// `posenet:///模型根目录?architecture=resnet50&stride=32&resolution=513&quant=4`
pub struct PoseNetBuilder {
  root: PathBuf,
  config: ModelConfig,
}

impl FromUrlWithScheme for PoseNetBuilder {
  const SCHEME: &'static str = "posenet";
}

impl FromUrl for PoseNetBuilder {
  type Error = PoseNetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(PoseNetError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let config = ModelConfig::from_query(url)?;
    debug!("模型配置: {:?}", config);
    Ok(PoseNetBuilder {
      root: PathBuf::from(url.path()),
      config,
    })
  }
}

impl PoseNetBuilder {
  pub fn new(root: impl Into<PathBuf>, config: ModelConfig) -> Self {
    Self {
      root: root.into(),
      config,
    }
  }

  pub fn config(&self) -> &ModelConfig {
    &self.config
  }

  /// 计算图文件位置: `<root>/<检查点目录>/model-stride{s}.onnx`
  pub fn graph_path(&self) -> PathBuf {
    Checkpoint::from(&self.config).local_path(&self.root, "onnx")
  }

  pub fn build_with_graph<G: GraphModel>(self, graph: G) -> Result<PoseNet<G>, PoseNetError> {
    PoseNet::from_graph(&self.config, graph)
  }

  #[cfg(feature = "onnx")]
  pub fn build(self) -> Result<PoseNet<crate::graph::OnnxGraph>, PoseNetError> {
    let path = self.graph_path();
    info!("加载模型文件: {}", path.display());
    let graph = crate::graph::OnnxGraph::from_file(&path)?;
    self.build_with_graph(graph)
  }
}
