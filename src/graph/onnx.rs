// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/graph/onnx.rs - 基于 ONNX Runtime 的计算图
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

use std::{path::Path, sync::Mutex};

use ndarray::{ArrayD, ArrayView4};
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::{Tensor, ValueType},
};
use tracing::{debug, info};

use crate::graph::{Dim, GraphError, GraphModel};

pub struct OnnxGraph {
  // 单个会话同一时刻只允许一次推理
  session: Mutex<Session>,
  input_shape: Vec<Dim>,
}

impl OnnxGraph {
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(GraphError::ModelPath(format!(
        "模型文件不存在: {}",
        path.display()
      )));
    }

    info!("加载 ONNX 模型: {}", path.display());
    let session = Session::builder()
      .map_err(|e| load_error(path, e))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| load_error(path, e))?
      .commit_from_file(path)
      .map_err(|e| load_error(path, e))?;

    let input = session
      .inputs
      .first()
      .ok_or_else(|| GraphError::InvalidInput("模型没有输入".to_string()))?;
    let input_shape = match &input.input_type {
      ValueType::Tensor { shape, .. } => shape.iter().map(|&d| Dim::from(d)).collect::<Vec<_>>(),
      other => {
        return Err(GraphError::InvalidInput(format!(
          "输入 {} 不是张量: {:?}",
          input.name, other
        )));
      }
    };

    debug!(
      "模型输入: {:?}",
      session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>()
    );
    debug!(
      "模型输出: {:?}",
      session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>()
    );
    info!("模型加载完成，输入形状: {:?}", input_shape);

    Ok(Self {
      session: Mutex::new(session),
      input_shape,
    })
  }
}

fn load_error<E: std::fmt::Display>(path: &Path, e: E) -> GraphError {
  GraphError::ModelPath(format!("{}: {}", path.display(), e))
}

impl GraphModel for OnnxGraph {
  fn input_shape(&self) -> &[Dim] {
    &self.input_shape
  }

  fn execute(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<ArrayD<f32>>, GraphError> {
    let input = Tensor::from_array(batch.to_owned())?;

    let mut session = self
      .session
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    let outputs = session.run(ort::inputs![input])?;

    let mut results = Vec::with_capacity(outputs.len());
    for (name, value) in outputs.iter() {
      let array = value.try_extract_array::<f32>()?;
      debug!("输出 {}: 形状 {:?}", name, array.shape());
      results.push(array.to_owned());
    }
    Ok(results)
  }
}
