#![allow(dead_code)]

use std::cell::RefCell;

use ndarray::{ArrayD, ArrayView4, IxDyn};
use posenet_adapter::{
  graph::{Dim, GraphError, GraphModel},
  model::NUM_KEYPOINTS,
};

pub const HEATMAP_LOGIT: f32 = 0.0;
pub const OFFSET_VALUE: f32 = 1.0;
pub const FWD_VALUE: f32 = 2.0;
pub const BWD_VALUE: f32 = 3.0;

/// 导出时的原始输出排列
#[derive(Debug, Clone, Copy)]
pub enum Layout {
  /// (offsets, heatmaps, fwd, bwd)
  MobileNet,
  /// (fwd, bwd, offsets, heatmaps)
  ResNet,
  /// 只返回前三个输出
  Truncated,
  /// 批维度为 2
  DoubleBatch,
  /// 推理直接失败
  Fail,
}

/// 按输入分辨率生成常量输出的计算图，记录最近一次输入
pub struct FakeGraph {
  input_shape: Vec<Dim>,
  stride: usize,
  layout: Layout,
  pub seen: RefCell<Option<ArrayD<f32>>>,
}

impl FakeGraph {
  pub fn new(layout: Layout, stride: usize) -> Self {
    Self::with_input_shape(layout, stride, vec![Dim::Any, Dim::Any, Dim::Any, Dim::Fixed(3)])
  }

  pub fn with_input_shape(layout: Layout, stride: usize, input_shape: Vec<Dim>) -> Self {
    Self {
      input_shape,
      stride,
      layout,
      seen: RefCell::new(None),
    }
  }
}

fn constant(batch: usize, h: usize, w: usize, c: usize, value: f32) -> ArrayD<f32> {
  ArrayD::from_elem(IxDyn(&[batch, h, w, c]), value)
}

impl GraphModel for FakeGraph {
  fn input_shape(&self) -> &[Dim] {
    &self.input_shape
  }

  fn execute(&self, batch: ArrayView4<'_, f32>) -> Result<Vec<ArrayD<f32>>, GraphError> {
    let (_, height, width, _) = batch.dim();
    *self.seen.borrow_mut() = Some(batch.to_owned().into_dyn());
    if let Layout::Fail = self.layout {
      return Err(GraphError::Execution("会话已关闭".to_string()));
    }

    let (gh, gw) = ((height - 1) / self.stride + 1, (width - 1) / self.stride + 1);
    let k = NUM_KEYPOINTS;
    let heatmaps = constant(1, gh, gw, k, HEATMAP_LOGIT);
    let offsets = constant(1, gh, gw, 2 * k, OFFSET_VALUE);
    let fwd = constant(1, gh, gw, 2 * (k - 1), FWD_VALUE);
    let bwd = constant(1, gh, gw, 2 * (k - 1), BWD_VALUE);

    Ok(match self.layout {
      Layout::MobileNet => vec![offsets, heatmaps, fwd, bwd],
      Layout::ResNet => vec![fwd, bwd, offsets, heatmaps],
      Layout::Truncated => vec![offsets, heatmaps, fwd],
      Layout::Fail => Vec::new(),
      Layout::DoubleBatch => vec![
        offsets,
        constant(2, gh, gw, k, HEATMAP_LOGIT),
        fwd,
        bwd,
      ],
    })
  }
}

pub fn all_close(values: &[f32], expected: f32) -> bool {
  values.iter().all(|v| (v - expected).abs() < 1e-4)
}
