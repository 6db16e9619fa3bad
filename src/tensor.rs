// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/tensor.rs - 受追踪的张量与作用域
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

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use ndarray::{ArrayD, ArrayViewD};
use thiserror::Error;
use tracing::debug;

/// 张量内存统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
  pub num_tensors: usize,
  pub num_bytes: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
  num_tensors: AtomicUsize,
  num_bytes: AtomicUsize,
}

/// 存活张量计数器
///
/// 通过同一个注册表创建的张量在释放（drop）时自动注销，
/// 因此 [`TensorRegistry::memory`] 始终反映当前真实存活的缓冲区数量。
#[derive(Debug, Clone, Default)]
pub struct TensorRegistry {
  inner: Arc<RegistryInner>,
}

impl TensorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn track(&self, data: ArrayD<f32>) -> Tensor {
    let bytes = data.len() * std::mem::size_of::<f32>();
    self.inner.num_tensors.fetch_add(1, Ordering::Relaxed);
    self.inner.num_bytes.fetch_add(bytes, Ordering::Relaxed);
    Tensor {
      data,
      allocation: Allocation {
        registry: Arc::clone(&self.inner),
        bytes,
      },
    }
  }

  pub fn memory(&self) -> MemoryInfo {
    MemoryInfo {
      num_tensors: self.inner.num_tensors.load(Ordering::Relaxed),
      num_bytes: self.inner.num_bytes.load(Ordering::Relaxed),
    }
  }

  pub fn num_tensors(&self) -> usize {
    self.inner.num_tensors.load(Ordering::Relaxed)
  }
}

#[derive(Debug)]
struct Allocation {
  registry: Arc<RegistryInner>,
  bytes: usize,
}

impl Drop for Allocation {
  fn drop(&mut self) {
    self.registry.num_tensors.fetch_sub(1, Ordering::Relaxed);
    self.registry.num_bytes.fetch_sub(self.bytes, Ordering::Relaxed);
  }
}

/// 在 [`TensorRegistry`] 中登记的 f32 张量
#[derive(Debug)]
pub struct Tensor {
  data: ArrayD<f32>,
  allocation: Allocation,
}

impl Tensor {
  pub fn shape(&self) -> &[usize] {
    self.data.shape()
  }

  pub fn ndim(&self) -> usize {
    self.data.ndim()
  }

  pub fn view(&self) -> ArrayViewD<'_, f32> {
    self.data.view()
  }

  pub fn as_slice(&self) -> Option<&[f32]> {
    self.data.as_slice()
  }

  pub fn size_in_bytes(&self) -> usize {
    self.allocation.bytes
  }

  /// 取出底层数组，张量随即从注册表注销
  pub fn into_array(self) -> ArrayD<f32> {
    let Tensor { data, allocation } = self;
    drop(allocation);
    data
  }

  pub fn dispose(self) {
    drop(self);
  }
}

impl PartialEq<ArrayD<f32>> for Tensor {
  fn eq(&self, other: &ArrayD<f32>) -> bool {
    self.data == *other
  }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
  #[error("张量 #{0} 已被移出作用域")]
  Escaped(usize),
  #[error("张量 #{0} 不属于当前作用域")]
  Unknown(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorId(usize);

/// 中间张量作用域
///
/// 作用域内分配的每个张量都由作用域持有，只有通过 [`Scope::escape`]
/// 移出的张量会交还给调用方；其余张量在作用域被丢弃时统一释放，
/// 包括因 `?` 提前返回的失败路径。
pub struct Scope<'r> {
  name: &'static str,
  registry: &'r TensorRegistry,
  slots: Vec<Option<Tensor>>,
}

impl<'r> Scope<'r> {
  pub fn new(name: &'static str, registry: &'r TensorRegistry) -> Self {
    Self {
      name,
      registry,
      slots: Vec::new(),
    }
  }

  pub fn track(&mut self, data: ArrayD<f32>) -> TensorId {
    let id = TensorId(self.slots.len());
    self.slots.push(Some(self.registry.track(data)));
    id
  }

  pub fn get(&self, id: TensorId) -> Result<&Tensor, ScopeError> {
    match self.slots.get(id.0) {
      Some(Some(tensor)) => Ok(tensor),
      Some(None) => Err(ScopeError::Escaped(id.0)),
      None => Err(ScopeError::Unknown(id.0)),
    }
  }

  pub fn len(&self) -> usize {
    self.slots.iter().filter(|slot| slot.is_some()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 移出指定张量并结束作用域，其余张量立即释放
  pub fn escape<const N: usize>(mut self, ids: [TensorId; N]) -> Result<[Tensor; N], ScopeError> {
    let mut kept = Vec::with_capacity(N);
    for id in ids {
      let tensor = match self.slots.get_mut(id.0) {
        Some(slot) => slot.take().ok_or(ScopeError::Escaped(id.0))?,
        None => return Err(ScopeError::Unknown(id.0)),
      };
      kept.push(tensor);
    }
    // 长度恒为 N
    kept.try_into().map_err(|_| ScopeError::Unknown(N))
  }
}

impl Drop for Scope<'_> {
  fn drop(&mut self) {
    let released = self.len();
    self.slots.clear();
    debug!(
      "作用域 {} 结束，释放 {} 个中间张量，剩余存活张量 {}",
      self.name,
      released,
      self.registry.num_tensors()
    );
  }
}
