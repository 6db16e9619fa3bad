// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{model::Model, output::Render, tensor::MemoryInfo};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());
    drop(result);

    if let Some(memory) = model.memory() {
      info!("存活张量: {} 个, {} 字节", memory.num_tensors, memory.num_bytes);
    }

    Ok(())
  }
}

/// 对同一帧重复推理，统计平均耗时并检查张量是否泄漏
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 1000,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }

  /// 不计入平均耗时的前若干次推理
  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }

  pub fn average(&self, times: &[Duration]) -> Option<Duration> {
    let counted = times.get(self.warmup..).filter(|t| !t.is_empty())?;
    Some(counted.iter().sum::<Duration>() / counted.len() as u32)
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let baseline: Option<MemoryInfo> = model.memory();
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      drop(result);
      times.push(elapsed);

      if let (Some(before), Some(after)) = (baseline, model.memory()) {
        if after.num_tensors > before.num_tensors {
          warn!(
            "({})存活张量增加: {} -> {}",
            i, before.num_tensors, after.num_tensors
          );
        }
      }
    }

    match self.average(&times) {
      Some(average) => warn!("平均推理时间: {:.2?}", average),
      None => warn!("推理次数不足 {} 次，不统计平均时间", self.warmup + 1),
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  struct Doubler {
    calls: Cell<usize>,
  }

  impl Model for Doubler {
    type Input = i32;
    type Output = i32;
    type Error = std::io::Error;

    fn infer(&self, input: &i32) -> Result<i32, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      Ok(input * 2)
    }
  }

  struct Collect(std::cell::RefCell<Vec<i32>>);

  impl Render<i32, i32> for &Collect {
    type Error = std::io::Error;

    fn render_result(&self, _frame: &i32, result: &i32) -> Result<(), Self::Error> {
      self.0.borrow_mut().push(*result);
      Ok(())
    }
  }

  #[test]
  fn one_shot_uses_first_frame() {
    let collect = Collect(Default::default());
    let model = Doubler { calls: Cell::new(0) };
    OneShotTask
      .run_task(vec![3, 4].into_iter(), model, &collect)
      .unwrap();
    assert_eq!(*collect.0.borrow(), vec![6]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let collect = Collect(Default::default());
    let model = Doubler { calls: Cell::new(0) };
    assert!(
      OneShotTask
        .run_task(Vec::<i32>::new().into_iter(), model, &collect)
        .is_err()
    );
  }

  #[test]
  fn repeat_shot_runs_requested_times() {
    let collect = Collect(Default::default());
    let model = Doubler { calls: Cell::new(0) };
    RepeatShotTask::default()
      .with_repeat(5)
      .run_task(std::iter::once(1), model, &collect)
      .unwrap();
    assert_eq!(*collect.0.borrow(), vec![2; 5]);
  }

  #[test]
  fn average_skips_warmup() {
    let task = RepeatShotTask::default().with_warmup(1);
    let times = [
      Duration::from_millis(100),
      Duration::from_millis(10),
      Duration::from_millis(20),
    ];
    assert_eq!(task.average(&times), Some(Duration::from_millis(15)));
    assert_eq!(task.average(&times[..1]), None);
  }
}
