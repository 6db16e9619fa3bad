// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/resolution.rs - 输入分辨率校验与推导
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

use std::{fmt, str::FromStr};

use thiserror::Error;

/// 骨干网络的总下采样倍数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStride {
  Stride8,
  Stride16,
  Stride32,
}

impl OutputStride {
  pub const ALL: [OutputStride; 3] = [
    OutputStride::Stride8,
    OutputStride::Stride16,
    OutputStride::Stride32,
  ];

  pub fn get(self) -> u32 {
    match self {
      OutputStride::Stride8 => 8,
      OutputStride::Stride16 => 16,
      OutputStride::Stride32 => 32,
    }
  }
}

impl fmt::Display for OutputStride {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.get())
  }
}

impl TryFrom<u32> for OutputStride {
  type Error = ValidationError;

  fn try_from(value: u32) -> Result<Self, Self::Error> {
    match value {
      8 => Ok(OutputStride::Stride8),
      16 => Ok(OutputStride::Stride16),
      32 => Ok(OutputStride::Stride32),
      other => Err(ValidationError::UnsupportedStride(other)),
    }
  }
}

impl FromStr for OutputStride {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = s
      .trim()
      .parse::<u32>()
      .map_err(|_| ValidationError::Unparsable(s.to_string()))?;
    OutputStride::try_from(value)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("输入分辨率 [{height}, {width}] 减一后必须能被输出步长 {stride} 整除")]
  IncompatibleResolution { height: u32, width: u32, stride: u32 },
  #[error("不支持的输出步长: {0}, 仅支持 8、16、32")]
  UnsupportedStride(u32),
  #[error("无法解析: {0}")]
  Unparsable(String),
  #[error("请求的输入分辨率 {requested} 过大, 输出步长 {stride} 下的合法值超出 u32 范围")]
  ResolutionTooLarge { requested: u32, stride: u32 },
}

/// 已校验的输入分辨率，顺序固定为 (height, width)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
  pub height: u32,
  pub width: u32,
}

impl Resolution {
  /// 按给定步长计算输出网格大小 `(gridH, gridW)`
  pub fn grid(&self, stride: OutputStride) -> (usize, usize) {
    let s = stride.get();
    (
      ((self.height - 1) / s + 1) as usize,
      ((self.width - 1) / s + 1) as usize,
    )
  }
}

impl fmt::Display for Resolution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

impl From<Resolution> for (u32, u32) {
  fn from(r: Resolution) -> Self {
    (r.height, r.width)
  }
}

fn is_valid_input_resolution(value: u32, stride: OutputStride) -> bool {
  value >= 1 && (value - 1) % stride.get() == 0
}

/// 返回不小于 `requested` 且满足 `(v - 1) % stride == 0` 的最小值，超出 u32 时为 `None`
pub fn checked_valid_input_resolution(requested: u32, stride: OutputStride) -> Option<u32> {
  if requested <= 1 {
    return Some(1);
  }
  let s = stride.get();
  (requested - 1).div_ceil(s).checked_mul(s)?.checked_add(1)
}

/// 给定步长下 u32 能表示的最大合法分辨率
pub fn max_valid_input_resolution(stride: OutputStride) -> u32 {
  let s = stride.get();
  (u32::MAX - 1) / s * s + 1
}

/// 返回不小于 `requested` 且满足 `(v - 1) % stride == 0` 的最小值
///
/// 超过 [`max_valid_input_resolution`] 的请求取该最大值，
/// [`InputResolution::try_to_valid`] 会在配置阶段拒绝这类请求。
pub fn to_valid_input_resolution(requested: u32, stride: OutputStride) -> u32 {
  checked_valid_input_resolution(requested, stride)
    .unwrap_or_else(|| max_valid_input_resolution(stride))
}

/// `resolution` 顺序为 (height, width)
pub fn assert_valid_resolution(
  resolution: (u32, u32),
  stride: OutputStride,
) -> Result<(), ValidationError> {
  let (height, width) = resolution;
  if is_valid_input_resolution(height, stride) && is_valid_input_resolution(width, stride) {
    Ok(())
  } else {
    Err(ValidationError::IncompatibleResolution {
      height,
      width,
      stride: stride.get(),
    })
  }
}

/// 用户请求的输入分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResolution {
  Square(u32),
  Size { width: u32, height: u32 },
}

impl InputResolution {
  /// 每个维度独立推导，结果顺序为 (height, width)
  pub fn to_valid(self, stride: OutputStride) -> Resolution {
    let (height, width) = match self {
      InputResolution::Square(n) => (n, n),
      InputResolution::Size { width, height } => (height, width),
    };
    Resolution {
      height: to_valid_input_resolution(height, stride),
      width: to_valid_input_resolution(width, stride),
    }
  }
}

impl InputResolution {
  /// 与 [`InputResolution::to_valid`] 相同，合法值超出 u32 时报错
  pub fn try_to_valid(self, stride: OutputStride) -> Result<Resolution, ValidationError> {
    let (height, width) = match self {
      InputResolution::Square(n) => (n, n),
      InputResolution::Size { width, height } => (height, width),
    };
    let valid = |requested: u32| {
      checked_valid_input_resolution(requested, stride).ok_or(
        ValidationError::ResolutionTooLarge {
          requested,
          stride: stride.get(),
        },
      )
    };
    Ok(Resolution {
      height: valid(height)?,
      width: valid(width)?,
    })
  }
}

impl Default for InputResolution {
  fn default() -> Self {
    InputResolution::Square(257)
  }
}

/// 支持 `257` 或 `600x400`（宽x高）两种写法
impl FromStr for InputResolution {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parse = |v: &str| {
      v.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::Unparsable(s.to_string()))
    };
    match s.split_once(['x', 'X']) {
      Some((w, h)) => Ok(InputResolution::Size {
        width: parse(w)?,
        height: parse(h)?,
      }),
      None => Ok(InputResolution::Square(parse(s)?)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_resolution_is_odd_and_aligned() {
    for stride in OutputStride::ALL {
      for r in 1..=2048 {
        let v = to_valid_input_resolution(r, stride);
        assert_eq!((v - 1) % stride.get(), 0, "r={r} stride={stride}");
        assert_eq!(v % 2, 1, "r={r} stride={stride}");
        assert!(v >= r);
        assert_eq!(to_valid_input_resolution(v, stride), v);
      }
    }
  }

  #[test]
  fn returns_odd_value_for_common_sizes() {
    use OutputStride::*;
    assert_eq!(to_valid_input_resolution(1920, Stride8) % 2, 1);
    assert_eq!(to_valid_input_resolution(1280, Stride16) % 2, 1);
    assert_eq!(to_valid_input_resolution(719, Stride16) % 2, 1);
    assert_eq!(to_valid_input_resolution(545, Stride16) % 2, 1);
    assert_eq!(to_valid_input_resolution(225, Stride8) % 2, 1);
    assert_eq!(to_valid_input_resolution(240, Stride8) % 2, 1);
  }

  #[test]
  fn known_values() {
    assert_eq!(to_valid_input_resolution(500, OutputStride::Stride32), 513);
    assert_eq!(to_valid_input_resolution(350, OutputStride::Stride32), 353);
    assert_eq!(to_valid_input_resolution(513, OutputStride::Stride32), 513);
    assert_eq!(to_valid_input_resolution(562, OutputStride::Stride8), 569);
    assert_eq!(to_valid_input_resolution(0, OutputStride::Stride16), 1);
  }

  #[test]
  fn assert_rejects_exactly_misaligned_pairs() {
    let s = OutputStride::Stride16;
    let good = to_valid_input_resolution(16 * 5, s);
    assert!(assert_valid_resolution((good + 1, good), s).is_err());
    assert!(assert_valid_resolution((good, good + 1), s).is_err());
    assert!(assert_valid_resolution((0, good), s).is_err());
    assert!(
      assert_valid_resolution(
        (
          to_valid_input_resolution(16 * 10, s),
          to_valid_input_resolution(16 * 5 + 20, s)
        ),
        s
      )
      .is_ok()
    );

    for h in 1..200 {
      for w in [1, 33, 34, 65] {
        let expected_err = (h - 1) % 32 != 0 || (w - 1) % 32 != 0;
        assert_eq!(
          assert_valid_resolution((h, w), OutputStride::Stride32).is_err(),
          expected_err
        );
      }
    }
  }

  #[test]
  fn size_request_keeps_height_width_order() {
    let s = OutputStride::Stride32;
    let r = InputResolution::Size {
      width: 600,
      height: 400,
    }
    .to_valid(s);
    assert_eq!(
      (r.height, r.width),
      (
        to_valid_input_resolution(400, s),
        to_valid_input_resolution(600, s)
      )
    );
    assert_eq!(InputResolution::Square(500).to_valid(s), Resolution {
      height: 513,
      width: 513
    });
  }

  #[test]
  fn parses_requests_and_strides() {
    assert_eq!(
      "600x400".parse::<InputResolution>().unwrap(),
      InputResolution::Size {
        width: 600,
        height: 400
      }
    );
    assert_eq!(
      "257".parse::<InputResolution>().unwrap(),
      InputResolution::Square(257)
    );
    assert!("abc".parse::<InputResolution>().is_err());
    assert_eq!("16".parse::<OutputStride>().unwrap(), OutputStride::Stride16);
    assert_eq!(
      "24".parse::<OutputStride>(),
      Err(ValidationError::UnsupportedStride(24))
    );
  }

  #[test]
  fn huge_requests_do_not_overflow() {
    for stride in OutputStride::ALL {
      let max = max_valid_input_resolution(stride);
      assert_eq!((max - 1) % stride.get(), 0);
      assert!(u32::MAX - max < stride.get());
      assert_eq!(checked_valid_input_resolution(max, stride), Some(max));
      assert_eq!(checked_valid_input_resolution(u32::MAX - 1, stride), None);
      assert_eq!(to_valid_input_resolution(u32::MAX - 1, stride), max);
      assert_eq!(to_valid_input_resolution(u32::MAX, stride), max);
    }
    assert_eq!(
      InputResolution::Square(u32::MAX - 1).try_to_valid(OutputStride::Stride32),
      Err(ValidationError::ResolutionTooLarge {
        requested: u32::MAX - 1,
        stride: 32
      })
    );
    assert_eq!(
      InputResolution::Size {
        width: 600,
        height: 400
      }
      .try_to_valid(OutputStride::Stride32),
      Ok(Resolution {
        height: 417,
        width: 609
      })
    );
  }

  #[test]
  fn grid_matches_stride() {
    let r = Resolution {
      height: 513,
      width: 257,
    };
    assert_eq!(r.grid(OutputStride::Stride32), (17, 9));
    assert_eq!(r.grid(OutputStride::Stride16), (33, 17));
  }
}
