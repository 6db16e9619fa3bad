// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/frame.rs - HWC 图像帧定义
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

use ndarray::{Array3, ArrayD};

pub const RGB_CHANNELS: usize = 3;

/// (height, width, channels) 排布的原始图像
///
/// 元素类型为 8 位整数或浮点数，任何变换都会产生新数组，原图不被修改。
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
  U8(Array3<u8>),
  F32(Array3<f32>),
}

impl Image {
  pub fn height(&self) -> usize {
    self.dim().0
  }

  pub fn width(&self) -> usize {
    self.dim().1
  }

  pub fn channels(&self) -> usize {
    self.dim().2
  }

  pub fn dim(&self) -> (usize, usize, usize) {
    match self {
      Image::U8(data) => data.dim(),
      Image::F32(data) => data.dim(),
    }
  }

  /// 返回 (height, width)
  ///
  /// 超出 u32 的维度按 `u32::MAX` 返回，不会通过任何步长的分辨率校验。
  pub fn resolution(&self) -> (u32, u32) {
    let clamp = |v: usize| u32::try_from(v).unwrap_or(u32::MAX);
    (clamp(self.height()), clamp(self.width()))
  }

  /// 转换为浮点副本，整数像素按数值直接转换
  pub fn to_float(&self) -> ArrayD<f32> {
    match self {
      Image::U8(data) => data.mapv(f32::from).into_dyn(),
      Image::F32(data) => data.clone().into_dyn(),
    }
  }

  pub fn zeros(height: usize, width: usize) -> Self {
    Image::U8(Array3::zeros((height, width, RGB_CHANNELS)))
  }
}

impl From<Array3<u8>> for Image {
  fn from(data: Array3<u8>) -> Self {
    Image::U8(data)
  }
}

impl From<Array3<f32>> for Image {
  fn from(data: Array3<f32>) -> Self {
    Image::F32(data)
  }
}

#[cfg(feature = "image")]
impl TryFrom<image::RgbImage> for Image {
  type Error = ndarray::ShapeError;

  fn try_from(image: image::RgbImage) -> Result<Self, Self::Error> {
    let (width, height) = image.dimensions();
    // RgbImage 的原始缓冲区即为 HWC 排布
    let data = Array3::from_shape_vec(
      (height as usize, width as usize, RGB_CHANNELS),
      image.into_raw(),
    )?;
    Ok(Image::U8(data))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use ndarray::IxDyn;

  #[test]
  fn integer_image_converts_without_mutation() {
    let mut data = Array3::<u8>::zeros((2, 3, 3));
    data[[1, 2, 0]] = 255;
    let image = Image::from(data.clone());
    let float = image.to_float();
    assert_eq!(float.shape(), &[2, 3, 3]);
    assert_eq!(float[IxDyn(&[1, 2, 0])], 255.0);
    assert_eq!(image, Image::U8(data));
    assert_eq!(image.resolution(), (2, 3));
  }

  #[cfg(feature = "image")]
  #[test]
  fn rgb_image_keeps_hwc_layout() {
    let mut rgb = image::RgbImage::new(4, 2);
    rgb.put_pixel(3, 1, image::Rgb([10, 20, 30]));
    let Image::U8(data) = Image::try_from(rgb).unwrap() else {
      panic!("expected integer image");
    };
    assert_eq!(data.dim(), (2, 4, 3));
    assert_eq!(
      [data[[1, 3, 0]], data[[1, 3, 1]], data[[1, 3, 2]]],
      [10, 20, 30]
    );
  }

  #[cfg(target_pointer_width = "64")]
  #[test]
  fn oversized_dimension_saturates() {
    let tall = Image::from(Array3::<u8>::zeros(((1usize << 32) + 1, 0, 3)));
    assert_eq!(tall.resolution(), (u32::MAX, 0));
  }
}
