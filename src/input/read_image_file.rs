// 该文件是 PoseNet Adapter （姿态骨干适配） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Image, resolution::Resolution};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// `image:///path/to/file.jpg`，只产生一帧
pub struct ImageFileInput {
  image: Option<RgbImage>,
  resolution: Option<Resolution>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?;
    debug!("读取图像 {}: {}x{}", path, image.width(), image.height());

    Ok(ImageFileInput {
      image: Some(image.into_rgb8()),
      resolution: None,
    })
  }
}

impl ImageFileInput {
  pub fn from_image(image: RgbImage) -> Self {
    Self {
      image: Some(image),
      resolution: None,
    }
  }

  pub fn with_resolution(mut self, resolution: Resolution) -> Self {
    self.resolution = Some(resolution);
    self
  }
}

impl Iterator for ImageFileInput {
  type Item = Image;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.image.take()?;
    let image = match self.resolution {
      Some(r) if image.dimensions() != (r.width, r.height) => {
        debug!("缩放图像 {}x{} -> {}", image.width(), image.height(), r);
        image::imageops::resize(&image, r.width, r.height, FilterType::Triangle)
      }
      _ => image,
    };
    match Image::try_from(image) {
      Ok(frame) => Some(frame),
      Err(e) => {
        error!("图像转换失败: {}", e);
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resizes_to_model_resolution_once() {
    let mut input = ImageFileInput::from_image(RgbImage::new(640, 480)).with_resolution(Resolution {
      height: 353,
      width: 513,
    });
    let frame = input.next().unwrap();
    assert_eq!(frame.dim(), (353, 513, 3));
    assert!(input.next().is_none());
  }

  #[test]
  fn reads_file_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbImage::new(17, 9).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.next().unwrap().dim(), (9, 17, 3));

    let wrong = Url::parse("video:///tmp/a.mp4").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&wrong),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
