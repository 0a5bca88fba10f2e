//! 二维纹理
//!
//! 图像来源可以是文件路径、编码后的字节（PNG/JPEG 等，由 `image` 解码），
//! 或按 `source_format` 解释的原始像素。上传前统一转换为 RGBA8。

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use image::GenericImageView;

use crate::math::Color;
use crate::renderer::device::DeviceShared;
use crate::renderer::resource::{GpuResource, ResourceId, ResourceKind};

/// GPU 端像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    /// 无 alpha，上传时 alpha 固定为 1
    Rgb8,
    Srgb8,
    Srgb8Alpha8,
}

impl TextureFormat {
    pub fn is_srgb(&self) -> bool {
        matches!(self, TextureFormat::Srgb8 | TextureFormat::Srgb8Alpha8)
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, TextureFormat::Rgba8 | TextureFormat::Srgb8Alpha8)
    }
}

/// 原始像素的通道排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Rgb,
    Bgr,
    #[default]
    Rgba,
    Bgra,
    /// 单通道灰度
    Luminance,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Luminance => 1,
        }
    }
}

/// 纹理坐标越界时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    /// 使用 `border_color`
    ClampToBorder,
}

/// 纹理过滤方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// 纹理设置
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureSettings2D {
    pub target_format: TextureFormat,
    pub source_format: PixelFormat,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub border_color: Option<Color>,
}

impl TextureSettings2D {
    pub fn new(
        target_format: TextureFormat,
        source_format: PixelFormat,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
        min_filter: FilterMode,
        mag_filter: FilterMode,
        border_color: Option<Color>,
    ) -> Self {
        Self {
            target_format,
            source_format,
            wrap_s,
            wrap_t,
            min_filter,
            mag_filter,
            border_color,
        }
    }
}

/// 图像来源
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    /// 图像文件
    Path(&'a Path),
    /// 编码后的图像字节
    Encoded(&'a [u8]),
    /// 按 `source_format` 排列的原始像素
    Raw {
        width: u32,
        height: u32,
        pixels: &'a [u8],
    },
}

impl<'a> ImageSource<'a> {
    pub fn from_path<P: AsRef<Path> + ?Sized>(path: &'a P) -> Self {
        ImageSource::Path(path.as_ref())
    }
}

/// 解码后的 RGBA8 像素
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// 把图像来源转换为 RGBA8
///
/// 编码图像的通道顺序由解码器决定，`source_format` 只用于原始像素。
pub(crate) fn load_rgba(
    settings: &TextureSettings2D,
    source: ImageSource<'_>,
) -> Result<RgbaImage, String> {
    let mut image = match source {
        ImageSource::Path(path) => {
            let decoded = image::open(path)
                .map_err(|e| format!("failed to decode '{}': {e}", path.display()))?;
            from_dynamic(decoded)
        }
        ImageSource::Encoded(bytes) => {
            let decoded = image::load_from_memory(bytes)
                .map_err(|e| format!("failed to decode image bytes: {e}"))?;
            from_dynamic(decoded)
        }
        ImageSource::Raw { width, height, pixels } => {
            convert_raw(width, height, pixels, settings.source_format)?
        }
    };

    if image.width == 0 || image.height == 0 {
        return Err(format!(
            "image has zero dimension ({}x{})",
            image.width, image.height
        ));
    }

    if !settings.target_format.has_alpha() {
        for pixel in image.pixels.chunks_exact_mut(4) {
            pixel[3] = u8::MAX;
        }
    }

    Ok(image)
}

fn from_dynamic(decoded: image::DynamicImage) -> RgbaImage {
    let (width, height) = decoded.dimensions();
    RgbaImage {
        width,
        height,
        pixels: decoded.to_rgba8().into_raw(),
    }
}

fn convert_raw(
    width: u32,
    height: u32,
    pixels: &[u8],
    format: PixelFormat,
) -> Result<RgbaImage, String> {
    let overflow = || format!("{width}x{height} image dimensions overflow the addressable size");
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(overflow)?;
    let expected = pixel_count
        .checked_mul(format.bytes_per_pixel())
        .ok_or_else(overflow)?;
    let rgba_len = pixel_count.checked_mul(4).ok_or_else(overflow)?;
    if pixels.len() != expected {
        return Err(format!(
            "{width}x{height} {format:?} image needs {expected} bytes, got {}",
            pixels.len()
        ));
    }

    let mut rgba = Vec::with_capacity(rgba_len);
    for pixel in pixels.chunks_exact(format.bytes_per_pixel()) {
        let converted = match format {
            PixelFormat::Rgb => [pixel[0], pixel[1], pixel[2], u8::MAX],
            PixelFormat::Bgr => [pixel[2], pixel[1], pixel[0], u8::MAX],
            PixelFormat::Rgba => [pixel[0], pixel[1], pixel[2], pixel[3]],
            PixelFormat::Bgra => [pixel[2], pixel[1], pixel[0], pixel[3]],
            PixelFormat::Luminance => [pixel[0], pixel[0], pixel[0], u8::MAX],
        };
        rgba.extend_from_slice(&converted);
    }

    Ok(RgbaImage { width, height, pixels: rgba })
}

/// GPU 二维纹理
pub struct Texture2D {
    device: Rc<DeviceShared>,
    id: ResourceId,
    width: u32,
    height: u32,
    settings: TextureSettings2D,
}

impl Texture2D {
    pub(crate) fn new(
        device: Rc<DeviceShared>,
        id: ResourceId,
        width: u32,
        height: u32,
        settings: TextureSettings2D,
    ) -> Self {
        Self {
            device,
            id,
            width,
            height,
            settings,
        }
    }

    pub(crate) fn device(&self) -> &Rc<DeviceShared> {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn settings(&self) -> &TextureSettings2D {
        &self.settings
    }

    /// 显式释放
    pub fn destroy(self) {}
}

impl GpuResource for Texture2D {
    const KIND: ResourceKind = ResourceKind::Texture;

    fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture2D")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Drop for Texture2D {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(source_format: PixelFormat, target_format: TextureFormat) -> TextureSettings2D {
        TextureSettings2D {
            source_format,
            target_format,
            ..Default::default()
        }
    }

    #[test]
    fn test_bgr_conversion() {
        let source = ImageSource::Raw { width: 2, height: 1, pixels: &[1, 2, 3, 4, 5, 6] };
        let image = load_rgba(&settings(PixelFormat::Bgr, TextureFormat::Srgb8), source).unwrap();
        assert_eq!(image.pixels, vec![3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn test_luminance_and_alpha() {
        let source = ImageSource::Raw { width: 1, height: 2, pixels: &[10, 200] };
        let image = load_rgba(&settings(PixelFormat::Luminance, TextureFormat::Rgba8), source).unwrap();
        assert_eq!(image.pixels, vec![10, 10, 10, 255, 200, 200, 200, 255]);

        // 不带 alpha 的目标格式强制 alpha = 255
        let source = ImageSource::Raw { width: 1, height: 1, pixels: &[1, 2, 3, 4] };
        let image = load_rgba(&settings(PixelFormat::Bgra, TextureFormat::Rgb8), source).unwrap();
        assert_eq!(image.pixels, vec![3, 2, 1, 255]);

        let image = load_rgba(&settings(PixelFormat::Bgra, TextureFormat::Srgb8Alpha8), source).unwrap();
        assert_eq!(image.pixels, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_raw_size_mismatch() {
        let source = ImageSource::Raw { width: 2, height: 2, pixels: &[0; 15] };
        let err = load_rgba(&settings(PixelFormat::Rgba, TextureFormat::Rgba8), source).unwrap_err();
        assert!(err.contains("needs 16 bytes"));
    }

    #[test]
    fn test_raw_dimensions_overflow() {
        let source = ImageSource::Raw { width: u32::MAX, height: u32::MAX, pixels: &[] };
        let err = load_rgba(&settings(PixelFormat::Rgba, TextureFormat::Rgba8), source).unwrap_err();
        assert!(err.contains("overflow"));
    }

    #[test]
    fn test_zero_dimension() {
        let source = ImageSource::Raw { width: 0, height: 4, pixels: &[] };
        assert!(load_rgba(&TextureSettings2D::default(), source).is_err());
    }

    #[test]
    fn test_undecodable_bytes() {
        let source = ImageSource::Encoded(b"definitely not a png");
        assert!(load_rgba(&TextureSettings2D::default(), source).is_err());

        let source = ImageSource::from_path("missing/texture.png");
        assert!(load_rgba(&TextureSettings2D::default(), source).is_err());
    }

    #[test]
    fn test_decode_png() {
        let mut encoded = Vec::new();
        let image = image::RgbaImage::from_raw(1, 1, vec![9, 8, 7, 6]).unwrap();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageOutputFormat::Png)
            .unwrap();

        let decoded = load_rgba(&TextureSettings2D::default(), ImageSource::Encoded(&encoded)).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.pixels, vec![9, 8, 7, 6]);
    }
}
