//! Texture and renderbuffer formats.
use crate::api::gl::{self, GLenum};

/// Which aspects of a pixel a format stores.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FormatAspect {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

/// Sized internal formats usable for textures and renderbuffers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Rgb565,
    Rgba4,
    R32F,
    Rgba16F,
    Rgba32F,
    Depth16,
    Depth24,
    Depth32F,
    Depth24Stencil8,
    Depth32FStencil8,
    Stencil8,
}

/// GL enums describing a format: the sized internal format and the format/type pair
/// used for pixel transfers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GlFormatInfo {
    pub internal_fmt: GLenum,
    pub upload_components: GLenum,
    pub upload_ty: GLenum,
}

impl TextureFormat {
    pub fn gl_format_info(self) -> GlFormatInfo {
        use TextureFormat::*;
        let (internal_fmt, upload_components, upload_ty) = match self {
            R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
            Rg8 => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE),
            Rgb8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
            Rgba8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
            Rgb565 => (gl::RGB565, gl::RGB, gl::UNSIGNED_SHORT_5_6_5),
            Rgba4 => (gl::RGBA4, gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4),
            R32F => (gl::R32F, gl::RED, gl::FLOAT),
            Rgba16F => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
            Rgba32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
            Depth16 => (gl::DEPTH_COMPONENT16, gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT),
            Depth24 => (gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT),
            Depth32F => (gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT),
            Depth24Stencil8 => (gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8),
            Depth32FStencil8 => (
                gl::DEPTH32F_STENCIL8,
                gl::DEPTH_STENCIL,
                gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
            ),
            Stencil8 => (gl::STENCIL_INDEX8, gl::NONE, gl::UNSIGNED_BYTE),
        };
        GlFormatInfo {
            internal_fmt,
            upload_components,
            upload_ty,
        }
    }

    /// Returns the format with the given sized internal format enum.
    pub fn from_internal_format(internal_fmt: GLenum) -> Option<TextureFormat> {
        use TextureFormat::*;
        [
            R8,
            Rg8,
            Rgb8,
            Rgba8,
            Rgb565,
            Rgba4,
            R32F,
            Rgba16F,
            Rgba32F,
            Depth16,
            Depth24,
            Depth32F,
            Depth24Stencil8,
            Depth32FStencil8,
            Stencil8,
        ]
        .iter()
        .copied()
        .find(|f| f.gl_format_info().internal_fmt == internal_fmt)
    }

    /// Size of one pixel in bytes, in the layout expected by image uploads.
    pub fn byte_size(self) -> usize {
        use TextureFormat::*;
        match self {
            R8 | Stencil8 => 1,
            Rg8 | Rgb565 | Rgba4 | Depth16 => 2,
            Rgb8 => 3,
            Rgba8 | R32F | Depth24 | Depth32F | Depth24Stencil8 => 4,
            Rgba16F | Depth32FStencil8 => 8,
            Rgba32F => 16,
        }
    }

    pub fn aspect(self) -> FormatAspect {
        use TextureFormat::*;
        match self {
            Depth16 | Depth24 | Depth32F => FormatAspect::Depth,
            Depth24Stencil8 | Depth32FStencil8 => FormatAspect::DepthStencil,
            Stencil8 => FormatAspect::Stencil,
            _ => FormatAspect::Color,
        }
    }

    pub fn is_color(self) -> bool {
        self.aspect() == FormatAspect::Color
    }

    /// Whether the format can be rendered to through a color attachment.
    ///
    /// Float formats are not color-renderable without `EXT_color_buffer_float`.
    pub fn is_color_renderable(self, float_color_buffers: bool) -> bool {
        use TextureFormat::*;
        match self {
            R8 | Rg8 | Rgb8 | Rgba8 | Rgb565 | Rgba4 => true,
            R32F | Rgba16F | Rgba32F => float_color_buffers,
            _ => false,
        }
    }

    /// Whether textures can be allocated with this format. Stencil-only storage is
    /// renderbuffer-only.
    pub fn is_texturable(self) -> bool {
        self != TextureFormat::Stencil8
    }
}

/// Number of levels in a full mip chain for an image of the given size.
pub fn max_mip_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Size of mip level `level` of an image of the given base size.
pub fn mip_level_size(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}
