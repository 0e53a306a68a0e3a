//! 2D and cube map textures.
use crate::{
    api::gl::{self, GLenum},
    context::{Context, ContextInner, ContextRef, ImageId, ImageRecord},
    error::{Error, GlResult},
    format::{max_mip_levels, mip_level_size, TextureFormat},
    handle::{ObjectKind, RawHandle, UniqueHandle},
    sampling::TextureParameters,
};
use std::rc::Rc;
use tracing::trace;

/// A face of a cube map.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn to_gl(self) -> GLenum {
        match self {
            CubeFace::PositiveX => gl::TEXTURE_CUBE_MAP_POSITIVE_X,
            CubeFace::NegativeX => gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
            CubeFace::PositiveY => gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
            CubeFace::NegativeY => gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            CubeFace::PositiveZ => gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
            CubeFace::NegativeZ => gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        }
    }
}

/// Immutable texture storage shared by both texture kinds.
#[derive(Debug)]
struct TextureStorage {
    ctx: ContextRef,
    handle: UniqueHandle,
    image: ImageId,
    bind_target: GLenum,
    format: TextureFormat,
    width: u32,
    height: u32,
    mip_levels: u32,
    parameters: TextureParameters,
}

impl TextureStorage {
    fn create(
        context: &Context,
        bind_target: GLenum,
        max_size: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
    ) -> GlResult<TextureStorage> {
        if !format.is_texturable() {
            return Err(Error::InvalidParameter(format!(
                "{:?} cannot be used as a texture format",
                format
            )));
        }
        if width == 0 || height == 0 || width > max_size || height > max_size {
            return Err(Error::InvalidParameter(format!(
                "texture size {}x{} outside of 1..={}",
                width, height, max_size
            )));
        }
        let max_levels = max_mip_levels(width, height);
        if mip_levels == 0 || mip_levels > max_levels {
            return Err(Error::InvalidParameter(format!(
                "{} mip levels requested, a {}x{} texture has between 1 and {}",
                mip_levels, width, height, max_levels
            )));
        }

        let inner = context.inner();
        let (handle, raw) = inner.create_object(ObjectKind::Texture)?;
        inner.bind_texture(bind_target, Some(raw));
        let parameters = TextureParameters::default();
        {
            let mut driver = inner.driver();
            driver.tex_storage_2d(
                bind_target,
                mip_levels,
                format.gl_format_info().internal_fmt,
                width,
                height,
            );
            for (pname, value) in parameters.to_gl() {
                driver.tex_parameter(bind_target, pname, value);
            }
        }
        let image = inner.register_image(ImageRecord {
            handle: raw,
            format,
            width,
            height,
            mip_levels,
        });
        Ok(TextureStorage {
            ctx: context.downgrade(),
            handle,
            image,
            bind_target,
            format,
            width,
            height,
            mip_levels,
            parameters,
        })
    }

    fn bind(&self) -> GlResult<(Rc<ContextInner>, RawHandle)> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        ctx.bind_texture(self.bind_target, Some(raw));
        Ok((ctx, raw))
    }

    fn level_size(&self, level: u32) -> GlResult<(u32, u32)> {
        if level >= self.mip_levels {
            return Err(Error::InvalidParameter(format!(
                "mip level {} out of range (texture has {})",
                level, self.mip_levels
            )));
        }
        Ok(mip_level_size(self.width, self.height, level))
    }

    fn set_image_data(&self, image_target: GLenum, level: u32, data: &[u8]) -> GlResult<()> {
        self.ctx.resolve(&self.handle)?;
        let (w, h) = self.level_size(level)?;
        let expected = w as usize * h as usize * self.format.byte_size();
        if data.len() != expected {
            return Err(Error::FormatMismatch {
                expected,
                found: data.len(),
            });
        }
        let (ctx, _) = self.bind()?;
        let info = self.format.gl_format_info();
        ctx.driver().tex_sub_image_2d(
            image_target,
            level,
            w,
            h,
            info.upload_components,
            info.upload_ty,
            data,
        );
        Ok(())
    }

    fn set_parameters(&mut self, params: &TextureParameters, has_r_coordinate: bool) -> GlResult<()> {
        self.ctx.resolve(&self.handle)?;
        params.validate(self.mip_levels, has_r_coordinate)?;
        let (ctx, _) = self.bind()?;
        {
            let mut driver = ctx.driver();
            for (pname, value) in params.to_gl() {
                driver.tex_parameter(self.bind_target, pname, value);
            }
        }
        self.parameters = *params;
        Ok(())
    }

    /// Reads a level back through a temporary framebuffer. The framebuffer binding is reset to the
    /// default surface afterwards.
    fn read_pixels(&self, image_target: GLenum, level: u32) -> GlResult<Vec<u8>> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        if !self.format.is_color() {
            return Err(Error::InvalidParameter(format!(
                "cannot read back a {:?} texture",
                self.format
            )));
        }
        let (w, h) = self.level_size(level)?;

        let (mut fb, fb_raw) = ctx.create_object(ObjectKind::Framebuffer)?;
        ctx.bind_framebuffer(Some(fb_raw));
        let status = {
            let mut driver = ctx.driver();
            driver.framebuffer_texture_2d(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                image_target,
                Some(raw),
                level,
            );
            driver.read_buffer(gl::COLOR_ATTACHMENT0);
            driver.check_framebuffer_status(gl::FRAMEBUFFER)
        };
        let result = if status == gl::FRAMEBUFFER_COMPLETE {
            let info = self.format.gl_format_info();
            let mut out = vec![0u8; w as usize * h as usize * self.format.byte_size()];
            ctx.driver().read_pixels(
                0,
                0,
                w,
                h,
                info.upload_components,
                info.upload_ty,
                &mut out,
            );
            Ok(out)
        } else {
            Err(Error::InvalidParameter(format!(
                "{:?} is not readable on this context",
                self.format
            )))
        };
        trace!(texture = ?raw, level, "read_pixels");
        self.ctx.release(&mut fb);
        result
    }

    fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let image = self.image;
        self.ctx.with_alive(|ctx| ctx.remove_image(image));
        self.ctx.release(&mut self.handle);
    }

    fn image_id(&self) -> GlResult<ImageId> {
        if self.handle.is_null() {
            Err(Error::UseAfterFree {
                kind: ObjectKind::Texture,
            })
        } else {
            Ok(self.image)
        }
    }
}

/// Accessors shared by both texture kinds.
macro_rules! impl_texture_accessors {
    ($t:ty) => {
        impl $t {
            pub fn width(&self) -> u32 {
                self.storage.width
            }

            pub fn height(&self) -> u32 {
                self.storage.height
            }

            pub fn format(&self) -> TextureFormat {
                self.storage.format
            }

            pub fn mip_levels(&self) -> u32 {
                self.storage.mip_levels
            }

            /// The sampling parameters last applied.
            pub fn parameters(&self) -> &TextureParameters {
                &self.storage.parameters
            }

            pub fn handle(&self) -> Option<RawHandle> {
                self.storage.handle.get()
            }

            pub fn is_destroyed(&self) -> bool {
                self.storage.handle.is_null()
            }

            /// Releases the texture. Framebuffers that still reference it become stale. Calling it
            /// again does nothing.
            pub fn destroy(&mut self) {
                self.storage.destroy()
            }

            pub(crate) fn image_id(&self) -> GlResult<ImageId> {
                self.storage.image_id()
            }

            pub(crate) fn context_ref(&self) -> &ContextRef {
                &self.storage.ctx
            }
        }

        impl Drop for $t {
            fn drop(&mut self) {
                self.storage.destroy()
            }
        }
    };
}

/// A two-dimensional texture with immutable storage.
#[derive(Debug)]
pub struct Texture2D {
    storage: TextureStorage,
}

impl Texture2D {
    /// Allocates a `width`x`height` texture with `mip_levels` levels.
    pub fn create(
        context: &Context,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
    ) -> GlResult<Texture2D> {
        let max_size = context.max_texture_size()?;
        let storage = TextureStorage::create(
            context,
            gl::TEXTURE_2D,
            max_size,
            width,
            height,
            format,
            mip_levels,
        )?;
        Ok(Texture2D { storage })
    }

    /// Uploads a full mip level. `data` must hold exactly one level in the upload layout of the
    /// format.
    pub fn set_image_data(&self, level: u32, data: &[u8]) -> GlResult<()> {
        self.storage.set_image_data(gl::TEXTURE_2D, level, data)
    }

    pub fn set_parameters(&mut self, params: &TextureParameters) -> GlResult<()> {
        self.storage.set_parameters(params, false)
    }

    pub fn read_pixels(&self, level: u32) -> GlResult<Vec<u8>> {
        self.storage.read_pixels(gl::TEXTURE_2D, level)
    }
}

impl_texture_accessors!(Texture2D);

/// A cube map. All six faces are square and share the same size.
#[derive(Debug)]
pub struct TextureCube {
    storage: TextureStorage,
}

impl TextureCube {
    pub fn create(
        context: &Context,
        width: u32,
        height: u32,
        format: TextureFormat,
        mip_levels: u32,
    ) -> GlResult<TextureCube> {
        if width != height {
            return Err(Error::InvalidParameter(format!(
                "cube map faces must be square, got {}x{}",
                width, height
            )));
        }
        let max_size = context.max_cube_map_texture_size()?;
        let storage = TextureStorage::create(
            context,
            gl::TEXTURE_CUBE_MAP,
            max_size,
            width,
            height,
            format,
            mip_levels,
        )?;
        Ok(TextureCube { storage })
    }

    pub fn set_image_data(&self, face: CubeFace, level: u32, data: &[u8]) -> GlResult<()> {
        self.storage.set_image_data(face.to_gl(), level, data)
    }

    pub fn set_parameters(&mut self, params: &TextureParameters) -> GlResult<()> {
        self.storage.set_parameters(params, true)
    }

    pub fn read_pixels(&self, face: CubeFace, level: u32) -> GlResult<Vec<u8>> {
        self.storage.read_pixels(face.to_gl(), level)
    }
}

impl_texture_accessors!(TextureCube);
