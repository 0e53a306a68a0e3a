use crate::{
    context::{Context, ContextRef, ImageId, ImageRecord},
    error::{Error, GlResult},
    format::TextureFormat,
    handle::{ObjectKind, RawHandle, UniqueHandle},
};

/// Render-target storage that cannot be sampled.
#[derive(Debug)]
pub struct Renderbuffer {
    ctx: ContextRef,
    handle: UniqueHandle,
    image: ImageId,
    format: TextureFormat,
    width: u32,
    height: u32,
}

impl Renderbuffer {
    pub fn create(
        context: &Context,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> GlResult<Renderbuffer> {
        let max = context.max_renderbuffer_size()?;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(Error::InvalidParameter(format!(
                "renderbuffer size {}x{} outside of 1..={}",
                width, height, max
            )));
        }
        let inner = context.inner();
        let (handle, raw) = inner.create_object(ObjectKind::Renderbuffer)?;
        inner.bind_renderbuffer(Some(raw));
        inner
            .driver()
            .renderbuffer_storage(format.gl_format_info().internal_fmt, width, height);
        let image = inner.register_image(ImageRecord {
            handle: raw,
            format,
            width,
            height,
            mip_levels: 1,
        });
        Ok(Renderbuffer {
            ctx: context.downgrade(),
            handle,
            image,
            format,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.handle.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_null()
    }

    pub(crate) fn image_id(&self) -> GlResult<ImageId> {
        if self.handle.is_null() {
            Err(Error::UseAfterFree {
                kind: ObjectKind::Renderbuffer,
            })
        } else {
            Ok(self.image)
        }
    }

    pub(crate) fn context_ref(&self) -> &ContextRef {
        &self.ctx
    }

    /// Releases the storage. Framebuffers that still reference it become stale. Calling it again
    /// does nothing.
    pub fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let image = self.image;
        self.ctx.with_alive(|ctx| ctx.remove_image(image));
        self.ctx.release(&mut self.handle);
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        self.destroy()
    }
}
