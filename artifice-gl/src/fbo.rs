//! Off-screen render targets that own their attachments.
use crate::{
    context::{Context, ContextRef},
    error::{Error, GlResult},
    format::{FormatAspect, TextureFormat},
    framebuffer::{Attachment, AttachmentPoint, Framebuffer},
    handle::ObjectKind,
    renderbuffer::Renderbuffer,
    texture::Texture2D,
};
use tracing::debug;

/// A framebuffer with a color texture and an optional depth (or depth-stencil) renderbuffer, all
/// created, resized and destroyed together.
///
/// Unlike attachments added with [`Framebuffer::attach`], the images belong to the `Fbo`.
#[derive(Debug)]
pub struct Fbo {
    ctx: ContextRef,
    // released before the images it references
    framebuffer: Framebuffer,
    color: Texture2D,
    depth: Option<Renderbuffer>,
    color_format: TextureFormat,
    depth_format: Option<TextureFormat>,
}

struct FboParts {
    framebuffer: Framebuffer,
    color: Texture2D,
    depth: Option<Renderbuffer>,
}

fn depth_attachment_point(format: TextureFormat) -> GlResult<AttachmentPoint> {
    match format.aspect() {
        FormatAspect::Depth => Ok(AttachmentPoint::Depth),
        FormatAspect::DepthStencil => Ok(AttachmentPoint::DepthStencil),
        FormatAspect::Stencil => Ok(AttachmentPoint::Stencil),
        FormatAspect::Color => Err(Error::InvalidParameter(format!(
            "{:?} is not a depth or stencil format",
            format
        ))),
    }
}

/// Creates and attaches everything. Whatever was created is dropped, and thus released, if a
/// later step fails.
fn build(
    context: &Context,
    width: u32,
    height: u32,
    color_format: TextureFormat,
    depth_format: Option<TextureFormat>,
) -> GlResult<FboParts> {
    if !color_format.is_color() {
        return Err(Error::InvalidParameter(format!(
            "{:?} is not a color format",
            color_format
        )));
    }
    let depth_point = depth_format.map(depth_attachment_point).transpose()?;

    let color = Texture2D::create(context, width, height, color_format, 1)?;
    let depth = match depth_format {
        Some(format) => Some(Renderbuffer::create(context, width, height, format)?),
        None => None,
    };
    let mut framebuffer = Framebuffer::create(context)?;
    framebuffer.attach(AttachmentPoint::Color(0), Attachment::texture(&color))?;
    if let (Some(point), Some(depth)) = (depth_point, depth.as_ref()) {
        framebuffer.attach(point, Attachment::renderbuffer(depth))?;
    }
    framebuffer.check_completeness()?;
    Ok(FboParts {
        framebuffer,
        color,
        depth,
    })
}

impl Fbo {
    /// Creates a complete `width`x`height` render target.
    pub fn create(
        context: &Context,
        width: u32,
        height: u32,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> GlResult<Fbo> {
        let parts = build(context, width, height, color_format, depth_format)?;
        debug!(width, height, ?color_format, ?depth_format, "created fbo");
        Ok(Fbo {
            ctx: context.downgrade(),
            framebuffer: parts.framebuffer,
            color: parts.color,
            depth: parts.depth,
            color_format,
            depth_format,
        })
    }

    /// Recreates the framebuffer and every attachment at the new size.
    ///
    /// The new objects are built before the old ones are released: on failure the `Fbo` is left
    /// as it was. Any handle obtained from the previous attachments is stale afterwards.
    pub fn resize(&mut self, width: u32, height: u32) -> GlResult<()> {
        if self.is_destroyed() {
            return Err(Error::UseAfterFree {
                kind: ObjectKind::Framebuffer,
            });
        }
        if self.size() == (width, height) {
            return Ok(());
        }
        let context = self.ctx.context()?;
        let parts = build(&context, width, height, self.color_format, self.depth_format)?;
        debug!(
            from = ?self.size(),
            to = ?(width, height),
            "resized fbo"
        );
        self.destroy();
        self.framebuffer = parts.framebuffer;
        self.color = parts.color;
        self.depth = parts.depth;
        Ok(())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn color_texture(&self) -> &Texture2D {
        &self.color
    }

    pub fn depth_renderbuffer(&self) -> Option<&Renderbuffer> {
        self.depth.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.color.width(), self.color.height())
    }

    pub fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    pub fn depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }

    pub fn is_destroyed(&self) -> bool {
        self.framebuffer.is_destroyed()
    }

    /// Releases the framebuffer and the images it owns. Calling it again does nothing.
    pub fn destroy(&mut self) {
        self.framebuffer.destroy();
        self.color.destroy();
        if let Some(depth) = self.depth.as_mut() {
            depth.destroy();
        }
    }
}
