//! Framebuffers and completeness validation.
use crate::{
    api::{
        get::describe,
        gl::{self, GLenum},
    },
    context::{Context, ContextInner, ContextRef, ImageId},
    error::{Error, GlResult},
    format::{mip_level_size, FormatAspect, TextureFormat},
    handle::{ObjectKind, RawHandle, UniqueHandle},
    renderbuffer::Renderbuffer,
    texture::{CubeFace, Texture2D, TextureCube},
};
use std::{collections::BTreeMap, fmt, rc::Rc};
use tracing::debug;

/// A framebuffer attachment slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum AttachmentPoint {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

impl AttachmentPoint {
    /// Fails with `InvalidParameter` for a color index past the end of the GL enum range.
    pub fn to_gl(self) -> GlResult<GLenum> {
        match self {
            AttachmentPoint::Color(i) => gl::COLOR_ATTACHMENT0.checked_add(i).ok_or_else(|| {
                Error::InvalidParameter(format!("color attachment index {} out of range", i))
            }),
            AttachmentPoint::Depth => Ok(gl::DEPTH_ATTACHMENT),
            AttachmentPoint::Stencil => Ok(gl::STENCIL_ATTACHMENT),
            AttachmentPoint::DepthStencil => Ok(gl::DEPTH_STENCIL_ATTACHMENT),
        }
    }

    /// Whether an image of the given format may be attached here.
    fn accepts(self, format: TextureFormat, float_color_buffers: bool) -> bool {
        match self {
            AttachmentPoint::Color(_) => format.is_color_renderable(float_color_buffers),
            AttachmentPoint::Depth => format.aspect() == FormatAspect::Depth,
            AttachmentPoint::Stencil => format.aspect() == FormatAspect::Stencil,
            AttachmentPoint::DepthStencil => format.aspect() == FormatAspect::DepthStencil,
        }
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttachmentPoint::Color(i) => write!(f, "color{}", i),
            AttachmentPoint::Depth => f.write_str("depth"),
            AttachmentPoint::Stencil => f.write_str("stencil"),
            AttachmentPoint::DepthStencil => f.write_str("depth-stencil"),
        }
    }
}

/// An image to attach to a framebuffer.
#[derive(Copy, Clone, Debug)]
pub enum Attachment<'a> {
    Texture { texture: &'a Texture2D, level: u32 },
    CubeFace {
        texture: &'a TextureCube,
        face: CubeFace,
        level: u32,
    },
    Renderbuffer(&'a Renderbuffer),
}

impl<'a> Attachment<'a> {
    /// Level 0 of a 2D texture.
    pub fn texture(texture: &'a Texture2D) -> Attachment<'a> {
        Attachment::Texture { texture, level: 0 }
    }

    pub fn renderbuffer(renderbuffer: &'a Renderbuffer) -> Attachment<'a> {
        Attachment::Renderbuffer(renderbuffer)
    }

    fn context_ref(&self) -> &ContextRef {
        match self {
            Attachment::Texture { texture, .. } => texture.context_ref(),
            Attachment::CubeFace { texture, .. } => texture.context_ref(),
            Attachment::Renderbuffer(r) => r.context_ref(),
        }
    }

    fn resolve(&self) -> GlResult<AttachedImage> {
        let (image, handle, image_target, level) = match *self {
            Attachment::Texture { texture, level } => {
                (texture.image_id()?, texture.handle(), gl::TEXTURE_2D, level)
            }
            Attachment::CubeFace {
                texture,
                face,
                level,
            } => (texture.image_id()?, texture.handle(), face.to_gl(), level),
            Attachment::Renderbuffer(r) => (r.image_id()?, r.handle(), gl::RENDERBUFFER, 0),
        };
        let handle = handle.ok_or(Error::UseAfterFree {
            kind: ObjectKind::Texture,
        })?;
        Ok(AttachedImage {
            image,
            handle,
            image_target,
            level,
        })
    }
}

#[derive(Copy, Clone, Debug)]
struct AttachedImage {
    image: ImageId,
    handle: RawHandle,
    /// `TEXTURE_2D`, a cube face, or `RENDERBUFFER`.
    image_target: GLenum,
    level: u32,
}

/// Why a framebuffer cannot be drawn to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IncompleteReason {
    /// Nothing is attached.
    MissingAttachment,
    /// The attached image's format cannot be used at that slot.
    UnsupportedFormat {
        point: AttachmentPoint,
        format: TextureFormat,
    },
    /// Attached images differ in size.
    DimensionMismatch {
        point: AttachmentPoint,
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// Depth and depth-stencil attachments cannot be combined.
    ConflictingDepthAttachments,
    /// The attached object was destroyed.
    DestroyedAttachment { point: AttachmentPoint },
    /// Rejected by the driver with the given status.
    Driver(GLenum),
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IncompleteReason::MissingAttachment => f.write_str("no attachments"),
            IncompleteReason::UnsupportedFormat { point, format } => {
                write!(f, "{:?} is not supported as a {} attachment", format, point)
            }
            IncompleteReason::DimensionMismatch {
                point,
                expected,
                found,
            } => write!(
                f,
                "{} attachment is {}x{}, expected {}x{}",
                point, found.0, found.1, expected.0, expected.1
            ),
            IncompleteReason::ConflictingDepthAttachments => {
                f.write_str("both depth and depth-stencil are attached")
            }
            IncompleteReason::DestroyedAttachment { point } => {
                write!(f, "{} attachment was destroyed", point)
            }
            IncompleteReason::Driver(status) => {
                write!(f, "driver status {}", describe(*status))
            }
        }
    }
}

/// A set of attached images used as a render target.
///
/// Attachments are non-owning: destroying the framebuffer leaves the attached textures and
/// renderbuffers alone, and destroying an attached object leaves the cached completeness stale
/// until [`refresh_completeness`](Framebuffer::refresh_completeness) runs. Draws re-check that
/// every attachment is still alive.
#[derive(Debug)]
pub struct Framebuffer {
    ctx: ContextRef,
    handle: UniqueHandle,
    attachments: BTreeMap<AttachmentPoint, AttachedImage>,
    completeness: Result<(), IncompleteReason>,
}

impl Framebuffer {
    pub fn create(context: &Context) -> GlResult<Framebuffer> {
        let (handle, _) = context.inner().create_object(ObjectKind::Framebuffer)?;
        Ok(Framebuffer {
            ctx: context.downgrade(),
            handle,
            attachments: BTreeMap::new(),
            completeness: Err(IncompleteReason::MissingAttachment),
        })
    }

    fn bind(&self) -> GlResult<(Rc<ContextInner>, RawHandle)> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        ctx.bind_framebuffer(Some(raw));
        Ok((ctx, raw))
    }

    /// Attaches an image at `point`, replacing whatever was there, and revalidates.
    ///
    /// Succeeds even if the result is incomplete; use
    /// [`check_completeness`](Framebuffer::check_completeness) to find out.
    pub fn attach(&mut self, point: AttachmentPoint, attachment: Attachment) -> GlResult<()> {
        let ctx = self.ctx.resolve(&self.handle)?.0;
        if !attachment.context_ref().same_as(&self.ctx) {
            return Err(Error::InvalidParameter(
                "attachment belongs to another context".to_string(),
            ));
        }
        if let AttachmentPoint::Color(index) = point {
            let max = ctx.driver().get_parameter(gl::MAX_COLOR_ATTACHMENTS);
            let max = max.and_then(|v| v.as_int()).unwrap_or(1);
            if i64::from(index) >= max {
                return Err(Error::InvalidParameter(format!(
                    "color attachment {} exceeds MAX_COLOR_ATTACHMENTS ({})",
                    index, max
                )));
            }
        }
        let attached = attachment.resolve()?;
        let mip_levels = ctx
            .images()
            .get(attached.image)
            .map(|r| r.mip_levels)
            .unwrap_or(0);
        if attached.level >= mip_levels {
            return Err(Error::InvalidParameter(format!(
                "mip level {} out of range (image has {})",
                attached.level, mip_levels
            )));
        }

        let gl_point = point.to_gl()?;
        self.bind()?;
        {
            let mut driver = ctx.driver();
            if attached.image_target == gl::RENDERBUFFER {
                driver.framebuffer_renderbuffer(gl::FRAMEBUFFER, gl_point, Some(attached.handle));
            } else {
                driver.framebuffer_texture_2d(
                    gl::FRAMEBUFFER,
                    gl_point,
                    attached.image_target,
                    Some(attached.handle),
                    attached.level,
                );
            }
        }
        self.attachments.insert(point, attached);
        self.update_draw_buffers(&ctx);
        self.revalidate(&ctx);
        Ok(())
    }

    /// Removes the attachment at `point`, if any, and revalidates.
    pub fn detach(&mut self, point: AttachmentPoint) -> GlResult<()> {
        let gl_point = point.to_gl()?;
        let (ctx, _) = self.bind()?;
        if let Some(old) = self.attachments.remove(&point) {
            let mut driver = ctx.driver();
            if old.image_target == gl::RENDERBUFFER {
                driver.framebuffer_renderbuffer(gl::FRAMEBUFFER, gl_point, None);
            } else {
                driver.framebuffer_texture_2d(
                    gl::FRAMEBUFFER,
                    gl_point,
                    old.image_target,
                    None,
                    0,
                );
            }
        }
        self.update_draw_buffers(&ctx);
        self.revalidate(&ctx);
        Ok(())
    }

    /// The object attached at `point`, if it is still alive.
    pub fn attachment(&self, point: AttachmentPoint) -> Option<RawHandle> {
        let attached = self.attachments.get(&point)?;
        let ctx = self.ctx.get().ok()?;
        let images = ctx.images();
        images.get(attached.image).map(|r| r.handle)
    }

    pub fn attachment_points(&self) -> Vec<AttachmentPoint> {
        self.attachments.keys().copied().collect()
    }

    /// Returns the completeness computed by the last attach, detach or refresh.
    pub fn check_completeness(&self) -> GlResult<()> {
        self.ctx.resolve(&self.handle)?;
        self.completeness
            .clone()
            .map_err(Error::IncompleteFramebuffer)
    }

    pub fn is_complete(&self) -> bool {
        self.completeness.is_ok()
    }

    /// Revalidates every attachment, then returns the new completeness.
    pub fn refresh_completeness(&mut self) -> GlResult<()> {
        let (ctx, _) = self.bind()?;
        self.revalidate(&ctx);
        self.check_completeness()
    }

    /// Size shared by the attachments, from the first attached image that is still alive.
    pub fn size(&self) -> Option<(u32, u32)> {
        let ctx = self.ctx.get().ok()?;
        let images = ctx.images();
        self.attachments.values().find_map(|a| {
            images
                .get(a.image)
                .map(|r| mip_level_size(r.width, r.height, a.level))
        })
    }

    /// Reads back a color attachment of a complete framebuffer.
    ///
    /// Leaves the framebuffer bound.
    pub fn read_pixels(&self, point: AttachmentPoint) -> GlResult<Vec<u8>> {
        let index = match point {
            AttachmentPoint::Color(index) => index,
            other => {
                return Err(Error::InvalidParameter(format!(
                    "cannot read back the {} attachment",
                    other
                )))
            }
        };
        let gl_point = point.to_gl()?;
        let raw = self.bind_for_draw()?;
        let ctx = self.ctx.get()?;
        let attached = self.attachments.get(&point).ok_or_else(|| {
            Error::InvalidParameter(format!("nothing attached at color{}", index))
        })?;
        let (format, w, h) = {
            let images = ctx.images();
            let record = images
                .get(attached.image)
                .ok_or(Error::IncompleteFramebuffer(
                    IncompleteReason::DestroyedAttachment { point },
                ))?;
            let (w, h) = mip_level_size(record.width, record.height, attached.level);
            (record.format, w, h)
        };
        let info = format.gl_format_info();
        let mut out = vec![0u8; w as usize * h as usize * format.byte_size()];
        let mut driver = ctx.driver();
        driver.read_buffer(gl_point);
        driver.read_pixels(0, 0, w, h, info.upload_components, info.upload_ty, &mut out);
        debug!(framebuffer = ?raw, %point, "read_pixels");
        Ok(out)
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.handle.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_null()
    }

    pub(crate) fn context_ref(&self) -> &ContextRef {
        &self.ctx
    }

    /// Binds the framebuffer as the render target after checking that it is complete and that
    /// every attachment is still alive.
    pub(crate) fn bind_for_draw(&self) -> GlResult<RawHandle> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        self.completeness
            .clone()
            .map_err(Error::IncompleteFramebuffer)?;
        {
            let images = ctx.images();
            for (&point, a) in self.attachments.iter() {
                if !images.contains_key(a.image) {
                    return Err(Error::IncompleteFramebuffer(
                        IncompleteReason::DestroyedAttachment { point },
                    ));
                }
            }
        }
        ctx.bind_framebuffer(Some(raw));
        Ok(raw)
    }

    /// Releases the framebuffer object. Attached images are not affected. Calling it again does
    /// nothing.
    pub fn destroy(&mut self) {
        self.ctx.release(&mut self.handle);
        self.attachments.clear();
        self.completeness = Err(IncompleteReason::MissingAttachment);
    }

    /// Enables a draw buffer for every color attachment slot up to the highest one in use.
    fn update_draw_buffers(&self, ctx: &ContextInner) {
        let highest = self
            .attachments
            .keys()
            .filter_map(|p| match p {
                AttachmentPoint::Color(i) => Some(*i),
                _ => None,
            })
            .max();
        let buffers: Vec<GLenum> = match highest {
            Some(highest) => (0..=highest)
                .map(|i| {
                    if self.attachments.contains_key(&AttachmentPoint::Color(i)) {
                        gl::COLOR_ATTACHMENT0 + i
                    } else {
                        gl::NONE
                    }
                })
                .collect(),
            None => vec![gl::NONE],
        };
        ctx.driver().draw_buffers(&buffers);
    }

    /// Recomputes completeness. Expects the framebuffer to be bound.
    fn revalidate(&mut self, ctx: &ContextInner) {
        let completeness = self.validate(ctx);
        if completeness != self.completeness {
            debug!(
                framebuffer = ?self.handle,
                complete = completeness.is_ok(),
                reason = ?completeness.as_ref().err(),
                "framebuffer completeness changed"
            );
        }
        self.completeness = completeness;
    }

    fn validate(&self, ctx: &ContextInner) -> Result<(), IncompleteReason> {
        if self.attachments.is_empty() {
            return Err(IncompleteReason::MissingAttachment);
        }
        let float_color_buffers = ctx.driver().has_extension("EXT_color_buffer_float");
        let mut size = None;
        {
            let images = ctx.images();
            for (&point, a) in self.attachments.iter() {
                let record = images
                    .get(a.image)
                    .ok_or(IncompleteReason::DestroyedAttachment { point })?;
                if !point.accepts(record.format, float_color_buffers) {
                    return Err(IncompleteReason::UnsupportedFormat {
                        point,
                        format: record.format,
                    });
                }
                let found = mip_level_size(record.width, record.height, a.level);
                match size {
                    None => size = Some(found),
                    Some(expected) if expected != found => {
                        return Err(IncompleteReason::DimensionMismatch {
                            point,
                            expected,
                            found,
                        })
                    }
                    _ => {}
                }
            }
        }
        if self.attachments.contains_key(&AttachmentPoint::Depth)
            && self.attachments.contains_key(&AttachmentPoint::DepthStencil)
        {
            return Err(IncompleteReason::ConflictingDepthAttachments);
        }
        let status = ctx.driver().check_framebuffer_status(gl::FRAMEBUFFER);
        if status != gl::FRAMEBUFFER_COMPLETE {
            return Err(IncompleteReason::Driver(status));
        }
        Ok(())
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        self.destroy()
    }
}
