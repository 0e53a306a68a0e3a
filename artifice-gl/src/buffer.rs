use crate::{
    api::gl::{self, GLenum},
    context::{BufferId, BufferRecord, Context, ContextRef},
    error::{Error, GlResult},
    handle::{ObjectKind, RawHandle, UniqueHandle},
};
use tracing::trace;

/// What a buffer holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`).
    Vertex,
    /// Vertex indices (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

impl BufferTarget {
    pub fn to_gl(self) -> GLenum {
        match self {
            BufferTarget::Vertex => gl::ARRAY_BUFFER,
            BufferTarget::Index => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Static,
    Dynamic,
    Stream,
}

impl BufferUsage {
    pub fn to_gl(self) -> GLenum {
        match self {
            BufferUsage::Static => gl::STATIC_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
            BufferUsage::Stream => gl::STREAM_DRAW,
        }
    }
}

/// GPU memory for vertex or index data.
///
/// The contents are undefined until the first upload. Uploading past the end grows the storage;
/// existing bytes are preserved and any gap between the old end and the upload offset is zeroed.
#[derive(Debug)]
pub struct Buffer {
    ctx: ContextRef,
    handle: UniqueHandle,
    id: BufferId,
    target: BufferTarget,
    usage: BufferUsage,
    byte_length: usize,
}

impl Buffer {
    pub fn create(context: &Context, target: BufferTarget, usage: BufferUsage) -> GlResult<Buffer> {
        let inner = context.inner();
        let (handle, raw) = inner.create_object(ObjectKind::Buffer)?;
        let id = inner.register_buffer(BufferRecord {
            handle: raw,
            byte_length: 0,
        });
        Ok(Buffer {
            ctx: context.downgrade(),
            handle,
            id,
            target,
            usage,
            byte_length: 0,
        })
    }

    /// Copies `data` into the buffer at byte `offset`.
    ///
    /// Leaves the buffer bound to its target.
    pub fn upload(&mut self, data: &[u8], offset: usize) -> GlResult<()> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        let end = offset.checked_add(data.len()).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "upload range overflows: offset {} + {} bytes",
                offset,
                data.len()
            ))
        })?;
        let target = self.target.to_gl();
        ctx.bind_buffer(target, Some(raw));

        if end > self.byte_length {
            // storage is reallocated with the new size: save the old contents first
            let mut old = vec![0u8; self.byte_length];
            let mut driver = ctx.driver();
            if !old.is_empty() {
                driver.get_buffer_sub_data(target, 0, &mut old);
            }
            driver.buffer_data(target, end, self.usage.to_gl());
            if !old.is_empty() {
                driver.buffer_sub_data(target, 0, &old);
            }
            trace!(handle = ?raw, from = self.byte_length, to = end, "grow_buffer");
            self.byte_length = end;
            if let Some(record) = ctx.buffers_mut().get_mut(self.id) {
                record.byte_length = end;
            }
        }

        if !data.is_empty() {
            ctx.driver().buffer_sub_data(target, offset, data);
        }
        Ok(())
    }

    /// Uploads a slice of plain-old-data elements at byte `offset`.
    pub fn upload_slice<T: bytemuck::Pod>(&mut self, data: &[T], offset: usize) -> GlResult<()> {
        self.upload(bytemuck::cast_slice(data), offset)
    }

    /// Reads `len` bytes starting at byte `offset`.
    pub fn read(&self, offset: usize, len: usize) -> GlResult<Vec<u8>> {
        let (ctx, raw) = self.ctx.resolve(&self.handle)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.byte_length => {}
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "read of {} bytes at offset {} is out of bounds (buffer is {} bytes)",
                    len, offset, self.byte_length
                )))
            }
        }
        let target = self.target.to_gl();
        ctx.bind_buffer(target, Some(raw));
        let mut out = vec![0u8; len];
        ctx.driver().get_buffer_sub_data(target, offset, &mut out);
        Ok(out)
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Size of the storage after the last upload.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The driver name, or `None` once destroyed.
    pub fn handle(&self) -> Option<RawHandle> {
        self.handle.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_null()
    }

    pub(crate) fn id(&self) -> BufferId {
        self.id
    }

    pub(crate) fn context_ref(&self) -> &ContextRef {
        &self.ctx
    }

    /// Releases the buffer. Calling it again does nothing.
    pub fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let id = self.id;
        self.ctx.with_alive(|ctx| ctx.remove_buffer(id));
        self.ctx.release(&mut self.handle);
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.destroy()
    }
}
