use crate::{framebuffer::IncompleteReason, handle::ObjectKind, shader::ShaderStage};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("the driver refused to create a {kind} object")]
    ResourceCreation { kind: ObjectKind },
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("program link failed: {log}")]
    Link { log: String },
    #[error("{kind} object used after it was destroyed")]
    UseAfterFree { kind: ObjectKind },
    #[error("no active attribute or uniform named `{name}`")]
    UnknownLocation { name: String },
    #[error("uniform `{name}` is declared as {expected}, got a {found} value")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),
    #[error("image data size mismatch: expected {expected} bytes, got {found}")]
    FormatMismatch { expected: usize, found: usize },
    #[error("framebuffer is incomplete: {0}")]
    IncompleteFramebuffer(IncompleteReason),
    #[error("attribute slot {slot} is consumed by the program but has no data source")]
    MissingAttribute { slot: u32 },
    #[error("invalid draw state: {0}")]
    InvalidDrawState(String),
    #[error("the graphics context was lost")]
    ContextLost,
}

pub type GlResult<T> = Result<T, Error>;
