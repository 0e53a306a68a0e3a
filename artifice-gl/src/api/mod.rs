//! The native side: GL enums and the driver interface.
pub mod gl;
pub mod get;
mod driver;
mod headless;

pub use self::driver::{ActiveVariable, Driver, ParameterValue};
pub use self::get::{gl_get, gl_name};
pub use self::headless::{
    AttribPointer, DrawRecord, HeadlessConfig, HeadlessDriver, VertexAttribState,
};
