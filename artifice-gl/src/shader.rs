//! Shader programs.
use crate::{
    api::{
        gl::{self, GLenum},
        ActiveVariable,
    },
    context::{Context, ContextInner, ContextRef},
    error::{Error, GlResult},
    handle::{ObjectKind, RawHandle, UniqueHandle},
    uniform::{glsl_type_name, UniformValue},
};
use std::{collections::HashMap, fmt};
use tracing::{debug, warn};

/// A programmable pipeline stage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_gl(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Build state of a program.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProgramState {
    /// Created, never built.
    Pending,
    Linked,
    /// The last build failed at compilation or link time.
    Failed,
}

/// A linked vertex + fragment shader pair.
///
/// Active attributes and uniforms are enumerated once after a successful link; location lookups
/// only consult that cache. A program that is pending or failed has no locations.
#[derive(Debug)]
pub struct Program {
    ctx: ContextRef,
    program: UniqueHandle,
    vertex: Option<UniqueHandle>,
    fragment: Option<UniqueHandle>,
    state: ProgramState,
    attributes: HashMap<String, ActiveVariable>,
    uniforms: HashMap<String, ActiveVariable>,
}

impl Program {
    /// Creates a program object in the pending state.
    pub fn new(context: &Context) -> GlResult<Program> {
        let (program, _) = context.inner().create_object(ObjectKind::Program)?;
        Ok(Program {
            ctx: context.downgrade(),
            program,
            vertex: None,
            fragment: None,
            state: ProgramState::Pending,
            attributes: HashMap::new(),
            uniforms: HashMap::new(),
        })
    }

    /// Creates a program and builds it from GLSL sources.
    pub fn create(context: &Context, vertex_source: &str, fragment_source: &str) -> GlResult<Program> {
        let mut program = Program::new(context)?;
        program.build(vertex_source, fragment_source)?;
        Ok(program)
    }

    /// Compiles both stages and links them, replacing the previous build.
    ///
    /// On failure the program is left in the `Failed` state with empty location caches.
    pub fn build(&mut self, vertex_source: &str, fragment_source: &str) -> GlResult<()> {
        let (ctx, raw) = self.ctx.resolve(&self.program)?;
        self.attributes.clear();
        self.uniforms.clear();
        self.state = ProgramState::Failed;
        self.release_shaders();

        let vertex = compile_stage(&ctx, ShaderStage::Vertex, vertex_source);
        let vertex = self.vertex.insert(vertex?);
        let vertex_raw = vertex.get();
        let fragment = compile_stage(&ctx, ShaderStage::Fragment, fragment_source);
        let fragment = self.fragment.insert(fragment?);
        let fragment_raw = fragment.get();

        let shaders: Vec<RawHandle> = vertex_raw.into_iter().chain(fragment_raw).collect();
        let linked = ctx.driver().link_program(raw, &shaders);
        if let Err(log) = linked {
            warn!(program = ?raw, log = log.as_str(), "link failed");
            return Err(Error::Link { log });
        }

        let attributes = ctx.driver().active_attributes(raw);
        let uniforms = ctx.driver().active_uniforms(raw);
        debug!(
            program = ?raw,
            attributes = attributes.len(),
            uniforms = uniforms.len(),
            "linked program"
        );
        self.attributes = attributes.into_iter().map(|v| (v.name.clone(), v)).collect();
        self.uniforms = uniforms.into_iter().map(|v| (v.name.clone(), v)).collect();
        self.state = ProgramState::Linked;
        Ok(())
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_linked(&self) -> bool {
        self.state == ProgramState::Linked
    }

    fn lookup<'a>(
        &self,
        table: &'a HashMap<String, ActiveVariable>,
        name: &str,
    ) -> GlResult<&'a ActiveVariable> {
        self.ctx.resolve(&self.program)?;
        table.get(name).ok_or_else(|| Error::UnknownLocation {
            name: name.to_string(),
        })
    }

    /// Returns the slot of an active vertex attribute.
    pub fn attribute_location(&self, name: &str) -> GlResult<u32> {
        self.lookup(&self.attributes, name).map(|v| v.location)
    }

    /// Returns the location of an active uniform.
    pub fn uniform_location(&self, name: &str) -> GlResult<u32> {
        self.lookup(&self.uniforms, name).map(|v| v.location)
    }

    /// Active attributes, ordered by slot.
    pub fn attributes(&self) -> Vec<&ActiveVariable> {
        let mut v: Vec<_> = self.attributes.values().collect();
        v.sort_by_key(|a| a.location);
        v
    }

    /// Active uniforms, ordered by location.
    pub fn uniforms(&self) -> Vec<&ActiveVariable> {
        let mut v: Vec<_> = self.uniforms.values().collect();
        v.sort_by_key(|u| u.location);
        v
    }

    /// Sets a uniform, checking the value against the declared type.
    ///
    /// Leaves the program in use.
    pub fn set_uniform(&self, location: u32, value: UniformValue) -> GlResult<()> {
        let (ctx, raw) = self.ctx.resolve(&self.program)?;
        let uniform = self
            .uniforms
            .values()
            .find(|u| u.location == location)
            .ok_or_else(|| Error::UnknownLocation {
                name: format!("<uniform location {}>", location),
            })?;
        if uniform.size > 1 {
            return Err(Error::InvalidParameter(format!(
                "uniform `{}` is an array, array uniforms are not supported",
                uniform.name
            )));
        }
        if !value.is_compatible_with(uniform.ty) {
            return Err(Error::TypeMismatch {
                name: uniform.name.clone(),
                expected: glsl_type_name(uniform.ty),
                found: value.type_name(),
            });
        }
        ctx.use_program(Some(raw));
        ctx.driver().uniform(location, &value);
        Ok(())
    }

    /// Shorthand for `uniform_location` followed by `set_uniform`.
    pub fn set_uniform_by_name(&self, name: &str, value: UniformValue) -> GlResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform(location, value)
    }

    pub fn handle(&self) -> Option<RawHandle> {
        self.program.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.program.is_null()
    }

    pub(crate) fn context_ref(&self) -> &ContextRef {
        &self.ctx
    }

    /// Releases both shader stages and the program. Calling it again does nothing.
    pub fn destroy(&mut self) {
        self.release_shaders();
        self.ctx.release(&mut self.program);
        self.state = ProgramState::Failed;
        self.attributes.clear();
        self.uniforms.clear();
    }

    fn release_shaders(&mut self) {
        if let Some(mut shader) = self.vertex.take() {
            self.ctx.release(&mut shader);
        }
        if let Some(mut shader) = self.fragment.take() {
            self.ctx.release(&mut shader);
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.destroy()
    }
}

fn compile_stage(ctx: &ContextInner, stage: ShaderStage, source: &str) -> GlResult<UniqueHandle> {
    let (shader, raw) = ctx.create_object(ObjectKind::Shader(stage.to_gl()))?;
    let compiled = ctx.driver().compile_shader(raw, source);
    match compiled {
        Ok(()) => Ok(shader),
        Err(log) => {
            warn!(%stage, log = log.as_str(), "shader compilation failed");
            let mut shader = shader;
            if let Some(raw) = shader.take() {
                ctx.delete_object(shader.kind(), raw);
            }
            Err(Error::ShaderCompile { stage, log })
        }
    }
}
