use crate::api::gl::{self, GLenum};

/// A value for a non-array uniform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Bool(bool),
    /// Column-major 2x2 matrix.
    Mat2([f32; 4]),
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
    /// Texture unit index for a sampler uniform.
    Sampler(u32),
}

impl UniformValue {
    /// Returns the GLSL name of the type of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Int(_) => "int",
            UniformValue::IVec2(_) => "ivec2",
            UniformValue::IVec3(_) => "ivec3",
            UniformValue::IVec4(_) => "ivec4",
            UniformValue::Bool(_) => "bool",
            UniformValue::Mat2(_) => "mat2",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::Sampler(_) => "sampler unit",
        }
    }

    /// Whether a uniform declared with type `ty` can be set with this value.
    ///
    /// Booleans may be set from bools or ints (like `glUniform1i` on a `bool`). Samplers only
    /// take texture units.
    pub fn is_compatible_with(&self, ty: GLenum) -> bool {
        match (self, ty) {
            (UniformValue::Float(_), gl::FLOAT) => true,
            (UniformValue::Vec2(_), gl::FLOAT_VEC2) => true,
            (UniformValue::Vec3(_), gl::FLOAT_VEC3) => true,
            (UniformValue::Vec4(_), gl::FLOAT_VEC4) => true,
            (UniformValue::Int(_), gl::INT) => true,
            (UniformValue::IVec2(_), gl::INT_VEC2) => true,
            (UniformValue::IVec3(_), gl::INT_VEC3) => true,
            (UniformValue::IVec4(_), gl::INT_VEC4) => true,
            (UniformValue::Bool(_), gl::BOOL) | (UniformValue::Int(_), gl::BOOL) => true,
            (UniformValue::Mat2(_), gl::FLOAT_MAT2) => true,
            (UniformValue::Mat3(_), gl::FLOAT_MAT3) => true,
            (UniformValue::Mat4(_), gl::FLOAT_MAT4) => true,
            (UniformValue::Sampler(_), gl::SAMPLER_2D) | (UniformValue::Sampler(_), gl::SAMPLER_CUBE) => true,
            _ => false,
        }
    }
}

/// Returns the GLSL name of a uniform or attribute type enum.
pub fn glsl_type_name(ty: GLenum) -> &'static str {
    match ty {
        gl::FLOAT => "float",
        gl::FLOAT_VEC2 => "vec2",
        gl::FLOAT_VEC3 => "vec3",
        gl::FLOAT_VEC4 => "vec4",
        gl::INT => "int",
        gl::INT_VEC2 => "ivec2",
        gl::INT_VEC3 => "ivec3",
        gl::INT_VEC4 => "ivec4",
        gl::BOOL => "bool",
        gl::BOOL_VEC2 => "bvec2",
        gl::BOOL_VEC3 => "bvec3",
        gl::BOOL_VEC4 => "bvec4",
        gl::FLOAT_MAT2 => "mat2",
        gl::FLOAT_MAT3 => "mat3",
        gl::FLOAT_MAT4 => "mat4",
        gl::SAMPLER_2D => "sampler2D",
        gl::SAMPLER_CUBE => "samplerCube",
        _ => "unknown",
    }
}

/// Inverse of [`glsl_type_name`].
pub(crate) fn glsl_type_from_name(name: &str) -> Option<GLenum> {
    Some(match name {
        "float" => gl::FLOAT,
        "vec2" => gl::FLOAT_VEC2,
        "vec3" => gl::FLOAT_VEC3,
        "vec4" => gl::FLOAT_VEC4,
        "int" => gl::INT,
        "ivec2" => gl::INT_VEC2,
        "ivec3" => gl::INT_VEC3,
        "ivec4" => gl::INT_VEC4,
        "bool" => gl::BOOL,
        "bvec2" => gl::BOOL_VEC2,
        "bvec3" => gl::BOOL_VEC3,
        "bvec4" => gl::BOOL_VEC4,
        "mat2" => gl::FLOAT_MAT2,
        "mat3" => gl::FLOAT_MAT3,
        "mat4" => gl::FLOAT_MAT4,
        "sampler2D" => gl::SAMPLER_2D,
        "samplerCube" => gl::SAMPLER_CUBE,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility() {
        assert!(UniformValue::Mat4([0.0; 16]).is_compatible_with(gl::FLOAT_MAT4));
        assert!(!UniformValue::Mat4([0.0; 16]).is_compatible_with(gl::FLOAT_MAT3));
        assert!(UniformValue::Int(1).is_compatible_with(gl::BOOL));
        assert!(!UniformValue::Int(1).is_compatible_with(gl::SAMPLER_2D));
        assert!(UniformValue::Sampler(3).is_compatible_with(gl::SAMPLER_CUBE));
        assert!(!UniformValue::Float(1.0).is_compatible_with(gl::INT));
    }

    #[test]
    fn type_names_round_trip() {
        for &ty in &[gl::FLOAT_VEC3, gl::SAMPLER_CUBE, gl::BOOL_VEC2, gl::FLOAT_MAT3] {
            assert_eq!(glsl_type_from_name(glsl_type_name(ty)), Some(ty));
        }
        assert_eq!(glsl_type_from_name("dvec3"), None);
    }
}
