//! Texture filtering and wrapping parameters.
use crate::{
    api::gl::{self, GLenum},
    error::{Error, GlResult},
};

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// How the minification filter picks between mip levels. `None` samples the base level only.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum MipmapMode {
    None,
    Nearest,
    Linear,
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum WrapMode {
    Clamp,
    Mirror,
    Repeat,
}

/// Sampling state of a texture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TextureParameters {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    /// Third wrap coordinate. Only cube maps accept it.
    pub wrap_r: Option<WrapMode>,
}

impl Default for TextureParameters {
    fn default() -> Self {
        TextureParameters {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_mode: MipmapMode::None,
            wrap_s: WrapMode::Clamp,
            wrap_t: WrapMode::Clamp,
            wrap_r: None,
        }
    }
}

impl TextureParameters {
    pub const NEAREST: TextureParameters = TextureParameters {
        min_filter: Filter::Nearest,
        mag_filter: Filter::Nearest,
        mipmap_mode: MipmapMode::None,
        wrap_s: WrapMode::Clamp,
        wrap_t: WrapMode::Clamp,
        wrap_r: None,
    };

    pub const LINEAR_MIPMAP_LINEAR: TextureParameters = TextureParameters {
        min_filter: Filter::Linear,
        mag_filter: Filter::Linear,
        mipmap_mode: MipmapMode::Linear,
        wrap_s: WrapMode::Clamp,
        wrap_t: WrapMode::Clamp,
        wrap_r: None,
    };

    /// Checks the combination against a texture with `mip_levels` levels.
    pub(crate) fn validate(&self, mip_levels: u32, has_r_coordinate: bool) -> GlResult<()> {
        if self.mipmap_mode != MipmapMode::None && mip_levels < 2 {
            return Err(Error::InvalidParameter(format!(
                "mipmapped minification filter ({:?}) on a texture with a single mip level",
                self.mipmap_mode
            )));
        }
        if self.wrap_r.is_some() && !has_r_coordinate {
            return Err(Error::InvalidParameter(
                "wrap_r is only valid for cube maps".to_string(),
            ));
        }
        Ok(())
    }

    /// `(pname, value)` pairs to pass to `tex_parameter`.
    pub(crate) fn to_gl(&self) -> Vec<(GLenum, GLenum)> {
        let mut params = vec![
            (
                gl::TEXTURE_MIN_FILTER,
                min_filter_to_glenum(self.min_filter, self.mipmap_mode),
            ),
            (gl::TEXTURE_MAG_FILTER, mag_filter_to_glenum(self.mag_filter)),
            (gl::TEXTURE_WRAP_S, wrap_mode_to_glenum(self.wrap_s)),
            (gl::TEXTURE_WRAP_T, wrap_mode_to_glenum(self.wrap_t)),
        ];
        if let Some(r) = self.wrap_r {
            params.push((gl::TEXTURE_WRAP_R, wrap_mode_to_glenum(r)));
        }
        params
    }
}

fn min_filter_to_glenum(filter: Filter, mipmap_mode: MipmapMode) -> GLenum {
    match (filter, mipmap_mode) {
        (Filter::Nearest, MipmapMode::None) => gl::NEAREST,
        (Filter::Linear, MipmapMode::None) => gl::LINEAR,
        (Filter::Nearest, MipmapMode::Linear) => gl::NEAREST_MIPMAP_LINEAR,
        (Filter::Linear, MipmapMode::Linear) => gl::LINEAR_MIPMAP_LINEAR,
        (Filter::Nearest, MipmapMode::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
        (Filter::Linear, MipmapMode::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
    }
}

fn mag_filter_to_glenum(filter: Filter) -> GLenum {
    match filter {
        Filter::Nearest => gl::NEAREST,
        Filter::Linear => gl::LINEAR,
    }
}

fn wrap_mode_to_glenum(mode: WrapMode) -> GLenum {
    match mode {
        WrapMode::Clamp => gl::CLAMP_TO_EDGE,
        WrapMode::Mirror => gl::MIRRORED_REPEAT,
        WrapMode::Repeat => gl::REPEAT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmapped_filter_needs_levels() {
        let params = TextureParameters::LINEAR_MIPMAP_LINEAR;
        assert!(matches!(
            params.validate(1, false),
            Err(Error::InvalidParameter(_))
        ));
        assert!(params.validate(4, false).is_ok());
    }

    #[test]
    fn wrap_r_only_on_cube_maps() {
        let params = TextureParameters {
            wrap_r: Some(WrapMode::Repeat),
            ..Default::default()
        };
        assert!(params.validate(1, false).is_err());
        assert!(params.validate(1, true).is_ok());
        assert_eq!(params.to_gl().len(), 5);
    }

    #[test]
    fn gl_values() {
        let params = TextureParameters {
            min_filter: Filter::Nearest,
            mipmap_mode: MipmapMode::Linear,
            wrap_s: WrapMode::Mirror,
            ..Default::default()
        };
        let values = params.to_gl();
        assert!(values.contains(&(gl::TEXTURE_MIN_FILTER, gl::NEAREST_MIPMAP_LINEAR)));
        assert!(values.contains(&(gl::TEXTURE_WRAP_S, gl::MIRRORED_REPEAT)));
        assert!(values.contains(&(gl::TEXTURE_MAG_FILTER, gl::LINEAR)));
    }
}
