//! Shader programs of the pipeline.
//!
//! The pipeline treats each program as an opaque unit with a fixed uniform
//! interface (see [`uniforms`](crate::uniforms)). Built-in WGSL is embedded in
//! the binary; any program can be replaced from a directory of `.wgsl` files.
//! Every source is parsed and validated with naga before wgpu sees it, so a
//! broken program surfaces as a [`ShaderError`] instead of a device panic.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use tracing::{debug, info};

use crate::error::ShaderError;

pub const INIT_POSITIONS: &str = include_str!("shaders/init_positions.wgsl");
pub const UPDATE_POSITIONS: &str = include_str!("shaders/update_positions.wgsl");
pub const DRAW_PARTICLES: &str = include_str!("shaders/draw_particles.wgsl");
pub const CANVAS_PREPROCESS: &str = include_str!("shaders/canvas_preprocess.wgsl");
pub const PRESENT: &str = include_str!("shaders/present.wgsl");

/// The five programs the pipeline runs.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub init_positions: Cow<'static, str>,
    pub update_positions: Cow<'static, str>,
    pub draw_particles: Cow<'static, str>,
    pub canvas_preprocess: Cow<'static, str>,
    pub present: Cow<'static, str>,
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShaderSet {
    /// The programs compiled into the crate.
    pub fn builtin() -> Self {
        Self {
            init_positions: Cow::Borrowed(INIT_POSITIONS),
            update_positions: Cow::Borrowed(UPDATE_POSITIONS),
            draw_particles: Cow::Borrowed(DRAW_PARTICLES),
            canvas_preprocess: Cow::Borrowed(CANVAS_PREPROCESS),
            present: Cow::Borrowed(PRESENT),
        }
    }

    /// Load overrides from `dir`. Files that don't exist keep the built-in
    /// program; files that exist but can't be read are an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let dir = dir.as_ref();
        let mut set = Self::builtin();
        for (name, slot) in set.programs_mut() {
            let path = dir.join(format!("{}.wgsl", name));
            match fs::read_to_string(&path) {
                Ok(source) => {
                    info!(program = name, path = %path.display(), "loaded shader override");
                    *slot = Cow::Owned(source);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(ShaderError::Load { name, source }),
            }
        }
        Ok(set)
    }

    /// Parse and validate every program.
    pub fn validate(&self) -> Result<(), ShaderError> {
        for (name, source) in self.programs() {
            validate_wgsl(name, source)?;
            debug!(program = name, "shader validated");
        }
        Ok(())
    }

    fn programs(&self) -> [(&'static str, &str); 5] {
        [
            ("init_positions", &self.init_positions),
            ("update_positions", &self.update_positions),
            ("draw_particles", &self.draw_particles),
            ("canvas_preprocess", &self.canvas_preprocess),
            ("present", &self.present),
        ]
    }

    fn programs_mut(&mut self) -> [(&'static str, &mut Cow<'static, str>); 5] {
        [
            ("init_positions", &mut self.init_positions),
            ("update_positions", &mut self.update_positions),
            ("draw_particles", &mut self.draw_particles),
            ("canvas_preprocess", &mut self.canvas_preprocess),
            ("present", &mut self.present),
        ]
    }
}

/// Validate WGSL source code.
pub fn validate_wgsl(name: &'static str, source: &str) -> Result<(), ShaderError> {
    let module = wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
        name,
        message: err.emit_to_string(source),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            name,
            message: err.emit_to_string(source),
        })?;

    Ok(())
}

/// Create a wgpu module from already validated WGSL.
pub(crate) fn create_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_shaders_validate() {
        ShaderSet::builtin().validate().unwrap();
    }

    #[test]
    fn test_entry_points_present() {
        for (name, source) in ShaderSet::builtin().programs() {
            assert!(source.contains("fn vs_main"), "{} lacks vs_main", name);
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", name);
        }
    }

    #[test]
    fn test_syntax_error_names_program() {
        let set = ShaderSet {
            update_positions: Cow::Borrowed("fn broken( {"),
            ..ShaderSet::builtin()
        };
        match set.validate() {
            Err(ShaderError::Compile { name, .. }) => assert_eq!(name, "update_positions"),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_error_is_reported() {
        // Parses, but returns the wrong type
        let source = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        assert!(validate_wgsl("present", source).is_err());
    }

    #[test]
    fn test_from_dir_overrides_and_falls_back() {
        let dir = std::env::temp_dir().join(format!("flowtrail-shaders-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("present.wgsl"), "// custom\n").unwrap();

        let set = ShaderSet::from_dir(&dir).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(set.present, "// custom\n");
        assert_eq!(set.init_positions, INIT_POSITIONS);
    }
}
