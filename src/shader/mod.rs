//! Shader program builder
//!
//! Compiles any subset of vertex, fragment and compute sources and links the
//! stages that compiled into one program. Optional transform-feedback varyings
//! are declared before linking.
//!
//! Stage objects never outlive [`ShaderBuilder::build`]: they are deleted on
//! success and on every failure path.
//!
//! ```no_run
//! use gles_demos::shader::{GlesShaderBackend, ShaderBuilder};
//!
//! # fn demo() -> Result<(), gles_demos::shader::ShaderError> {
//! let program = ShaderBuilder::new()
//!     .vertex("attribute vec4 pos; void main() { gl_Position = pos; }")
//!     .fragment("void main() { gl_FragColor = vec4(1.0); }")
//!     .build(&mut GlesShaderBackend)?;
//! # Ok(())
//! # }
//! ```

use gl::types::{GLchar, GLenum, GLint, GLuint};
use log::error;
use std::ffi::CString;
use thiserror::Error;

/// Pipeline stage a source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }

    pub fn gl_enum(self) -> GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
            ShaderStage::Compute => gl::COMPUTE_SHADER,
        }
    }
}

/// How transform feedback writes captured varyings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    /// All varyings into one buffer
    Interleaved,
    /// One buffer per varying
    Separate,
}

impl FeedbackMode {
    pub fn gl_enum(self) -> GLenum {
        match self {
            FeedbackMode::Interleaved => gl::INTERLEAVED_ATTRIBS,
            FeedbackMode::Separate => gl::SEPARATE_ATTRIBS,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("no shader stage compiled")]
    NoStageCompiled,

    #[error("failed to create program object")]
    ProgramCreation,

    #[error("linking program: {0}")]
    Link(String),
}

/// GL entry points the builder needs
pub trait ShaderBackend {
    /// Creates a shader object, 0 on failure
    fn create_shader(&mut self, stage: ShaderStage) -> GLuint;

    /// Uploads and compiles the source, returning the compile status
    fn compile_shader(&mut self, shader: GLuint, source: &str) -> bool;

    fn shader_info_log(&mut self, shader: GLuint) -> String;

    fn delete_shader(&mut self, shader: GLuint);

    /// Creates a program object, 0 on failure
    fn create_program(&mut self) -> GLuint;

    fn attach_shader(&mut self, program: GLuint, shader: GLuint);

    fn transform_feedback_varyings(&mut self, program: GLuint, varyings: &[&str], mode: FeedbackMode);

    /// Links the program, returning the link status
    fn link_program(&mut self, program: GLuint) -> bool;

    fn program_info_log(&mut self, program: GLuint) -> String;

    fn delete_program(&mut self, program: GLuint);
}

/// Builder collecting the sources of one program
#[derive(Debug, Clone, Default)]
pub struct ShaderBuilder<'a> {
    vertex: Option<&'a str>,
    fragment: Option<&'a str>,
    compute: Option<&'a str>,
    feedback: Option<(Vec<&'a str>, FeedbackMode)>,
}

impl<'a> ShaderBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex(mut self, source: &'a str) -> Self {
        self.vertex = Some(source);
        self
    }

    pub fn fragment(mut self, source: &'a str) -> Self {
        self.fragment = Some(source);
        self
    }

    pub fn compute(mut self, source: &'a str) -> Self {
        self.compute = Some(source);
        self
    }

    /// Captures `varyings` with transform feedback
    pub fn transform_feedback(mut self, varyings: &[&'a str], mode: FeedbackMode) -> Self {
        self.feedback = Some((varyings.to_vec(), mode));
        self
    }

    /// Compiles, links and returns the program name
    pub fn build<B: ShaderBackend + ?Sized>(&self, backend: &mut B) -> Result<GLuint, ShaderError> {
        let shaders: Vec<GLuint> = [
            (ShaderStage::Vertex, self.vertex),
            (ShaderStage::Fragment, self.fragment),
            (ShaderStage::Compute, self.compute),
        ]
        .into_iter()
        .filter_map(|(stage, source)| compile_stage(backend, stage, source?))
        .collect();

        if shaders.is_empty() {
            return Err(ShaderError::NoStageCompiled);
        }

        let result = link(backend, &shaders, self.feedback.as_ref());

        for shader in shaders {
            backend.delete_shader(shader);
        }

        result
    }
}

fn compile_stage<B: ShaderBackend + ?Sized>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
) -> Option<GLuint> {
    let shader = backend.create_shader(stage);
    if shader == 0 {
        error!("Error: creating {} shader", stage.name());
        return None;
    }

    if !backend.compile_shader(shader, source) {
        let log = backend.shader_info_log(shader);
        error!("Error: compiling {}: {}", stage.name(), log.trim_end());
        backend.delete_shader(shader);
        return None;
    }

    Some(shader)
}

fn link<B: ShaderBackend + ?Sized>(
    backend: &mut B,
    shaders: &[GLuint],
    feedback: Option<&(Vec<&str>, FeedbackMode)>,
) -> Result<GLuint, ShaderError> {
    let program = backend.create_program();
    if program == 0 {
        error!("Error: creating program");
        return Err(ShaderError::ProgramCreation);
    }

    for shader in shaders {
        backend.attach_shader(program, *shader);
    }

    if let Some((varyings, mode)) = feedback {
        backend.transform_feedback_varyings(program, varyings, *mode);
    }

    if !backend.link_program(program) {
        let log = backend.program_info_log(program);
        error!("Error: linking:\n{}", log.trim_end());
        backend.delete_program(program);
        return Err(ShaderError::Link(log));
    }

    Ok(program)
}

/// [`ShaderBackend`] over the loaded `gl` function pointers.
///
/// Requires a current context with `gl::load_with` already done.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlesShaderBackend;

impl GlesShaderBackend {
    fn read_log(len: GLint, fetch: impl FnOnce(GLint, *mut GLint, *mut GLchar)) -> String {
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u8; len as usize];
        let mut written: GLint = 0;
        fetch(len, &mut written, buf.as_mut_ptr() as *mut GLchar);
        buf.truncate(written.clamp(0, len) as usize);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl ShaderBackend for GlesShaderBackend {
    fn create_shader(&mut self, stage: ShaderStage) -> GLuint {
        unsafe { gl::CreateShader(stage.gl_enum()) }
    }

    fn compile_shader(&mut self, shader: GLuint, source: &str) -> bool {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        let mut status: GLint = 0;
        unsafe {
            gl::ShaderSource(shader, 1, &ptr, &len);
            gl::CompileShader(shader);
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        }
        status != 0
    }

    fn shader_info_log(&mut self, shader: GLuint) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
        Self::read_log(len, |len, written, buf| unsafe {
            gl::GetShaderInfoLog(shader, len, written, buf)
        })
    }

    fn delete_shader(&mut self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&mut self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn transform_feedback_varyings(&mut self, program: GLuint, varyings: &[&str], mode: FeedbackMode) {
        // Names with interior NULs cannot exist in GLSL, skip them
        let names: Vec<CString> = varyings
            .iter()
            .filter_map(|v| CString::new(*v).ok())
            .collect();
        let ptrs: Vec<*const GLchar> = names.iter().map(|n| n.as_ptr()).collect();
        unsafe {
            gl::TransformFeedbackVaryings(program, ptrs.len() as GLint, ptrs.as_ptr(), mode.gl_enum());
        }
    }

    fn link_program(&mut self, program: GLuint) -> bool {
        let mut status: GLint = 0;
        unsafe {
            gl::LinkProgram(program);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        }
        status != 0
    }

    fn program_info_log(&mut self, program: GLuint) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
        Self::read_log(len, |len, written, buf| unsafe {
            gl::GetProgramInfoLog(program, len, written, buf)
        })
    }

    fn delete_program(&mut self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// In-memory GL that links vertex+fragment pairs or lone compute stages
    #[derive(Default)]
    struct FakeGl {
        next_name: GLuint,
        shaders: HashMap<GLuint, ShaderStage>,
        programs: HashMap<GLuint, Vec<GLuint>>,
        varyings: HashMap<GLuint, Vec<String>>,
        linked: HashSet<GLuint>,
        fail_create_program: bool,
        calls: Vec<&'static str>,
    }

    impl FakeGl {
        fn alloc(&mut self) -> GLuint {
            self.next_name += 1;
            self.next_name
        }
    }

    impl ShaderBackend for FakeGl {
        fn create_shader(&mut self, stage: ShaderStage) -> GLuint {
            let name = self.alloc();
            self.shaders.insert(name, stage);
            name
        }

        fn compile_shader(&mut self, _shader: GLuint, source: &str) -> bool {
            source.contains("void main()")
        }

        fn shader_info_log(&mut self, _shader: GLuint) -> String {
            "0:1: 'main' : function not defined\n".to_string()
        }

        fn delete_shader(&mut self, shader: GLuint) {
            assert!(self.shaders.remove(&shader).is_some(), "double delete");
        }

        fn create_program(&mut self) -> GLuint {
            if self.fail_create_program {
                return 0;
            }
            let name = self.alloc();
            self.programs.insert(name, Vec::new());
            name
        }

        fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
            self.calls.push("attach");
            if let Some(attached) = self.programs.get_mut(&program) {
                attached.push(shader);
            }
        }

        fn transform_feedback_varyings(&mut self, program: GLuint, varyings: &[&str], mode: FeedbackMode) {
            assert_eq!(mode, FeedbackMode::Interleaved);
            self.calls.push("varyings");
            self.varyings
                .insert(program, varyings.iter().map(|v| v.to_string()).collect());
        }

        fn link_program(&mut self, program: GLuint) -> bool {
            self.calls.push("link");
            let stages: Vec<ShaderStage> = self.programs[&program]
                .iter()
                .filter_map(|s| self.shaders.get(s).copied())
                .collect();
            let has = |stage| stages.contains(&stage);
            let ok = (has(ShaderStage::Vertex) && has(ShaderStage::Fragment))
                || stages == [ShaderStage::Compute];
            if ok {
                self.linked.insert(program);
            }
            ok
        }

        fn program_info_log(&mut self, _program: GLuint) -> String {
            "error: no fragment shader attached".to_string()
        }

        fn delete_program(&mut self, program: GLuint) {
            self.programs.remove(&program);
        }
    }

    const VERTEX: &str = "attribute vec4 pos;\nvoid main() { gl_Position = pos; }";
    const FRAGMENT: &str = "precision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }";
    const BROKEN_FRAGMENT: &str = "precision mediump float;\nvoid mian() { gl_FragColor = vec4(1.0); }";
    const COMPUTE: &str = "#version 310 es\nlayout(local_size_x = 4) in;\nvoid main() {}";

    #[test]
    fn test_vertex_fragment_pair_links() {
        let mut gl = FakeGl::default();
        let program = ShaderBuilder::new()
            .vertex(VERTEX)
            .fragment(FRAGMENT)
            .build(&mut gl)
            .unwrap();

        assert_ne!(program, 0);
        assert!(gl.linked.contains(&program));
        assert!(gl.shaders.is_empty(), "stage objects must be deleted");
    }

    #[test]
    fn test_broken_fragment_fails_without_leaking() {
        let mut gl = FakeGl::default();
        let result = ShaderBuilder::new()
            .vertex(VERTEX)
            .fragment(BROKEN_FRAGMENT)
            .build(&mut gl);

        assert!(matches!(result, Err(ShaderError::Link(_))));
        assert!(gl.shaders.is_empty(), "vertex shader leaked");
        assert!(gl.programs.is_empty(), "program leaked");
    }

    #[test]
    fn test_compute_only_program() {
        let mut gl = FakeGl::default();
        let program = ShaderBuilder::new().compute(COMPUTE).build(&mut gl).unwrap();

        assert!(gl.linked.contains(&program));
        assert!(gl.shaders.is_empty());
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let mut gl = FakeGl::default();
        assert_eq!(
            ShaderBuilder::new().build(&mut gl),
            Err(ShaderError::NoStageCompiled)
        );
        assert!(gl.calls.is_empty());
    }

    #[test]
    fn test_every_stage_failing_skips_link() {
        let mut gl = FakeGl::default();
        let result = ShaderBuilder::new()
            .vertex("garbage")
            .fragment(BROKEN_FRAGMENT)
            .build(&mut gl);

        assert_eq!(result, Err(ShaderError::NoStageCompiled));
        assert!(!gl.calls.contains(&"link"));
        assert!(gl.shaders.is_empty());
    }

    #[test]
    fn test_feedback_varyings_declared_before_link() {
        let mut gl = FakeGl::default();
        let program = ShaderBuilder::new()
            .vertex(VERTEX)
            .fragment(FRAGMENT)
            .transform_feedback(&["feedbackPosition"], FeedbackMode::Interleaved)
            .build(&mut gl)
            .unwrap();

        assert_eq!(gl.calls, vec!["attach", "attach", "varyings", "link"]);
        assert_eq!(gl.varyings[&program], vec!["feedbackPosition".to_string()]);
    }

    #[test]
    fn test_program_creation_failure_releases_stages() {
        let mut gl = FakeGl {
            fail_create_program: true,
            ..Default::default()
        };
        let result = ShaderBuilder::new()
            .vertex(VERTEX)
            .fragment(FRAGMENT)
            .build(&mut gl);

        assert_eq!(result, Err(ShaderError::ProgramCreation));
        assert!(gl.shaders.is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ShaderStage::Vertex.name(), "vertex");
        assert_eq!(ShaderStage::Fragment.name(), "fragment");
        assert_eq!(ShaderStage::Compute.name(), "compute");
    }
}
