//! Demo programs built on the harness
//!
//! Each submodule is one [`GlApp`](crate::app::GlApp). This module holds the
//! pieces they share: cube geometry, matrices and thin wrappers over the raw
//! `gl` calls for buffers, textures and attribute lookup.

pub mod bullet;
pub mod compute;
pub mod compute_bounce;
pub mod compute_fbo;
pub mod cube;
pub mod danmaku;
pub mod fbo;
pub mod instanced;
pub mod instanced_cloud;
pub mod tex_cube;
pub mod transform_feedback;

pub use bullet::BulletDemo;
pub use compute::ComputeDemo;
pub use compute_bounce::ComputeBounceDemo;
pub use compute_fbo::ComputeFboDemo;
pub use cube::CubeDemo;
pub use fbo::FboDemo;
pub use instanced::InstancedDemo;
pub use instanced_cloud::InstancedCloudDemo;
pub use tex_cube::TexCubeDemo;
pub use transform_feedback::TransformFeedbackDemo;

use crate::shader::{GlesShaderBackend, ShaderBuilder};
use crate::window::Size;
use anyhow::{bail, Context, Result};
use bytemuck::Pod;
use cgmath::{perspective, Deg, Matrix4, Vector3};
use gl::types::{GLenum, GLint, GLsizeiptr, GLuint};
use std::ffi::CString;
use std::time::{Duration, Instant};
use tiny_skia::Pixmap;

/// Side length of the procedural point sprite
pub const SPRITE_SIZE: u32 = 256;

/// Cube corners, four per face, faces in the order front, back, top,
/// bottom, right, left
#[rustfmt::skip]
pub const CUBE_POSITIONS: [[f32; 3]; 24] = [
    [-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5],
    [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5, -0.5, -0.5],
    [-0.5,  0.5, -0.5], [-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5],
    [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5],
    [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5], [ 0.5, -0.5,  0.5],
    [-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5],
];

/// Two triangles per face, counter-clockwise from outside
#[rustfmt::skip]
pub const CUBE_INDICES: [u16; 36] = [
     0,  1,  2,   0,  2,  3,
     4,  5,  6,   4,  6,  7,
     8,  9, 10,   8, 10, 11,
    12, 13, 14,  12, 14, 15,
    16, 17, 18,  16, 18, 19,
    20, 21, 22,  20, 22, 23,
];

/// Degrees added per frame around the x and y axes
pub const SPIN_STEP: (f32, f32) = (0.5, 0.3);

/// Rotation angles of a spinning cube
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CubeSpin {
    pub x: f32,
    pub y: f32,
}

impl CubeSpin {
    /// Steps both angles, wrapping at 360°
    pub fn advance(&mut self) {
        self.x = wrap_degrees(self.x + SPIN_STEP.0);
        self.y = wrap_degrees(self.y + SPIN_STEP.1);
    }

    /// Model matrix: pushed 5 units into the screen, then rotated
    pub fn model(&self) -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0))
            * Matrix4::from_angle_x(Deg(self.x))
            * Matrix4::from_angle_y(Deg(self.y))
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    if angle >= 360.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// 45° perspective for a buffer of the given pixel size
pub fn projection(width: i32, height: i32) -> Matrix4<f32> {
    let aspect = if height > 0 {
        width as f32 / height as f32
    } else {
        1.0
    };
    perspective(Deg(45.0), aspect, 0.1, 100.0)
}

/// Builds a vertex+fragment program
pub fn build_program(vertex: &str, fragment: &str) -> Result<GLuint> {
    build_program_with(ShaderBuilder::new().vertex(vertex).fragment(fragment))
}

pub fn build_program_with(builder: ShaderBuilder<'_>) -> Result<GLuint> {
    builder
        .build(&mut GlesShaderBackend)
        .context("Failed to build shader program")
}

pub fn attrib_location(program: GLuint, name: &str) -> Result<GLuint> {
    let cname = CString::new(name)?;
    let location = unsafe { gl::GetAttribLocation(program, cname.as_ptr()) };
    u32::try_from(location).with_context(|| format!("Attribute {name} not found"))
}

pub fn uniform_location(program: GLuint, name: &str) -> Result<GLint> {
    let cname = CString::new(name)?;
    let location = unsafe { gl::GetUniformLocation(program, cname.as_ptr()) };
    if location < 0 {
        anyhow::bail!("Uniform {name} not found");
    }
    Ok(location)
}

/// Creates a buffer bound to `target` and fills it with `data`
pub fn create_buffer<T: Pod>(target: GLenum, data: &[T], usage: GLenum) -> GLuint {
    let mut buffer = 0;
    unsafe {
        gl::GenBuffers(1, &mut buffer);
        gl::BindBuffer(target, buffer);
    }
    buffer_data(target, data, usage);
    buffer
}

/// Shader storage buffer filled with `data` and attached to `binding`
pub fn storage_buffer<T: Pod>(data: &[T], binding: GLuint) -> GLuint {
    let buffer = create_buffer(gl::SHADER_STORAGE_BUFFER, data, gl::STATIC_DRAW);
    unsafe { gl::BindBufferBase(gl::SHADER_STORAGE_BUFFER, binding, buffer) };
    buffer
}

/// Replaces the contents of the buffer bound to `target`
pub fn buffer_data<T: Pod>(target: GLenum, data: &[T], usage: GLenum) {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    unsafe {
        gl::BufferData(
            target,
            bytes.len() as GLsizeiptr,
            bytes.as_ptr().cast(),
            usage,
        );
    }
}

/// Enables a float attribute of `components` values read from the buffer
/// currently bound to `ARRAY_BUFFER`
pub fn float_attribute(location: GLuint, components: GLint) {
    unsafe {
        gl::VertexAttribPointer(
            location,
            components,
            gl::FLOAT,
            gl::FALSE,
            0,
            std::ptr::null(),
        );
        gl::EnableVertexAttribArray(location);
    }
}

/// Uploads a pixmap as an RGBA texture and leaves it bound to `TEXTURE_2D`
pub fn upload_texture(pixmap: &Pixmap, filter: GLenum, wrap: GLenum) -> GLuint {
    let mut texture = 0;
    unsafe {
        gl::GenTextures(1, &mut texture);
        gl::BindTexture(gl::TEXTURE_2D, texture);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap as GLint);
        gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA as GLint,
            pixmap.width() as GLint,
            pixmap.height() as GLint,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            pixmap.data().as_ptr().cast(),
        );
    }
    texture
}

/// Sampler with linear filtering and repeat wrapping, used for point sprites
pub fn create_point_sampler() -> GLuint {
    let mut sampler = 0;
    unsafe {
        gl::GenSamplers(1, &mut sampler);
        gl::SamplerParameteri(sampler, gl::TEXTURE_WRAP_S, gl::REPEAT as GLint);
        gl::SamplerParameteri(sampler, gl::TEXTURE_WRAP_T, gl::REPEAT as GLint);
        gl::SamplerParameteri(sampler, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
        gl::SamplerParameteri(sampler, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
    }
    sampler
}

/// Replaces the image of an existing texture, leaving it bound
pub fn replace_texture(texture: GLuint, pixmap: &Pixmap) {
    unsafe {
        gl::BindTexture(gl::TEXTURE_2D, texture);
        gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA as GLint,
            pixmap.width() as GLint,
            pixmap.height() as GLint,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            pixmap.data().as_ptr().cast(),
        );
    }
}

/// Clip-space quad covering `[-extent, extent]` on both axes, as a triangle
/// strip with texture coordinates
pub fn screen_quad(extent: f32) -> ([[f32; 2]; 4], [[f32; 2]; 4]) {
    (
        [
            [-extent, -extent],
            [extent, -extent],
            [-extent, extent],
            [extent, extent],
        ],
        [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
    )
}

/// GLES-only enum (0x8CD9) absent from the desktop `gl` bindings
const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: GLenum = 0x8CD9;

fn framebuffer_status_name(status: GLenum) -> &'static str {
    match status {
        gl::FRAMEBUFFER_COMPLETE => "complete",
        gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "incomplete attachment",
        gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "missing attachment",
        FRAMEBUFFER_INCOMPLETE_DIMENSIONS => "incomplete dimensions",
        gl::FRAMEBUFFER_UNSUPPORTED => "unsupported",
        gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "incomplete multisample",
        _ => "unknown status",
    }
}

/// Framebuffer object with an RGBA colour texture and a depth renderbuffer
#[derive(Debug, Default)]
pub struct Offscreen {
    framebuffer: GLuint,
    depth: GLuint,
    texture: GLuint,
    size: Size,
}

impl Offscreen {
    pub fn new(size: Size) -> Result<Self> {
        if size.is_empty() {
            bail!("Offscreen target needs a positive size, got {size}");
        }

        let mut target = Self {
            size,
            ..Self::default()
        };
        let status = unsafe {
            gl::GenTextures(1, &mut target.texture);
            gl::BindTexture(gl::TEXTURE_2D, target.texture);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA as GLint,
                size.width,
                size.height,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                std::ptr::null(),
            );
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::BindTexture(gl::TEXTURE_2D, 0);

            gl::GenFramebuffers(1, &mut target.framebuffer);
            gl::BindFramebuffer(gl::FRAMEBUFFER, target.framebuffer);
            gl::GenRenderbuffers(1, &mut target.depth);
            gl::BindRenderbuffer(gl::RENDERBUFFER, target.depth);
            gl::RenderbufferStorage(
                gl::RENDERBUFFER,
                gl::DEPTH_COMPONENT24,
                size.width,
                size.height,
            );
            gl::FramebufferRenderbuffer(
                gl::FRAMEBUFFER,
                gl::DEPTH_ATTACHMENT,
                gl::RENDERBUFFER,
                target.depth,
            );
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                target.texture,
                0,
            );
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindRenderbuffer(gl::RENDERBUFFER, 0);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            status
        };

        if status != gl::FRAMEBUFFER_COMPLETE {
            target.delete();
            bail!(
                "Offscreen framebuffer {}x{} is {} (0x{status:x})",
                size.width,
                size.height,
                framebuffer_status_name(status)
            );
        }
        Ok(target)
    }

    /// Directs drawing into the texture and sets the viewport to cover it
    pub fn bind(&self) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.framebuffer);
            gl::Viewport(0, 0, self.size.width, self.size.height);
        }
    }

    /// Back to the window surface
    pub fn unbind(&self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, 0) };
    }

    pub fn texture(&self) -> GLuint {
        self.texture
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn delete(&mut self) {
        unsafe {
            if self.framebuffer != 0 {
                gl::DeleteFramebuffers(1, &self.framebuffer);
            }
            if self.depth != 0 {
                gl::DeleteRenderbuffers(1, &self.depth);
            }
        }
        self.framebuffer = 0;
        self.depth = 0;
        delete_texture(&mut self.texture);
    }
}

/// Frames per second, recomputed once at least a second has passed
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frames: u32,
    window_start: Option<Instant>,
    fps: f32,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a frame drawn at `now`. Returns the new rate when a one-second
    /// window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        if elapsed < Self::WINDOW {
            return None;
        }
        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = Some(now);
        Some(self.fps)
    }

    /// Last computed rate, zero until the first window closes
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

pub fn delete_buffers(buffers: &[GLuint]) {
    if !buffers.is_empty() {
        unsafe { gl::DeleteBuffers(buffers.len() as i32, buffers.as_ptr()) };
    }
}

pub fn delete_program(program: &mut GLuint) {
    if *program != 0 {
        unsafe { gl::DeleteProgram(*program) };
        *program = 0;
    }
}

pub fn delete_texture(texture: &mut GLuint) {
    if *texture != 0 {
        unsafe { gl::DeleteTextures(1, texture) };
        *texture = 0;
    }
}
