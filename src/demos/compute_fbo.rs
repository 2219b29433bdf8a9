//! A million compute-driven balls drawn offscreen, then copied to the window
//!
//! The compute pass is the bounce shader from
//! [`compute_bounce`](super::compute_bounce) with larger work groups. Balls
//! are shaded discs rendered into an offscreen texture, which a full-window
//! quad then shows. The frame number is drawn into a small label texture in
//! the top right corner every frame.

use super::compute_bounce::{bounce_shader, random_balls};
use super::{
    build_program, build_program_with, create_buffer, delete_buffers, delete_program,
    delete_texture, float_attribute, replace_texture, screen_quad, storage_buffer, Offscreen,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use crate::shader::ShaderBuilder;
use crate::window::Size;
use anyhow::{Context, Result};
use gl::types::{GLint, GLuint};
use log::warn;

pub const SCENE_SIZE: Size = Size::new(1920, 1080);
pub const BALL_COUNT: usize = 1_000_000;
pub const WORKGROUP_SIZE: usize = 32;
pub const BOUNCE_LIMIT: f32 = 0.985;
/// Side of the frame counter label texture
pub const LABEL_SIZE: u32 = 64;

const _: () = assert!(BALL_COUNT % WORKGROUP_SIZE == 0);

const BALL_POSITION_LOCATION: GLuint = 0;
const BALL_COLOR_LOCATION: GLuint = 1;
const QUAD_POSITION_LOCATION: GLuint = 2;
const QUAD_TEXCOORD_LOCATION: GLuint = 3;
const SRC_TEX_LOCATION: GLint = 4;
const POSITION_BINDING: GLuint = 1;
const BALL_BINDING: GLuint = 2;

const BALL_VERTEX_SHADER: &str = r#"#version 310 es
layout (location=0) in vec4 position;
layout (location=1) in vec4 color;
out vec4 vColor;
void main()
{
    gl_Position = position;
    gl_PointSize = 10.0;
    vColor = color;
}
"#;

const BALL_FRAGMENT_SHADER: &str = r#"#version 310 es
out mediump vec4 fragColor;
in mediump vec4 vColor;
void main()
{
    mediump vec3 n;
    n.xy = gl_PointCoord * 2.0 - 1.0;
    n.z = 1.0 - dot(n.xy, n.xy);
    if (n.z < 0.0) discard;
    fragColor = vColor * n.z;
}
"#;

const QUAD_VERTEX_SHADER: &str = r#"#version 310 es
layout (location=2) in vec2 position;
layout (location=3) in vec2 texcoord;
out vec2 vTexcoord;
void main()
{
    gl_Position = vec4(position.xy, 0.0, 1.0);
    vTexcoord = texcoord;
}
"#;

const QUAD_FRAGMENT_SHADER: &str = r#"#version 310 es
out mediump vec4 fragColor;
in mediump vec2 vTexcoord;
layout (location=4) uniform sampler2D srcTex;
void main()
{
    fragColor = texture(srcTex, vTexcoord);
}
"#;

/// Strip covering the top right tenth of the window; the label image's top
/// row lands on the window's top edge
pub fn label_quad() -> ([[f32; 2]; 4], [[f32; 2]; 4]) {
    (
        [[0.8, 0.8], [1.0, 0.8], [0.8, 1.0], [1.0, 1.0]],
        [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
    )
}

/// Vertex array with a position and a texcoord buffer, both two floats
fn quad_array(positions: &[[f32; 2]], texcoords: &[[f32; 2]]) -> (GLuint, [GLuint; 2]) {
    let mut vao = 0;
    unsafe {
        gl::GenVertexArrays(1, &mut vao);
        gl::BindVertexArray(vao);
    }
    let position = create_buffer(gl::ARRAY_BUFFER, positions, gl::STATIC_DRAW);
    float_attribute(QUAD_POSITION_LOCATION, 2);
    let texcoord = create_buffer(gl::ARRAY_BUFFER, texcoords, gl::STATIC_DRAW);
    float_attribute(QUAD_TEXCOORD_LOCATION, 2);
    unsafe { gl::BindVertexArray(0) };
    (vao, [position, texcoord])
}

#[derive(Debug, Default)]
pub struct ComputeFboDemo {
    ball_program: GLuint,
    quad_program: GLuint,
    compute_program: GLuint,
    offscreen: Option<Offscreen>,
    label_texture: GLuint,
    /// Balls, full-window quad, label quad
    vaos: [GLuint; 3],
    buffers: Vec<GLuint>,
    frames: u64,
}

impl ComputeFboDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-compute3",
            "org.gles_demos.gl-compute3",
            SCENE_SIZE.width,
            SCENE_SIZE.height,
        )
    }

    fn init_balls(&mut self) {
        let (balls, colors) = random_balls(&mut rand::thread_rng(), BALL_COUNT);
        let positions = storage_buffer(&vec![[0.0f32; 4]; BALL_COUNT], POSITION_BINDING);
        let state = storage_buffer(&balls, BALL_BINDING);

        unsafe {
            gl::GenVertexArrays(1, &mut self.vaos[0]);
            gl::BindVertexArray(self.vaos[0]);
            gl::BindBuffer(gl::ARRAY_BUFFER, positions);
        }
        float_attribute(BALL_POSITION_LOCATION, 4);
        let color = create_buffer(gl::ARRAY_BUFFER, &colors, gl::STATIC_DRAW);
        float_attribute(BALL_COLOR_LOCATION, 4);
        unsafe { gl::BindVertexArray(0) };

        self.buffers.extend([positions, state, color]);
    }

    fn draw_quad(&self, vao: GLuint, texture: GLuint) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::BindVertexArray(vao);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);
            gl::BindVertexArray(0);
        }
    }
}

impl GlApp for ComputeFboDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.ball_program = build_program(BALL_VERTEX_SHADER, BALL_FRAGMENT_SHADER)?;
        self.quad_program = build_program(QUAD_VERTEX_SHADER, QUAD_FRAGMENT_SHADER)?;
        let compute = bounce_shader(WORKGROUP_SIZE, BOUNCE_LIMIT);
        self.compute_program = build_program_with(ShaderBuilder::new().compute(&compute))?;

        self.offscreen =
            Some(Offscreen::new(SCENE_SIZE).context("Failed to create the ball framebuffer")?);
        let label = assets::number_label(0, LABEL_SIZE, LABEL_SIZE)?;
        self.label_texture = super::upload_texture(&label, gl::LINEAR, gl::CLAMP_TO_EDGE);

        self.init_balls();

        let (positions, texcoords) = screen_quad(1.0);
        let (vao, buffers) = quad_array(&positions, &texcoords);
        self.vaos[1] = vao;
        self.buffers.extend(buffers);

        let (positions, texcoords) = label_quad();
        let (vao, buffers) = quad_array(&positions, &texcoords);
        self.vaos[2] = vao;
        self.buffers.extend(buffers);

        unsafe {
            gl::UseProgram(self.quad_program);
            gl::Uniform1i(SRC_TEX_LOCATION, 0);
        }
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let Some(offscreen) = &self.offscreen else {
            return;
        };

        unsafe {
            gl::UseProgram(self.compute_program);
            gl::DispatchCompute((BALL_COUNT / WORKGROUP_SIZE) as u32, 1, 1);
            gl::MemoryBarrier(gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT);
        }

        offscreen.bind();
        unsafe {
            gl::UseProgram(self.ball_program);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::BindVertexArray(self.vaos[0]);
            gl::DrawArrays(gl::POINTS, 0, BALL_COUNT as i32);
            gl::BindVertexArray(0);
        }
        offscreen.unbind();

        let size = frame.buffer_size;
        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::UseProgram(self.quad_program);
            gl::Disable(gl::BLEND);
            gl::ClearColor(0.0, 0.0, 0.0, 0.0);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
            gl::ActiveTexture(gl::TEXTURE0);
        }
        self.draw_quad(self.vaos[1], offscreen.texture());

        self.frames += 1;
        match assets::number_label(self.frames, LABEL_SIZE, LABEL_SIZE) {
            Ok(label) => replace_texture(self.label_texture, &label),
            Err(e) => warn!("frame label: {e:#}"),
        }
        self.draw_quad(self.vaos[2], self.label_texture);
    }

    fn deinit_gl(&mut self) {
        unsafe { gl::DeleteVertexArrays(self.vaos.len() as i32, self.vaos.as_ptr()) };
        self.vaos = [0; 3];
        delete_buffers(&self.buffers);
        self.buffers.clear();
        if let Some(mut offscreen) = self.offscreen.take() {
            offscreen.delete();
        }
        delete_texture(&mut self.label_texture);
        delete_program(&mut self.ball_program);
        delete_program(&mut self.quad_program);
        delete_program(&mut self.compute_program);
    }
}
