//! Balls bouncing inside the window, moved by a compute shader
//!
//! Ball state lives in one shader storage buffer and never leaves the GPU.
//! Each frame the compute pass advances and reflects every ball and writes
//! its clip-space position into a second buffer that the render pass reads
//! as a vertex attribute.

use super::{
    build_program, build_program_with, create_buffer, delete_buffers, delete_program,
    delete_texture, float_attribute, storage_buffer, upload_texture, SPRITE_SIZE,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use crate::shader::ShaderBuilder;
use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use gl::types::{GLint, GLuint};
use rand::Rng;
use std::f32::consts::PI;

pub const BALL_COUNT: usize = 100;
pub const WORKGROUP_SIZE: usize = 4;

const _: () = assert!(BALL_COUNT % WORKGROUP_SIZE == 0);

/// Balls turn around this far from the window edge, in clip space
pub const BOUNCE_LIMIT: f32 = 0.97;

const POSITION_LOCATION: GLuint = 0;
const COLOR_LOCATION: GLuint = 1;
const SRC_TEX_LOCATION: GLint = 2;
const POSITION_BINDING: GLuint = 1;
const BALL_BINDING: GLuint = 2;

const VERTEX_SHADER: &str = r#"#version 310 es
layout (location=0) in vec4 position;
layout (location=1) in vec4 color;
out vec4 vColor;
void main()
{
    gl_Position = position;
    gl_PointSize = 20.0;
    vColor = color;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 310 es
out mediump vec4 fragColor;
in mediump vec4 vColor;
layout (location=2) uniform mediump sampler2D srcTex;
void main()
{
    fragColor = texture(srcTex, gl_PointCoord) * vColor;
}
"#;

/// Compute pass shared with the offscreen variant; `{local_size}` and
/// `{limit}` are filled in by [`bounce_shader`]
const BOUNCE_SHADER_TEMPLATE: &str = r#"#version 310 es
struct Ball {
    vec2 p;
    vec2 v;
};
layout(std140, binding=1) buffer vertex {
    vec4 pos[];
};
layout(std140, binding=2) buffer balls {
    Ball b[];
};
layout(local_size_x = {local_size}) in;
void main()
{
    float th = {limit};
    uint i = gl_GlobalInvocationID.x;
    b[i].p += b[i].v;
    if (b[i].p.x < -th) {
        b[i].p.x = -th;
        b[i].v.x = -b[i].v.x;
    }
    if (b[i].p.x > th) {
        b[i].p.x = th;
        b[i].v.x = -b[i].v.x;
    }
    if (b[i].p.y < -th) {
        b[i].p.y = -th;
        b[i].v.y = -b[i].v.y;
    }
    if (b[i].p.y > th) {
        b[i].p.y = th;
        b[i].v.y = -b[i].v.y;
    }
    pos[i] = vec4(b[i].p.xy, 0.0, 1.0);
}
"#;

/// Bounce compute shader for the given work group size and edge limit
pub fn bounce_shader(local_size: usize, limit: f32) -> String {
    BOUNCE_SHADER_TEMPLATE
        .replace("{local_size}", &local_size.to_string())
        .replace("{limit}", &format!("{limit:?}"))
}

/// One ball as the compute shader sees it (std140 `vec2 p; vec2 v;`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Ball {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl Ball {
    /// CPU rendition of one compute step, used to check the shader's rules
    pub fn step(&mut self, limit: f32) {
        for axis in 0..2 {
            self.position[axis] += self.velocity[axis];
            if self.position[axis] < -limit {
                self.position[axis] = -limit;
                self.velocity[axis] = -self.velocity[axis];
            }
            if self.position[axis] > limit {
                self.position[axis] = limit;
                self.velocity[axis] = -self.velocity[axis];
            }
        }
    }
}

/// Opaque primary and secondary colours plus white
pub const PALETTE: [[f32; 4]; 7] = [
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
    [0.0, 1.0, 1.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [1.0, 1.0, 0.0, 1.0],
];

/// Balls anywhere in clip space, speed 0.01 to 0.03 per frame in a whole
/// degree direction, each with a palette colour
pub fn random_balls<R: Rng + ?Sized>(rng: &mut R, count: usize) -> (Vec<Ball>, Vec<[f32; 4]>) {
    (0..count)
        .map(|_| {
            let x = rng.gen_range(0..1000) as f32 / 500.0 - 1.0;
            let y = rng.gen_range(0..1000) as f32 / 500.0 - 1.0;
            let speed = rng.gen_range(0..200) as f32 / 10_000.0 + 0.01;
            let angle = rng.gen_range(0..360) as f32 / 180.0 * PI;
            let ball = Ball {
                position: [x, y],
                velocity: [speed * angle.cos(), speed * angle.sin()],
            };
            (ball, PALETTE[rng.gen_range(0..PALETTE.len())])
        })
        .unzip()
}

#[derive(Debug, Default)]
pub struct ComputeBounceDemo {
    render_program: GLuint,
    compute_program: GLuint,
    texture: GLuint,
    position_ssbo: GLuint,
    ball_ssbo: GLuint,
    color_buffer: GLuint,
}

impl ComputeBounceDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new("gl-compute2", "org.gles_demos.gl-compute2", 500, 500)
    }
}

impl GlApp for ComputeBounceDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.render_program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let compute = bounce_shader(WORKGROUP_SIZE, BOUNCE_LIMIT);
        self.compute_program = build_program_with(ShaderBuilder::new().compute(&compute))?;

        let sprite = assets::circle_sprite(SPRITE_SIZE)?;
        self.texture = upload_texture(&sprite, gl::LINEAR, gl::CLAMP_TO_EDGE);

        let (balls, colors) = random_balls(&mut rand::thread_rng(), BALL_COUNT);
        self.position_ssbo = storage_buffer(&vec![[0.0f32; 4]; BALL_COUNT], POSITION_BINDING);
        self.ball_ssbo = storage_buffer(&balls, BALL_BINDING);

        unsafe {
            gl::UseProgram(self.render_program);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::Uniform1i(SRC_TEX_LOCATION, 0);

            gl::BindBuffer(gl::ARRAY_BUFFER, self.position_ssbo);
        }
        float_attribute(POSITION_LOCATION, 4);
        self.color_buffer = create_buffer(gl::ARRAY_BUFFER, &colors, gl::STATIC_DRAW);
        float_attribute(COLOR_LOCATION, 4);

        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let size = frame.buffer_size;
        unsafe {
            gl::UseProgram(self.compute_program);
            gl::DispatchCompute((BALL_COUNT / WORKGROUP_SIZE) as u32, 1, 1);
            gl::MemoryBarrier(gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT);

            gl::UseProgram(self.render_program);
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::DrawArrays(gl::POINTS, 0, BALL_COUNT as i32);
        }
    }

    fn deinit_gl(&mut self) {
        delete_buffers(&[self.position_ssbo, self.ball_ssbo, self.color_buffer]);
        self.position_ssbo = 0;
        self.ball_ssbo = 0;
        self.color_buffer = 0;
        delete_program(&mut self.render_program);
        delete_program(&mut self.compute_program);
        delete_texture(&mut self.texture);
    }
}
