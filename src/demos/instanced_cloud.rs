//! A thousand point sprites from one instanced draw
//!
//! Position and colour are per-instance attributes (divisor 1) rather than
//! a uniform array, so the instance count is only bounded by buffer size.
//! The frame rate is logged once a second.

use super::{
    attrib_location, build_program, create_buffer, create_point_sampler, delete_buffers,
    delete_program, delete_texture, float_attribute, uniform_location, upload_texture,
    FpsCounter, SPRITE_SIZE,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use anyhow::Result;
use gl::types::GLuint;
use log::info;
use rand::Rng;
use std::time::Instant;

pub const INSTANCE_COUNT: usize = 1000;

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 position;
in vec4 color;
out lowp vec4 vColor;
void main()
{
    gl_Position = vec4(position, 1.0);
    vColor = color;
    gl_PointSize = 10.0;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
in lowp vec4 vColor;
out mediump vec4 fragColor;
uniform mediump sampler2D tex;
void main()
{
    fragColor = texture(tex, gl_PointCoord) * vColor;
}
"#;

/// Per-instance attributes of the cloud
#[derive(Debug, Clone, PartialEq)]
pub struct Cloud {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
}

impl Cloud {
    /// Points anywhere in the clip cube, random colours at least half opaque
    pub fn random<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let mut coordinate = || rng.gen_range(-1000..1000) as f32 / 1000.0;
        let positions = (0..count)
            .map(|_| [coordinate(), coordinate(), coordinate()])
            .collect();
        let colors = (0..count)
            .map(|_| {
                [
                    rng.gen_range(0..1000) as f32 / 1000.0,
                    rng.gen_range(0..1000) as f32 / 1000.0,
                    rng.gen_range(0..1000) as f32 / 1000.0,
                    rng.gen_range(500..1000) as f32 / 1000.0,
                ]
            })
            .collect();
        Self { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug)]
pub struct InstancedCloudDemo {
    program: GLuint,
    texture: GLuint,
    sampler: GLuint,
    vao: GLuint,
    buffers: [GLuint; 2],
    instances: usize,
    fps: FpsCounter,
}

impl Default for InstancedCloudDemo {
    fn default() -> Self {
        Self {
            program: 0,
            texture: 0,
            sampler: 0,
            vao: 0,
            buffers: [0; 2],
            instances: 0,
            fps: FpsCounter::new(),
        }
    }
}

impl InstancedCloudDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-instanced-rendering3",
            "org.gles_demos.gl-instanced-rendering3",
            400,
            400,
        )
    }
}

impl GlApp for InstancedCloudDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.program = build_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let position = attrib_location(self.program, "position")?;
        let color = attrib_location(self.program, "color")?;
        let tex = uniform_location(self.program, "tex")?;

        unsafe {
            gl::UseProgram(self.program);
            gl::Uniform1i(tex, 0);
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        }

        let sprite = assets::circle_sprite(SPRITE_SIZE)?;
        self.texture = upload_texture(&sprite, gl::LINEAR, gl::REPEAT);
        self.sampler = create_point_sampler();

        let cloud = Cloud::random(&mut rand::thread_rng(), INSTANCE_COUNT);
        self.instances = cloud.len();
        unsafe {
            gl::GenVertexArrays(1, &mut self.vao);
            gl::BindVertexArray(self.vao);
        }
        self.buffers[0] = create_buffer(gl::ARRAY_BUFFER, &cloud.positions, gl::STATIC_DRAW);
        float_attribute(position, 3);
        self.buffers[1] = create_buffer(gl::ARRAY_BUFFER, &cloud.colors, gl::STATIC_DRAW);
        float_attribute(color, 4);
        unsafe {
            gl::VertexAttribDivisor(position, 1);
            gl::VertexAttribDivisor(color, 1);
            gl::BindVertexArray(0);
        }

        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let size = frame.buffer_size;
        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
            gl::UseProgram(self.program);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::BindSampler(0, self.sampler);

            gl::BindVertexArray(self.vao);
            gl::DrawArraysInstanced(gl::POINTS, 0, 1, self.instances as i32);
            gl::BindVertexArray(0);
        }

        if let Some(fps) = self.fps.tick(Instant::now()) {
            info!("FPS: {fps:.2}");
        }
    }

    fn deinit_gl(&mut self) {
        unsafe {
            gl::DeleteSamplers(1, &self.sampler);
            gl::DeleteVertexArrays(1, &self.vao);
        }
        self.sampler = 0;
        self.vao = 0;
        delete_buffers(&self.buffers);
        self.buffers = [0; 2];
        delete_texture(&mut self.texture);
        delete_program(&mut self.program);
    }
}
