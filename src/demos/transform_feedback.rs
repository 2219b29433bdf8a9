//! Points moved by transform feedback
//!
//! Two vertex arrays share the same colours but own separate position
//! buffers. Each frame draws from one and captures the advanced positions
//! into the other, then the roles swap.

use super::{
    attrib_location, build_program_with, create_buffer, create_point_sampler, delete_buffers,
    delete_program, delete_texture, float_attribute, uniform_location, upload_texture,
    SPRITE_SIZE,
};
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::assets;
use crate::renderer::damage::DamageRect;
use crate::shader::{FeedbackMode, ShaderBuilder};
use anyhow::Result;
use gl::types::GLuint;
use rand::Rng;

pub const PARTICLE_COUNT: usize = 50;

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 position;
in vec4 color;
out lowp vec4 vColor;
out vec3 feedbackPosition;
void main()
{
    vec4 newPosition = vec4(position, 1.0);
    newPosition.x += 0.01;
    if (1.0 <= newPosition.x + 0.05) {
        newPosition.x = -1.0;
    }
    feedbackPosition = newPosition.xyz;
    gl_Position = newPosition;
    vColor = color;
    gl_PointSize = 20.0;
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

const FEEDBACK_VARYINGS: [&str; 1] = ["feedbackPosition"];

/// Starting positions and colours of the particles
#[derive(Debug, Clone, PartialEq)]
pub struct Particles {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
}

impl Particles {
    /// Positions spread over x in [-1, 1) and y in [-0.9, 0.9) on the z = 0
    /// plane, opaque random colours
    pub fn random<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let positions = (0..count)
            .map(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-0.9..0.9), 0.0])
            .collect();
        let colors = (0..count)
            .map(|_| [rng.gen(), rng.gen(), rng.gen(), 1.0])
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

/// Which of the two vertex arrays is drawn this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    /// Array drawn from
    pub fn source(&self) -> usize {
        self.current
    }

    /// Array whose position buffer receives the feedback
    pub fn target(&self) -> usize {
        1 - self.current
    }

    pub fn swap(&mut self) {
        self.current = self.target();
    }
}

#[derive(Debug, Default)]
pub struct TransformFeedbackDemo {
    program: GLuint,
    texture: GLuint,
    sampler: GLuint,
    vao: [GLuint; 2],
    /// `[position, color]` per vertex array
    buffers: [[GLuint; 2]; 2],
    ping_pong: PingPong,
}

impl TransformFeedbackDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-transform-feedback1",
            "org.gles_demos.gl-transform-feedback1",
            400,
            400,
        )
    }

    fn init_buffers(&mut self, particles: &Particles, position: GLuint, color: GLuint) {
        unsafe { gl::GenVertexArrays(2, self.vao.as_mut_ptr()) };

        for (vao, buffers) in self.vao.iter().zip(self.buffers.iter_mut()) {
            unsafe { gl::BindVertexArray(*vao) };
            buffers[0] = create_buffer(gl::ARRAY_BUFFER, &particles.positions, gl::STREAM_DRAW);
            float_attribute(position, 3);
            buffers[1] = create_buffer(gl::ARRAY_BUFFER, &particles.colors, gl::STATIC_DRAW);
            float_attribute(color, 4);
            unsafe { gl::BindVertexArray(0) };
        }
    }
}

impl GlApp for TransformFeedbackDemo {
    fn init_gl(&mut self) -> Result<()> {
        self.program = build_program_with(
            ShaderBuilder::new()
                .vertex(VERTEX_SHADER)
                .fragment(FRAGMENT_SHADER)
                .transform_feedback(&FEEDBACK_VARYINGS, FeedbackMode::Interleaved),
        )?;
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

        let particles = Particles::random(&mut rand::thread_rng(), PARTICLE_COUNT);
        self.init_buffers(&particles, position, color);
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        let size = frame.buffer_size;
        let source = self.ping_pong.source();
        let target = self.ping_pong.target();

        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(0.0, 0.0, 0.0, 0.5);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
            gl::UseProgram(self.program);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.texture);
            gl::BindSampler(0, self.sampler);

            gl::BindVertexArray(self.vao[source]);
            gl::BindBufferBase(gl::TRANSFORM_FEEDBACK_BUFFER, 0, self.buffers[target][0]);
            gl::BeginTransformFeedback(gl::POINTS);
            gl::DrawArrays(gl::POINTS, 0, PARTICLE_COUNT as i32);
            gl::EndTransformFeedback();
            gl::BindBufferBase(gl::TRANSFORM_FEEDBACK_BUFFER, 0, 0);
            gl::BindVertexArray(0);
        }

        self.ping_pong.swap();
    }

    fn deinit_gl(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(2, self.vao.as_ptr());
            gl::DeleteSamplers(1, &self.sampler);
        }
        self.vao = [0; 2];
        self.sampler = 0;
        for buffers in &mut self.buffers {
            delete_buffers(buffers);
            *buffers = [0; 2];
        }
        delete_texture(&mut self.texture);
        delete_program(&mut self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_particles_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let particles = Particles::random(&mut rng, 500);

        assert_eq!(particles.len(), 500);
        assert_eq!(particles.colors.len(), 500);
        for [x, y, z] in &particles.positions {
            assert!((-1.0..1.0).contains(x));
            assert!((-0.9..0.9).contains(y));
            assert_eq!(*z, 0.0);
        }
        for [r, g, b, a] in &particles.colors {
            assert!([r, g, b].iter().all(|c| (0.0..1.0).contains(*c)));
            assert_eq!(*a, 1.0);
        }
    }

    #[test]
    fn test_random_particles_are_reproducible_per_seed() {
        let a = Particles::random(&mut StdRng::seed_from_u64(1), 10);
        let b = Particles::random(&mut StdRng::seed_from_u64(1), 10);
        assert_eq!(a, b);
        assert!(Particles::random(&mut StdRng::seed_from_u64(1), 0).is_empty());
    }

    #[test]
    fn test_ping_pong_alternates() {
        let mut pp = PingPong::default();
        assert_eq!((pp.source(), pp.target()), (0, 1));
        pp.swap();
        assert_eq!((pp.source(), pp.target()), (1, 0));
        pp.swap();
        assert_eq!(pp, PingPong::default());
    }

    #[test]
    fn test_info() {
        let info = TransformFeedbackDemo::info();
        assert_eq!(info.name, "gl-transform-feedback1");
        assert_eq!((info.width, info.height), (400, 400));
    }
}
