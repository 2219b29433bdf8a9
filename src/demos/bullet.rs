//! Textured quads: a dense bullet pattern drawn straight to the window
//!
//! The live bullet count and the frame rate are drawn in the top right
//! corner with glyphs from the atlas digit strip.

use super::danmaku::{build_atlas, Danmaku, Pattern, SpriteBatch, SpriteRenderer};
use super::FpsCounter;
use crate::app::{AppInfo, FrameInfo, GlApp};
use crate::renderer::damage::DamageRect;
use crate::window::Size;
use anyhow::Result;
use rand::rngs::ThreadRng;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const SCENE_SIZE: Size = Size::new(1280, 960);

#[derive(Debug)]
pub struct BulletDemo {
    image_dir: PathBuf,
    scene: Danmaku,
    batch: SpriteBatch,
    renderer: Option<SpriteRenderer>,
    fps: FpsCounter,
    rng: ThreadRng,
}

impl Default for BulletDemo {
    fn default() -> Self {
        Self::with_image_dir(super::danmaku::DEFAULT_IMAGE_DIR)
    }
}

impl BulletDemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: dir.into(),
            scene: Danmaku::new(SCENE_SIZE, Pattern::DENSE),
            batch: SpriteBatch::new(),
            renderer: None,
            fps: FpsCounter::new(),
            rng: rand::thread_rng(),
        }
    }

    pub fn info() -> AppInfo {
        AppInfo::new(
            "gl-bullet",
            "org.gles_demos.gl-bullet",
            SCENE_SIZE.width,
            SCENE_SIZE.height,
        )
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Scene quads followed by the bullet count and frame rate overlays
    pub fn fill_batch(&mut self) {
        self.batch.clear();
        self.scene.fill_batch(&mut self.batch);

        let right = SCENE_SIZE.width;
        let top = SCENE_SIZE.height;
        let count = u32::try_from(self.scene.bullets().len()).unwrap_or(u32::MAX);
        self.batch.push_number(count, right, top - 32);
        self.batch.push_rate(self.fps.fps(), right, top - 16);
    }

    pub fn batch(&self) -> &SpriteBatch {
        &self.batch
    }
}

impl GlApp for BulletDemo {
    fn init_gl(&mut self) -> Result<()> {
        let atlas = build_atlas(&self.image_dir)?;
        self.renderer = Some(SpriteRenderer::new(&atlas)?);
        unsafe {
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        }
        Ok(())
    }

    fn redraw(&mut self, frame: &FrameInfo, _damage: &mut DamageRect) {
        self.scene.step(&mut self.rng);
        self.fps.tick(Instant::now());
        self.fill_batch();

        let size = frame.buffer_size;
        unsafe {
            gl::Viewport(0, 0, size.width, size.height);
            gl::ClearColor(1.0, 1.0, 1.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
        if let Some(renderer) = &self.renderer {
            renderer.draw(&self.batch, SCENE_SIZE);
        }
    }

    fn deinit_gl(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.delete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlays_follow_scene_quads() {
        let mut demo = BulletDemo::new();
        demo.fill_batch();

        // background, player, enemy, count "0", then "0.0"
        assert_eq!(demo.batch().vertex_count(), (3 + 1 + 3) * 6);
        let count_glyph = demo.batch().positions()[3 * 6];
        assert_eq!(count_glyph, [1272, 944]);
    }

    #[test]
    fn test_info_and_defaults() {
        let info = BulletDemo::info();
        assert_eq!(info.name, "gl-bullet");
        assert_eq!(info.size(), SCENE_SIZE);
        assert_eq!(BulletDemo::new().image_dir(), Path::new("images"));
    }
}
