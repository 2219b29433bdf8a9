//! # gles-demos
//!
//! OpenGL ES demo programs on a shared Wayland/EGL windowing harness.
//!
//! ## Architecture
//!
//! - `shader`: compile and link GLSL programs
//! - `output`: track the compositor's outputs and their scale/transform
//! - `window`: toplevel state and buffer geometry
//! - `display`: Wayland globals, surfaces and input dispatch
//! - `egl`: EGL display, context and window surfaces
//! - `renderer`: per-frame geometry, damage and presentation
//! - `event_loop`: configure wait, GL init, steady-state frame loop
//! - `app`: the [`GlApp`] contract and [`app_main`] entry point
//! - `demos`: the demo programs themselves
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gles_demos::demos::CubeDemo;
//! use std::process::ExitCode;
//!
//! fn main() -> ExitCode {
//!     gles_demos::app_main(CubeDemo::info(), CubeDemo::new())
//! }
//! ```

pub mod app;
pub mod assets;
pub mod cli;
pub mod config;
pub mod demos;
pub mod display;
pub mod egl;
pub mod event_loop;
pub mod logging;
pub mod output;
pub mod renderer;
pub mod shader;
pub mod window;

pub use app::{app_main, AppInfo, FrameInfo, GlApp};
pub use config::HarnessConfig;
pub use output::{OutputId, OutputRegistry, OutputTransform};
pub use renderer::damage::DamageRect;
pub use renderer::FrameDriver;
pub use shader::{ShaderBuilder, ShaderError};
pub use window::{Size, Window, WindowOptions};

pub use anyhow::{Context, Error, Result};
