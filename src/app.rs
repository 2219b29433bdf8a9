//! Application contract and process entry
//!
//! Every demo implements [`GlApp`] and hands itself to [`app_main`] together
//! with its [`AppInfo`]. `app_main` parses the command line, sets up logging
//! and configuration, runs the event loop and maps the outcome to an exit
//! status.

use crate::cli::{Cli, ParseOutcome};
use crate::config::HarnessConfig;
use crate::event_loop;
use crate::logging;
use crate::renderer::damage::DamageRect;
use crate::window::Size;
use anyhow::Result;
use log::error;
use std::process::ExitCode;

/// Identity and initial size of a demo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Human readable name, used as the toplevel title
    pub name: String,
    /// Reverse-DNS identifier, used as the toplevel app-id
    pub id: String,
    pub width: i32,
    pub height: i32,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, id: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// What the application gets to know about the frame it draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Pixel size of the back buffer
    pub buffer_size: Size,
    pub scale: i32,
    /// Frames presented before this one
    pub frame: u64,
}

/// Callbacks a demo provides to the harness
pub trait GlApp {
    /// One-time GL setup, called once the window is configured and the EGL
    /// context is current
    fn init_gl(&mut self) -> Result<()>;

    /// Draws one frame. `damage` starts zeroed; leaving it so means the whole
    /// buffer changed.
    fn redraw(&mut self, frame: &FrameInfo, damage: &mut DamageRect);

    /// One-time GL teardown, called before the connection goes away
    fn deinit_gl(&mut self);
}

/// Runs a demo to completion and returns the process exit status
pub fn app_main<A: GlApp>(info: AppInfo, mut app: A) -> ExitCode {
    let cli = match Cli::parse_args(std::env::args_os()) {
        ParseOutcome::Run(cli) => cli,
        ParseOutcome::Exit { code, message } => {
            eprint!("{message}");
            return ExitCode::from(code);
        }
    };

    let config = cli.config_path().map(HarnessConfig::load).transpose();
    let level = match (&config, cli.debug) {
        (_, true) => "debug".to_string(),
        (Ok(Some(config)), false) => config.logging.level.clone(),
        _ => "info".to_string(),
    };
    logging::init_logging(&level);

    let config = match config {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            error!("❌ {e:#}");
            return ExitCode::FAILURE;
        }
    };

    logging::log_startup(&info);
    let options = cli.window_options(&config.window);

    match event_loop::run(&info, options, &config, &mut app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {} failed: {e:#}", info.name);
            ExitCode::FAILURE
        }
    }
}

/// Startup log line summarising the chosen window options
pub(crate) fn describe_options(options: &crate::window::WindowOptions) -> String {
    let mut flags = Vec::new();
    if options.fullscreen {
        flags.push("fullscreen");
    }
    if options.maximized {
        flags.push("maximized");
    }
    if options.opaque {
        flags.push("opaque");
    }
    if !options.frame_sync {
        flags.push("no-frame-sync");
    }
    if flags.is_empty() {
        "windowed".to_string()
    } else {
        flags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowOptions;

    #[test]
    fn test_app_info_size() {
        let info = AppInfo::new("cube", "org.example.cube", 500, 400);
        assert_eq!(info.size(), Size::new(500, 400));
        assert_eq!(info.name, "cube");
    }

    #[test]
    fn test_describe_options() {
        assert_eq!(describe_options(&WindowOptions::default()), "windowed");

        let options = WindowOptions {
            fullscreen: true,
            opaque: true,
            frame_sync: false,
            ..Default::default()
        };
        assert_eq!(describe_options(&options), "fullscreen, opaque, no-frame-sync");
    }
}
