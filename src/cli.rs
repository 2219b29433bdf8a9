//! Command-line flags shared by every demo

use crate::config::WindowConfig;
use crate::window::WindowOptions;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(
    about = "OpenGL ES demo on a Wayland/EGL window",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Run in fullscreen mode
    #[arg(short = 'f')]
    pub fullscreen: bool,

    /// Run in maximized mode
    #[arg(short = 'm')]
    pub maximized: bool,

    /// Create an opaque surface
    #[arg(short = 'o')]
    pub opaque: bool,

    /// Don't sync to compositor redraw (eglSwapInterval 0)
    #[arg(short = 'b')]
    pub no_frame_sync: bool,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// This help text
    #[arg(short = 'h', long, action = ArgAction::Help)]
    help: Option<bool>,
}

/// Result of parsing the command line
#[derive(Debug)]
pub enum ParseOutcome {
    Run(Cli),
    /// Print `message` to stderr and exit with `code`
    Exit { code: u8, message: String },
}

impl Cli {
    /// Parses `args` (including the program name). Help exits 0, any other
    /// problem prints usage and exits 1.
    pub fn parse_args<I, T>(args: I) -> ParseOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Cli::try_parse_from(args) {
            Ok(cli) => ParseOutcome::Run(cli),
            Err(e) => {
                let code = match e.kind() {
                    ErrorKind::DisplayHelp => 0,
                    _ => 1,
                };
                ParseOutcome::Exit {
                    code,
                    message: e.render().to_string(),
                }
            }
        }
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    /// Combines the config file's window section with the flags.
    ///
    /// Flags only turn features on; `-b` only turns frame sync off.
    pub fn window_options(&self, config: &WindowConfig) -> WindowOptions {
        WindowOptions {
            fullscreen: config.fullscreen || self.fullscreen,
            maximized: config.maximized || self.maximized,
            opaque: config.opaque || self.opaque,
            frame_sync: config.frame_sync && !self.no_frame_sync,
        }
    }
}
