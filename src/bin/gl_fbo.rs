use gles_demos::demos::FboDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(FboDemo::info(), FboDemo::new())
}
