use gles_demos::demos::ComputeBounceDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(ComputeBounceDemo::info(), ComputeBounceDemo::new())
}
