use gles_demos::demos::CubeDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(CubeDemo::info(), CubeDemo::new())
}
