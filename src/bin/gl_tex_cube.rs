use gles_demos::demos::TexCubeDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(TexCubeDemo::info(), TexCubeDemo::new())
}
