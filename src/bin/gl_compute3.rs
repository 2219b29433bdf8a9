use gles_demos::demos::ComputeFboDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(ComputeFboDemo::info(), ComputeFboDemo::new())
}
