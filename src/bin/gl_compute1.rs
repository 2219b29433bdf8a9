use gles_demos::demos::ComputeDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(ComputeDemo::info(), ComputeDemo::new())
}
