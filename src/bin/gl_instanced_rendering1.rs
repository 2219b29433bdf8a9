use gles_demos::demos::InstancedDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(InstancedDemo::info(), InstancedDemo::new())
}
