use gles_demos::demos::InstancedCloudDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(InstancedCloudDemo::info(), InstancedCloudDemo::new())
}
