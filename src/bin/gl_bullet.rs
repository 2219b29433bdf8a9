use gles_demos::demos::BulletDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(BulletDemo::info(), BulletDemo::new())
}
