use gles_demos::demos::TransformFeedbackDemo;
use std::process::ExitCode;

fn main() -> ExitCode {
    gles_demos::app_main(TransformFeedbackDemo::info(), TransformFeedbackDemo::new())
}
