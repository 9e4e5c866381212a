mod app;
mod vertices;

use std::process::ExitCode;

use learngl_engine::device::GpuInit;
use learngl_engine::logging::{init_logging, LoggingConfig};
use learngl_engine::window::{Runtime, RuntimeConfig};

use app::TrianglesApp;

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let app = TrianglesApp::new(app::SHADER_DIR);
    match Runtime::run(RuntimeConfig::default(), GpuInit::default(), app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
