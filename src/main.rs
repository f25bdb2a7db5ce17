use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use flowtrail::{App, PipelineError, ShaderSet, SimulationParameters, DEFAULT_MAX_ROW_WIDTH};

/// Directory of `.wgsl` files overriding the built-in programs.
const SHADER_DIR_VAR: &str = "FLOWTRAIL_SHADERS";

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("flowtrail starting");
    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), PipelineError> {
    // Optional preset as the first argument
    let preset = match std::env::args_os().nth(1) {
        Some(path) => {
            info!(path = ?path, "loading preset");
            Some(SimulationParameters::load(path)?)
        }
        None => None,
    };

    let shaders = match std::env::var_os(SHADER_DIR_VAR) {
        Some(dir) => ShaderSet::from_dir(dir)?,
        None => ShaderSet::builtin(),
    };

    App::new(preset, shaders, DEFAULT_MAX_ROW_WIDTH).run()
}
