use std::env;
use std::path::PathBuf;

use medallion_pipeline::config::Config;
use medallion_pipeline::orchestrator::run_pipeline;

fn usage_error() -> ! {
    println!("Usage:");
    println!("  medallion-pipeline [CONFIG_PATH]");
    std::process::exit(1);
}

pub fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        usage_error();
    }

    let config_path = PathBuf::from(&args[1]);

    let result = Config::load(&config_path)
        .map_err(medallion_pipeline::error::PipelineError::from)
        .and_then(|config| run_pipeline(&config));

    if let Err(e) = result {
        tracing::error!(error = %e, "pipeline run failed");
        std::process::exit(1);
    }
}
