use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use threadline_app::tether::Tether;
use threadline_common::observability::{LogConfig, LogFormat, init_logging};
use threadline_config::ThreadlineConfigLoader;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "threadline", version, about = "Shared-chat extraction and grounded chat service")]
struct Args {
    /// YAML configuration file; skipped when absent.
    #[arg(long, env = "THREADLINE_CONFIG", default_value = "threadline.yaml")]
    config: PathBuf,

    /// Listen address, overriding `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Env wins over the file.
    let mut cfg = ThreadlineConfigLoader::new()
        .with_optional_file(&args.config)
        .load()?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }

    let log_path = init_logging(LogConfig {
        log_dir: cfg.log.dir.clone(),
        format: if cfg.log.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        default_filter: cfg.log.level.clone(),
        ..LogConfig::default()
    })?;
    info!(log_file = %log_path.display(), config = %args.config.display(), "threadline starting");

    Tether::build(&cfg)?.run().await
}
