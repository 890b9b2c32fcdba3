use anyhow::Result;
use data_mesh_util::command_line;
use data_mesh_util::config::MeshConfig;
use data_mesh_util::context::AwsContext;
use data_mesh_util::logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = MeshConfig::from_env()?;
    logging::init_logging(config.log_level)?;

    let ctx = AwsContext::from_config(&config).await;
    info!(region = %ctx.region(), "Data mesh utility ready");

    command_line::run(&ctx, &config).await
}
