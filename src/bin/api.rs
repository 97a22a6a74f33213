use std::sync::Arc;

use anyhow::Context;
use lambda_runtime::{LambdaEvent, service_fn};
use pqf_bot::api::{ApiState, function_handler};
use pqf_bot::core::config::AppConfig;
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pqf_bot::setup_logging();

    let config = AppConfig::from_env().context("loading configuration")?;
    let state = Arc::new(ApiState::from_config(config).context("building service clients")?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let state = Arc::clone(&state);
        async move { function_handler(&state, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
