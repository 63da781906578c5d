use std::sync::Arc;

use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::http::client::HttpClientBuilder;
use crate::http::strategies::{BodyEncoding, HyperPooled, ReqwestBlocking, ReqwestPooled, UreqAgent};
use crate::http::target::TelegramTarget;
use crate::strategy::{ClientStrategy, ExecutionModel};

/// Every strategy name [`build_strategy`] accepts, in default run order.
pub const STRATEGY_NAMES: &[&str] = &["reqwest", "reqwest-json", "hyper", "reqwest-blocking", "ureq"];

/// Execution model and one-line description of a known strategy.
pub fn describe_strategy(name: &str) -> Option<(ExecutionModel, &'static str)> {
    match name {
        "reqwest" => Some((
            ExecutionModel::Suspending,
            "async reqwest, pooled client per run, form body",
        )),
        "reqwest-json" => Some((
            ExecutionModel::Suspending,
            "async reqwest, pooled client per run, JSON body",
        )),
        "hyper" => Some((
            ExecutionModel::Suspending,
            "hyper-util pooled client per run, JSON body",
        )),
        "reqwest-blocking" => Some((
            ExecutionModel::Blocking,
            "blocking reqwest, new client per request, form body",
        )),
        "ureq" => Some((
            ExecutionModel::Blocking,
            "ureq agent with keep-alive pool, form body",
        )),
        _ => None,
    }
}

/// Connection settings derived from the configuration.
pub fn client_builder(config: &BenchConfig) -> HttpClientBuilder {
    HttpClientBuilder::new()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .pool_max_idle_per_host(config.max_concurrent_requests)
}

/// Construct the named strategy against the configured target.
pub fn build_strategy(name: &str, config: &BenchConfig) -> Result<ClientStrategy, BenchError> {
    let target = Arc::new(TelegramTarget::new(
        &config.api_url_template,
        &config.bot_token,
        config.chat_id.clone(),
    ));
    let builder = client_builder(config);

    let strategy = match name {
        "reqwest" => ClientStrategy::suspending(ReqwestPooled::new(
            "reqwest",
            target,
            builder,
            BodyEncoding::Form,
        )),
        "reqwest-json" => ClientStrategy::suspending(ReqwestPooled::new(
            "reqwest-json",
            target,
            builder,
            BodyEncoding::Json,
        )),
        "hyper" => ClientStrategy::suspending(HyperPooled::new("hyper", target, builder)),
        "reqwest-blocking" => {
            ClientStrategy::blocking(ReqwestBlocking::new("reqwest-blocking", target, builder))
        }
        "ureq" => ClientStrategy::blocking(UreqAgent::new("ureq", target, &builder)),
        other => return Err(BenchError::UnknownStrategy(other.to_string())),
    };
    Ok(strategy)
}

/// The strategies to run: the configured selection, or all of them.
pub fn selected_strategies(config: &BenchConfig) -> Vec<&str> {
    if config.strategies.is_empty() {
        STRATEGY_NAMES.to_vec()
    } else {
        config.strategies.iter().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
