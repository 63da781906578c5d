pub mod client;
pub mod registry;
pub mod strategies;
pub mod target;

pub use client::{HttpClientBuilder, HyperHttpsClient};
pub use registry::{build_strategy, describe_strategy, selected_strategies, STRATEGY_NAMES};
pub use strategies::{
    BodyEncoding, HyperPooled, ReqwestBlocking, ReqwestPooled, UreqAgent, HYPER_VERSION,
    REQWEST_VERSION, UREQ_VERSION,
};
pub use target::{outcome_from_response, redact_url, TelegramTarget};
