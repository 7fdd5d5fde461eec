pub mod composer;
pub mod config;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod models;
pub mod normalizer;
pub mod parse;
pub mod registry;
pub mod server;
pub mod service;
pub mod sse;
pub mod telemetry;

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::error::{PaymentRequired, SuggestError};
    pub use crate::models::{ApiConfig, SuggestRequest, SuggestionResult};
    pub use crate::registry::{ProviderId, Protocol};
    pub use crate::{llm, registry, server, service, telemetry};
}
