pub mod gpu_query;
pub mod runpod_client;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One GraphQL round trip: POST the request body, hand back the parsed
/// response. Implementations surface transport failures and non-2xx
/// statuses as errors so the caller can fall through to the next query
/// variant.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post_graphql(&self, body: &Value) -> Result<Value>;
}
