use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::WatchError;
use crate::market::MarketScope;
use crate::runpod::GraphqlTransport;

const GPU_QUERY_NEW: &str = r#"query GpuAvailability($gpuTypeId: String!, $lp: GpuLowestPriceInput!) {
  gpuTypes(input: { id: $gpuTypeId }) {
    displayName
    memoryInGb
    lowestPrice(input: $lp) {
      stockStatus
      maxUnreservedGpuCount
      availableGpuCounts
      uninterruptablePrice
    }
  }
}"#;

const GPU_QUERY_LEGACY: &str = r#"query GpuAvailability($gpuTypeId: String!, $lp: GpuTypeLowestPriceInput!) {
  gpuTypes(input: { id: $gpuTypeId }) {
    displayName
    memoryInGb
    lowestPrice(input: $lp) {
      stockStatus
      maxUnreservedGpuCount
      availableGpuCounts
      uninterruptablePrice
    }
  }
}"#;

/// The marketplace has shipped two names for the lowest-price input type and
/// two names for its disk-size field, with no version signal to pick by.
/// Every lookup walks these combinations in order until one succeeds.
struct QueryVariant {
    query: &'static str,
    disk_field: &'static str,
}

const QUERY_ATTEMPTS: [QueryVariant; 4] = [
    QueryVariant {
        query: GPU_QUERY_NEW,
        disk_field: "minDisk",
    },
    QueryVariant {
        query: GPU_QUERY_NEW,
        disk_field: "minDiskInGb",
    },
    QueryVariant {
        query: GPU_QUERY_LEGACY,
        disk_field: "minDisk",
    },
    QueryVariant {
        query: GPU_QUERY_LEGACY,
        disk_field: "minDiskInGb",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct GpuQueryRequest<'a> {
    pub gpu_type_id: &'a str,
    pub datacenter_id: Option<&'a str>,
    pub scope: MarketScope,
    pub gpu_count: i64,
}

/// Normalized availability for one GPU type in one market scope.
#[derive(Debug, Clone)]
pub struct GpuAvailabilityRow {
    /// False when the scope has no listing for the requested id at all.
    pub found: bool,
    pub name: String,
    pub vram_gb: Option<i64>,
    pub stock_status: Option<String>,
    pub max_unreserved_count: i64,
    pub available_counts: Vec<i64>,
    pub price_per_hour: Option<f64>,
}

impl GpuAvailabilityRow {
    fn missing(requested: &str) -> Self {
        Self {
            found: false,
            name: requested.to_string(),
            vram_gb: None,
            stock_status: None,
            max_unreserved_count: 0,
            available_counts: Vec::new(),
            price_per_hour: None,
        }
    }
}

/// Fetches one availability row, trying each schema variant in turn. An
/// empty gpuTypes list is a successful answer (the id is unknown to this
/// scope), not a reason to fall through to the next variant.
pub async fn fetch_gpu_row(
    transport: &dyn GraphqlTransport,
    request: &GpuQueryRequest<'_>,
) -> Result<GpuAvailabilityRow, WatchError> {
    let mut last_error: Option<anyhow::Error> = None;

    for variant in &QUERY_ATTEMPTS {
        let body = json!({
            "query": variant.query,
            "variables": {
                "gpuTypeId": request.gpu_type_id,
                "lp": lowest_price_input(request, variant.disk_field),
            },
        });

        match run_attempt(transport, &body, request.gpu_type_id).await {
            Ok(row) => return Ok(row),
            Err(error) => last_error = Some(error),
        }
    }

    Err(WatchError::QueryExhausted {
        gpu_type_id: request.gpu_type_id.to_string(),
        cause: last_error.unwrap_or_else(|| anyhow!("no query variants attempted")),
    })
}

fn lowest_price_input(request: &GpuQueryRequest<'_>, disk_field: &str) -> Value {
    let mut input = json!({
        "secureCloud": request.scope.secure_cloud(),
        "gpuCount": request.gpu_count,
        "globalNetwork": !request.scope.secure_cloud(),
    });

    if let Some(datacenter_id) = request.datacenter_id {
        input["dataCenterId"] = json!(datacenter_id);
    }
    input[disk_field] = json!(0);

    input
}

async fn run_attempt(
    transport: &dyn GraphqlTransport,
    body: &Value,
    requested: &str,
) -> Result<GpuAvailabilityRow> {
    let payload = transport.post_graphql(body).await?;

    let envelope: GraphqlEnvelope =
        serde_json::from_value(payload).context("unexpected gpuTypes response shape")?;

    if !envelope.errors.is_empty() {
        bail!("graphql error response: {}", Value::from(envelope.errors));
    }

    let rows = envelope
        .data
        .and_then(|data| data.gpu_types)
        .unwrap_or_default();

    let Some(gpu) = rows.into_iter().next() else {
        return Ok(GpuAvailabilityRow::missing(requested));
    };

    let lowest = gpu.lowest_price.unwrap_or_default();

    Ok(GpuAvailabilityRow {
        found: true,
        name: gpu.display_name.unwrap_or_else(|| requested.to_string()),
        vram_gb: gpu.memory_in_gb,
        stock_status: lowest.stock_status,
        max_unreserved_count: lowest.max_unreserved_gpu_count.unwrap_or(0),
        available_counts: lowest.available_gpu_counts.unwrap_or_default(),
        price_per_hour: lowest.uninterruptable_price,
    })
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    errors: Vec<Value>,
    data: Option<GpuTypesData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GpuTypesData {
    gpu_types: Option<Vec<RawGpuType>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGpuType {
    display_name: Option<String>,
    memory_in_gb: Option<i64>,
    lowest_price: Option<RawLowestPrice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLowestPrice {
    stock_status: Option<String>,
    max_unreserved_gpu_count: Option<i64>,
    available_gpu_counts: Option<Vec<i64>>,
    uninterruptable_price: Option<f64>,
}
