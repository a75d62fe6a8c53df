//! Per-call response metadata and rolling per-tool metrics.
//!
//! Token counts are a pure character-count heuristic, good enough for the
//! caller to budget its context window. Cost figures price the response
//! text at published per-million-token rates; the request side is treated
//! as free since the tool arguments are tiny.

use crate::tools::ToolResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

const COST_MODEL: &str = "claude-3.5-sonnet";
const INPUT_COST_PER_MILLION: f64 = 3.0;
const OUTPUT_COST_PER_MILLION: f64 = 15.0;

/// `ceil(chars / 4)`, the chars-per-token rule of thumb. Empty text is zero.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

fn estimate_cost_usd(input_tokens: u64, output_tokens: u64) -> f64 {
    input_tokens as f64 / 1_000_000.0 * INPUT_COST_PER_MILLION
        + output_tokens as f64 / 1_000_000.0 * OUTPUT_COST_PER_MILLION
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub estimated: u64,
    pub approximation_method: String,
    pub warning: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInfo {
    pub execution_time_ms: u64,
    pub cached_result: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
    pub model: String,
}

/// Shape of the payload, present only for query results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    pub row_count: usize,
    pub column_count: usize,
    pub truncated: bool,
    pub row_limit: u32,
}

/// The `meta` object attached to every `tools/call` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub timestamp: DateTime<Utc>,
    pub tokens: TokenInfo,
    pub performance: PerformanceInfo,
    pub cost: CostInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataInfo>,
}

impl ResponseMetadata {
    /// Build metadata for a rendered tool response.
    ///
    /// `configured_max` is the server-wide row cap; a query returning that
    /// many rows is flagged as truncated.
    pub fn build(
        rendered: &str,
        result: &ToolResult,
        execution_time_ms: u64,
        cached_result: bool,
        configured_max: u32,
    ) -> Self {
        let estimated = estimate_tokens(rendered);
        let data = match result {
            ToolResult::Query(q) => Some(DataInfo {
                row_count: q.row_count,
                column_count: q.column_names.len(),
                truncated: q.row_count >= configured_max as usize,
                row_limit: q.row_limit,
            }),
            _ => None,
        };

        Self {
            timestamp: Utc::now(),
            tokens: TokenInfo {
                estimated,
                approximation_method: "chars/4".to_string(),
                warning: "Token count is a character-based approximation".to_string(),
            },
            performance: PerformanceInfo {
                execution_time_ms,
                cached_result,
            },
            cost: CostInfo {
                input_tokens: 0,
                output_tokens: estimated,
                estimated_cost_usd: estimate_cost_usd(0, estimated),
                model: COST_MODEL.to_string(),
            },
            data,
        }
    }
}

/// One call's contribution to a tool's accumulator.
#[derive(Debug, Clone, Copy)]
pub struct CallRecord {
    pub execution_time_ms: u64,
    pub characters: u64,
    pub tokens: u64,
    pub cost_usd: f64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ToolAccumulator {
    call_count: u64,
    total_execution_time_ms: u64,
    total_characters: u64,
    total_tokens: u64,
    cache_hits: u64,
    total_cost_usd: f64,
}

/// Rolling statistics for one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatistics {
    pub total_calls: u64,
    pub avg_execution_time_ms: f64,
    pub avg_characters: f64,
    pub avg_tokens: f64,
    pub total_cost_usd: f64,
    /// Percentage of calls served from the metadata cache.
    pub cache_hit_rate: f64,
}

impl From<ToolAccumulator> for ToolStatistics {
    fn from(acc: ToolAccumulator) -> Self {
        let calls = acc.call_count as f64;
        Self {
            total_calls: acc.call_count,
            avg_execution_time_ms: acc.total_execution_time_ms as f64 / calls,
            avg_characters: acc.total_characters as f64 / calls,
            avg_tokens: acc.total_tokens as f64 / calls,
            total_cost_usd: acc.total_cost_usd,
            cache_hit_rate: acc.cache_hits as f64 / calls * 100.0,
        }
    }
}

/// Process-wide metrics store, injected into the server at construction.
///
/// One lock guards the whole map: recordings serialize their
/// read-modify-write, readers take a snapshot, and reset can never leave a
/// half-cleared state visible.
#[derive(Default)]
pub struct MetricsRegistry {
    tools: Mutex<BTreeMap<String, ToolAccumulator>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tool: &str, record: CallRecord) {
        let mut tools = self.tools.lock().unwrap_or_else(|e| e.into_inner());
        let acc = tools.entry(tool.to_string()).or_default();
        acc.call_count += 1;
        acc.total_execution_time_ms += record.execution_time_ms;
        acc.total_characters += record.characters;
        acc.total_tokens += record.tokens;
        acc.total_cost_usd += record.cost_usd;
        if record.cache_hit {
            acc.cache_hits += 1;
        }
    }

    /// Snapshot of one tool's statistics, `None` before its first call.
    pub fn statistics(&self, tool: &str) -> Option<ToolStatistics> {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tool)
            .copied()
            .map(ToolStatistics::from)
    }

    /// Snapshot of every tool's statistics, keyed by tool name.
    pub fn all_statistics(&self) -> BTreeMap<String, ToolStatistics> {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, acc)| (name.clone(), ToolStatistics::from(*acc)))
            .collect()
    }

    /// Drop every accumulator in one step.
    pub fn reset(&self) {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
