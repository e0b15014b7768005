use serde::{Deserialize, Serialize};

/// Monotonic per-agent counters plus an exponential moving average of
/// response time. Counters only ever increase across the agent's lifetime.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: u64,
    pub errors: u64,
    pub total_time_ms: u64,
    pub avg_response_time_ms: f64,
}

impl AgentMetrics {
    /// EMA smoothing factor: a fixed 0.2 weight on new samples so recent
    /// latency dominates without being whipsawed by a single slow call.
    const EMA_ALPHA: f64 = 0.2;

    pub fn record_request(&mut self, elapsed_ms: u64, is_error: bool) {
        self.requests += 1;
        self.total_time_ms += elapsed_ms;
        if is_error {
            self.errors += 1;
        }
        self.avg_response_time_ms = if self.requests == 1 {
            elapsed_ms as f64
        } else {
            Self::EMA_ALPHA * elapsed_ms as f64 + (1.0 - Self::EMA_ALPHA) * self.avg_response_time_ms
        };
    }

    pub fn record_tokens(&mut self, input: u64, output: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
    }

    pub fn record_tool_call(&mut self) {
        self.tool_calls += 1;
    }

    /// Fold a sub-agent's counters into this (parent) agent's metrics, per
    /// the rule that child metrics aggregate into the parent. The parent's
    /// own `avg_response_time_ms` EMA is left untouched -- it tracks the
    /// parent's own request latencies, not delegated work.
    pub fn merge_child(&mut self, child: &AgentMetrics) {
        self.requests += child.requests;
        self.input_tokens += child.input_tokens;
        self.output_tokens += child.output_tokens;
        self.tool_calls += child.tool_calls;
        self.errors += child.errors;
        self.total_time_ms += child.total_time_ms;
    }
}
