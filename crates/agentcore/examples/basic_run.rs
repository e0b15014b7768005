//! Minimal end-to-end run against the scripted test client.
//!
//! ```bash
//! RUST_LOG=info cargo run -p agentcore --example basic_run --features test-support
//! ```

use agentcore::config::AgentConfig;
use agentcore::test_support::ScriptedLLMClient;
use agentcore::{llm::LLMResponse, llm::Usage, AgentCore};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::init();

    let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
        text: Some("The answer is 42.".to_string()),
        tool_calls: vec![],
        usage: Usage::default(),
    }]));

    let agent = AgentCore::new("demo-agent", AgentConfig::default(), llm);
    let result = agent
        .run("What is the answer to everything?", None)
        .await
        .expect("run should succeed against a scripted client");

    println!("session: {}", result.session_id);
    println!("answer: {}", result.answer);

    let history = agent.get_session_history(&result.session_id).await.unwrap();
    println!("turns persisted: {}", history.len());
}
