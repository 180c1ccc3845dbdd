//! 流水线阶段：route（路由）、generate（调用 LLM）、finalize（后处理）

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmError};
use crate::pipeline::state::{TurnState, TurnUpdate, NO_RESPONSE};
use crate::session::Message;

/// 唯一的下游分支：通用 LLM 问答
pub const GENERAL_LLM: &str = "general_llm";

/// 路由：恒定选择通用 LLM 分支，与输入无关
pub fn route(_state: &TurnState) -> TurnUpdate {
    TurnUpdate::route_to(GENERAL_LLM)
}

/// 调用 LLM：以 input 作为唯一一条 user 消息发起一次请求，不重试。
///
/// 任何失败（网络、鉴权、响应格式、超时、取消）都不向上传播，而是作为 `Error: <描述>` 追加到 tool_outputs，
/// 保证流水线总能走完。
pub async fn generate(
    llm: &dyn LlmClient,
    state: &TurnState,
    timeout: Duration,
    cancel: &CancellationToken,
) -> TurnUpdate {
    let messages = [Message::user(state.input.clone())];

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled),
        r = tokio::time::timeout(timeout, llm.complete(&messages)) => {
            r.unwrap_or_else(|_| Err(LlmError::Timeout(timeout)))
        }
    };

    match result {
        Ok(text) => TurnUpdate::tool_output(text),
        Err(e) => {
            tracing::warn!(llm = llm.name(), error = %e, "completion failed");
            TurnUpdate::tool_output(format!("Error: {}", e))
        }
    }
}

/// 后处理：取第一条去空白后非空的输出；都为空时给出 "No response"
pub fn finalize(state: &TurnState) -> TurnUpdate {
    let chosen = state
        .tool_outputs
        .iter()
        .find(|out| !out.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| NO_RESPONSE.to_string());
    TurnUpdate::final_output(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn state_with_outputs(outputs: &[&str]) -> TurnState {
        TurnState {
            tool_outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..TurnState::new("q")
        }
    }

    #[test]
    fn test_route_is_constant() {
        for input in ["", "hello", "refund please", "   "] {
            let update = route(&TurnState::new(input));
            assert_eq!(update.next_node.as_deref(), Some(GENERAL_LLM));
            assert!(update.tool_outputs.is_empty());
        }
    }

    #[test]
    fn test_finalize_first_non_blank_wins() {
        let update = finalize(&state_with_outputs(&["", "  \n", "answer", "later"]));
        assert_eq!(update.final_output.as_deref(), Some("answer"));
    }

    #[test]
    fn test_finalize_keeps_untrimmed_text() {
        let update = finalize(&state_with_outputs(&["  padded  "]));
        assert_eq!(update.final_output.as_deref(), Some("  padded  "));
    }

    #[test]
    fn test_finalize_sentinel_when_empty_or_blank() {
        assert_eq!(
            finalize(&state_with_outputs(&[])).final_output.as_deref(),
            Some(NO_RESPONSE)
        );
        assert_eq!(
            finalize(&state_with_outputs(&[" ", "\t"])).final_output.as_deref(),
            Some(NO_RESPONSE)
        );
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_message() {
        let llm = MockLlmClient::replying("T");
        let update = generate(
            &llm,
            &TurnState::new("where is my order?"),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(update.tool_outputs, vec!["T"]);
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], vec![Message::user("where is my order?")]);
    }

    #[tokio::test]
    async fn test_generate_turns_failure_into_text() {
        let llm = MockLlmClient::failing("boom");
        let update = generate(
            &llm,
            &TurnState::new("q"),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(update.tool_outputs, vec!["Error: boom"]);
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let llm = MockLlmClient::replying("late").with_delay(Duration::from_millis(500));
        let update = generate(
            &llm,
            &TurnState::new("q"),
            Duration::from_millis(20),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(update.tool_outputs.len(), 1);
        assert!(update.tool_outputs[0].starts_with("Error: request timed out after"));
    }

    #[tokio::test]
    async fn test_generate_cancelled() {
        let llm = MockLlmClient::replying("never").with_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let update = generate(&llm, &TurnState::new("q"), Duration::from_secs(10), &cancel).await;
        assert_eq!(update.tool_outputs, vec!["Error: request cancelled"]);
    }
}
