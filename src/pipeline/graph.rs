//! 流水线运行器：固定顺序 Start → Routed → Generated → Finalized → End
//!
//! 唯一的分支点在 Routed：按 next_node 查分支表，未登记的标签属于配置错误（UnmappedBranch），
//! 而不是运行时数据错误。无循环、无挂起、单次运行内无并发。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::pipeline::stages::{finalize, generate, route, GENERAL_LLM};
use crate::pipeline::state::{TurnState, TurnUpdate};

/// 路由函数：读取状态，返回写入 next_node 的更新
pub type RouteFn = fn(&TurnState) -> TurnUpdate;

/// 路由之后可走的分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// 把输入原样交给 LLM
    GeneralLlm,
}

/// 运行器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Start,
    Routed,
    Generated,
    Finalized,
    End,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelinePhase::Start => "start",
            PipelinePhase::Routed => "routed",
            PipelinePhase::Generated => "generated",
            PipelinePhase::Finalized => "finalized",
            PipelinePhase::End => "end",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no branch registered for route label '{0}'")]
    UnmappedBranch(String),
}

/// 编译好的流水线，可被多个会话共享
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    router: RouteFn,
    branches: HashMap<String, Branch>,
    request_timeout: Duration,
}

impl Pipeline {
    /// 默认配置：恒定路由到 general_llm，请求超时 60 秒
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        PipelineBuilder::new(llm).build()
    }

    pub fn builder(llm: Arc<dyn LlmClient>) -> PipelineBuilder {
        PipelineBuilder::new(llm)
    }

    /// 按配置选择 LLM 后端与请求超时
    pub fn from_config(cfg: &AppConfig) -> Self {
        PipelineBuilder::new(create_llm_from_config(cfg))
            .request_timeout(cfg.llm.request_timeout())
            .build()
    }

    /// 处理一条用户输入，返回完整的终态
    pub async fn invoke(&self, input: &str) -> Result<TurnState, PipelineError> {
        self.invoke_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// 同 invoke，但 LLM 调用可被 cancel 打断（打断结果以错误文本呈现）
    pub async fn invoke_with_cancel(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnState, PipelineError> {
        self.run(TurnState::new(input), cancel).await
    }

    async fn run(
        &self,
        mut state: TurnState,
        cancel: &CancellationToken,
    ) -> Result<TurnState, PipelineError> {
        let mut phase = PipelinePhase::Start;
        loop {
            let next = match phase {
                PipelinePhase::Start => {
                    state.apply((self.router)(&state));
                    PipelinePhase::Routed
                }
                PipelinePhase::Routed => {
                    match self.resolve(&state.next_node)? {
                        Branch::GeneralLlm => {
                            let update =
                                generate(self.llm.as_ref(), &state, self.request_timeout, cancel)
                                    .await;
                            state.apply(update);
                        }
                    }
                    PipelinePhase::Generated
                }
                PipelinePhase::Generated => {
                    state.apply(finalize(&state));
                    PipelinePhase::Finalized
                }
                PipelinePhase::Finalized => PipelinePhase::End,
                PipelinePhase::End => return Ok(state),
            };
            tracing::debug!(from = %phase, to = %next, "pipeline transition");
            phase = next;
        }
    }

    fn resolve(&self, label: &str) -> Result<Branch, PipelineError> {
        self.branches
            .get(label)
            .copied()
            .ok_or_else(|| PipelineError::UnmappedBranch(label.to_string()))
    }
}

/// 流水线构建器
pub struct PipelineBuilder {
    llm: Arc<dyn LlmClient>,
    router: RouteFn,
    branches: HashMap<String, Branch>,
    request_timeout: Duration,
}

impl PipelineBuilder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        let mut branches = HashMap::new();
        branches.insert(GENERAL_LLM.to_string(), Branch::GeneralLlm);
        Self {
            llm,
            router: route,
            branches,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// 替换路由函数
    pub fn router(mut self, router: RouteFn) -> Self {
        self.router = router;
        self
    }

    /// 登记（或覆盖）一个分支标签
    pub fn branch(mut self, label: impl Into<String>, branch: Branch) -> Self {
        self.branches.insert(label.into(), branch);
        self
    }

    /// 清空分支表
    pub fn without_branches(mut self) -> Self {
        self.branches.clear();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            llm: self.llm,
            router: self.router,
            branches: self.branches,
            request_timeout: self.request_timeout,
        }
    }
}
