//! 单轮状态与阶段更新
//!
//! 每条用户消息新建一个 TurnState，跑完流水线后丢弃；各阶段返回 TurnUpdate，由 apply 合并。

use serde::Serialize;

/// 没有任何非空输出时 final_output 的兜底值
pub const NO_RESPONSE: &str = "No response";

/// 单轮状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnState {
    /// 本轮用户原始输入
    pub input: String,
    /// 各阶段的输出，只追加
    pub tool_outputs: Vec<String>,
    /// 路由阶段选出的分支标签
    pub next_node: String,
    /// 最终展示给用户的文本
    pub final_output: String,
}

impl TurnState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// 合并阶段更新：tool_outputs 追加，其余字段有值则覆盖
    pub fn apply(&mut self, update: TurnUpdate) {
        self.tool_outputs.extend(update.tool_outputs);
        if let Some(next_node) = update.next_node {
            self.next_node = next_node;
        }
        if let Some(final_output) = update.final_output {
            self.final_output = final_output;
        }
    }
}

/// 阶段返回的部分状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnUpdate {
    pub tool_outputs: Vec<String>,
    pub next_node: Option<String>,
    pub final_output: Option<String>,
}

impl TurnUpdate {
    pub fn route_to(label: impl Into<String>) -> Self {
        Self {
            next_node: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn tool_output(text: impl Into<String>) -> Self {
        Self {
            tool_outputs: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn final_output(text: impl Into<String>) -> Self {
        Self {
            final_output: Some(text.into()),
            ..Self::default()
        }
    }
}
