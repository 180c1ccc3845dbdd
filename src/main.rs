//! Helpdesk - 终端客服问答助手
//!
//! 入口：加载 .env、初始化日志、创建会话编排器与 TUI，并运行主循环。

use std::path::Path;

use anyhow::Context;
use helpdesk::{core::create_shell, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 中的 GROQ_API_KEY 等密钥；文件不存在时忽略
    let _ = dotenvy::dotenv();

    // 日志写文件，避免打乱全屏界面；默认 info，可通过 RUST_LOG 覆盖
    observability::init_to_file(Path::new("helpdesk.log")).context("Failed to open log file")?;

    // 创建会话编排器：返回命令发送端、状态接收端
    let (cmd_tx, state_rx) = create_shell(None);

    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
