//! Work items come in as JSON lines on stdin, one retrieval request per
//! line; each produces one JSON line on stdout (the message list, or the
//! recorded error under continue-on-fail).

use anyhow::Context;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use tgu_core::{
    config::Config,
    runner::{run_items, RunOptions, WorkItem},
};
use tgu_telegram::TelegramTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgu_core::logging::init("tgu");

    let cfg = Config::load().context("loading configuration")?;
    let transport = TelegramTransport::connect(&cfg)
        .await
        .context("connecting to telegram")?;

    let mut items: Vec<WorkItem> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        items.push(serde_json::from_str(line).context("parsing work item")?);
    }

    let outcomes = run_items(
        &transport,
        &items,
        RunOptions {
            continue_on_fail: cfg.continue_on_fail,
        },
    )
    .await?;

    for outcome in outcomes {
        let line = match outcome.result {
            Ok(messages) => json!({ "index": outcome.index, "result": messages }),
            Err(error) => json!({ "index": outcome.index, "error": error.to_string() }),
        };
        println!("{line}");
    }

    Ok(())
}
