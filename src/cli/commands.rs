use std::{
    io::IsTerminal,
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::{
    dashboard::{
        clear_all_data, load_dashboard,
        render::{render_json, render_text},
        save_hourly_wage,
    },
    store::{json_file::JsonFileStore, KeyValueStore},
    utils::clock::DefaultClock,
};

use super::OutputFormat;

pub const CLEAR_PROMPT: &str = "모든 기록을 삭제하시겠습니까? (시급 설정은 유지됩니다) [y/N] ";
pub const WAGE_SAVED: &str = "시급이 저장되었습니다!";

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

async fn print_dashboard(store: &impl KeyValueStore, format: OutputFormat) -> Result<()> {
    let view = load_dashboard(store).await?;
    let rendered = match format {
        OutputFormat::Text => render_text(&view, std::io::stdout().is_terminal()),
        OutputFormat::Json => render_json(&view)? + "\n",
    };
    print!("{rendered}");
    Ok(())
}

/// `report` command. In watch mode the dashboard is redrawn after every change to the store
/// until interrupted.
pub async fn process_report_command(
    app_dir: &Path,
    format: OutputFormat,
    watch: bool,
    poll_ms: u64,
) -> Result<()> {
    let store = JsonFileStore::in_dir(app_dir)?;
    print_dashboard(&store, format).await?;
    if !watch {
        return Ok(());
    }

    let redraw = std::io::stdout().is_terminal() && format == OutputFormat::Text;
    let changes = store.changes(Duration::from_millis(poll_ms), Arc::new(DefaultClock));
    tokio::pin!(changes);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped watching");
                return Ok(());
            }
            change = changes.next() => {
                if change.is_none() {
                    return Ok(());
                }
                debug!("Store changed, redrawing");
                if redraw {
                    print!("{CLEAR_SCREEN}");
                }
                // A half-written file is picked up by the next poll.
                if let Err(e) = print_dashboard(&store, format).await {
                    error!("Failed to refresh dashboard {e:?}");
                }
            }
        }
    }
}

/// `wage` command.
pub async fn process_wage_command(app_dir: &Path, value: &str) -> Result<()> {
    let store = JsonFileStore::in_dir(app_dir)?;
    save_hourly_wage(&store, value).await?;
    println!("{WAGE_SAVED}");
    print_dashboard(&store, OutputFormat::Text).await
}

/// `clear` command.
pub async fn process_clear_command(app_dir: &Path, skip_confirmation: bool) -> Result<()> {
    let store = JsonFileStore::in_dir(app_dir)?;
    let confirmed = skip_confirmation
        || confirm(
            CLEAR_PROMPT,
            &mut BufReader::new(tokio::io::stdin()),
            &mut tokio::io::stdout(),
        )
        .await?;
    if !confirmed {
        info!("Clearing cancelled");
        return Ok(());
    }

    clear_all_data(&store).await?;
    print_dashboard(&store, OutputFormat::Text).await
}

/// Asks a yes/no question. Only an explicit yes counts.
pub async fn confirm(
    prompt: &str,
    input: &mut (impl AsyncBufRead + Unpin),
    output: &mut (impl AsyncWrite + Unpin),
) -> Result<bool> {
    output.write_all(prompt.as_bytes()).await?;
    output.flush().await?;

    let mut answer = String::new();
    input.read_line(&mut answer).await?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "예" | "네"
    ))
}
