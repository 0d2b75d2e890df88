// Therapist core CLI
// One turn per stdin line, one JSON outcome per stdout line.

use anyhow::Context;
use therapist_core::telemetry::{self, LogFormat};
use therapist_core::{Settings, TherapySupervisor, TurnRequest};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

const CLI_SESSION_ID: &str = "cli-session";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_format = LogFormat::from_env().context("Invalid LOG_FORMAT")?;
    telemetry::init(log_format)?;

    let settings = Settings::from_env().context("Failed to load configuration")?;
    let supervisor = TherapySupervisor::from_settings(&settings)?;

    let health = supervisor.health();
    info!(status = %health.status, "Pipeline ready, reading turns from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut turn_number: u32 = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        turn_number += 1;

        let request = parse_line(line, turn_number);
        match supervisor.process_turn(request).await {
            Ok(outcome) => {
                let mut json = serde_json::to_string(&outcome)?;
                json.push('\n');
                stdout.write_all(json.as_bytes()).await?;
                stdout.flush().await?;
            }
            Err(e) => error!("Turn {} rejected: {}", turn_number, e),
        }
    }

    info!("stdin closed, shutting down");
    supervisor.shutdown().await;
    Ok(())
}

/// A line is either a JSON `TurnRequest` or a plain transcript.
fn parse_line(line: &str, turn_number: u32) -> TurnRequest {
    if line.starts_with('{') {
        if let Ok(request) = serde_json::from_str::<TurnRequest>(line) {
            return request;
        }
    }
    TurnRequest::new(line, CLI_SESSION_ID, turn_number)
}
