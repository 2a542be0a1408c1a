use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::StoreRecord,
    error::ApiError,
    protocol::{DeleteStoreResponse, HealthResponse},
};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "STORECTL_SERVER_URL", default_value = "http://127.0.0.1:3001")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Create,
    List,
    Get { id: String },
    Delete { id: String },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.server_url.trim_end_matches('/');

    match cli.command {
        Command::Create => {
            let response = client.post(format!("{base}/stores")).send().await?;
            let record: StoreRecord = read_json(response).await?;
            println!("{}", format_record(&record));
        }
        Command::List => {
            let response = client.get(format!("{base}/stores")).send().await?;
            let records: Vec<StoreRecord> = read_json(response).await?;
            if records.is_empty() {
                println!("no stores");
            }
            for record in &records {
                println!("{}", format_record(record));
            }
        }
        Command::Get { id } => {
            let response = client.get(format!("{base}/stores/{id}")).send().await?;
            let record: StoreRecord = read_json(response).await?;
            println!("{}", format_record(&record));
        }
        Command::Delete { id } => {
            let response = client.delete(format!("{base}/stores/{id}")).send().await?;
            if response.status() == StatusCode::ACCEPTED {
                let record: StoreRecord = read_json(response).await?;
                println!("deletion in progress: {}", format_record(&record));
            } else {
                let deleted: DeleteStoreResponse = read_json(response).await?;
                println!("{id}: {}", deleted.message);
            }
        }
        Command::Health => {
            let response = client.get(format!("{base}/health")).send().await?;
            let health: HealthResponse = read_json(response).await?;
            println!("{}", health.status);
        }
    }

    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await.context("failed to read response body")?;
    if !status.is_success() {
        match serde_json::from_slice::<ApiError>(&body) {
            Ok(err) => bail!("{status}: {}", err.message),
            Err(_) => bail!("{status}: {}", String::from_utf8_lossy(&body)),
        }
    }
    serde_json::from_slice(&body).context("unexpected response body")
}

fn format_record(record: &StoreRecord) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        record.id,
        record.state,
        record.endpoint,
        record.created_at.to_rfc3339()
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
