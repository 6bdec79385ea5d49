use std::time::{SystemTime, UNIX_EPOCH};

use auth_gate::auth::gate::{ACCESS_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use auth_gate::security::path;
use auth_gate::security::calculate_sign;
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Operator tooling for the authorization gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a server-to-server signature
    Sign {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        group: Option<String>,
        /// Milliseconds since the epoch; now when omitted
        #[arg(long)]
        timestamp: Option<String>,
        #[arg(long)]
        secret: String,
    },
    /// Show each canonicalization step for a raw request path
    Canonicalize {
        path: String,
        /// Decode charset label, as in `auth.path_charset`
        #[arg(long)]
        charset: Option<String>,
    },
    /// Send a signed GET request through the gate
    Probe {
        /// Full URL, e.g. http://localhost:8080/nacos/v1/cs/configs?tenant=public&group=DEFAULT_GROUP
        url: String,
        #[arg(long)]
        secret: String,
        #[arg(long, default_value = "gate-cli")]
        access_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { tenant, group, timestamp, secret } => {
            let timestamp = timestamp.unwrap_or_else(now_millis);
            let signature = calculate_sign(tenant.as_deref(), group.as_deref(), &timestamp, &secret);
            let out = json!({
                "tenant": tenant,
                "group": group,
                "timestamp": timestamp,
                "signature": signature,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Canonicalize { path: raw, charset } => {
            let normalized = path::normalize(&raw, true);
            let decoded = normalized
                .as_deref()
                .map(|n| path::decode_with_label(n, charset.as_deref()).map(|d| d.into_owned()));
            let stripped = match &decoded {
                Some(Ok(d)) => Some(path::strip_path_params(d).into_owned()),
                _ => None,
            };
            let out = json!({
                "raw": raw,
                "normalized": normalized,
                "decoded": decoded.as_ref().map(|d| match d {
                    Ok(d) => d.clone(),
                    Err(e) => format!("error: {e}"),
                }),
                "canonical": stripped,
                "dot_segments_after_decode": stripped.as_deref().map(path::has_dot_segments),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Probe { url, secret, access_key } => {
            let parsed = url::Url::parse(&url)?;
            let param = |name: &str| {
                parsed
                    .query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
            };
            let tenant = param("tenant");
            let group = param("group");
            let timestamp = now_millis();
            let signature =
                calculate_sign(tenant.as_deref(), group.as_deref(), &timestamp, &secret);

            let mut headers = HeaderMap::new();
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature)?);
            headers.insert(ACCESS_KEY_HEADER, HeaderValue::from_str(&access_key)?);
            headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&timestamp)?);

            let res = reqwest::Client::new().get(parsed).headers(headers).send().await?;
            let status = res.status();
            let body = res.text().await?;
            println!("{status}");
            println!("{body}");
        }
    }

    Ok(())
}

fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}
