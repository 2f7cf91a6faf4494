//! `redirector health` — check the health of a running instance.
//!
//! Sends a `GET /health` request to the instance's admin listener and
//! displays the response as formatted text or raw JSON.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::RedirectorError;
use crate::health::HealthResponse;

pub async fn execute(args: HealthArgs) -> Result<(), RedirectorError> {
    let url = format!("{}/health", args.url.trim_end_matches('/'));
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| RedirectorError::UriParse {
            source: Box::new(e),
        })?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| RedirectorError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| RedirectorError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| RedirectorError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| RedirectorError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(RedirectorError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => print!("{}", render(&args.url, &health)),
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

fn render(url: &str, health: &HealthResponse) -> String {
    let config = &health.config;
    let stats = &health.stats;
    format!(
        "\u{2713} redirector is healthy ({url})\n  \
         uptime:         {}\n  \
         config source:  {} (version {}, loaded {}s ago)\n  \
         mappings:       {} domains, {} targets, {} rotating\n  \
         requests:       {} redirected, {} unmatched, {} failed\n  \
         reloads:        {}\n",
        format_uptime(health.uptime_seconds),
        config.source,
        config.version,
        config.loaded_ago_seconds,
        config.mappings,
        config.targets,
        config.rotating_domains,
        stats.redirected,
        stats.unmatched,
        stats.failed,
        stats.config_reloads,
    )
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
