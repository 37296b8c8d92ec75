use serde::{Deserialize, Serialize};
use serde_json::Value;
use reqwest::{Client, StatusCode, header};
use log::{debug, info};
use std::time::Duration;

use crate::grid::CharacterGrid;
use super::{BoardDevice, DeviceError, WriteOptions};

pub const LOCAL_API_PORT: u16 = 7000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY_HEADER: &str = "X-Vestaboard-Local-Api-Key";
const ENABLEMENT_HEADER: &str = "X-Vestaboard-Local-Api-Enablement-Token";

/// Body of a message write.
#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    characters: &'a CharacterGrid,
    #[serde(flatten)]
    options: Option<&'a WriteOptions>,
}

#[derive(Debug, Deserialize)]
struct EnablementResponse {
    #[serde(rename = "apiKey")]
    api_key: String,
}

/// Client for the board's local HTTP API.
#[derive(Debug, Clone)]
pub struct LocalClient {
    base_url: String,
    api_key: String,
    client: Client,
}

fn build_client(timeout: Duration) -> Result<Client, DeviceError> {
    const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));

    Client::builder()
        .http1_only()
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| DeviceError::Transport(e.to_string()))
}

impl LocalClient {
    /// Client for `http://{host}:7000` authenticated by `api_key`.
    pub fn new(host: &str, api_key: &str, timeout: Duration) -> Result<Self, DeviceError> {
        Ok(LocalClient {
            base_url: base_url(host),
            api_key: api_key.to_string(),
            client: build_client(timeout)?,
        })
    }

    /// Trade a one-time enablement token for an API key, then build a client
    /// around it.
    pub async fn enable(host: &str, token: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let client = build_client(timeout)?;
        let url = format!("{}/local-api/enablement", base_url(host));

        let response = client.post(&url).header(ENABLEMENT_HEADER, token).send().await?;
        check_status(response.status())?;
        let body: EnablementResponse = response.json().await?;
        info!("Local API enabled on {}", host);

        Ok(LocalClient {
            base_url: base_url(host),
            api_key: body.api_key,
            client,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn message_url(&self) -> String {
        format!("{}/local-api/message", self.base_url)
    }
}

fn base_url(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else if host.contains(':') && !host.starts_with('[') {
        // host:port given explicitly
        format!("http://{}", host)
    } else {
        format!("http://{}:{}", host, LOCAL_API_PORT)
    }
}

fn check_status(status: StatusCode) -> Result<(), DeviceError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeviceError::from_status(status.as_u16()))
    }
}

/// Grid from a read body: `{"message": [[..]]}`, a bare grid, or nothing.
pub fn parse_message_body(body: &str) -> Result<Option<CharacterGrid>, DeviceError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body)?;
    let grid = match value {
        Value::Null => return Ok(None),
        Value::Object(mut map) => match map.remove("message") {
            None | Some(Value::Null) => return Ok(None),
            Some(inner) => inner,
        },
        other => other,
    };
    let rows: Vec<Vec<i32>> = serde_json::from_value(grid)?;
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(CharacterGrid::new(rows)))
}

impl BoardDevice for LocalClient {
    async fn read_message(&self) -> Result<Option<CharacterGrid>, DeviceError> {
        let response = self
            .client
            .get(self.message_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        check_status(response.status())?;
        let text = response.text().await?;
        debug!("read {} bytes from {}", text.len(), self.base_url);
        parse_message_body(&text)
    }

    async fn write_message(
        &self,
        grid: &CharacterGrid,
        options: Option<&WriteOptions>,
    ) -> Result<(), DeviceError> {
        let body = WriteRequest {
            characters: grid,
            options,
        };
        let response = self
            .client
            .post(self.message_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        // 201 Created is the documented answer, accept any 2xx
        check_status(response.status())?;
        debug!("wrote grid to {}", self.base_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("192.168.1.40"), "http://192.168.1.40:7000");
        assert_eq!(base_url("board.local:8080"), "http://board.local:8080");
        assert_eq!(base_url("http://board.local:7000/"), "http://board.local:7000");
    }

    #[test]
    fn test_parse_wrapped_and_bare() {
        let wrapped = parse_message_body(r#"{"message":[[1,2],[3,4]]}"#).unwrap().unwrap();
        let bare = parse_message_body("[[1,2],[3,4]]").unwrap().unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(bare.get(1, 0), Some(3));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(parse_message_body("").unwrap(), None);
        assert_eq!(parse_message_body("  \n").unwrap(), None);
        assert_eq!(parse_message_body("null").unwrap(), None);
        assert_eq!(parse_message_body(r#"{"message":null}"#).unwrap(), None);
        assert_eq!(parse_message_body("[]").unwrap(), None);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(
            parse_message_body("<html>"),
            Err(DeviceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_message_body(r#"{"message":"hi"}"#),
            Err(DeviceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_write_body_shape() {
        let grid = CharacterGrid::new(vec![vec![1, 0]]);
        let plain = WriteRequest { characters: &grid, options: None };
        assert_eq!(serde_json::to_string(&plain).unwrap(), r#"{"characters":[[1,0]]}"#);

        let opts = WriteOptions {
            strategy: Some("random".into()),
            step_interval_ms: Some(250),
            step_size: None,
        };
        let animated = WriteRequest { characters: &grid, options: Some(&opts) };
        assert_eq!(
            serde_json::to_string(&animated).unwrap(),
            r#"{"characters":[[1,0]],"strategy":"random","step_interval_ms":250}"#
        );
    }
}
