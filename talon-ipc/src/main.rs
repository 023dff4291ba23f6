//! # Talon IPC Server
//!
//! JSON-RPC 2.0 line protocol over stdio for scripted player control.
//!
//! ## Methods
//! - `initialize`: server name/version handshake
//! - `properties/list`: registered property names
//! - `get_property`: `{name}` to typed value plus display text
//! - `set_property`: `{name, value}` (string or JSON scalar)
//! - `command`: a full command invocation, returns terminal output
//!
//! ## Usage
//! ```bash
//! # Start server (stdio transport)
//! talon-ipc
//!
//! # With debug logging
//! RUST_LOG=debug talon-ipc
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::io::{self, BufRead, Write};
use talon_core::command::{run_command, Invocation};
use talon_core::context::{PlayerContext, StopReason};
use talon_core::options::Options;
use talon_core::properties::{
    get_property, print_property, property_names, set_property, set_property_from_str,
};
use talon_core::property::{PropertyError, Value};
use tracing::{debug, error, info, warn};

// ============================================================================
// JSON-RPC Protocol Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Json>,
    method: String,
    #[serde(default)]
    params: Json,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Json,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;
const PROPERTY_ERROR: i32 = -32000;

fn invalid_params(message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code: INVALID_PARAMS,
        message: message.into(),
    }
}

fn property_error(e: PropertyError) -> JsonRpcError {
    JsonRpcError {
        code: PROPERTY_ERROR,
        message: e.answer_code().to_string(),
    }
}

// ============================================================================
// Server
// ============================================================================

struct IpcServer {
    ctx: PlayerContext,
    /// Exit code once a quit command came through.
    quit: Option<i32>,
}

impl IpcServer {
    fn new(ctx: PlayerContext) -> Self {
        Self { ctx, quit: None }
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Json::Null);

        let result = match request.method.as_str() {
            "initialize" => Ok(json!({
                "name": "talon-ipc",
                "version": talon_core::VERSION,
            })),
            "properties/list" => Ok(json!(property_names())),
            "get_property" => self.handle_get_property(&request.params),
            "set_property" => self.handle_set_property(&request.params),
            "command" => self.handle_command(&request.params),
            _ => Err(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", request.method),
            }),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id,
                result: Some(value),
                error: None,
            },
            Err(error) => JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    fn handle_get_property(&mut self, params: &Json) -> Result<Json, JsonRpcError> {
        let name = param_str(params, "name")?;
        let value = get_property(&self.ctx, name).map_err(property_error)?;
        let text = print_property(&self.ctx, name).unwrap_or_default();
        Ok(json!({
            "value": value_to_json(&value),
            "text": text,
        }))
    }

    fn handle_set_property(&mut self, params: &Json) -> Result<Json, JsonRpcError> {
        let name = param_str(params, "name")?;
        let value = params
            .get("value")
            .ok_or_else(|| invalid_params("missing 'value'"))?;
        let result = match value {
            Json::String(s) => set_property_from_str(&mut self.ctx, name, s),
            Json::Bool(b) => set_property(&mut self.ctx, name, Value::Flag(*b)),
            Json::Number(n) if n.is_i64() => set_property(
                &mut self.ctx,
                name,
                Value::Int(n.as_i64().unwrap_or_default()),
            ),
            Json::Number(n) => set_property(
                &mut self.ctx,
                name,
                Value::Float(n.as_f64().unwrap_or_default()),
            ),
            _ => return Err(invalid_params("'value' must be a scalar")),
        };
        result.map_err(property_error)?;
        Ok(json!({}))
    }

    fn handle_command(&mut self, params: &Json) -> Result<Json, JsonRpcError> {
        let invocation: Invocation = serde_json::from_value(params.clone())
            .map_err(|e| invalid_params(format!("bad command: {}", e)))?;
        run_command(&mut self.ctx, &invocation);

        if let Some(StopReason::Quit(code)) = self.ctx.stop_play {
            self.quit = Some(code);
        }

        Ok(json!({
            "output": self.ctx.take_term_output(),
        }))
    }
}

fn param_str<'a>(params: &'a Json, key: &str) -> Result<&'a str, JsonRpcError> {
    params
        .get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| invalid_params(format!("missing '{}'", key)))
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Flag(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) | Value::Time(f) => json!(f),
        Value::Str(s) => json!(s),
        Value::StrList(list) => json!(list),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean protocol channel.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("talon_ipc=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    info!("Talon IPC Server v{} starting...", talon_core::VERSION);

    let mut server = IpcServer::new(PlayerContext::new(Options::load()));
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    info!("Listening for requests on stdin...");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                continue;
            }
        };

        let response = server.handle_request(request);
        let response_json = serde_json::to_string(&response)?;

        debug!("Sending: {}", response_json);
        writeln!(stdout, "{}", response_json)?;
        stdout.flush()?;

        if let Some(code) = server.quit {
            warn!("Quit requested (code {}), shutting down.", code);
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use talon_core::media::{AudioStream, Media, Track, TrackKind};

    fn server_with_media() -> IpcServer {
        let mut media = Media::from_path("/tmp/demo.mkv");
        media.duration = 100.0;
        media.tracks = vec![Track::new(0, TrackKind::Audio)];
        media.audio = Some(AudioStream {
            codec: "opus".into(),
            format: 0,
            bitrate: 16_000,
            samplerate: 48_000,
            channels: 2,
        });
        let mut ctx = PlayerContext::default();
        ctx.load_media(media);
        IpcServer::new(ctx)
    }

    fn call(server: &mut IpcServer, method: &str, params: Json) -> JsonRpcResponse {
        server.handle_request(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: method.into(),
            params,
        })
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut server = server_with_media();
        let resp = call(
            &mut server,
            "set_property",
            json!({"name": "volume", "value": 55}),
        );
        assert!(resp.error.is_none());

        let resp = call(&mut server, "get_property", json!({"name": "volume"}));
        let result = resp.result.unwrap();
        assert_eq!(result["value"], json!(55.0));
    }

    #[test]
    fn test_unknown_property_reports_code() {
        let mut server = server_with_media();
        let resp = call(&mut server, "get_property", json!({"name": "warp"}));
        let error = resp.error.unwrap();
        assert_eq!(error.code, PROPERTY_ERROR);
        assert_eq!(error.message, "PROPERTY_UNKNOWN");
    }

    #[test]
    fn test_command_returns_output_and_quit() {
        let mut server = server_with_media();
        let resp = call(
            &mut server,
            "command",
            json!({"cmd": "get_property", "property": "samplerate"}),
        );
        let result = resp.result.unwrap();
        assert_eq!(result["output"], json!(["ANS_samplerate=48000"]));

        call(&mut server, "command", json!({"cmd": "quit", "code": 2}));
        assert_eq!(server.quit, Some(2));
    }

    #[test]
    fn test_method_not_found() {
        let mut server = server_with_media();
        let resp = call(&mut server, "eject", json!({}));
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
