use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::protocol::{
    BusInformationArgs, FindNextBusArgs, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, RpcRequest, RpcResponse, SearchStopsArgs, ToolCall, ToolOutput, tool_list,
};
use crate::output::{render_arrivals, render_error, render_positions, render_stops};
use crate::query::TransitService;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "Nysse Transit Server";

pub struct ToolServer {
    service: TransitService,
}

impl ToolServer {
    pub fn new(service: TransitService) -> Self {
        Self { service }
    }

    /// Reads requests line by line until EOF, writing one response line per request.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(simulated = self.service.is_simulated(), "Tool server listening on stdio");

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };

            let mut encoded = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }

        info!("Tool server input closed");
        Ok(())
    }

    /// Handles one raw request line. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let request: RpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Unparsable request");
                return Some(RpcResponse::failure(Value::Null, PARSE_ERROR, e.to_string()));
            }
        };

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Notification ignored");
            return None;
        };
        if request.jsonrpc != "2.0" {
            return Some(RpcResponse::failure(
                id,
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err((code, message)) => RpcResponse::failure(id, code, message),
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": { "tools": {} },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tool_list()),
            "tools/call" => {
                let call: ToolCall = parse_params(params)?;
                Ok(self.call_tool(call).await?.into_value())
            }
            other => Err((METHOD_NOT_FOUND, format!("method not found: {other}"))),
        }
    }

    #[tracing::instrument(skip(self, call), fields(tool = %call.name))]
    async fn call_tool(&self, call: ToolCall) -> Result<ToolOutput, (i64, String)> {
        let output = match call.name.as_str() {
            "findNextBus" => {
                let args: FindNextBusArgs = parse_params(call.arguments)?;
                match self.service.find_next_bus(&args.stop_name).await {
                    Ok(results) => ToolOutput::text(render_arrivals(&args.stop_name, &results)),
                    Err(e) => ToolOutput::error(render_error(&e)),
                }
            }
            "getBusInformation" => {
                let args: BusInformationArgs = parse_params(call.arguments)?;
                match self.service.get_bus_information(&args.search_text).await {
                    Ok(positions) => {
                        ToolOutput::text(render_positions(&args.search_text, &positions))
                    }
                    Err(e) => ToolOutput::error(render_error(&e)),
                }
            }
            "searchBusStops" => {
                let args: SearchStopsArgs = parse_params(call.arguments)?;
                match self.service.search_stops(&args.query) {
                    Ok(stops) => ToolOutput::text(render_stops(&args.query, &stops)),
                    Err(e) => ToolOutput::error(render_error(&e)),
                }
            }
            other => return Err((INVALID_PARAMS, format!("unknown tool: {other}"))),
        };
        Ok(output)
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, (i64, String)> {
    serde_json::from_value(params).map_err(|e| (INVALID_PARAMS, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationReason;
    use crate::reference::{ReferenceLoader, StopDirectory, StopReference};

    fn server() -> ToolServer {
        let stops = (1..=7)
            .map(|i| StopReference {
                stop_code: format!("{i:04}"),
                stop_name: format!("Keskustori {i}"),
                latitude: 61.49,
                longitude: 23.76,
                zone: None,
            })
            .chain(std::iter::once(StopReference {
                stop_code: "1234".into(),
                stop_name: "Hervannan kampus".into(),
                latitude: 61.45,
                longitude: 23.85,
                zone: Some("B".into()),
            }))
            .collect();

        ToolServer::new(TransitService::simulated(
            StopDirectory::new(stops),
            ReferenceLoader::new("/unused/stops.txt", "/unused/trips.txt"),
            SimulationReason::Forced,
        ))
    }

    async fn call(server: &ToolServer, line: &str) -> Value {
        let response = server.handle_line(line).await.unwrap();
        serde_json::to_value(&response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await;
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["result"]["serverInfo"]["name"], json!(SERVER_NAME));
    }

    #[tokio::test]
    async fn test_search_bus_stops() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"searchBusStops","arguments":{"query":"hervannan"}}}"#,
        )
        .await;
        assert_eq!(value["result"]["isError"], json!(false));
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("- Hervannan kampus (1234)"));
    }

    #[tokio::test]
    async fn test_find_next_bus_ambiguous_is_tool_error() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"findNextBus","arguments":{"stopName":"Keskus"}}}"#,
        )
        .await;
        assert_eq!(value["result"]["isError"], json!(true));
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Found 7 stops"));
    }

    #[tokio::test]
    async fn test_find_next_bus_simulated() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"findNextBus","arguments":{"stopName":"1234"}}}"#,
        )
        .await;
        assert_eq!(value["result"]["isError"], json!(false));
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("[simulated]"));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_invalid_params() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"getBusInformation","arguments":{}}}"#,
        )
        .await;
        assert_eq!(value["error"]["code"], json!(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_unknown_method_and_parse_error() {
        let s = server();
        let value = call(&s, r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#).await;
        assert_eq!(value["error"]["code"], json!(METHOD_NOT_FOUND));

        let value = call(&s, "{not json").await;
        assert_eq!(value["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_run_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();

        server().run(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], json!(2));
        assert!(second["result"]["tools"].is_array());
    }
}
