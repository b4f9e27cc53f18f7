use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// The result of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn into_value(self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNextBusArgs {
    pub stop_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusInformationArgs {
    pub search_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchStopsArgs {
    pub query: String,
}

/// Tool descriptors returned from `tools/list`.
pub fn tool_list() -> Value {
    json!({
        "tools": [
            {
                "name": "findNextBus",
                "description": "Find the next buses arriving at a specific stop in Tampere, Finland",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "stopName": {
                            "type": "string",
                            "description": "The name or code of the bus stop. Can be a partial name."
                        }
                    },
                    "required": ["stopName"]
                }
            },
            {
                "name": "getBusInformation",
                "description": "Find where a bus is right now by vehicle id, route number or licence plate",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "searchText": {
                            "type": "string",
                            "description": "Vehicle id, route id or licence plate"
                        }
                    },
                    "required": ["searchText"]
                }
            },
            {
                "name": "searchBusStops",
                "description": "Search for bus stops in Tampere, Finland by name",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The name or partial name of the bus stop to search for"
                        }
                    },
                    "required": ["query"]
                }
            }
        ]
    })
}
