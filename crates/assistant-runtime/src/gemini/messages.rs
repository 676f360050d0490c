//! Gemini `generateContent` wire format and message translation

use assistant_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall, find_tool_name, system_prompt},
    provider::{StreamDelta, ToolCallDelta},
    schema::ToolSchema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{GeminiSchema, has_parameters, to_gemini};
use crate::translate::{structured_args, structured_result, synthesize_call_id};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GeminiSchema>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

fn function_declarations(tools: &[ToolSchema]) -> Vec<GeminiTool> {
    if tools.is_empty() {
        return Vec::new();
    }
    let declarations = tools
        .iter()
        .map(|t| {
            let schema = to_gemini(&t.parameters);
            FunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: has_parameters(&schema).then_some(schema),
            }
        })
        .collect();
    vec![GeminiTool {
        function_declarations: declarations,
    }]
}

/// Build a request from canonical messages.
///
/// The first system message becomes `systemInstruction`; later system
/// messages are dropped.
pub fn to_request(messages: &[Message], tools: &[ToolSchema]) -> GenerateContentRequest {
    let system_instruction = system_prompt(messages).map(|text| Content {
        role: None,
        parts: vec![Part::text(text)],
    });

    let contents = messages
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let (role, parts) = match m.role {
                Role::System => return None,
                Role::User => ("user", text_parts(&m.content)),
                Role::Assistant => {
                    let mut parts = text_parts(&m.content);
                    parts.extend(m.tool_calls.iter().map(|c| Part {
                        function_call: Some(FunctionCall {
                            name: c.name.clone(),
                            args: structured_args(&c.arguments),
                        }),
                        ..Part::default()
                    }));
                    ("model", parts)
                }
                Role::Tool => {
                    let id = m.tool_call_id.as_deref().unwrap_or_default();
                    let name = find_tool_name(&messages[..i], id);
                    let part = Part {
                        function_response: Some(FunctionResponse {
                            name: name.to_string(),
                            response: structured_result(&m.content),
                        }),
                        ..Part::default()
                    };
                    ("function", vec![part])
                }
            };
            (!parts.is_empty()).then(|| Content {
                role: Some(role.to_string()),
                parts,
            })
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction,
        tools: function_declarations(tools),
    }
}

fn text_parts(text: &str) -> Vec<Part> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Part::text(text)]
    }
}

/// Concatenated text and tool calls of one candidate
fn candidate_parts(content: Option<Content>) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut calls = Vec::new();
    for part in content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(fc) = part.function_call {
            let arguments = match fc.args {
                Value::Null => "{}".to_string(),
                args => args.to_string(),
            };
            calls.push(ToolCall::new(synthesize_call_id(&fc.name), fc.name, arguments));
        }
    }
    (text, calls)
}

/// First candidate as an assistant message
pub fn from_response(response: GenerateContentResponse) -> Result<Message> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AgentError::EmptyResponse)?;
    let (text, calls) = candidate_parts(candidate.content);
    Ok(Message::assistant_with_tools(text, calls))
}

/// One streamed response chunk as a delta. Function calls arrive whole.
pub fn to_delta(response: GenerateContentResponse) -> Option<StreamDelta> {
    let candidate = response.candidates.into_iter().next()?;
    let done = candidate.finish_reason.is_some();
    let (content, calls) = candidate_parts(candidate.content);
    Some(StreamDelta {
        content,
        tool_calls: calls.into_iter().map(ToolCallDelta::complete).collect(),
        done,
    })
}

/// Rebuild canonical messages from a request.
///
/// Call ids are synthesized from function names, so ids only round-trip
/// when they already follow that convention.
pub fn from_request(request: &GenerateContentRequest) -> Vec<Message> {
    let mut out = Vec::new();
    if let Some(system) = &request.system_instruction {
        let text: String = system.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        out.push(Message::system(text));
    }

    for content in &request.contents {
        match content.role.as_deref() {
            Some("model") => {
                let (text, calls) = candidate_parts(Some(content.clone()));
                out.push(Message::assistant_with_tools(text, calls));
            }
            Some("function") => {
                for resp in content.parts.iter().filter_map(|p| p.function_response.as_ref()) {
                    let text = match resp.response.get("result") {
                        Some(Value::String(s)) if resp.response.as_object().is_some_and(|o| o.len() == 1) => {
                            s.clone()
                        }
                        _ => resp.response.to_string(),
                    };
                    out.push(Message::tool(synthesize_call_id(&resp.name), text));
                }
            }
            _ => {
                let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
                out.push(Message::user(text));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::message::UNKNOWN_TOOL_NAME;
    use assistant_core::schema::JsonSchema;
    use serde_json::json;

    #[test]
    fn test_text_round_trip() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("Bye"),
        ];
        let back = from_request(&to_request(&messages, &[]));
        assert_eq!(back.len(), messages.len());
        for (a, b) in messages.iter().zip(&back) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_system_instruction_uses_first_system_message() {
        let messages = vec![
            Message::system("first"),
            Message::user("hi"),
            Message::system("second"),
        ];
        let request = to_request(&messages, &[]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["systemInstruction"], json!({"parts": [{"text": "first"}]}));
        assert_eq!(value["contents"], json!([{"role": "user", "parts": [{"text": "hi"}]}]));
    }

    #[test]
    fn test_tool_call_and_result_translation() {
        let messages = vec![
            Message::user("logs?"),
            Message::assistant_with_tools(
                "Fetching.",
                vec![
                    ToolCall::new("call_get_pod_logs", "get_pod_logs", "{\"pod\":\"web\"}"),
                    ToolCall::new("call_list_pods", "list_pods", "not json"),
                ],
            ),
            Message::tool("call_get_pod_logs", "line 1\nline 2"),
            Message::tool("call_list_pods", "{\"pods\":[]}"),
            Message::tool("call_missing", "orphan"),
        ];
        let value = serde_json::to_value(to_request(&messages, &[])).unwrap();
        let contents = value["contents"].as_array().unwrap();

        assert_eq!(
            contents[1],
            json!({
                "role": "model",
                "parts": [
                    {"text": "Fetching."},
                    {"functionCall": {"name": "get_pod_logs", "args": {"pod": "web"}}},
                    {"functionCall": {"name": "list_pods", "args": {"args": "not json"}}}
                ]
            })
        );
        assert_eq!(
            contents[2],
            json!({"role": "function", "parts": [{"functionResponse": {
                "name": "get_pod_logs", "response": {"result": "line 1\nline 2"}
            }}]})
        );
        assert_eq!(contents[3]["parts"][0]["functionResponse"]["response"], json!({"pods": []}));
        assert_eq!(contents[4]["parts"][0]["functionResponse"]["name"], UNKNOWN_TOOL_NAME);
    }

    #[test]
    fn test_response_synthesizes_call_ids() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me "},
                    {"text": "look."},
                    {"functionCall": {"name": "list_pods", "args": {"namespace": "prod"}}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let message = from_response(response).unwrap();
        assert_eq!(message.content, "Let me look.");
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "call_list_pods");
        assert_eq!(message.tool_calls[0].arguments, "{\"namespace\":\"prod\"}");
    }

    #[test]
    fn test_no_candidates_is_empty_response() {
        let err = from_response(GenerateContentResponse::default()).unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[test]
    fn test_tools_become_function_declarations() {
        let tools = [
            ToolSchema::new("get_cluster_info", "Cluster summary", JsonSchema::object()),
            ToolSchema::new(
                "list_pods",
                "List pods",
                JsonSchema::object().property("namespace", JsonSchema::string()),
            ),
        ];
        let value = serde_json::to_value(to_request(&[Message::user("x")], &tools)).unwrap();
        let decls = &value["tools"][0]["functionDeclarations"];
        assert!(decls[0].get("parameters").is_none());
        assert_eq!(decls[1]["parameters"]["type"], "OBJECT");
    }
}
