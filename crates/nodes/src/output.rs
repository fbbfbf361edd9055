//! Locating the JSON result of a completed session.
//!
//! The agent may deliver its answer in three places. They are tried in order:
//!
//! 1. `structured_output`, when it holds more than an attachment list;
//! 2. a JSON attachment whose name starts with the expected stem;
//! 3. the first `{...}` block in an agent message, newest message first
//!    (`[...]` for [`OutputName::Issues`], which is a bare list).

use pipeline::{AnalyzerError, SessionApi, SessionDetails};
use serde_json::Value;

/// Which result a session was asked to produce. Doubles as the attachment
/// file-name stem the agent is told to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputName {
    Issues,
    Scan,
    Analysis,
    Plan,
    Execution,
}

impl OutputName {
    pub fn stem(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::Scan => "scan",
            Self::Analysis => "analysis",
            Self::Plan => "plan",
            Self::Execution => "execution",
        }
    }

    fn is_list(self) -> bool {
        matches!(self, Self::Issues)
    }
}

/// Extracts the JSON result named `name` from `details`.
pub async fn extract_json(
    api: &dyn SessionApi,
    details: &SessionDetails,
    name: OutputName,
) -> Result<Value, AnalyzerError> {
    if let Some(value) = details.structured_output.as_ref().filter(|v| is_result(v)) {
        return Ok(value.clone());
    }

    for attachment in details
        .attachments
        .iter()
        .filter(|a| a.is_json_named(name.stem()))
    {
        let content = match api.download_attachment(attachment).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    session_id = %details.id,
                    attachment = %attachment.name,
                    error = %e,
                    "attachment download failed"
                );
                continue;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::warn!(
                session_id = %details.id,
                attachment = %attachment.name,
                error = %e,
                "attachment is not valid JSON"
            ),
        }
    }

    let find = if name.is_list() {
        find_json_list
    } else {
        find_json_block
    };
    details
        .agent_messages_newest_first()
        .find_map(|m| find(&m.text))
        .ok_or_else(|| {
            AnalyzerError::upstream(format!(
                "no {} JSON found in session {}",
                name.stem(),
                details.id
            ))
        })
}

/// A non-empty object or array that is not just `{"attachments": [...]}`.
fn is_result(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.keys().any(|k| k != "attachments"),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// First complete JSON object embedded in free text.
pub fn find_json_block(text: &str) -> Option<Value> {
    find_embedded(text, '{', Value::is_object)
}

/// First complete JSON array embedded in free text.
pub fn find_json_list(text: &str) -> Option<Value> {
    find_embedded(text, '[', Value::is_array)
}

fn find_embedded(text: &str, open: char, accept: fn(&Value) -> bool) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == open)
        .find_map(|(start, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) if accept(&value) => Some(value),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use pipeline::{MessageKind, SessionId, SessionMessage, SessionStatus};
    use serde_json::json;

    use super::*;
    use crate::testing::FakeSessionApi;

    fn details() -> SessionDetails {
        SessionDetails {
            id: SessionId::new("s-1").unwrap(),
            status: SessionStatus::Completed,
            remote_status: "finished".into(),
            structured_output: None,
            messages: vec![],
            attachments: vec![],
            pull_request_url: None,
        }
    }

    fn agent(text: &str) -> SessionMessage {
        SessionMessage {
            kind: MessageKind::Agent,
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn structured_output_wins() {
        let mut d = details();
        d.structured_output = Some(json!({"summary": "s"}));
        d.messages = vec![agent(r#"{"summary": "from message"}"#)];

        let v = extract_json(&FakeSessionApi::new(), &d, OutputName::Plan)
            .await
            .unwrap();
        assert_eq!(v, json!({"summary": "s"}));
    }

    #[tokio::test]
    async fn attachment_only_structured_output_falls_through_to_attachment() {
        let api = FakeSessionApi::new().with_download("u-2", r#"{"action_plan": []}"#);
        let mut d = details();
        d.structured_output = Some(json!({"attachments": ["x"]}));
        d.attachments = vec![
            pipeline::Attachment {
                uuid: "u-1".into(),
                name: "notes.txt".into(),
                url: String::new(),
            },
            pipeline::Attachment {
                uuid: "u-2".into(),
                name: "plan.json".into(),
                url: String::new(),
            },
        ];

        let v = extract_json(&api, &d, OutputName::Plan).await.unwrap();
        assert_eq!(v, json!({"action_plan": []}));
    }

    #[tokio::test]
    async fn falls_back_to_newest_agent_message() {
        let mut d = details();
        d.messages = vec![
            agent(r#"Earlier: {"feasibility_score": 10}"#),
            SessionMessage {
                kind: MessageKind::User,
                text: r#"{"feasibility_score": 99}"#.into(),
            },
            agent(r#"Done. Result: {"feasibility_score": 70} (see above)"#),
        ];

        let v = extract_json(&FakeSessionApi::new(), &d, OutputName::Analysis)
            .await
            .unwrap();
        assert_eq!(v, json!({"feasibility_score": 70}));
    }

    #[tokio::test]
    async fn nothing_found_is_upstream_failure() {
        let mut d = details();
        d.messages = vec![agent("I could not finish.")];

        let err = extract_json(&FakeSessionApi::new(), &d, OutputName::Scan)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no scan JSON found in session s-1"));
    }

    #[test]
    fn json_block_skips_braces_that_are_not_json() {
        assert_eq!(
            find_json_block(r#"use {x} then {"a": {"b": 1}} and {"c": 2}"#),
            Some(json!({"a": {"b": 1}}))
        );
        assert_eq!(find_json_block("no json {here"), None);
    }

    #[tokio::test]
    async fn issue_list_is_read_from_message_array() {
        let mut d = details();
        d.messages = vec![agent(
            r#"Here are the issues: [{"number": 4, "title": "a"}, {"number": 5, "title": "b"}]"#,
        )];

        let v = extract_json(&FakeSessionApi::new(), &d, OutputName::Issues)
            .await
            .unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(2));
        assert_eq!(v[1]["number"], 5);
    }

    #[test]
    fn json_list_skips_bracketed_prose() {
        assert_eq!(
            find_json_list(r#"see [docs] then [{"n": 1}]"#),
            Some(json!([{"n": 1}]))
        );
        assert_eq!(find_json_list(r#"only {"n": 1}"#), None);
    }
}
