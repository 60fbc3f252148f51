//! Interpretation of a completed job's `output` payload.
//!
//! A worker can report success at the job level while its handler
//! reports failure inside the payload, so a `COMPLETED` status alone is
//! not enough to decide the outcome.

use serde_json::Value;

/// What a completed job actually delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDescriptor {
    /// The handler reported a failure inside an otherwise completed job.
    Failed(String),
    /// The video is embedded as base64.
    Inline {
        data: String,
        filename: Option<String>,
    },
    /// The video lives elsewhere (URL or shared-storage path).
    Reference {
        locator: String,
        filename: Option<String>,
    },
    /// Nothing usable was delivered.
    Missing,
}

impl OutputDescriptor {
    pub fn parse(output: Option<&Value>) -> Self {
        let Some(output) = output else {
            return Self::Missing;
        };

        let object = match output {
            Value::Object(map) => map,
            Value::String(s) if !s.trim().is_empty() => {
                return Self::Reference {
                    locator: s.trim().to_string(),
                    filename: None,
                }
            }
            _ => return Self::Missing,
        };

        if let Some(error) = object.get("error").filter(|v| !v.is_null()) {
            return Self::Failed(value_text(error));
        }
        if let Some(status) = object.get("status").and_then(Value::as_str) {
            if !status.eq_ignore_ascii_case("success") {
                return Self::Failed(format!("Handler reported status '{status}'"));
            }
        }

        let filename = non_empty_str(object.get("video_filename"));

        if let Some(data) = non_empty_str(object.get("video_data")) {
            return Self::Inline { data, filename };
        }

        for key in ["video_url", "download_url", "video_path"] {
            if let Some(locator) = non_empty_str(object.get(key)) {
                return Self::Reference { locator, filename };
            }
        }

        Self::Missing
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inline_payload() {
        let out = json!({
            "status": "success",
            "video_data": "AAAA",
            "video_filename": "clip.mp4"
        });
        assert_eq!(
            OutputDescriptor::parse(Some(&out)),
            OutputDescriptor::Inline {
                data: "AAAA".into(),
                filename: Some("clip.mp4".into()),
            }
        );
    }

    #[test]
    fn path_payload_is_a_reference() {
        let out = json!({ "status": "success", "video_path": "/workspace/out/a.mp4" });
        assert_eq!(
            OutputDescriptor::parse(Some(&out)),
            OutputDescriptor::Reference {
                locator: "/workspace/out/a.mp4".into(),
                filename: None,
            }
        );
    }

    #[test]
    fn url_string_is_a_reference() {
        let out = json!("https://cdn.example.com/v.mp4");
        assert!(matches!(
            OutputDescriptor::parse(Some(&out)),
            OutputDescriptor::Reference { .. }
        ));
    }

    #[test]
    fn embedded_error_wins_over_data() {
        let out = json!({ "error": "CUDA out of memory", "video_data": "AAAA" });
        assert_eq!(
            OutputDescriptor::parse(Some(&out)),
            OutputDescriptor::Failed("CUDA out of memory".into())
        );
    }

    #[test]
    fn non_success_status_is_a_failure() {
        let out = json!({ "status": "error" });
        assert!(matches!(
            OutputDescriptor::parse(Some(&out)),
            OutputDescriptor::Failed(_)
        ));
    }

    #[test]
    fn empty_payloads_are_missing() {
        assert_eq!(OutputDescriptor::parse(None), OutputDescriptor::Missing);
        assert_eq!(
            OutputDescriptor::parse(Some(&json!({ "status": "success" }))),
            OutputDescriptor::Missing
        );
        assert_eq!(
            OutputDescriptor::parse(Some(&json!({ "video_data": "" }))),
            OutputDescriptor::Missing
        );
    }
}
