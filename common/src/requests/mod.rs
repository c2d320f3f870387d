//! Payloads exchanged with the jobs API.
//!
//! The backend answers in JSON for everything except artifacts and, depending
//! on the deployment, the log tail. Submission is a multipart form whose
//! parameter part comes in two flavours, see [`ParamEncoding`].

use serde::{Deserialize, Serialize};

use crate::jobs::{JobId, JobStatus};
use crate::model::params::ParamBag;
use crate::model::tool::Tool;

/// Response of `POST /jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

/// Response of `GET /jobs/{id}`. Extra fields the backend adds are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// JSON flavour of `GET /jobs/{id}/logs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsResponse {
    pub log: String,
}

/// Error body returned by the backend on rejected requests, `{ "detail": ... }`.
/// `detail` is usually a string but validation failures return a list.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// How the parameter bag is laid out in the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamEncoding {
    /// One form field per option, named after the descriptor's wire name.
    #[default]
    Flattened,
    /// A single `params` field holding the bag as JSON.
    JsonBlob,
}

/// Builds the non-file fields of a submission form, `tool` first.
///
/// Flattened encoding skips empty text options, the backend treats a missing
/// field as "use the default".
pub fn submit_fields(
    tool: Tool,
    params: &ParamBag,
    encoding: ParamEncoding,
) -> Result<Vec<(String, String)>, serde_json::Error> {
    let mut fields = vec![("tool".to_string(), tool.key().to_string())];
    match encoding {
        ParamEncoding::Flattened => {
            let descriptor = tool.descriptor();
            fields.extend(
                params
                    .iter()
                    .filter(|(_, value)| !value.is_empty())
                    .map(|(name, value)| {
                        (descriptor.wire_name(name).to_string(), value.to_form_value())
                    }),
            );
        }
        ParamEncoding::JsonBlob => {
            fields.push(("params".to_string(), serde_json::to_string(params)?));
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::params::ParamValue;

    #[test]
    fn flattened_mpnn_fields_use_wire_names() {
        let params = Tool::ProteinMpnn.descriptor().defaults();
        let fields = submit_fields(Tool::ProteinMpnn, &params, ParamEncoding::Flattened).unwrap();

        assert_eq!(fields[0], ("tool".to_string(), "proteinmpnn".to_string()));
        assert!(fields.contains(&("mpnn_num_seq".to_string(), "10".to_string())));
        assert!(fields.contains(&("mpnn_sampling_temp".to_string(), "0.2".to_string())));
        assert!(!fields.iter().any(|(name, _)| name == "mpnn_freeze_spec"));
    }

    #[test]
    fn alphafold_scenario_fields() {
        let params = ParamBag::new()
            .with("model_preset", ParamValue::Text("monomer".into()))
            .with("db_preset", ParamValue::Text("full_dbs".into()))
            .with("max_template_date", ParamValue::Text("2024-12-31".into()));
        let fields = submit_fields(Tool::AlphaFold, &params, ParamEncoding::Flattened).unwrap();

        assert_eq!(
            fields,
            vec![
                ("tool".to_string(), "alphafold".to_string()),
                ("db_preset".to_string(), "full_dbs".to_string()),
                ("max_template_date".to_string(), "2024-12-31".to_string()),
                ("model_preset".to_string(), "monomer".to_string()),
            ]
        );
    }

    #[test]
    fn json_blob_keeps_bag_names() {
        let params = ParamBag::new().with("batch_size", ParamValue::Integer(2));
        let fields = submit_fields(Tool::ProteinMpnn, &params, ParamEncoding::JsonBlob).unwrap();
        assert_eq!(fields[1], ("params".to_string(), r#"{"batch_size":2}"#.to_string()));
    }

    #[test]
    fn error_detail_accepts_strings_and_lists() {
        let err: ErrorDetail = serde_json::from_str(r#"{"detail":"ProteinMPNN expects a .pdb or .cif"}"#).unwrap();
        assert_eq!(err.message(), "ProteinMPNN expects a .pdb or .cif");

        let err: ErrorDetail = serde_json::from_str(r#"{"detail":[{"loc":["body","file"]}]}"#).unwrap();
        assert!(err.message().starts_with('['));
    }

    #[test]
    fn status_response_ignores_extra_fields() {
        let body = r#"{"id":"ab12","tool":"alphafold","status":"finished","exit_code":0,"created_at":1.5}"#;
        let status: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(status.status, JobStatus::Finished);
        assert_eq!(status.exit_code, Some(0));
    }
}
