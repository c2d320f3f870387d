//! Tool descriptor table.
//!
//! Every backend pipeline the console can drive is described once here: which
//! input files it accepts, which options it takes and under which form field
//! names, and what the defaults are. The submission, persistence and form
//! rendering code are all driven from this table instead of being duplicated
//! per tool.

use serde::{Deserialize, Serialize};

use crate::model::params::{ParamBag, ParamValue};

/// Backend pipeline that processes a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "alphafold")]
    AlphaFold,
    #[serde(rename = "proteinmpnn")]
    ProteinMpnn,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::AlphaFold, Tool::ProteinMpnn];

    /// Identifier sent as the `tool` form field and used as storage key.
    pub fn key(self) -> &'static str {
        match self {
            Tool::AlphaFold => "alphafold",
            Tool::ProteinMpnn => "proteinmpnn",
        }
    }

    pub fn from_key(key: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.key() == key)
    }

    pub fn descriptor(self) -> &'static ToolDescriptor {
        match self {
            Tool::AlphaFold => &ALPHAFOLD,
            Tool::ProteinMpnn => &PROTEIN_MPNN,
        }
    }
}

/// Shape of an option, used to parse form input and to build defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Choice(&'static [&'static str]),
    /// ISO `YYYY-MM-DD` date, sent as text.
    Date,
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64, step: f64 },
    Flag,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamField {
    /// Name used inside the parameter bag and the JSON blob encoding.
    pub name: &'static str,
    /// Name used when the bag is flattened into individual form fields.
    pub wire_name: &'static str,
    pub kind: FieldKind,
    pub default: &'static str,
}

impl ParamField {
    pub fn default_value(&self) -> ParamValue {
        self.parse_input(self.default)
    }

    /// Converts raw form input into a typed value. Input that does not parse
    /// for the field's kind falls back to the default.
    pub fn parse_input(&self, raw: &str) -> ParamValue {
        let raw = raw.trim();
        match self.kind {
            FieldKind::Choice(_) | FieldKind::Date | FieldKind::Text => {
                ParamValue::Text(raw.to_string())
            }
            FieldKind::Integer { .. } => raw
                .parse()
                .map(ParamValue::Integer)
                .unwrap_or_else(|_| self.fallback()),
            FieldKind::Float { .. } => raw
                .parse()
                .map(ParamValue::Float)
                .unwrap_or_else(|_| self.fallback()),
            FieldKind::Flag => ParamValue::Flag(matches!(raw, "true" | "on" | "1")),
        }
    }

    fn fallback(&self) -> ParamValue {
        match self.kind {
            FieldKind::Integer { min, .. } => ParamValue::Integer(self.default.parse().unwrap_or(min)),
            FieldKind::Float { min, .. } => ParamValue::Float(self.default.parse().unwrap_or(min)),
            _ => ParamValue::Text(self.default.to_string()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ToolDescriptor {
    pub tool: Tool,
    pub label: &'static str,
    pub accepted_extensions: &'static [&'static str],
    pub input_hint: &'static str,
    pub fields: &'static [ParamField],
}

impl ToolDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static ParamField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn defaults(&self) -> ParamBag {
        self.fields
            .iter()
            .map(|field| (field.name.to_string(), field.default_value()))
            .collect()
    }

    /// Value for the `accept` attribute of a file input, e.g. `.fa,.fasta`.
    pub fn accept_attribute(&self) -> String {
        self.accepted_extensions.join(",")
    }

    /// Form field name for an option when the bag is flattened. Options that
    /// are not in the table are sent under their own name.
    pub fn wire_name<'a>(&self, name: &'a str) -> &'a str {
        match self.field(name) {
            Some(field) => field.wire_name,
            None => name,
        }
    }
}

static ALPHAFOLD: ToolDescriptor = ToolDescriptor {
    tool: Tool::AlphaFold,
    label: "AlphaFold",
    accepted_extensions: &[".fa", ".fasta"],
    input_hint: "Upload FASTA (.fa/.fasta)",
    fields: &[
        ParamField {
            name: "model_preset",
            wire_name: "model_preset",
            kind: FieldKind::Choice(&["monomer", "multimer"]),
            default: "monomer",
        },
        ParamField {
            name: "db_preset",
            wire_name: "db_preset",
            kind: FieldKind::Choice(&["full_dbs", "reduced_dbs"]),
            default: "full_dbs",
        },
        ParamField {
            name: "max_template_date",
            wire_name: "max_template_date",
            kind: FieldKind::Date,
            default: "2024-12-31",
        },
        ParamField {
            name: "models_to_relax",
            wire_name: "models_to_relax",
            kind: FieldKind::Choice(&["none", "best", "all"]),
            default: "none",
        },
        ParamField {
            name: "use_gpu_relax",
            wire_name: "use_gpu_relax",
            kind: FieldKind::Flag,
            default: "false",
        },
    ],
};

static PROTEIN_MPNN: ToolDescriptor = ToolDescriptor {
    tool: Tool::ProteinMpnn,
    label: "ProteinMPNN",
    accepted_extensions: &[".pdb", ".cif"],
    input_hint: "Upload PDB/CIF (.pdb/.cif)",
    fields: &[
        ParamField {
            name: "model_name",
            wire_name: "mpnn_model_name",
            kind: FieldKind::Choice(&[
                "v_48_002",
                "v_48_010",
                "v_48_020",
                "v_48_030",
                "ca_48_010",
                "s_48_020",
            ]),
            default: "v_48_020",
        },
        ParamField {
            name: "num_seq_per_target",
            wire_name: "mpnn_num_seq",
            kind: FieldKind::Integer { min: 1, max: 200 },
            default: "10",
        },
        ParamField {
            name: "batch_size",
            wire_name: "mpnn_batch_size",
            kind: FieldKind::Integer { min: 1, max: 32 },
            default: "1",
        },
        ParamField {
            name: "sampling_temp",
            wire_name: "mpnn_sampling_temp",
            kind: FieldKind::Float { min: 0.05, max: 1.5, step: 0.01 },
            default: "0.2",
        },
        ParamField {
            name: "freeze_spec",
            wire_name: "mpnn_freeze_spec",
            kind: FieldKind::Text,
            default: "",
        },
    ],
};
