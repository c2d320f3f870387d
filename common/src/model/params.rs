use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single tool option value.
///
/// The backend treats every option as an opaque form value, so the client only
/// distinguishes the handful of shapes the parameter forms produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Rendering used for flattened multipart fields.
    pub fn to_form_value(&self) -> String {
        match self {
            ParamValue::Flag(flag) => flag.to_string(),
            ParamValue::Integer(value) => value.to_string(),
            ParamValue::Float(value) => value.to_string(),
            ParamValue::Text(text) => text.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ParamValue::Text(text) if text.trim().is_empty())
    }
}

/// Tool-specific option bag, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(BTreeMap<String, ParamValue>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `self` with every entry of `overrides` laid on top.
    pub fn overlaid_with(mut self, overrides: &ParamBag) -> ParamBag {
        for (name, value) in overrides.iter() {
            self.0.insert(name.clone(), value.clone());
        }
        self
    }
}

impl FromIterator<(String, ParamValue)> for ParamBag {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        ParamBag(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_keep_their_shape() {
        let bag: ParamBag = serde_json::from_str(
            r#"{"num_seq_per_target":10,"sampling_temp":0.2,"use_gpu_relax":false,"model_name":"v_48_020"}"#,
        )
        .unwrap();

        assert_eq!(bag.get("num_seq_per_target"), Some(&ParamValue::Integer(10)));
        assert_eq!(bag.get("sampling_temp"), Some(&ParamValue::Float(0.2)));
        assert_eq!(bag.get("use_gpu_relax"), Some(&ParamValue::Flag(false)));
        assert_eq!(
            bag.get("model_name"),
            Some(&ParamValue::Text("v_48_020".to_string()))
        );
    }

    #[test]
    fn overlay_replaces_and_keeps_unknown_keys() {
        let defaults = ParamBag::new()
            .with("batch_size", ParamValue::Integer(1))
            .with("model_name", ParamValue::Text("v_48_020".into()));
        let stored = ParamBag::new()
            .with("batch_size", ParamValue::Integer(4))
            .with("legacy_option", ParamValue::Flag(true));

        let merged = defaults.overlaid_with(&stored);

        assert_eq!(merged.get("batch_size"), Some(&ParamValue::Integer(4)));
        assert_eq!(merged.get("legacy_option"), Some(&ParamValue::Flag(true)));
        assert_eq!(merged.len(), 3);
    }
}
