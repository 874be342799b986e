use std::collections::BTreeMap;

use serde::Serialize;

use crate::WeftError;
use crate::WeftResult;

/// Mapping from string keys to [`Value`]s, ordered by key.
pub type Mapping = BTreeMap<String, Value>;

/// A parsed metadata tree.
///
/// Mirrors a YAML document but with string keys only, so merge logic can match
/// on each shape exhaustively.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(serde_json::Number),
	String(String),
	Sequence(Vec<Value>),
	Mapping(Mapping),
}

impl Value {
	/// Parse a YAML document. An empty document yields an empty mapping.
	pub fn from_yaml_str(content: &str, path_display: &str) -> WeftResult<Self> {
		let parsed: serde_yaml_ng::Value =
			serde_yaml_ng::from_str(content).map_err(|e| WeftError::MetadataParse {
				path: path_display.to_string(),
				reason: e.to_string(),
			})?;

		match parsed {
			serde_yaml_ng::Value::Null => Ok(Self::Mapping(Mapping::new())),
			other => Self::from_yaml(other, path_display),
		}
	}

	/// Parse a YAML document that must have a mapping at its root.
	pub fn mapping_from_yaml_str(content: &str, path_display: &str) -> WeftResult<Self> {
		let value = Self::from_yaml_str(content, path_display)?;
		if value.is_mapping() {
			Ok(value)
		} else {
			Err(WeftError::MetadataParse {
				path: path_display.to_string(),
				reason: format!(
					"expected a mapping at the document root, found {}",
					value.type_name()
				),
			})
		}
	}

	/// Interpret a command line scalar (`--value key=3`) the way YAML would.
	pub fn from_scalar(raw: &str) -> Self {
		match serde_yaml_ng::from_str::<serde_yaml_ng::Value>(raw) {
			Ok(
				value @ (serde_yaml_ng::Value::Bool(_)
				| serde_yaml_ng::Value::Number(_)
				| serde_yaml_ng::Value::String(_)),
			) => Self::from_yaml(value, raw).unwrap_or_else(|_| Self::String(raw.to_string())),
			_ => Self::String(raw.to_string()),
		}
	}

	fn from_yaml(value: serde_yaml_ng::Value, path_display: &str) -> WeftResult<Self> {
		let converted = match value {
			serde_yaml_ng::Value::Null => Self::Null,
			serde_yaml_ng::Value::Bool(b) => Self::Bool(b),
			serde_yaml_ng::Value::Number(n) => Self::Number(yaml_number(&n, path_display)?),
			serde_yaml_ng::Value::String(s) => Self::String(s),
			serde_yaml_ng::Value::Sequence(items) => {
				let items: WeftResult<Vec<Self>> = items
					.into_iter()
					.map(|item| Self::from_yaml(item, path_display))
					.collect();
				Self::Sequence(items?)
			}
			serde_yaml_ng::Value::Mapping(entries) => {
				let mut map = Mapping::new();
				for (key, value) in entries {
					map.insert(yaml_key(key, path_display)?, Self::from_yaml(value, path_display)?);
				}
				Self::Mapping(map)
			}
			serde_yaml_ng::Value::Tagged(tagged) => Self::from_yaml(tagged.value, path_display)?,
		};

		Ok(converted)
	}

	/// Convert a `toml::Value` (from `[values]` in `weft.toml`).
	pub fn from_toml(value: toml::Value, path_display: &str) -> WeftResult<Self> {
		let converted = match value {
			toml::Value::String(s) => Self::String(s),
			toml::Value::Integer(i) => Self::Number(i.into()),
			toml::Value::Float(f) => {
				Self::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
					WeftError::ConfigParse(format!(
						"unrepresentable float `{f}` in `{path_display}`"
					))
				})?)
			}
			toml::Value::Boolean(b) => Self::Bool(b),
			toml::Value::Datetime(dt) => Self::String(dt.to_string()),
			toml::Value::Array(items) => {
				let items: WeftResult<Vec<Self>> = items
					.into_iter()
					.map(|item| Self::from_toml(item, path_display))
					.collect();
				Self::Sequence(items?)
			}
			toml::Value::Table(table) => {
				let mut map = Mapping::new();
				for (key, value) in table {
					map.insert(key, Self::from_toml(value, path_display)?);
				}
				Self::Mapping(map)
			}
		};

		Ok(converted)
	}

	pub fn is_mapping(&self) -> bool {
		matches!(self, Self::Mapping(_))
	}

	pub fn as_mapping(&self) -> Option<&Mapping> {
		match self {
			Self::Mapping(map) => Some(map),
			_ => None,
		}
	}

	/// Look up a key when this value is a mapping.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.as_mapping().and_then(|map| map.get(key))
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Number(_) => "number",
			Self::String(_) => "string",
			Self::Sequence(_) => "sequence",
			Self::Mapping(_) => "mapping",
		}
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Self::Sequence(value)
	}
}

impl From<Mapping> for Value {
	fn from(value: Mapping) -> Self {
		Self::Mapping(value)
	}
}

fn yaml_number(number: &serde_yaml_ng::Number, path_display: &str) -> WeftResult<serde_json::Number> {
	if let Some(i) = number.as_i64() {
		return Ok(i.into());
	}
	if let Some(u) = number.as_u64() {
		return Ok(u.into());
	}

	number
		.as_f64()
		.and_then(serde_json::Number::from_f64)
		.ok_or_else(|| {
			WeftError::MetadataParse {
				path: path_display.to_string(),
				reason: format!("unrepresentable number `{number}`"),
			}
		})
}

/// Scalar keys are stringified; structured keys are rejected.
fn yaml_key(key: serde_yaml_ng::Value, path_display: &str) -> WeftResult<String> {
	match key {
		serde_yaml_ng::Value::String(s) => Ok(s),
		serde_yaml_ng::Value::Bool(b) => Ok(b.to_string()),
		serde_yaml_ng::Value::Number(n) => Ok(n.to_string()),
		serde_yaml_ng::Value::Null => Ok("null".to_string()),
		serde_yaml_ng::Value::Tagged(tagged) => yaml_key(tagged.value, path_display),
		serde_yaml_ng::Value::Sequence(_) | serde_yaml_ng::Value::Mapping(_) => {
			Err(WeftError::MetadataParse {
				path: path_display.to_string(),
				reason: "mapping keys must be scalars".to_string(),
			})
		}
	}
}
