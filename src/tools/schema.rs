use std::str::FromStr;

use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::ExchangeError;
use crate::precision;

/// Type of a single tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Market symbol, e.g. `BTC` or `kPEPE`. Trimmed; case is kept and
    /// resolved against the exchange universe.
    Symbol,
    /// 0x-prefixed 20-byte hex address.
    Address,
    /// Exact decimal greater than zero, given as a JSON number or string.
    PositiveDecimal,
    /// Unsigned integer within an inclusive range.
    Integer { min: u64, max: u64 },
    Boolean,
    /// One of a fixed set of lower-case values, matched case-insensitively.
    Enum(&'static [&'static str]),
}

impl ParamType {
    pub const ANY_INTEGER: ParamType = ParamType::Integer {
        min: 0,
        max: u64::MAX,
    };

    fn json_schema(&self) -> Value {
        match self {
            ParamType::Symbol => json!({"type": "string", "pattern": "^[A-Za-z0-9]+$"}),
            ParamType::Address => json!({"type": "string", "pattern": "^0x[0-9a-fA-F]{40}$"}),
            ParamType::PositiveDecimal => json!({"type": ["string", "number"]}),
            ParamType::Integer { min, max } => {
                let mut schema = json!({"type": "integer", "minimum": min});
                if *max != u64::MAX {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Enum(values) => json!({"type": "string", "enum": values}),
        }
    }

    fn normalize(&self, name: &str, value: &Value) -> Result<Value, String> {
        match self {
            ParamType::Symbol => {
                let raw = expect_str(name, value)?.trim();
                if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(format!("'{}' is not a valid symbol: '{}'", name, raw));
                }
                Ok(Value::String(raw.to_string()))
            }
            ParamType::Address => {
                let raw = expect_str(name, value)?.trim();
                if raw.len() != 42 || !raw.starts_with("0x") {
                    return Err(format!("'{}' must be a 0x-prefixed 40 hex digit address", name));
                }
                let address = Address::from_str(raw)
                    .map_err(|e| format!("'{}' is not a valid address: {}", name, e))?;
                Ok(Value::String(address.to_string()))
            }
            ParamType::PositiveDecimal => {
                let decimal = precision::parse_decimal(value)
                    .map_err(|e| format!("'{}' is not a valid decimal: {}", name, e))?;
                if decimal.is_sign_negative() || decimal.is_zero() {
                    return Err(format!("'{}' must be greater than zero", name));
                }
                Ok(Value::String(decimal.to_string()))
            }
            ParamType::Integer { min, max } => {
                let parsed = match value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                };
                let n = parsed
                    .ok_or_else(|| format!("'{}' must be a non-negative integer", name))?;
                if n < *min || n > *max {
                    return Err(format!(
                        "'{}' must be between {} and {}, got {}",
                        name, min, max, n
                    ));
                }
                Ok(json!(n))
            }
            ParamType::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' must be a boolean", name)),
            },
            ParamType::Enum(values) => {
                let raw = expect_str(name, value)?.trim().to_ascii_lowercase();
                if !values.contains(&raw.as_str()) {
                    return Err(format!(
                        "'{}' must be one of {}, got '{}'",
                        name,
                        values.join(", "),
                        raw
                    ));
                }
                Ok(Value::String(raw))
            }
        }
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("'{}' must be a string", name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub ty: ParamType,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        ParamSpec {
            name,
            description,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        ParamSpec {
            name,
            description,
            ty,
            required: false,
        }
    }
}

/// Ordered parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        InputSchema { params }
    }

    /// JSON Schema object advertised through `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut schema = param.ty.json_schema();
            schema["description"] = Value::String(param.description.to_string());
            properties.insert(param.name.to_string(), schema);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check `arguments` against the schema and normalize every value.
    ///
    /// `null` is treated as an empty argument object. Unknown argument names
    /// are rejected; an explicit `null` counts as absent.
    pub fn validate(&self, arguments: &Value) -> Result<ValidatedArgs, String> {
        let empty = Map::new();
        let object = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err("arguments must be a JSON object".to_string()),
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(format!("unknown argument '{}'", unknown));
        }

        let mut normalized = Map::new();
        for param in &self.params {
            match object.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(format!("missing required argument '{}'", param.name));
                    }
                }
                Some(value) => {
                    normalized.insert(
                        param.name.to_string(),
                        param.ty.normalize(param.name, value)?,
                    );
                }
            }
        }

        Ok(ValidatedArgs(normalized))
    }
}

/// Arguments that passed schema validation, in normalized form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    /// Deserialize into a typed request struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ExchangeError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| ExchangeError::InvalidArguments(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
