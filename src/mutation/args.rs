//! Mutation arguments.

use serde_json::{Map, Value};

/// Normalize raw `args` from the wire into an object.
///
/// Clients send either an object or a one-element array wrapping one. The
/// first element is used; missing, null, or an empty array become `{}`.
pub fn normalize_args(raw: Value) -> Value {
    match raw {
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(first) => first,
        },
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

/// Expected JSON type of a declared argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl ArgType {
    fn matches(self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Integer => value.is_i64() || value.is_u64(),
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Object => value.is_object(),
            ArgType::Array => value.is_array(),
            ArgType::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::Object => "object",
            ArgType::Array => "array",
            ArgType::Any => "any",
        }
    }
}

#[derive(Debug, Clone)]
struct ArgSpec {
    name: String,
    ty: ArgType,
    required: bool,
}

/// Declared arguments of a mutation.
///
/// # Example
///
/// ```rust,ignore
/// let schema = ArgSchema::new()
///     .required("id", ArgType::String)
///     .required("title", ArgType::String)
///     .optional("done", ArgType::Boolean);
///
/// fn validate_args(&self, args: Value) -> Result<Value, Vec<String>> {
///     self.schema.validate(args)
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    specs: Vec<ArgSpec>,
    allow_unknown: bool,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.specs.push(ArgSpec {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: ArgType) -> Self {
        self.specs.push(ArgSpec {
            name: name.into(),
            ty,
            required: false,
        });
        self
    }

    /// Accept keys that were not declared instead of reporting them.
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    /// Validate `args`, collecting every problem.
    ///
    /// Optional arguments may be absent or null.
    pub fn validate(&self, args: Value) -> Result<Value, Vec<String>> {
        let Some(object) = args.as_object() else {
            return Err(vec![format!(
                "Expected arguments to be an object, got {}",
                json_type(&args)
            )]);
        };

        let mut errors = Vec::new();

        for spec in &self.specs {
            match object.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    errors.push(format!("Missing required argument: {}", spec.name));
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.ty.matches(value) => {
                    errors.push(format!(
                        "Argument {} must be {}, got {}",
                        spec.name,
                        spec.ty.name(),
                        json_type(value)
                    ));
                }
                Some(_) => {}
            }
        }

        if !self.allow_unknown {
            let mut unknown: Vec<&String> = object
                .keys()
                .filter(|key| !self.specs.iter().any(|spec| &spec.name == *key))
                .collect();
            unknown.sort();
            for key in unknown {
                errors.push(format!("Unexpected argument: {key}"));
            }
        }

        if errors.is_empty() {
            Ok(args)
        } else {
            Err(errors)
        }
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
