//! Input/output JSON Schema contracts (draft-07).
//!
//! A [`SchemaPair`] holds the two schema documents a node declares and a
//! compiled validator for the input side. Output validation compiles a fresh
//! validator per call.
//!
//! Validation is exhaustive rather than fail-fast: every violation is
//! rendered as `"<json-pointer-path> <message>"`, the renderings are sorted,
//! and they are joined with `", "` into a single [`SchemaError::Violations`].

use std::sync::{Arc, LazyLock};

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SchemaError;

// `{}` accepts every instance and always compiles.
static ACCEPT_ALL: LazyLock<Arc<Validator>> = LazyLock::new(|| {
  Arc::new(compile(&json!({})).expect("empty schema compiles"))
});

/// The schema documents of a node, as returned by [`SchemaPair::get_schemas`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schemas {
  pub input: Value,
  pub output: Value,
}

/// A node's input and output schemas plus the compiled input validator.
#[derive(Clone)]
pub struct SchemaPair {
  input: Value,
  output: Value,
  input_validator: Arc<Validator>,
}

impl SchemaPair {
  /// Compile a schema pair.
  ///
  /// Only the input schema is compiled up front; an invalid output schema
  /// surfaces on the first output validation.
  pub fn new(input: Value, output: Value) -> Result<Self, SchemaError> {
    let input_validator = Arc::new(compile(&input)?);
    Ok(Self {
      input,
      output,
      input_validator,
    })
  }

  /// Replace both schemas and rebuild the input validator.
  ///
  /// On error the previous pair is kept.
  pub fn set_schemas(&mut self, input: Value, output: Value) -> Result<(), SchemaError> {
    *self = Self::new(input, output)?;
    Ok(())
  }

  /// The currently configured schemas, unchanged.
  pub fn get_schemas(&self) -> Schemas {
    Schemas {
      input: self.input.clone(),
      output: self.output.clone(),
    }
  }

  pub fn input(&self) -> &Value {
    &self.input
  }

  pub fn output(&self) -> &Value {
    &self.output
  }

  /// Validate against the input schema using the cached validator.
  pub fn validate_input(&self, instance: &Value) -> Result<(), SchemaError> {
    check(&self.input_validator, instance)
  }

  /// Validate against the output schema with a freshly compiled validator.
  pub fn validate_output(&self, instance: &Value) -> Result<(), SchemaError> {
    validate(instance, &self.output)
  }
}

impl Default for SchemaPair {
  fn default() -> Self {
    Self {
      input: json!({}),
      output: json!({}),
      input_validator: Arc::clone(&ACCEPT_ALL),
    }
  }
}

impl std::fmt::Debug for SchemaPair {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SchemaPair")
      .field("input", &self.input)
      .field("output", &self.output)
      .finish_non_exhaustive()
  }
}

/// Validate `instance` against `schema`, reporting every violation.
pub fn validate(instance: &Value, schema: &Value) -> Result<(), SchemaError> {
  let validator = compile(schema)?;
  check(&validator, instance)
}

fn compile(schema: &Value) -> Result<Validator, SchemaError> {
  jsonschema::draft7::new(schema).map_err(|e| SchemaError::invalid_schema(e.to_string()))
}

fn check(validator: &Validator, instance: &Value) -> Result<(), SchemaError> {
  let violations: Vec<String> = validator
    .iter_errors(instance)
    .map(|e| format!("{} {}", e.instance_path, e))
    .collect();

  if violations.is_empty() {
    Ok(())
  } else {
    Err(SchemaError::violations(violations))
  }
}
