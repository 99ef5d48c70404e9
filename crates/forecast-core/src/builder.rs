//! Request construction
//!
//! Turns operator-supplied field values into a [`PredictionRequest`] that
//! matches the kind's schema exactly: same fields, same order, numeric
//! magnitudes untouched.

use crate::error::FatalBuildError;
use crate::models::{FieldValue, FieldValues, ForecastKind, PredictionRequest};
use crate::schema::{field_schema, FieldSpec, FieldType, PERCENTAGE_RANGE};

/// Builds canonical requests from raw field values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a request, requiring every schema field to be present.
    pub fn build(
        &self,
        kind: ForecastKind,
        values: &FieldValues,
    ) -> Result<PredictionRequest, FatalBuildError> {
        let schema = field_schema(kind);

        for name in values.keys() {
            if !schema.iter().any(|spec| spec.name == name.as_str()) {
                tracing::debug!(kind = %kind, field = %name, "Ignoring field not in schema");
            }
        }

        let fields = schema
            .iter()
            .map(|spec| {
                let raw = values.get(spec.name).ok_or(FatalBuildError::MissingField {
                    kind,
                    field: spec.name,
                })?;
                Ok((spec.name, coerce(kind, spec, raw)?))
            })
            .collect::<Result<Vec<_>, FatalBuildError>>()?;

        Ok(PredictionRequest::new(kind, fields))
    }

    /// Build a request, filling absent fields with the form defaults first.
    pub fn build_with_defaults(
        &self,
        kind: ForecastKind,
        values: FieldValues,
    ) -> Result<PredictionRequest, FatalBuildError> {
        self.build(kind, &with_defaults(kind, values))
    }
}

/// Fill every schema field missing from `values` with its form default.
pub fn with_defaults(kind: ForecastKind, mut values: FieldValues) -> FieldValues {
    for spec in field_schema(kind) {
        values
            .entry(spec.name.to_string())
            .or_insert_with(|| spec.default.to_value());
    }
    values
}

/// Default field values for a kind, as pre-filled on the form
pub fn default_values(kind: ForecastKind) -> FieldValues {
    field_schema(kind)
        .iter()
        .map(|spec| (spec.name.to_string(), spec.default.to_value()))
        .collect()
}

fn coerce(
    kind: ForecastKind,
    spec: &FieldSpec,
    raw: &FieldValue,
) -> Result<FieldValue, FatalBuildError> {
    let invalid = || FatalBuildError::InvalidValue {
        kind,
        field: spec.name,
        expected: spec.field_type.describe(),
        found: format!("{} '{}'", raw.type_name(), raw),
    };

    match spec.field_type {
        // Stored as INT, so the value must fit in i32
        FieldType::Integer => {
            let value = match raw {
                FieldValue::Integer(i) => Some(*i),
                FieldValue::Number(n)
                    if n.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(n) =>
                {
                    Some(*n as i64)
                }
                FieldValue::Number(_) => None,
                FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
            };
            value
                .and_then(|v| i32::try_from(v).ok())
                .map(|v| FieldValue::Integer(i64::from(v)))
                .ok_or_else(invalid)
        }
        FieldType::Number | FieldType::Percentage => {
            let value = match raw {
                FieldValue::Integer(i) => *i as f64,
                FieldValue::Number(n) => *n,
                FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
            };
            if !value.is_finite() {
                return Err(invalid());
            }
            if spec.field_type == FieldType::Percentage && !PERCENTAGE_RANGE.contains(&value) {
                tracing::warn!(
                    kind = %kind,
                    field = %spec.name,
                    value = %value,
                    "Percentage outside 0..=100, passing through unchanged"
                );
            }
            Ok(FieldValue::Number(value))
        }
        FieldType::Categorical(options) => {
            let text = raw.as_str().ok_or_else(invalid)?;
            options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(text.trim()))
                .map(|option| FieldValue::Text((*option).to_string()))
                .ok_or_else(invalid)
        }
    }
}
