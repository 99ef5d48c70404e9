//! Field schemas for each forecast kind
//!
//! Field names are the exact keys the prediction deployments were trained on
//! and the exact column names of the backing tables. Labels, defaults and
//! display precisions mirror the operator form.

use serde::Serialize;

use crate::models::{FieldValue, ForecastKind};

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Number,
    /// Percentage in 0..=100; out-of-range values are warned about, not rejected
    Percentage,
    Categorical(&'static [&'static str]),
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            FieldType::Integer => "a 32-bit integer".to_string(),
            FieldType::Number => "a number".to_string(),
            FieldType::Percentage => "a percentage".to_string(),
            FieldType::Categorical(options) => format!("one of {:?}", options),
        }
    }
}

/// Form default for a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Integer(i64),
    Number(f64),
    Text(&'static str),
}

impl DefaultValue {
    pub fn to_value(&self) -> FieldValue {
        match self {
            DefaultValue::Integer(i) => FieldValue::Integer(*i),
            DefaultValue::Number(n) => FieldValue::Number(*n),
            DefaultValue::Text(s) => FieldValue::Text((*s).to_string()),
        }
    }
}

/// One entry of a kind's field schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    pub default: DefaultValue,
    /// Digits shown after the decimal point; presentation only
    pub precision: usize,
}

pub const PERCENTAGE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

const YES_NO: &[&str] = &["Yes", "No"];

impl FieldSpec {
    const fn number(name: &'static str, label: &'static str, default: f64, precision: usize) -> Self {
        Self {
            name,
            label,
            field_type: FieldType::Number,
            default: DefaultValue::Number(default),
            precision,
        }
    }

    const fn percentage(
        name: &'static str,
        label: &'static str,
        default: f64,
        precision: usize,
    ) -> Self {
        Self {
            name,
            label,
            field_type: FieldType::Percentage,
            default: DefaultValue::Number(default),
            precision,
        }
    }

    /// Format a value for review. Never feeds back into the request.
    pub fn display(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Number(n) => format!("{:.*}", self.precision, n),
            FieldValue::Integer(i) => match self.field_type {
                FieldType::Number | FieldType::Percentage => {
                    format!("{:.*}", self.precision, *i as f64)
                }
                _ => i.to_string(),
            },
            FieldValue::Text(s) => s.clone(),
        }
    }
}

static YIELD_FIELDS: [FieldSpec; 14] = [
    FieldSpec {
        name: "Debtor",
        label: "Debtor",
        field_type: FieldType::Integer,
        default: DefaultValue::Integer(101420),
        precision: 0,
    },
    FieldSpec {
        name: "Revaluation_of_the_fall_",
        label: "Revaluation of the fall",
        field_type: FieldType::Categorical(YES_NO),
        default: DefaultValue::Text("Yes"),
        precision: 0,
    },
    FieldSpec::percentage("Aluminum____", "Aluminum (%)", 0.94677069, 8),
    FieldSpec::percentage("Heavy_Metals____", "Heavy Metals (%)", 0.522112512, 8),
    FieldSpec::percentage("Waste____", "Waste (%)", 17.93416494, 8),
    FieldSpec::percentage("Particle_Size__Coarse___", "Particle Size (Coarse %)", 62.53498913, 8),
    FieldSpec::number("Quality_Score", "Quality Score", 1.430019099, 9),
    FieldSpec::number("Weight__tons_", "Weight (tons)", 6.034453448, 9),
    FieldSpec::number("Final_Payment", "Final Payment", 245.7865421, 7),
    FieldSpec::percentage("Initial_Aluminum____", "Initial Aluminum (%)", 86.73194899, 8),
    FieldSpec::percentage("Initial_Heavy_Metals____", "Initial Heavy Metals (%)", 6.268629711, 9),
    FieldSpec::number("Vendor_Quality_History", "Vendor Quality History", 0.476514816, 9),
    FieldSpec::percentage("Processing_Efficiency____", "Processing Efficiency (%)", 84.10809734, 8),
    FieldSpec::number("Predicted_Yield", "Predicted Yield", 0.859382026, 9),
];

static SUPPLY_FIELDS: [FieldSpec; 7] = [
    FieldSpec::percentage("Processing_Efficiency", "Processing Efficiency (%)", 85.0, 2),
    FieldSpec::percentage("Initial_Heavy_Metals", "Initial Heavy Metals (%)", 0.5, 2),
    FieldSpec::percentage("Initial_Sand", "Initial Sand (%)", 0.2, 2),
    FieldSpec::percentage("Initial_Ash", "Initial Ash (%)", 0.1, 2),
    FieldSpec::number("Vendor_Quality_History", "Vendor Quality History", 0.8, 2),
    FieldSpec::number("Vendor_Consistency", "Vendor Consistency", 0.9, 2),
    FieldSpec::number("Debit_EUR", "Debit EUR", 800.0, 2),
];

static DEMAND_FIELDS: [FieldSpec; 6] = [
    FieldSpec::percentage("Processing_Efficiency", "Processing Efficiency (%)", 80.0, 2),
    FieldSpec::number("Vendor_Quality_History", "Vendor Quality History", 0.7, 2),
    FieldSpec::number("Vendor_Consistency", "Vendor Consistency", 0.85, 2),
    FieldSpec::number("Credit_EUR", "Credit EUR", 1000.0, 2),
    FieldSpec::percentage("Aluminum_Percentage", "Aluminum Percentage (%)", 0.8, 2),
    FieldSpec::percentage("Heavy_Metals_Percentage", "Heavy Metals Percentage (%)", 0.5, 2),
];

/// Ordered field schema for a kind
pub fn field_schema(kind: ForecastKind) -> &'static [FieldSpec] {
    match kind {
        ForecastKind::Yield => &YIELD_FIELDS,
        ForecastKind::Supply => &SUPPLY_FIELDS,
        ForecastKind::Demand => &DEMAND_FIELDS,
    }
}

pub fn field_spec(kind: ForecastKind, name: &str) -> Option<&'static FieldSpec> {
    field_schema(kind).iter().find(|spec| spec.name == name)
}
