//! Schema registry: per-category field sets, validation rules, and
//! type coercion for raw extractor output.
//!
//! Each [`ServiceCategory`] owns one [`FieldSchema`]. A record validates as
//! `full` only when every required field is present and coercible to its
//! declared kind. The `Unknown` category has an empty schema, which relaxes
//! validation entirely so classification failure never blocks extraction.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::types::record::FieldValue;

/// Service vertical of a target site. Closed set; drives schema choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Electricity,
    Mobile,
    Bank,
    Business,
    Unknown,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Electricity => "electricity",
            ServiceCategory::Mobile => "mobile",
            ServiceCategory::Bank => "bank",
            ServiceCategory::Business => "business",
            ServiceCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Currency,
    Duration,
    Url,
    Phone,
}

/// One named field in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Ordered field set for one service category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub category: ServiceCategory,
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(category: ServiceCategory, fields: Vec<FieldSpec>) -> Self {
        Self { category, fields }
    }

    /// Empty schema: no required fields, everything passes as-is.
    pub fn relaxed(category: ServiceCategory) -> Self {
        Self {
            category,
            fields: Vec::new(),
        }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Default extraction instruction derived from the field list.
    ///
    /// Used when a target config carries no instruction of its own.
    pub fn default_instruction(&self) -> String {
        if self.fields.is_empty() {
            return "Extract the key facts about this offer as a flat JSON object \
                    with short snake_case keys and string or number values. \
                    Use null for anything not present in the text."
                .to_string();
        }

        let keys: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                let hint = match f.kind {
                    FieldKind::Text => "string",
                    FieldKind::Number => "number",
                    FieldKind::Currency => "price with currency unit",
                    FieldKind::Duration => "duration in months",
                    FieldKind::Url => "URL",
                    FieldKind::Phone => "phone number",
                };
                format!("{} ({})", f.name, hint)
            })
            .collect();

        format!(
            "Extract one {} offer from the card text below. Return a single flat \
             JSON object with these keys: {}. Use null for values not present in \
             the text; never invent values.",
            self.category,
            keys.join(", ")
        )
    }

    /// Validate a loose extractor field map against this schema.
    ///
    /// Schema fields are coerced in declaration order; extra keys the
    /// extractor produced are appended verbatim as text so nothing is
    /// silently dropped. Returns the typed fields and whether every
    /// required field validated.
    pub fn validate(
        &self,
        raw: &IndexMap<String, serde_json::Value>,
    ) -> (IndexMap<String, FieldValue>, bool) {
        let normalized: IndexMap<String, &serde_json::Value> = raw
            .iter()
            .map(|(k, v)| (normalize_key(k), v))
            .collect();

        let mut fields = IndexMap::new();
        let mut all_required_ok = true;

        for spec in &self.fields {
            match normalized.get(&spec.name).and_then(|v| coerce(spec.kind, v)) {
                Some(value) => {
                    fields.insert(spec.name.clone(), value);
                }
                None => {
                    if spec.required {
                        all_required_ok = false;
                    }
                }
            }
        }

        for (key, value) in &normalized {
            if self.field(key).is_none() && !fields.contains_key(key.as_str()) {
                if let Some(text) = coerce(FieldKind::Text, value) {
                    fields.insert(key.clone(), text);
                }
            }
        }

        (fields, all_required_ok)
    }
}

/// Maps service categories to their expected field sets.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: IndexMap<ServiceCategory, FieldSchema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SchemaRegistry {
    /// Registry with the built-in per-vertical schemas.
    pub fn builtin() -> Self {
        let mut schemas = IndexMap::new();

        schemas.insert(
            ServiceCategory::Mobile,
            FieldSchema::new(
                ServiceCategory::Mobile,
                vec![
                    FieldSpec::required("name", FieldKind::Text),
                    FieldSpec::required("monthly_price", FieldKind::Currency),
                    FieldSpec::optional("operator", FieldKind::Text),
                    FieldSpec::optional("data_limit", FieldKind::Text),
                    FieldSpec::optional("contract_duration", FieldKind::Duration),
                    FieldSpec::optional("network", FieldKind::Text),
                    FieldSpec::optional("features", FieldKind::Text),
                    FieldSpec::optional("website", FieldKind::Url),
                    FieldSpec::optional("phone", FieldKind::Phone),
                ],
            ),
        );

        schemas.insert(
            ServiceCategory::Electricity,
            FieldSchema::new(
                ServiceCategory::Electricity,
                vec![
                    FieldSpec::required("name", FieldKind::Text),
                    FieldSpec::required("price_per_kwh", FieldKind::Currency),
                    FieldSpec::optional("monthly_fee", FieldKind::Currency),
                    FieldSpec::optional("contract_duration", FieldKind::Duration),
                    FieldSpec::optional("website", FieldKind::Url),
                ],
            ),
        );

        schemas.insert(
            ServiceCategory::Bank,
            FieldSchema::new(
                ServiceCategory::Bank,
                vec![
                    FieldSpec::required("name", FieldKind::Text),
                    FieldSpec::required("interest_rate", FieldKind::Number),
                    FieldSpec::optional("monthly_fee", FieldKind::Currency),
                    FieldSpec::optional("website", FieldKind::Url),
                    FieldSpec::optional("phone", FieldKind::Phone),
                ],
            ),
        );

        schemas.insert(
            ServiceCategory::Business,
            FieldSchema::new(
                ServiceCategory::Business,
                vec![
                    FieldSpec::required("name", FieldKind::Text),
                    FieldSpec::optional("address", FieldKind::Text),
                    FieldSpec::optional("website", FieldKind::Url),
                    FieldSpec::optional("phone_number", FieldKind::Phone),
                    FieldSpec::optional("description", FieldKind::Text),
                ],
            ),
        );

        Self { schemas }
    }

    /// Schema for a category. `Unknown` (or an unregistered category)
    /// yields a relaxed empty schema.
    pub fn schema_for(&self, category: ServiceCategory) -> FieldSchema {
        self.schemas
            .get(&category)
            .cloned()
            .unwrap_or_else(|| FieldSchema::relaxed(category))
    }

    /// Register or replace a schema.
    pub fn register(&mut self, schema: FieldSchema) {
        self.schemas.insert(schema.category, schema);
    }
}

/// Normalize an extractor-supplied key: camelCase and kebab-case collapse
/// to snake_case so `monthlyFee`, `monthly-fee`, and `monthly_fee` agree.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.trim().chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
            prev_lower = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Coerce a raw JSON value to a typed field value. `None` means the value
/// is missing, null, or unambiguously uncoercible.
pub fn coerce(kind: FieldKind, value: &serde_json::Value) -> Option<FieldValue> {
    use serde_json::Value;

    if value.is_null() {
        return None;
    }

    match kind {
        FieldKind::Text => match value {
            Value::String(s) if !s.trim().is_empty() => Some(FieldValue::Text {
                value: s.trim().to_string(),
            }),
            Value::Number(n) => Some(FieldValue::Text {
                value: n.to_string(),
            }),
            Value::Bool(b) => Some(FieldValue::Text {
                value: b.to_string(),
            }),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(FieldValue::Text {
                        value: parts.join("; "),
                    })
                }
            }
            _ => None,
        },
        FieldKind::Number => match value {
            Value::Number(n) => n.as_f64().map(|value| FieldValue::Number { value }),
            Value::String(s) => parse_number(s).map(|value| FieldValue::Number { value }),
            _ => None,
        },
        FieldKind::Currency => match value {
            Value::Number(n) => n.as_f64().map(|amount| FieldValue::Currency {
                amount,
                unit: String::new(),
            }),
            Value::String(s) => parse_currency(s).map(|(amount, unit)| FieldValue::Currency {
                amount,
                unit,
            }),
            _ => None,
        },
        FieldKind::Duration => match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|m| u32::try_from(m).ok())
                .map(|months| FieldValue::Duration { months }),
            Value::String(s) => parse_duration_months(s).map(|months| FieldValue::Duration { months }),
            _ => None,
        },
        FieldKind::Url => match value {
            Value::String(s) => {
                let s = s.trim();
                let candidate = if s.starts_with("http://") || s.starts_with("https://") {
                    s.to_string()
                } else if s.contains('.') && !s.contains(' ') {
                    format!("https://{s}")
                } else {
                    return None;
                };
                url::Url::parse(&candidate)
                    .ok()
                    .map(|u| FieldValue::Url { value: u.to_string() })
            }
            _ => None,
        },
        FieldKind::Phone => match value {
            Value::String(s) => {
                let digits: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '+')
                    .collect();
                if digits.chars().filter(|c| c.is_ascii_digit()).count() >= 5 {
                    Some(FieldValue::Phone { value: digits })
                } else {
                    None
                }
            }
            Value::Number(n) => Some(FieldValue::Phone {
                value: n.to_string(),
            }),
            _ => None,
        },
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("static regex"))
}

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "19,90 kr/mån", "299 kr", "kr 199", "45 øre/kWh", "NOK 349", "12,-"
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:(kr|nok|sek|øre|eur|usd|\$|€)\s*)?(\d+(?:[.,]\d+)?)\s*(kr/mån(?:ed)?|øre/kwh|kr/mnd|kr|nok|sek|øre|eur|usd|\$|€|,-)?",
        )
        .expect("static regex")
    })
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(mån(?:ad|ed)(?:er)?|mnd|months?|mos?|år|years?)").expect("static regex")
    })
}

/// Pull the first decimal number out of free text ("299 kr" → 299.0).
pub fn parse_number(text: &str) -> Option<f64> {
    let caps = number_re().captures(text)?;
    caps[1].replace(',', ".").parse().ok()
}

/// Parse an amount plus currency unit from free text.
///
/// "19,90 kr/mån" → (19.9, "kr/mån"); "NOK 349" → (349.0, "NOK").
pub fn parse_currency(text: &str) -> Option<(f64, String)> {
    let caps = currency_re().captures(text)?;
    let amount: f64 = caps.get(2)?.as_str().replace(',', ".").parse().ok()?;
    let unit = caps
        .get(3)
        .or_else(|| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(",-").trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_default();
    Some((amount, unit))
}

/// Parse a contract duration into months. Years are converted.
pub fn parse_duration_months(text: &str) -> Option<u32> {
    let caps = duration_re().captures(text)?;
    let value: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    if unit.starts_with("år") || unit.starts_with("year") {
        Some(value * 12)
    } else {
        Some(value)
    }
}
