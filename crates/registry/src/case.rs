use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Flat JSON object produced by one extraction pass.
pub type ExtractionRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseCategory {
    #[default]
    Atp,
    Logistics,
    Pricing,
    Unknown,
}

impl CaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::Atp => "ATP",
            CaseCategory::Logistics => "Logistics",
            CaseCategory::Pricing => "Pricing",
            CaseCategory::Unknown => "Unknown",
        }
    }

    /// Parse a category label. Unrecognized labels map to `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "atp" => CaseCategory::Atp,
            "logistics" => CaseCategory::Logistics,
            "pricing" => CaseCategory::Pricing,
            _ => CaseCategory::Unknown,
        }
    }
}

impl From<String> for CaseCategory {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<CaseCategory> for String {
    fn from(category: CaseCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for CaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,
}

/// One invoice-processing case.
///
/// Definitions are deserialized from camelCase JSON. A field of the wrong
/// type reads as absent. The `advanced` and `reasoning` records are empty
/// until the registry loads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_category")]
    pub category: CaseCategory,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vendor: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer: String,
    #[serde(default, deserialize_with = "lenient_location")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub pdf: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub advanced_path: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reasoning_path: String,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub atp_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_record")]
    pub advanced: ExtractionRecord,
    #[serde(default, deserialize_with = "lenient_record")]
    pub reasoning: ExtractionRecord,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64(),
        _ => None,
    })
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CaseCategory, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(label) => CaseCategory::parse(&label),
        _ => CaseCategory::Unknown,
    })
}

fn lenient_location<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Location>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_record<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExtractionRecord, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(record) => record,
        _ => ExtractionRecord::new(),
    })
}

impl Case {
    /// Shallow union of both extraction records; `reasoning` wins on collision.
    pub fn merged_extraction(&self) -> ExtractionRecord {
        let mut merged = self.advanced.clone();
        for (key, value) in &self.reasoning {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn status(&self) -> Option<&str> {
        non_empty(self.status.as_deref())
    }

    pub fn notes(&self) -> Option<&str> {
        non_empty(self.atp_notes.as_deref())
    }

    pub fn due_date(&self) -> Option<&str> {
        non_empty(self.due_date.as_deref())
    }

    /// Lowercased status text, empty when absent.
    pub fn status_lower(&self) -> String {
        self.status().unwrap_or_default().to_lowercase()
    }

    /// Amount formatted as currency, `None` when absent or not finite.
    pub fn display_amount(&self) -> Option<String> {
        self.amount.filter(|a| a.is_finite()).map(format_currency)
    }
}

/// Empty strings count as missing.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `29200.0` -> `$29,200`, `1234.5` -> `$1,234.5`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    match fraction {
        0 => format!("{}${}", sign, grouped),
        f if f % 10 == 0 => format!("{}${}.{}", sign, grouped, f / 10),
        f => format!("{}${}.{:02}", sign, grouped, f),
    }
}
