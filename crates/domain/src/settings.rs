//! Settings panel records, value validation and the marked placeholder categories.

use fundline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::records::RecordId;
use crate::wire_enum::wire_enum;

wire_enum! {
    /// Storage type of a setting value.
    pub enum SettingDataType {
        /// Free text.
        String => "string",
        /// Whole number.
        Integer => "integer",
        /// Decimal number.
        Float => "float",
        /// True or false.
        Boolean => "boolean",
        /// Arbitrary JSON.
        Json => "json",
        /// One of `validation_rules.options`.
        Select => "select",
    }
}

/// Group of related settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsCategory {
    /// Identifier.
    pub id: RecordId,
    /// Machine name used in `/settings/category/{name}`.
    pub name: String,
    /// Label.
    pub display_name: String,
    /// Description.
    pub description: Option<String>,
    /// Icon hint.
    pub icon: Option<String>,
    /// Ordering.
    pub sort_order: i64,
    /// Whether the category is shown.
    pub is_active: bool,
    /// Settings in this category.
    pub settings: Vec<Setting>,
}

impl SettingsCategory {
    /// Finds a setting by key.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find(|setting| setting.key == key)
    }
}

/// Validation constraints attached to a setting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Inclusive lower bound for numeric settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for select settings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// One configurable setting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Setting {
    /// Identifier used in `/settings/setting/{id}`.
    pub id: RecordId,
    /// Owning category.
    pub category_id: RecordId,
    /// Machine key.
    pub key: String,
    /// Label.
    pub display_name: String,
    /// Description.
    pub description: Option<String>,
    /// Storage type wire value.
    pub data_type: String,
    /// Default, serialised as text.
    pub default_value: Option<String>,
    /// Current value, serialised as text.
    pub current_value: Option<String>,
    /// Typed current value.
    pub value: Value,
    /// Constraints.
    pub validation_rules: Option<ValidationRules>,
    /// Widget hint.
    pub ui_component: Option<String>,
    /// Hidden from display.
    pub is_sensitive: bool,
    /// Not editable.
    pub is_readonly: bool,
    /// Must not be cleared.
    pub is_required: bool,
    /// Changing it needs a backend restart.
    pub requires_restart: bool,
    /// Ordering.
    pub sort_order: i64,
    /// Whether the setting is shown.
    pub is_active: bool,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Setting {
    /// Parsed storage type; unknown types behave like strings.
    #[must_use]
    pub fn data_type(&self) -> SettingDataType {
        self.data_type
            .parse()
            .unwrap_or(SettingDataType::String)
    }

    /// Checks and normalises a new value before it is sent to the backend.
    ///
    /// Text input is coerced to the setting's type, so `"45"` becomes `45` for integers.
    pub fn validate_value(&self, value: &Value) -> AppResult<Value> {
        if self.is_readonly {
            return Err(AppError::Validation(format!(
                "{} is read-only",
                self.label()
            )));
        }

        let blank = match value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            _ => false,
        };
        if blank {
            if self.is_required {
                return Err(AppError::Validation(format!("{} is required", self.label())));
            }
            return Ok(Value::Null);
        }

        let rules = self.validation_rules.clone().unwrap_or_default();
        let normalised = match self.data_type() {
            SettingDataType::String => Value::String(text_of(value)),
            SettingDataType::Integer => {
                let number = match integer_of(value) {
                    Whole::Exact(number) => number,
                    Whole::OutOfRange => {
                        return Err(AppError::Validation(format!(
                            "{} is out of range",
                            self.label()
                        )));
                    }
                    Whole::NotWhole => {
                        return Err(AppError::Validation(format!(
                            "{} must be a whole number",
                            self.label()
                        )));
                    }
                };
                self.check_range(number as f64, &rules)?;
                Value::from(number)
            }
            SettingDataType::Float => {
                let number = number_of(value).ok_or_else(|| {
                    AppError::Validation(format!("{} must be a number", self.label()))
                })?;
                self.check_range(number, &rules)?;
                Value::from(number)
            }
            SettingDataType::Boolean => Value::Bool(bool_of(value).ok_or_else(|| {
                AppError::Validation(format!("{} must be true or false", self.label()))
            })?),
            SettingDataType::Json => match value {
                Value::String(text) => serde_json::from_str(text).map_err(|_| {
                    AppError::Validation(format!("{} must be valid JSON", self.label()))
                })?,
                other => other.clone(),
            },
            SettingDataType::Select => {
                let choice = text_of(value);
                if !rules.options.is_empty() && !rules.options.contains(&choice) {
                    return Err(AppError::Validation(format!(
                        "{} must be one of: {}",
                        self.label(),
                        rules.options.join(", ")
                    )));
                }
                Value::String(choice)
            }
        };

        Ok(normalised)
    }

    /// Display name, falling back to the key.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.key.as_str()
        } else {
            self.display_name.as_str()
        }
    }

    fn check_range(&self, number: f64, rules: &ValidationRules) -> AppResult<()> {
        if let Some(min) = rules.min
            && number < min
        {
            return Err(AppError::Validation(format!(
                "{} must be at least {min}",
                self.label()
            )));
        }
        if let Some(max) = rules.max
            && number > max
        {
            return Err(AppError::Validation(format!(
                "{} must be at most {max}",
                self.label()
            )));
        }
        Ok(())
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_owned(),
        other => other.to_string(),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Largest magnitude an `f64` carries without losing integer precision.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_991.0;

enum Whole {
    Exact(i64),
    OutOfRange,
    NotWhole,
}

fn integer_of(value: &Value) -> Whole {
    match value {
        Value::Number(number) => {
            if let Some(number) = number.as_i64() {
                Whole::Exact(number)
            } else if number.is_u64() {
                Whole::OutOfRange
            } else {
                whole_float(number.as_f64())
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if let Ok(number) = text.parse::<i64>() {
                Whole::Exact(number)
            } else if text.parse::<i128>().is_ok() {
                Whole::OutOfRange
            } else {
                whole_float(text.parse::<f64>().ok())
            }
        }
        _ => Whole::NotWhole,
    }
}

fn whole_float(number: Option<f64>) -> Whole {
    match number {
        Some(number) if number.is_finite() && number.fract() == 0.0 => {
            if number.abs() <= MAX_EXACT_FLOAT_INTEGER {
                Whole::Exact(number as i64)
            } else {
                Whole::OutOfRange
            }
        }
        _ => Whole::NotWhole,
    }
}

fn bool_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|number| number != 0),
        _ => None,
    }
}

/// Body for `PUT /settings/setting/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingUpdate {
    /// New typed value.
    pub value: Value,
}

/// Per-agent override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSetting {
    /// Identifier.
    pub id: RecordId,
    /// Agent type the override applies to.
    pub agent_type: String,
    /// Specific agent, when not type-wide.
    pub agent_id: Option<String>,
    /// Setting key.
    pub setting_key: String,
    /// Value serialised as text.
    pub setting_value: Option<String>,
    /// Storage type wire value.
    pub data_type: String,
    /// Whether the override is active.
    pub is_enabled: bool,
    /// Typed value.
    pub typed_value: Value,
}

/// Body for `PUT /settings/agents/{type}/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSettingUpdate {
    /// New typed value.
    pub value: Value,
    /// Whether the override is active.
    pub is_enabled: bool,
}

/// Categories shown when `/settings/categories` cannot be loaded.
///
/// Callers must surface these as placeholder data; they are never the live configuration.
#[must_use]
pub fn default_settings_categories() -> Vec<SettingsCategory> {
    let log_levels: Vec<String> = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
        .into_iter()
        .map(str::to_owned)
        .collect();

    vec![
        SettingsCategory {
            id: RecordId::Int(1),
            name: "system".to_owned(),
            display_name: "System Settings".to_owned(),
            description: Some("Core system configuration and performance settings".to_owned()),
            icon: Some("cog".to_owned()),
            sort_order: 1,
            is_active: true,
            settings: vec![
                Setting {
                    id: RecordId::Int(1),
                    category_id: RecordId::Int(1),
                    key: "log_level".to_owned(),
                    display_name: "Log Level".to_owned(),
                    description: Some("Minimum log level for system logging".to_owned()),
                    data_type: SettingDataType::Select.as_str().to_owned(),
                    default_value: Some("INFO".to_owned()),
                    current_value: Some("INFO".to_owned()),
                    value: Value::from("INFO"),
                    validation_rules: Some(ValidationRules {
                        options: log_levels,
                        ..ValidationRules::default()
                    }),
                    ui_component: Some("select".to_owned()),
                    is_required: true,
                    sort_order: 1,
                    is_active: true,
                    ..Setting::default()
                },
                Setting {
                    id: RecordId::Int(2),
                    category_id: RecordId::Int(1),
                    key: "enable_metrics".to_owned(),
                    display_name: "Enable Metrics Collection".to_owned(),
                    description: Some("Collect system performance metrics".to_owned()),
                    data_type: SettingDataType::Boolean.as_str().to_owned(),
                    default_value: Some("true".to_owned()),
                    current_value: Some("true".to_owned()),
                    value: Value::Bool(true),
                    ui_component: Some("checkbox".to_owned()),
                    sort_order: 2,
                    is_active: true,
                    ..Setting::default()
                },
            ],
        },
        SettingsCategory {
            id: RecordId::Int(2),
            name: "agents".to_owned(),
            display_name: "Agent Management".to_owned(),
            description: Some("AI agent configuration and control settings".to_owned()),
            icon: Some("beaker".to_owned()),
            sort_order: 2,
            is_active: true,
            settings: vec![Setting {
                id: RecordId::Int(3),
                category_id: RecordId::Int(2),
                key: "agent_health_check_interval".to_owned(),
                display_name: "Agent Health Check Interval (seconds)".to_owned(),
                description: Some("How often to check agent health status".to_owned()),
                data_type: SettingDataType::Integer.as_str().to_owned(),
                default_value: Some("30".to_owned()),
                current_value: Some("30".to_owned()),
                value: Value::from(30),
                validation_rules: Some(ValidationRules {
                    min: Some(10.0),
                    max: Some(300.0),
                    options: Vec::new(),
                }),
                ui_component: Some("input".to_owned()),
                is_required: true,
                requires_restart: true,
                sort_order: 1,
                is_active: true,
                ..Setting::default()
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use fundline_core::AppError;
    use serde_json::{Value, json};

    use super::{SettingsCategory, default_settings_categories};

    fn interval_setting() -> super::Setting {
        default_settings_categories()
            .into_iter()
            .find(|category| category.name == "agents")
            .and_then(|category| category.setting("agent_health_check_interval").cloned())
            .unwrap_or_else(|| unreachable!())
    }

    #[test]
    fn integer_settings_enforce_bounds() {
        let setting = interval_setting();
        assert_eq!(setting.validate_value(&json!("45")).ok(), Some(json!(45)));
        assert!(setting.validate_value(&json!(5)).is_err());
        assert!(setting.validate_value(&json!(301)).is_err());
        assert!(setting.validate_value(&json!("12.5")).is_err());
        assert_eq!(setting.validate_value(&json!(60.0)).ok(), Some(json!(60)));
    }

    fn unbounded_integer() -> super::Setting {
        super::Setting {
            key: "max_upload_bytes".to_owned(),
            data_type: "integer".to_owned(),
            ..super::Setting::default()
        }
    }

    #[test]
    fn integer_settings_keep_every_digit() {
        let setting = unbounded_integer();

        assert_eq!(
            setting.validate_value(&json!(9_007_199_254_740_993_i64)).ok(),
            Some(json!(9_007_199_254_740_993_i64))
        );
        assert_eq!(
            setting.validate_value(&json!("9007199254740993")).ok(),
            Some(json!(9_007_199_254_740_993_i64))
        );
    }

    #[test]
    fn integer_settings_reject_values_beyond_i64() {
        let setting = unbounded_integer();
        let out_of_range = |value: Value| {
            matches!(
                setting.validate_value(&value),
                Err(AppError::Validation(ref message)) if message.ends_with("is out of range")
            )
        };

        assert!(out_of_range(json!("1e20")));
        assert!(out_of_range(json!(1e20)));
        assert!(out_of_range(json!("99999999999999999999")));
        assert!(out_of_range(json!(u64::MAX)));
        assert!(setting.validate_value(&json!("1e400")).is_err());
        assert!(setting.validate_value(&json!("ten")).is_err());
    }

    #[test]
    fn required_settings_reject_blank_values() {
        let setting = interval_setting();
        assert!(setting.validate_value(&json!("  ")).is_err());
        assert!(setting.validate_value(&Value::Null).is_err());
    }

    #[test]
    fn select_settings_check_options() {
        let categories = default_settings_categories();
        let log_level = categories
            .first()
            .and_then(|category| category.setting("log_level"))
            .unwrap_or_else(|| unreachable!());

        assert_eq!(
            log_level.validate_value(&json!("ERROR")).ok(),
            Some(json!("ERROR"))
        );
        assert!(log_level.validate_value(&json!("VERBOSE")).is_err());
    }

    #[test]
    fn boolean_settings_accept_text_forms() {
        let categories = default_settings_categories();
        let metrics = categories
            .first()
            .and_then(|category| category.setting("enable_metrics"))
            .unwrap_or_else(|| unreachable!());

        assert_eq!(metrics.validate_value(&json!("off")).ok(), Some(json!(false)));
        assert!(metrics.validate_value(&json!("maybe")).is_err());
    }

    #[test]
    fn categories_decode_backend_payload() {
        let payload = json!({
            "id": 1,
            "name": "system",
            "display_name": "System Settings",
            "settings": [{
                "id": 1, "key": "log_level", "data_type": "select", "value": "INFO",
                "validation_rules": {"options": ["INFO", "DEBUG"]}, "ui_options": {}
            }]
        });

        let category = serde_json::from_value::<SettingsCategory>(payload);
        assert!(category.is_ok());
        let category = category.unwrap_or_else(|_| unreachable!());
        assert_eq!(category.settings.len(), 1);
        assert!(category.settings[0].extra.contains_key("ui_options"));
    }
}
