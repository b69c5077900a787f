//! Unit conversion tool — length, mass, and temperature.

use async_trait::async_trait;
use hearth_core::error::ToolError;
use hearth_core::tool::{Tool, ToolArgs};
use serde_json::Value;

pub struct UnitConversionTool;

#[async_trait]
impl Tool for UnitConversionTool {
    fn name(&self) -> &str {
        "unit_conversion"
    }

    fn description(&self) -> &str {
        "Use when the user asks to convert units (e.g. 'miles to km', 'celsius to fahrenheit', \
         'pounds to kg'). Args: value (number), from_unit, to_unit. Supported: miles, km, m, \
         feet, inches; celsius, fahrenheit, kelvin; kg, pounds, grams. Example: 'convert 5 miles \
         to km' → value=5, from_unit=\"miles\", to_unit=\"km\"."
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "value": { "type": "number" },
                "from_unit": { "type": "string" },
                "to_unit": { "type": "string" }
            },
            "required": ["value", "from_unit", "to_unit"]
        })
    }

    fn example_call(&self) -> Option<&str> {
        Some(
            r#"<tool_call>{"name":"unit_conversion","args":{"value":5,"from_unit":"miles","to_unit":"km"}}</tool_call>"#,
        )
    }

    fn compact_hint(&self) -> Option<&str> {
        Some("value,from_unit,to_unit")
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let value = match args.get("value") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(value) = value else {
            return Ok("Error: missing or invalid \"value\" for unit_conversion.".to_string());
        };

        let from_str = string_arg(args, "from_unit").or_else(|| string_arg(args, "from"));
        let to_str = string_arg(args, "to_unit").or_else(|| string_arg(args, "to"));
        let (Some(from_str), Some(to_str)) = (from_str, to_str) else {
            return Ok(
                "Error: missing \"from_unit\" or \"to_unit\" for unit_conversion.".to_string(),
            );
        };

        let Some(from) = parse_unit(&from_str.trim().to_lowercase()) else {
            return Ok(unsupported_unit_error());
        };
        let Some(to) = parse_unit(&to_str.trim().to_lowercase()) else {
            return Ok(unsupported_unit_error());
        };
        if from.kind != to.kind {
            return Ok("Error: cannot convert between different unit types (e.g. length vs \
                       temperature)."
                .to_string());
        }

        let converted = to.from_base(from.to_base(value));
        Ok(format!("Result: {} {to_str}", format_value(converted)))
    }
}

fn string_arg<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn unsupported_unit_error() -> String {
    "Error: unsupported or invalid unit. Use e.g. km, miles, m, feet, celsius, fahrenheit, kg, \
     pounds."
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Length,
    Mass,
    Temperature,
}

/// A unit described by conversions to and from its kind's base unit
/// (meters, kilograms, celsius).
struct Unit {
    kind: UnitKind,
    to_base: fn(f64) -> f64,
    from_base: fn(f64) -> f64,
}

impl Unit {
    fn to_base(&self, value: f64) -> f64 {
        (self.to_base)(value)
    }
    fn from_base(&self, value: f64) -> f64 {
        (self.from_base)(value)
    }
}

fn parse_unit(s: &str) -> Option<Unit> {
    let unit = match s {
        "km" | "kilometers" | "kilometres" => Unit {
            kind: UnitKind::Length,
            to_base: |v| v * 1000.0,
            from_base: |v| v / 1000.0,
        },
        "m" | "meters" | "metres" => Unit {
            kind: UnitKind::Length,
            to_base: |v| v,
            from_base: |v| v,
        },
        "miles" | "mi" => Unit {
            kind: UnitKind::Length,
            to_base: |v| v * 1609.344,
            from_base: |v| v / 1609.344,
        },
        "feet" | "ft" => Unit {
            kind: UnitKind::Length,
            to_base: |v| v * 0.3048,
            from_base: |v| v / 0.3048,
        },
        "inches" | "in" => Unit {
            kind: UnitKind::Length,
            to_base: |v| v * 0.0254,
            from_base: |v| v / 0.0254,
        },
        "kg" | "kilograms" => Unit {
            kind: UnitKind::Mass,
            to_base: |v| v,
            from_base: |v| v,
        },
        "pounds" | "lbs" | "lb" => Unit {
            kind: UnitKind::Mass,
            to_base: |v| v * 0.453592,
            from_base: |v| v / 0.453592,
        },
        "grams" | "g" => Unit {
            kind: UnitKind::Mass,
            to_base: |v| v / 1000.0,
            from_base: |v| v * 1000.0,
        },
        "celsius" | "c" => Unit {
            kind: UnitKind::Temperature,
            to_base: |v| v,
            from_base: |v| v,
        },
        "fahrenheit" | "f" => Unit {
            kind: UnitKind::Temperature,
            to_base: |v| (v - 32.0) * 5.0 / 9.0,
            from_base: |v| v * 9.0 / 5.0 + 32.0,
        },
        "kelvin" | "k" => Unit {
            kind: UnitKind::Temperature,
            to_base: |v| v - 273.15,
            from_base: |v| v + 273.15,
        },
        _ => return None,
    };
    Some(unit)
}

/// Integer-valued results print without decimals; everything else rounds to
/// four significant digits.
fn format_value(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (3 - magnitude).max(0) as usize;
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}
