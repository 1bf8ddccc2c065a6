// Description (MOTD) handling: chat component JSON -> legacy `§` text -> map name.

use serde_json::Value;

use super::StatusError;
use crate::config::MotdFormat;

const SECTION: char = '§';

fn color_code(name: &str) -> Option<char> {
    Some(match name {
        "black" => '0',
        "dark_blue" => '1',
        "dark_green" => '2',
        "dark_aqua" => '3',
        "dark_red" => '4',
        "dark_purple" => '5',
        "gold" => '6',
        "gray" => '7',
        "dark_gray" => '8',
        "blue" => '9',
        "green" => 'a',
        "aqua" => 'b',
        "red" => 'c',
        "light_purple" => 'd',
        "yellow" => 'e',
        "white" => 'f',
        "reset" => 'r',
        _ => return None,
    })
}

const FORMAT_CODES: [(&str, char); 5] = [
    ("obfuscated", 'k'),
    ("bold", 'l'),
    ("strikethrough", 'm'),
    ("underlined", 'n'),
    ("italic", 'o'),
];

/// Flattens a `description` value (plain string or chat component) to legacy text.
pub fn flatten_description(description: &Value) -> String {
    let mut out = String::new();
    write_component(description, &mut out);
    out
}

fn write_component(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(parts) => {
            for part in parts {
                write_component(part, out);
            }
        }
        Value::Object(obj) => {
            if let Some(code) = obj.get("color").and_then(Value::as_str).and_then(color_code) {
                out.push(SECTION);
                out.push(code);
            }
            for (key, code) in FORMAT_CODES {
                if obj.get(key).and_then(Value::as_bool) == Some(true) {
                    out.push(SECTION);
                    out.push(code);
                }
            }
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
            if let Some(extra) = obj.get("extra") {
                write_component(extra, out);
            }
        }
        _ => {}
    }
}

/// Cuts the map name out of the flattened description.
pub fn extract_map_name(description: &str, format: &MotdFormat) -> Result<String, StatusError> {
    let line = description
        .lines()
        .nth(format.map_line)
        .ok_or(StatusError::MapNotFound {
            line: format.map_line,
        })?;
    let chars: Vec<char> = line.chars().collect();
    let end = chars.len().saturating_sub(format.strip_suffix);
    if format.strip_prefix >= end {
        return Err(StatusError::MapNotFound {
            line: format.map_line,
        });
    }
    Ok(chars[format.strip_prefix..end].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_string_passes_through() {
        assert_eq!(flatten_description(&json!("hello\nworld")), "hello\nworld");
    }

    #[test]
    fn component_colors_and_extra() {
        let desc = json!({
            "text": "",
            "extra": [
                {"text": "Server", "color": "gold", "bold": true},
                {"text": "\n"},
                {"text": "Map", "color": "aqua"}
            ]
        });
        assert_eq!(flatten_description(&desc), "§6§lServer\n§bMap");
    }

    #[test]
    fn extract_strips_both_ends() {
        let fmt = MotdFormat::default();
        let desc = "§6§lServer\n§7» §bHarb §7«";
        assert_eq!(extract_map_name(desc, &fmt).unwrap(), "Harb");
    }

    #[test]
    fn extract_missing_line_fails() {
        let fmt = MotdFormat::default();
        assert!(matches!(
            extract_map_name("only one line", &fmt),
            Err(StatusError::MapNotFound { line: 1 })
        ));
    }

    #[test]
    fn extract_too_short_line_fails() {
        let fmt = MotdFormat::default();
        assert!(extract_map_name("a\n0123456789", &fmt).is_err());
    }
}
