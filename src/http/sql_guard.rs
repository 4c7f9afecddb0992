//! Heuristic screen for SQL-injection attempts in request bodies.
//!
//! Queries are parameterised by Diesel, so this is a coarse filter for
//! obviously hostile payloads rather than a security boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ' OR 1=1 / " or 'a'='a
        r#"(?i)['"]\s*(or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
        r"(?i)\bunion\s+(all\s+)?select\b",
        r"(?i);\s*(drop|delete|insert|update|alter|truncate|create)\b",
        r"(?i)\b(drop|truncate|alter)\s+(table|database|schema)\b",
        r"(?i)\bselect\s+\*\s+from\b",
        r"(?i)\bselect\s+[\w,\s]+\s+from\s+\w+\s+where\s+\w+\s*=",
        r#"(?i)['";]\s*--"#,
        r"/\*.*\*/",
        r"(?i)\b(exec|execute)\s*(\(|xp_|sp_)",
        r"(?i)\bxp_cmdshell\b",
        r"(?i)\b(sleep|benchmark|pg_sleep)\s*\(\s*\d",
        r"(?i)\bwaitfor\s+delay\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static SQL guard pattern"))
    .collect()
});

pub fn is_suspicious(text: &str) -> bool {
    PATTERNS.iter().any(|re| re.is_match(text))
}

/// Returns the path of the first string (key or value) that looks hostile.
pub fn find_suspicious(value: &Value) -> Option<String> {
    scan(value, "")
}

fn scan(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::String(s) if is_suspicious(s) => Some(path.to_string()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| scan(v, &format!("{}[{}]", path, i))),
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            let child = if path.is_empty() {
                k.clone()
            } else {
                format!("{}.{}", path, k)
            };
            if is_suspicious(k) {
                return Some(child);
            }
            scan(v, &child)
        }),
        _ => None,
    }
}
