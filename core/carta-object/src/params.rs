//! Wire parameter parsing for remote commands.
//!
//! Parameters arrive as one string of `key=value` tokens separated by `,` or
//! `;`. A `:` is accepted in place of `=` because the browser client sends
//! `name:Gray`. Only the keys a command declares are kept; unknown keys are
//! dropped and missing keys read as the empty string.

use std::collections::HashMap;

/// Parsed parameters for one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    raw: String,
    values: HashMap<String, String>,
}

impl ParamMap {
    /// Parses `raw` against the declared key set.
    pub fn parse(raw: &str, keys: &[String]) -> Self {
        let mut values = HashMap::new();
        for token in raw.split([',', ';']) {
            let Some(split) = token.find(['=', ':']) else {
                continue;
            };
            let key = token[..split].trim();
            if keys.iter().any(|k| k == key) {
                values.insert(key.to_string(), token[split + 1..].trim().to_string());
            }
        }
        Self {
            raw: raw.to_string(),
            values,
        }
    }

    /// Value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    /// Whether the caller actually supplied `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The unparsed parameter string, for error messages.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Finite number for `key`; `NaN` and infinities read as `None`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).parse().ok()
    }

    /// Accepts `true`/`false` in any case, and `1`/`0`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key);
        if value.eq_ignore_ascii_case("true") || value == "1" {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") || value == "0" {
            Some(false)
        } else {
            None
        }
    }
}
