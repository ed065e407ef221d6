//! Turning structured messages into ordered tabular rows.

/// Tabular view of a message: an ordered field set with matching values.
///
/// `field_names` and `field_values` must agree in order; the header row of a
/// topic is derived from the first record's names, every later record only
/// contributes values.
pub trait Flat {
    fn field_names(&self) -> Vec<String>;
    fn field_values(&self) -> Vec<String>;
}

/// Message with no known schema, carried as a textual rendering of
/// `name: value` lines, one field per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericMessage {
    text: String,
}

impl GenericMessage {
    pub fn from_text(text: impl Into<String>) -> Self {
        GenericMessage { text: text.into() }
    }

    /// Render a JSON document into `name: value` lines, nested objects
    /// indented below their key, preserving field order.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(data)?;
        let mut text = String::new();
        render_json(&value, 0, &mut text);
        Ok(GenericMessage { text })
    }

    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        // Only the first colon separates name from value; later colons stay
        // inside the value. Lines without a colon are dropped.
        self.text.lines().filter_map(|line| {
            line.split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
        })
    }
}

impl Flat for GenericMessage {
    fn field_names(&self) -> Vec<String> {
        self.pairs().map(|(name, _)| name.to_string()).collect()
    }

    fn field_values(&self) -> Vec<String> {
        self.pairs().map(|(_, value)| value.to_string()).collect()
    }
}

fn render_json(value: &serde_json::Value, indent: usize, out: &mut String) {
    let serde_json::Value::Object(map) = value else {
        out.push_str(&scalar_text(value));
        out.push('\n');
        return;
    };
    for (key, v) in map {
        for _ in 0..indent {
            out.push(' ');
        }
        match v {
            serde_json::Value::Object(_) => {
                out.push_str(key);
                out.push_str(":\n");
                render_json(v, indent + 2, out);
            }
            _ => {
                out.push_str(key);
                out.push_str(": ");
                out.push_str(&scalar_text(v));
                out.push('\n');
            }
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_colon_splits_name_from_value() {
        let msg = GenericMessage::from_text("a: 1\nb: x:y");

        assert_eq!(msg.field_names(), vec!["a", "b"]);
        // Colon inside the value is preserved verbatim.
        assert_eq!(msg.field_values(), vec!["1", "x:y"]);
    }

    #[test]
    fn lines_without_colon_are_dropped() {
        let msg = GenericMessage::from_text("a: 1\n---\nb: 2");

        assert_eq!(msg.field_names(), vec!["a", "b"]);
        assert_eq!(msg.field_values(), vec!["1", "2"]);
    }

    #[test]
    fn nested_keys_keep_empty_values() {
        let msg = GenericMessage::from_text("header:\n  secs: 12\n  nsecs: 34");

        assert_eq!(msg.field_names(), vec!["header", "secs", "nsecs"]);
        assert_eq!(msg.field_values(), vec!["", "12", "34"]);
    }

    #[test]
    fn json_renders_nested_name_value_lines() {
        let msg =
            GenericMessage::from_json(br#"{"x": 1, "pose": {"y": 2.5, "frame": "map"}}"#).unwrap();

        assert_eq!(msg.field_names(), vec!["x", "pose", "y", "frame"]);
        assert_eq!(msg.field_values(), vec!["1", "", "2.5", "map"]);
    }
}
