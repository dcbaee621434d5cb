use super::escape::Html;
use crate::error::{KuperError, Result};

/// Supplies already-escaped values for template placeholders.
pub trait TemplateContext {
    fn value(&self, key: &str) -> Option<Html>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A document with `{{ name }}` placeholders, parsed once.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                KuperError::Template(format!("{name}: unterminated placeholder"))
            })?;
            let key = after[..close].trim();
            if key.is_empty() {
                return Err(KuperError::Template(format!("{name}: empty placeholder")));
            }
            segments.push(Segment::Placeholder(key.to_string()));
            rest = &after[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(key) => Some(key.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, context: &dyn TemplateContext) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    let value = context.value(key).ok_or_else(|| {
                        KuperError::Template(format!("{}: unknown placeholder '{key}'", self.name))
                    })?;
                    out.push_str(value.as_str());
                }
            }
        }
        Ok(out)
    }
}
