use crate::command::ParamValue;
use std::collections::BTreeMap;
use std::fmt;

/// One piece of a compiled template: either literal text or a placeholder
/// name to substitute.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A template string with named `{placeholder}` fields, parsed once at
/// construction time into a sequence of segments (spec's Design Notes:
/// "a compiled template representation ... substitution is a fold over
/// segments").
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    MissingParameter(String),
    UnterminatedPlaceholder,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingParameter(name) => write!(f, "missing required parameter {name}"),
            TemplateError::UnterminatedPlaceholder => write!(f, "unterminated placeholder"),
        }
    }
}

impl Template {
    /// Parse a template string such as `"G0 X{x} Y{y} F{feedrate}"`.
    pub fn parse(source: &str) -> Template {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '{' {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    // Treat an unterminated `{` as literal text, mirroring a
                    // line-oriented grammar with no escaping (spec §4.B).
                    literal.push('{');
                    literal.push_str(&name);
                } else {
                    segments.push(Segment::Placeholder(name));
                }
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Template { segments }
    }

    /// Substitute every placeholder from `params`. Numeric values render with
    /// 3 fractional digits; integers and strings render as-is. A placeholder
    /// absent from `params` is a typed failure — substitution never falls
    /// back silently (spec §4.B).
    pub fn render(&self, params: &BTreeMap<String, ParamValue>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingParameter(name.clone()))?;
                    out.push_str(&render_value(value));
                }
            }
        }
        Ok(out)
    }
}

fn render_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Number(v) => format!("{v:.3}"),
        ParamValue::Integer(v) => v.to_string(),
        ParamValue::Text(s) => s.clone(),
        ParamValue::Bool(b) => b.to_string(),
    }
}
