//! Boolean rule trees rendered into query strings.

use crate::catalog::FieldName;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

const MATCH_ALL: &str = "*:*";

/// Comparison of one attribute condition
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

/// Product selection rule of an optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Every child matches; no children matches everything
    All { rules: Vec<Rule> },
    /// At least one child matches
    Any { rules: Vec<Rule> },
    Not { rule: Box<Rule> },
    Condition {
        attribute: String,
        operator: Operator,
        value: Value,
    },
}

impl Rule {
    pub fn all(rules: Vec<Rule>) -> Self {
        Rule::All { rules }
    }

    pub fn any(rules: Vec<Rule>) -> Self {
        Rule::Any { rules }
    }

    pub fn negate(rule: Rule) -> Self {
        Rule::Not {
            rule: Box::new(rule),
        }
    }

    pub fn condition(attribute: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Rule::Condition {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Escaped query string selecting the documents the rule matches
    pub fn render(&self) -> Result<String> {
        match self {
            Rule::All { rules } if rules.is_empty() => Ok(MATCH_ALL.to_string()),
            Rule::All { rules } => join(rules, " AND "),
            Rule::Any { rules } if rules.is_empty() => {
                Err(SearchError::config("An 'any' rule needs at least one condition"))
            }
            Rule::Any { rules } => join(rules, " OR "),
            Rule::Not { rule } => Ok(format!("({} NOT ({}))", MATCH_ALL, rule.render()?)),
            Rule::Condition {
                attribute,
                operator,
                value,
            } => render_condition(attribute, *operator, value),
        }
    }
}

fn join(rules: &[Rule], separator: &str) -> Result<String> {
    let parts = rules.iter().map(Rule::render).collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(separator)))
}

fn render_condition(attribute: &str, operator: Operator, value: &Value) -> Result<String> {
    let field = FieldName::new(attribute)?;

    let rendered = match operator {
        Operator::Eq => format!("{}:{}", field, term(value)?),
        Operator::Neq => format!("({} NOT {}:{})", MATCH_ALL, field, term(value)?),
        Operator::In => format!("{}:{}", field, terms(value)?),
        Operator::Nin => format!("({} NOT {}:{})", MATCH_ALL, field, terms(value)?),
        Operator::Gt => format!("{}:{{{} TO *}}", field, term(value)?),
        Operator::Gte => format!("{}:[{} TO *]", field, term(value)?),
        Operator::Lt => format!("{}:{{* TO {}}}", field, term(value)?),
        Operator::Lte => format!("{}:[* TO {}]", field, term(value)?),
        Operator::Contains => match value {
            Value::String(text) if !text.is_empty() => format!("{}:*{}*", field, escape(text)),
            _ => {
                return Err(SearchError::config(format!(
                    "'contains' on '{}' needs a non empty string",
                    attribute
                )))
            }
        },
    };

    Ok(rendered)
}

/// A scalar rendered as a query string term; strings are quoted phrases
fn term(value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(SearchError::config(format!(
            "Rule value {} is not a scalar",
            other
        ))),
    }
}

fn terms(value: &Value) -> Result<String> {
    let values = value
        .as_array()
        .filter(|values| !values.is_empty())
        .ok_or_else(|| SearchError::config("'in' conditions need a non empty list"))?;
    let rendered = values.iter().map(term).collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", rendered.join(" OR ")))
}

/// Backslash escape query string syntax
pub fn escape(text: &str) -> String {
    const RESERVED: &[char] = &[
        '+', '-', '=', '&', '|', '>', '<', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*',
        '?', ':', '\\', '/', ' ',
    ];

    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
