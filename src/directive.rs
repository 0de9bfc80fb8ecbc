//! Join directives: which nested models to render, and under which alias.
//!
//! # Syntax
//!
//! ```text
//! Address:a, Profile
//! ───┬─── ┬  ───┬───
//!    │    │     └── include, keep default alias
//!    │    └── alias override
//!    └── model (bare type name)
//! ```

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{map, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ColprefixError, ColprefixResult};

/// Include nested models of type `model`, optionally under `alias`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JoinDirective {
    pub model: String,
    /// Empty keeps the model's default alias.
    pub alias: String,
}

impl JoinDirective {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            alias: String::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

/// Shorthand for `JoinDirective::new(model).with_alias(alias)`.
pub fn join(model: impl Into<String>, alias: impl Into<String>) -> JoinDirective {
    JoinDirective::new(model).with_alias(alias)
}

impl fmt::Display for JoinDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alias.is_empty() {
            write!(f, "{}", self.model)
        } else {
            write!(f, "{}:{}", self.model, self.alias)
        }
    }
}

impl FromStr for JoinDirective {
    type Err = ColprefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directives = parse_directives(s)?;
        if directives.len() != 1 {
            return Err(ColprefixError::parse(0, format!("Expected one directive, found {}", directives.len())));
        }
        Ok(directives.remove(0))
    }
}

/// Call-scoped lookup from model name to alias override.
///
/// Built fresh for every render, so aliases never leak between calls.
#[derive(Debug, Default)]
pub struct JoinSet<'a> {
    by_model: HashMap<&'a str, &'a str>,
}

impl<'a> JoinSet<'a> {
    /// Directives with an empty model name are ignored; a later directive
    /// for the same model replaces an earlier one.
    pub fn new(directives: &'a [JoinDirective]) -> Self {
        let by_model = directives
            .iter()
            .filter(|d| !d.model.is_empty())
            .map(|d| (d.model.as_str(), d.alias.as_str()))
            .collect();
        Self { by_model }
    }

    /// No usable directive: every nested model is rendered.
    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }

    pub fn includes(&self, model: &str) -> bool {
        self.is_empty() || self.by_model.contains_key(model)
    }

    /// Non-empty alias override for `model`.
    pub fn alias_for(&self, model: &str) -> Option<&'a str> {
        self.by_model.get(model).copied().filter(|alias| !alias.is_empty())
    }
}

/// Parse a comma-separated directive list such as `Address:a, Profile`.
pub fn parse_directives(input: &str) -> ColprefixResult<Vec<JoinDirective>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    match parse_list(trimmed) {
        Ok(("", directives)) => Ok(directives),
        Ok((remaining, _)) => Err(ColprefixError::parse(
            trimmed.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(e) => Err(ColprefixError::parse(0, format!("Parse failed: {:?}", e))),
    }
}

fn parse_list(input: &str) -> IResult<&str, Vec<JoinDirective>> {
    separated_list1(delimited(multispace0, char(','), multispace0), parse_directive)(input)
}

/// Parse `Model` or `Model:alias`.
fn parse_directive(input: &str) -> IResult<&str, JoinDirective> {
    map(
        pair(
            parse_identifier,
            opt(preceded(delimited(multispace0, char(':'), multispace0), parse_identifier)),
        ),
        |(model, alias)| JoinDirective {
            model: model.to_string(),
            alias: alias.unwrap_or_default().to_string(),
        },
    )(input)
}

/// Parse an identifier (model name, table alias).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}
