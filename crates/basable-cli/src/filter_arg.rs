//! `--filter` expression parsing
//!
//! Syntax: `[and|or] <column> <OPERATOR> [value] [end]`, where `OPERATOR` is a
//! filter label such as `EQUAL` or `greater_than`. Range operators take a start
//! and an end; `NULL` / `NOT_NULL` take no value.

use anyhow::{Context, bail};
use basable_core::{Combinator, FilterInput, FilterOperator};

pub fn parse_filter(expr: &str) -> anyhow::Result<FilterInput> {
    let mut tokens = expr.split_whitespace().peekable();

    let combinator = match tokens.peek().copied() {
        Some(word) if word.eq_ignore_ascii_case("and") || word.eq_ignore_ascii_case("or") => {
            tokens.next();
            word.parse::<Combinator>()?
        }
        _ => Combinator::Base,
    };

    let column = tokens
        .next()
        .with_context(|| format!("filter `{}` has no column", expr))?;
    let label = tokens
        .next()
        .with_context(|| format!("filter `{}` has no operator", expr))?;
    let operator = FilterOperator::from_label(label)?;

    let rest: Vec<&str> = tokens.collect();
    let mut filter = FilterInput::new(column, operator, "").with_combinator(combinator);

    if operator.requires_two_values() {
        match rest.as_slice() {
            [start, end @ ..] if !end.is_empty() => {
                filter.value = start.to_string();
                filter = filter.with_end_value(end.join(" "));
            }
            _ => bail!("{} needs a start and an end value: `{}`", operator, expr),
        }
    } else if operator.requires_value() {
        if rest.is_empty() {
            bail!("{} needs a value: `{}`", operator, expr);
        }
        filter.value = rest.join(" ");
    } else if !rest.is_empty() {
        bail!("{} takes no value: `{}`", operator, expr);
    }

    Ok(filter)
}
