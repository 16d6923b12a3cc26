use crate::error::{IndexError, Result};
use crate::index::{DocId, HashIndex};
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl FromStr for Operator {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            "NOT" => Ok(Operator::Not),
            other => Err(IndexError::UnknownOperator(other.to_string())),
        }
    }
}

/// What to do with an operator token that is not AND, OR or NOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownOperatorPolicy {
    /// Fail the whole query.
    #[default]
    Reject,
    /// Drop the offending (operator, term) pair and keep going.
    Ignore,
}

/// `TERM (OP TERM)*`, evaluated strictly left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BooleanQuery<'q> {
    pub first: Option<&'q str>,
    pub clauses: Vec<(Operator, &'q str)>,
}

impl<'q> BooleanQuery<'q> {
    /// A dangling operator at the end (no term after it) is dropped.
    pub fn parse(query: &'q str, policy: UnknownOperatorPolicy) -> Result<Self> {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        let Some((&first, rest)) = tokens.split_first() else {
            return Ok(BooleanQuery::default());
        };
        let mut clauses = Vec::with_capacity(rest.len() / 2);
        for pair in rest.chunks_exact(2) {
            match pair[0].parse::<Operator>() {
                Ok(op) => clauses.push((op, pair[1])),
                Err(e) => match policy {
                    UnknownOperatorPolicy::Reject => return Err(e),
                    UnknownOperatorPolicy::Ignore => {
                        tracing::debug!(op = pair[0], term = pair[1], "ignoring unknown operator");
                    }
                },
            }
        }
        Ok(BooleanQuery { first: Some(first), clauses })
    }

    pub fn evaluate(&self, index: &HashIndex) -> BTreeSet<DocId> {
        let Some(first) = self.first else { return BTreeSet::new() };
        let mut result = operand(index, first);
        for &(op, term) in &self.clauses {
            let rhs = operand(index, term);
            result = match op {
                Operator::And => result.intersection(&rhs).copied().collect(),
                Operator::Or => {
                    result.extend(rhs);
                    result
                }
                Operator::Not => result.difference(&rhs).copied().collect(),
            };
        }
        result
    }
}

fn operand(index: &HashIndex, term: &str) -> BTreeSet<DocId> {
    index.postings(term).iter().copied().collect()
}

/// Evaluate `query`, rejecting unknown operators.
pub fn search(index: &HashIndex, query: &str) -> Result<BTreeSet<DocId>> {
    search_with(index, query, UnknownOperatorPolicy::Reject)
}

pub fn search_with(index: &HashIndex, query: &str, policy: UnknownOperatorPolicy) -> Result<BTreeSet<DocId>> {
    let parsed = BooleanQuery::parse(query, policy)?;
    let hits = parsed.evaluate(index);
    tracing::debug!(query, clauses = parsed.clauses.len(), hits = hits.len(), "evaluated boolean query");
    Ok(hits)
}
