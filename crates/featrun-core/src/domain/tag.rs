//! Tags and tag expressions.
//!
//! Expression syntax: tokens separated by commas or whitespace, `@name`
//! requires a tag and `~@name` excludes one. A scenario matches when it
//! carries at least one required tag (or none are required) and none of the
//! excluded tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidTagExpressionError;

/// A scenario label, stored without its leading `@`. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Build a tag from a bare name (`smoke`, not `@smoke`).
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidTagExpressionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidTagExpressionError::new(&name, "tag name is empty"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '@' | '~' | ','))
        {
            return Err(InvalidTagExpressionError::new(
                &name,
                format!("tag name contains invalid character {:?}", c),
            ));
        }
        Ok(Self(name))
    }

    /// Build a tag from a source token such as `@smoke`.
    pub fn from_token(token: &str) -> Result<Self, InvalidTagExpressionError> {
        match token.strip_prefix('@') {
            Some(name) => Self::new(name),
            None => Err(InvalidTagExpressionError::new(
                token,
                "tag must start with '@'",
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Include/exclude tag selection. Evaluation is pure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagExpression {
    required: BTreeSet<Tag>,
    excluded: BTreeSet<Tag>,
}

impl TagExpression {
    /// The expression that matches every scenario.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit sets, rejecting a tag that is both required and excluded.
    pub fn new(
        required: impl IntoIterator<Item = Tag>,
        excluded: impl IntoIterator<Item = Tag>,
    ) -> Result<Self, InvalidTagExpressionError> {
        let expr = Self {
            required: required.into_iter().collect(),
            excluded: excluded.into_iter().collect(),
        };
        expr.check_consistent()?;
        Ok(expr)
    }

    /// Expression requiring a single tag, given by bare name.
    pub fn requiring(name: &str) -> Result<Self, InvalidTagExpressionError> {
        Self::new([Tag::new(name)?], [])
    }

    /// Expression excluding a single tag, given by bare name.
    pub fn excluding(name: &str) -> Result<Self, InvalidTagExpressionError> {
        Self::new([], [Tag::new(name)?])
    }

    /// Parse one expression string, e.g. `"@smoke,@regression ~@ignore"`.
    pub fn parse(expression: &str) -> Result<Self, InvalidTagExpressionError> {
        Self::parse_all([expression])
    }

    /// Parse several expression strings (one per CLI occurrence) into a single
    /// expression whose required and excluded sets are the unions of each.
    pub fn parse_all<I, S>(expressions: I) -> Result<Self, InvalidTagExpressionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expr = Self::default();
        for expression in expressions {
            let expression = expression.as_ref();
            let tokens = expression
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty());
            for token in tokens {
                if let Some(rest) = token.strip_prefix('~') {
                    let tag = Tag::from_token(rest)
                        .map_err(|e| InvalidTagExpressionError::new(expression, e.reason))?;
                    expr.excluded.insert(tag);
                } else {
                    let tag = Tag::from_token(token)
                        .map_err(|e| InvalidTagExpressionError::new(expression, e.reason))?;
                    expr.required.insert(tag);
                }
            }
        }
        expr.check_consistent()?;
        Ok(expr)
    }

    fn check_consistent(&self) -> Result<(), InvalidTagExpressionError> {
        if let Some(tag) = self.required.intersection(&self.excluded).next() {
            return Err(InvalidTagExpressionError::new(
                &self.to_string(),
                format!("{} is both required and excluded", tag),
            ));
        }
        Ok(())
    }

    pub fn required(&self) -> &BTreeSet<Tag> {
        &self.required
    }

    pub fn excluded(&self) -> &BTreeSet<Tag> {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }

    /// Match decision for a tag set.
    pub fn matches(&self, tags: &BTreeSet<Tag>) -> bool {
        let included =
            self.required.is_empty() || self.required.iter().any(|t| tags.contains(t));
        included && !self.excluded.iter().any(|t| tags.contains(t))
    }

    /// Whether any subset of `tags` could satisfy the required set.
    ///
    /// Used to skip whole specs whose combined tags cannot match.
    pub fn could_match(&self, tags: &BTreeSet<Tag>) -> bool {
        self.required.is_empty() || self.required.iter().any(|t| tags.contains(t))
    }
}

impl FromStr for TagExpression {
    type Err = InvalidTagExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .required
            .iter()
            .map(|t| t.to_string())
            .chain(self.excluded.iter().map(|t| format!("~{}", t)))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tags(names: &[&str]) -> BTreeSet<Tag> {
        names.iter().map(|n| Tag::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_tag_display_has_at_prefix() {
        assert_eq!(Tag::new("smoke").unwrap().to_string(), "@smoke");
    }

    #[test]
    fn test_tag_rejects_bad_names() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("a b").is_err());
        assert!(Tag::new("a@b").is_err());
        assert!(Tag::from_token("smoke").is_err());
        assert!(Tag::from_token("@").is_err());
    }

    #[test]
    fn test_parse_required_and_excluded() {
        let expr = TagExpression::parse("@smoke,@regression ~@ignore").unwrap();
        assert_eq!(expr.required(), &tags(&["smoke", "regression"]));
        assert_eq!(expr.excluded(), &tags(&["ignore"]));
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        for bad in ["smoke", "@", "~@", "~smoke", "@a@b", "@smoke,~"] {
            let err = TagExpression::parse(bad).unwrap_err();
            assert_eq!(err.expression, bad, "expression echoed for {bad}");
        }
    }

    #[test]
    fn test_parse_rejects_contradiction() {
        let err = TagExpression::parse("@smoke ~@smoke").unwrap_err();
        assert!(err.reason.contains("both required and excluded"));
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(TagExpression::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_all_merges_occurrences() {
        let expr = TagExpression::parse_all(["@smoke", "~@ignore"]).unwrap();
        assert_eq!(expr, TagExpression::parse("@smoke ~@ignore").unwrap());
    }

    #[test]
    fn test_required_is_any_of() {
        let expr = TagExpression::parse("@smoke,@regression").unwrap();
        assert!(expr.matches(&tags(&["smoke"])));
        assert!(expr.matches(&tags(&["regression", "slow"])));
        assert!(!expr.matches(&tags(&["slow"])));
        assert!(!expr.matches(&BTreeSet::new()));
    }

    #[test]
    fn test_excluded_wins() {
        let expr = TagExpression::parse("@smoke ~@ignore").unwrap();
        assert!(!expr.matches(&tags(&["smoke", "ignore"])));
    }

    #[test]
    fn test_display_round_trips() {
        let expr = TagExpression::parse("~@ignore @smoke").unwrap();
        assert_eq!(expr.to_string(), "@smoke,~@ignore");
        assert_eq!(expr.to_string().parse::<TagExpression>().unwrap(), expr);
    }

    #[test]
    fn test_could_match_uses_required_only() {
        let expr = TagExpression::parse("@smoke ~@ignore").unwrap();
        assert!(expr.could_match(&tags(&["smoke", "ignore"])));
        assert!(!expr.could_match(&tags(&["regression"])));
    }

    fn tag_name() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    proptest! {
        #[test]
        fn prop_empty_expression_matches_everything(
            names in proptest::collection::btree_set(tag_name(), 0..6)
        ) {
            let set: BTreeSet<Tag> = names.into_iter().map(|n| Tag::new(n).unwrap()).collect();
            prop_assert!(TagExpression::empty().matches(&set));
        }

        #[test]
        fn prop_matching_is_deterministic_and_order_independent(
            required in proptest::collection::vec(tag_name(), 0..4),
            excluded in proptest::collection::vec(tag_name(), 0..4),
            names in proptest::collection::vec(tag_name(), 0..6),
        ) {
            let required: Vec<Tag> = required.into_iter().map(|n| Tag::new(n).unwrap()).collect();
            let excluded: Vec<Tag> = excluded
                .into_iter()
                .map(|n| Tag::new(n).unwrap())
                .filter(|t| !required.contains(t))
                .collect();
            let forward = TagExpression::new(required.clone(), excluded.clone()).unwrap();
            let reversed = TagExpression::new(
                required.into_iter().rev(),
                excluded.into_iter().rev(),
            )
            .unwrap();
            let set: BTreeSet<Tag> = names.into_iter().map(|n| Tag::new(n).unwrap()).collect();

            let first = forward.matches(&set);
            prop_assert_eq!(first, forward.matches(&set));
            prop_assert_eq!(first, reversed.matches(&set));
        }
    }
}
