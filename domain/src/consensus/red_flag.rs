//! Red-flag rules
//!
//! A red flag is a named predicate over a candidate output. Any matching rule
//! discards the candidate before it is counted; the first matching rule in
//! declaration order is the one reported.

use std::fmt;
use std::sync::Arc;

type Predicate<O> = Arc<dyn Fn(&O) -> bool + Send + Sync>;

/// A labelled predicate that rejects a candidate when it returns `true`
pub struct RedFlagRule<O> {
    description: String,
    test: Predicate<O>,
}

impl<O> RedFlagRule<O> {
    pub fn new(
        description: impl Into<String>,
        test: impl Fn(&O) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn matches(&self, candidate: &O) -> bool {
        (self.test)(candidate)
    }
}

impl<O> Clone for RedFlagRule<O> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<O> fmt::Debug for RedFlagRule<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedFlagRule")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered list of red-flag rules
///
/// # Example
///
/// ```
/// use forge_domain::consensus::{RedFlagRule, RedFlags};
///
/// let flags = RedFlags::new()
///     .with(RedFlagRule::new("negative", |v: &i64| *v < 0))
///     .with(RedFlagRule::new("too large", |v: &i64| *v > 100));
///
/// assert_eq!(flags.first_match(&-5), Some("negative"));
/// assert_eq!(flags.first_match(&500), Some("too large"));
/// assert_eq!(flags.first_match(&42), None);
/// ```
pub struct RedFlags<O> {
    rules: Vec<RedFlagRule<O>>,
}

impl<O> RedFlags<O> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; evaluation order is insertion order.
    pub fn with(mut self, rule: RedFlagRule<O>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Description of the first rule that matches, if any.
    pub fn first_match(&self, candidate: &O) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(candidate))
            .map(RedFlagRule::description)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedFlagRule<O>> {
        self.rules.iter()
    }
}

impl<O> Default for RedFlags<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for RedFlags<O> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<O> fmt::Debug for RedFlags<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}

impl<O> FromIterator<RedFlagRule<O>> for RedFlags<O> {
    fn from_iter<T: IntoIterator<Item = RedFlagRule<O>>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_reports_declaration_order() {
        let flags = RedFlags::new()
            .with(RedFlagRule::new("even", |v: &u32| v % 2 == 0))
            .with(RedFlagRule::new("multiple of four", |v: &u32| v % 4 == 0));

        // Both rules match 8; the first declared wins
        assert_eq!(flags.first_match(&8), Some("even"));
        assert_eq!(flags.first_match(&6), Some("even"));
        assert_eq!(flags.first_match(&7), None);
    }

    #[test]
    fn test_empty_flags_never_match() {
        let flags: RedFlags<String> = RedFlags::default();
        assert!(flags.is_empty());
        assert_eq!(flags.first_match(&"anything".to_string()), None);
    }

    #[test]
    fn test_from_iter_and_clone() {
        let flags: RedFlags<i32> = vec![
            RedFlagRule::new("zero", |v: &i32| *v == 0),
            RedFlagRule::new("negative", |v: &i32| *v < 0),
        ]
        .into_iter()
        .collect();

        let cloned = flags.clone();
        assert_eq!(cloned.len(), 2);
        assert_eq!(cloned.first_match(&-1), Some("negative"));
        assert_eq!(
            cloned.iter().map(|r| r.description()).collect::<Vec<_>>(),
            vec!["zero", "negative"]
        );
    }
}
