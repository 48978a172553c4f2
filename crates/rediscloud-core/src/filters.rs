//! Filter combinators for data-source reads
//!
//! Data sources narrow list results with stacked predicates; every predicate
//! must hold for an item to survive.

use crate::error::{CoreError, Result};

/// A stack of predicates over `T`
pub struct Filters<'a, T> {
    predicates: Vec<Box<dyn Fn(&T) -> bool + Send + Sync + 'a>>,
}

impl<'a, T> Default for Filters<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> Filters<'a, T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    pub fn push(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'a) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Push the predicate only when the configured value is present.
    pub fn push_if<V>(
        self,
        value: Option<V>,
        predicate: impl Fn(&T, &V) -> bool + Send + Sync + 'a,
    ) -> Self
    where
        V: Send + Sync + 'a,
    {
        match value {
            Some(value) => self.push(move |item| predicate(item, &value)),
            None => self,
        }
    }

    pub fn matches(&self, item: &T) -> bool {
        self.predicates.iter().all(|predicate| predicate(item))
    }

    pub fn apply(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Exactly-one helper for singular data sources.
pub fn single<T>(mut items: Vec<T>, what: &str) -> Result<T> {
    match items.len() {
        1 => Ok(items.remove(0)),
        0 => Err(CoreError::validation(format!(
            "no {what} matched the given filters"
        ))),
        n => Err(CoreError::validation(format!(
            "{n} {what} matched the given filters, expected exactly one"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacked_predicates_all_apply() {
        let filters = Filters::new()
            .push(|n: &i64| *n > 2)
            .push(|n: &i64| *n % 2 == 0);
        assert_eq!(filters.apply(vec![1, 2, 3, 4, 5, 6]), vec![4, 6]);
    }

    #[test]
    fn push_if_skips_absent_values() {
        let filters = Filters::new().push_if(None::<i64>, |n: &i64, v| n == v);
        assert_eq!(filters.apply(vec![1, 2, 3]), vec![1, 2, 3]);

        let filters = Filters::new().push_if(Some(2i64), |n: &i64, v| n == v);
        assert_eq!(filters.apply(vec![1, 2, 3]), vec![2]);
    }

    #[test]
    fn single_requires_exactly_one() {
        assert_eq!(single(vec![7], "subscriptions").unwrap(), 7);
        assert!(single(Vec::<i64>::new(), "subscriptions").is_err());
        assert!(single(vec![1, 2], "subscriptions").is_err());
    }
}
