//! Test Planner
//!
//! Builds the execution plan by filtering registered test cases.
//!
//! Filtering: regex pattern matching on the `suite::method` identifier.
//!
//! Ordering: registration order is kept so reports are reproducible.

use parsebench_core::{Registry, TestCaseDef};

/// Execution plan for one round
pub struct ExecutionPlan<'a> {
    /// Test cases to run, in order
    pub cases: Vec<&'a TestCaseDef>,
}

impl ExecutionPlan<'_> {
    /// Number of planned cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether nothing is planned
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Build execution plan from registered test cases
pub fn build_plan<'a>(registry: &'a Registry, filter: Option<&regex::Regex>) -> ExecutionPlan<'a> {
    let cases = registry
        .iter()
        .filter(|case| filter.is_none_or(|re| re.is_match(&case.id())))
        .collect();

    ExecutionPlan { cases }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsebench_core::Measurer;

    fn registry() -> Registry {
        let pass = |_m: &mut Measurer| Ok(true);
        let mut registry = Registry::new();
        registry
            .register_fn("ExprSuite", "test_mul", pass)
            .register_fn("ExprSuite", "test_add", pass)
            .register_fn("StmtSuite", "test_if", pass);
        registry
    }

    #[test]
    fn test_no_filter_keeps_registration_order() {
        let registry = registry();
        let plan = build_plan(&registry, None);

        let ids: Vec<String> = plan.cases.iter().map(|c| c.id()).collect();
        assert_eq!(
            ids,
            vec!["ExprSuite::test_mul", "ExprSuite::test_add", "StmtSuite::test_if"]
        );
    }

    #[test]
    fn test_regex_filter_on_suite() {
        let registry = registry();
        let re = regex::Regex::new("^ExprSuite::").unwrap();
        let plan = build_plan(&registry, Some(&re));

        assert_eq!(plan.len(), 2);
        assert!(plan.cases.iter().all(|c| c.suite == "ExprSuite"));
    }

    #[test]
    fn test_regex_filter_on_method() {
        let registry = registry();
        let re = regex::Regex::new("test_(if|add)$").unwrap();
        let plan = build_plan(&registry, Some(&re));

        let methods: Vec<&str> = plan.cases.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(methods, vec!["test_add", "test_if"]);
    }

    #[test]
    fn test_filter_matching_nothing() {
        let registry = registry();
        let re = regex::Regex::new("nothing").unwrap();
        assert!(build_plan(&registry, Some(&re)).is_empty());
    }
}
