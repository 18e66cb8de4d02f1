#[cfg(test)]
mod tests {
    use attrs::{Map, Value};
    use rules::{AsyncStrategy, ErrorMap, RuleRegistry};

    use crate::{Config, ConfigStack, OnChangeStrategy};

    fn cfg(json: &str) -> Config {
        Config::from_json(json).unwrap()
    }

    #[test]
    fn merge_unions_colliding_rules() {
        let a = cfg(r#"{"name": "presence", "age": "numericality"}"#);
        let b = cfg(r#"{"name": {"length": {"minimum": 2}}, "email": "presence"}"#);
        let merged = a.merge(&b);
        let patterns: Vec<&str> = merged
            .rules()
            .entries()
            .iter()
            .map(|e| e.pattern().as_str())
            .collect();
        assert_eq!(patterns, vec!["name", "age", "email"]);
        assert_eq!(
            merged.rules().get("name").unwrap().rule_names(),
            vec!["presence", "length"]
        );
    }

    #[test]
    fn merge_options_and_strategies() {
        let a = cfg(
            r#"{"defaultOptions": {"message": "a", "keep": 1}, "onChangeStrategy": "none",
                "async": {"errorsStrategy": "join"}}"#,
        );
        let b = cfg(r#"{"defaultOptions": {"message": "b"}}"#);
        let merged = a.merge(&b);
        assert_eq!(merged.options().str("message"), Some("b"));
        assert_eq!(merged.options().f64("keep"), Some(1.0));
        assert_eq!(merged.strategy(), OnChangeStrategy::Never);
        assert!(matches!(merged.async_strategy(), AsyncStrategy::Join));

        let c = cfg(r#"{"onChangeStrategy": "onAfterValidate"}"#);
        assert_eq!(merged.merge(&c).strategy(), OnChangeStrategy::OnAfterValidate);
    }

    #[test]
    fn merge_concatenates_deps_and_helpers() {
        let a = Config::builder()
            .dep("price", &["total"])
            .helper(|_| Map::from([("a".to_string(), Value::from(1))]))
            .build()
            .unwrap();
        let b = Config::builder()
            .dep("price", &["tax"])
            .helper(|_| {
                Map::from([
                    ("a".to_string(), Value::from(2)),
                    ("b".to_string(), Value::from(3)),
                ])
            })
            .build()
            .unwrap();
        let merged = a.merge(&b);
        let deps: Vec<String> = merged
            .deps()
            .dependents_of("price")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(deps, vec!["total", "tax"]);

        let out = merged.eval_helpers(&Value::empty_map(), &ErrorMap::new());
        assert_eq!(out.get("a"), Some(&Value::from(2)));
        assert_eq!(out.get("b"), Some(&Value::from(3)));
    }

    #[test]
    fn stack_folds_layers_and_removes_by_identity() {
        let mut stack = ConfigStack::new(cfg(r#"{"name": "presence"}"#));
        assert_eq!(stack.merged().rules().len(), 1);

        let extra = stack.push(cfg(r#"{"bar": "presence"}"#));
        let other = stack.push(cfg(r#"{"baz": "presence"}"#));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.merged().rules().len(), 3);

        assert!(stack.remove(extra).is_some());
        assert!(stack.remove(extra).is_none());
        assert!(stack.merged().rules().get("bar").is_none());
        assert!(stack.merged().rules().get("baz").is_some());
        assert!(stack.contains(other));

        let base = stack.base_id().unwrap();
        assert_eq!(stack.amend(cfg(r#"{"title": "presence"}"#)), base);
        assert!(stack.merged().rules().get("name").is_none());
        let first = stack.merged().rules().entries()[0].pattern().as_str().to_string();
        assert_eq!(first, "title");
    }

    #[test]
    fn scoped_config_prefixes_rules_and_deps() {
        let item = cfg(
            r#"{"rules": {"name": "presence", "count": {"rules": "presence", "deps": ["max"]}}}"#,
        );
        let scoped = item.scoped("items.2").unwrap();
        assert!(scoped.rules().get("items.2.name").is_some());
        assert!(scoped.rules().get("items.2.count").is_some());
        let deps: Vec<String> = scoped
            .deps()
            .dependents_of("items.2.max")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(deps, vec!["items.2.count"]);
        assert!(scoped.deps().dependents_of("max").is_empty());
    }

    #[test]
    fn check_reports_unregistered_rules() {
        let registry = RuleRegistry::with_builtins();
        assert!(cfg(r#"{"a": "presence"}"#).check(&registry).is_ok());
        let bad = cfg(r#"{"async": {"rules": {"login": "taken"}}}"#);
        assert_eq!(
            bad.check(&registry).unwrap_err(),
            crate::Error::Rules(rules::Error::UnknownRule {
                name: "taken".into()
            })
        );
    }
}
