#[cfg(test)]
mod tests {
    use attrs::{PathPattern, Value};
    use serde_json::json;

    use crate::{
        Context, ErrorMap, ErrorPatch, Executor, Options, Outcome, RuleRegistry, RuleTable,
        ValidatorSpec, apply_patch,
    };

    fn tree(v: serde_json::Value) -> Value {
        Value::from(v)
    }

    fn table(rules: &[(&str, ValidatorSpec)]) -> RuleTable {
        let mut t = RuleTable::new();
        for (pattern, spec) in rules {
            t.insert(pattern, spec.clone()).unwrap();
        }
        t
    }

    fn failing(msg: &'static str) -> ValidatorSpec {
        ValidatorSpec::func(move |_: &Value, _: &Context<'_>| Outcome::invalid(msg))
    }

    #[test]
    fn uncovered_paths_are_valid() {
        let registry = RuleRegistry::with_builtins();
        let rules = table(&[("foo", "presence".into())]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"foo": "", "bar": ""}));
        assert_eq!(exec.validate_one(&attrs, "bar").unwrap(), None);
        assert_eq!(
            exec.validate_one(&attrs, "foo").unwrap().as_deref(),
            Some("Can't be empty")
        );
    }

    #[test]
    fn literal_and_wildcard_rules_both_apply() {
        let registry = RuleRegistry::new();
        let rules = table(&[
            ("items.1.name", ValidatorSpec::func(|_: &Value, _: &Context<'_>| Outcome::Valid)),
            ("items.*.name", failing("wildcard")),
        ]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"items": [{"name": "a"}, {"name": "b"}]}));
        assert_eq!(
            exec.validate_one(&attrs, "items.1.name").unwrap().as_deref(),
            Some("wildcard")
        );

        let rules = table(&[
            ("items.1.name", failing("literal")),
            ("items.*.name", failing("wildcard")),
        ]);
        let exec = Executor::new(&registry, &rules, &options);
        assert_eq!(
            exec.validate_one(&attrs, "items.1.name").unwrap().as_deref(),
            Some("literal")
        );
    }

    #[test]
    fn wildcards_ignore_indices_past_the_end() {
        let registry = RuleRegistry::new();
        let rules = table(&[("items.*.name", failing("bad"))]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"items": [{"name": "a"}]}));
        assert!(exec.validate_one(&attrs, "items.0.name").unwrap().is_some());
        assert_eq!(exec.validate_one(&attrs, "items.3.name").unwrap(), None);
    }

    #[test]
    fn validate_rule_fans_out() {
        let registry = RuleRegistry::with_builtins();
        let rules = table(&[("items.*.name", "presence".into())]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"items": [{"name": "a"}, {"name": ""}, {}]}));
        let mut patch = ErrorPatch::new();
        exec.validate_rule(&attrs, &PathPattern::parse("items.*.name").unwrap(), &mut patch)
            .unwrap();
        assert_eq!(patch.len(), 3);
        assert_eq!(patch["items.0.name"], None);
        assert_eq!(patch["items.1.name"].as_deref(), Some("Can't be empty"));
        assert_eq!(patch["items.2.name"].as_deref(), Some("Can't be empty"));
    }

    #[test]
    fn validate_all_reports_failures_only() {
        let registry = RuleRegistry::with_builtins();
        let rules = table(&[
            ("name", "presence".into()),
            ("age", ValidatorSpec::with_options(
                "numericality",
                Options::new().with("greaterThan", 17),
            )),
            ("missing", "presence".into()),
        ]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"name": "x", "age": 12}));
        let errors = exec.validate_all(&attrs).unwrap();
        let expected: ErrorMap = [
            ("age".to_string(), "Should be greater than 17".to_string()),
            ("missing".to_string(), "Can't be empty".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(errors, expected);
    }

    #[test]
    fn default_options_reach_every_rule() {
        let registry = RuleRegistry::with_builtins();
        let rules = table(&[("a", "presence".into()), ("b", "presence".into())]);
        let options = Options::new().with("message", "Required");
        let exec = Executor::new(&registry, &rules, &options);
        let errors = exec.validate_all(&Value::empty_map()).unwrap();
        assert_eq!(errors.get("a").map(String::as_str), Some("Required"));
        assert_eq!(errors.get("b").map(String::as_str), Some("Required"));
    }

    #[test]
    fn validators_see_siblings_and_captures() {
        let registry = RuleRegistry::new();
        let within_max = ValidatorSpec::func(|value: &Value, ctx: &Context<'_>| {
            let Some(i) = ctx.captures.get("i") else {
                return Outcome::invalid("no capture");
            };
            let max = ctx
                .get(&format!("items.{i}.max"))
                .and_then(Value::as_f64)
                .unwrap_or(f64::MAX);
            match value.as_f64() {
                Some(n) if n > max => Outcome::invalid("Too many"),
                _ => Outcome::Valid,
            }
        });
        let rules = table(&[("items.(i).count", within_max)]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"items": [{"count": 3, "max": 5}, {"count": 7, "max": 5}]}));
        let errors = exec.validate_all(&attrs).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["items.1.count"], "Too many");
    }

    #[test]
    fn validate_below_covers_nested_rules() {
        let registry = RuleRegistry::with_builtins();
        let rules = table(&[
            ("items.*.name", "presence".into()),
            ("items", "presence".into()),
            ("other", "presence".into()),
        ]);
        let options = Options::new();
        let exec = Executor::new(&registry, &rules, &options);
        let attrs = tree(json!({"items": [{"name": ""}, {"name": "b"}]}));
        let mut patch = ErrorPatch::new();
        exec.validate_below(&attrs, "items", &mut patch).unwrap();
        let keys: Vec<&str> = patch.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["items.0.name", "items.1.name"]);
    }

    #[test]
    fn apply_patch_compacts() {
        let mut errors: ErrorMap = [("a".to_string(), "x".to_string())].into_iter().collect();
        let patch: ErrorPatch = [
            ("a".to_string(), None),
            ("b".to_string(), Some("y".to_string())),
            ("c".to_string(), Some(String::new())),
        ]
        .into_iter()
        .collect();
        apply_patch(&mut errors, patch);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["b"], "y");
    }

    #[test]
    fn table_unions_colliding_patterns() {
        let mut rules = table(&[("a", "presence".into()), ("b", "presence".into())]);
        rules.insert("a", "length").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get("a").unwrap().rule_names(), vec!["presence", "length"]);
        assert_eq!(rules.entries()[0].pattern().as_str(), "a");
    }

    #[test]
    fn prefixed_table_scopes_patterns() {
        let rules = table(&[("name", "presence".into()), ("tags.*", "presence".into())]);
        let scoped = rules
            .prefixed(&PathPattern::parse("items.0").unwrap())
            .unwrap();
        let patterns: Vec<&str> = scoped.entries().iter().map(|e| e.pattern().as_str()).collect();
        assert_eq!(patterns, vec!["items.0.name", "items.0.tags.*"]);
    }
}
