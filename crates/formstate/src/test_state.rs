#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use attrs::{PathError, Value};
    use config::{Config, OnChangeStrategy};
    use rules::{ErrorMap, ErrorPatch, Outcome, RuleRegistry, ValidatorSpec};
    use serde_json::json;

    use crate::{Action, EngineState, Error, Patch, ResetTo, Response};

    fn state(attrs: serde_json::Value, config: &str) -> EngineState {
        EngineState::new(Value::from(attrs), Config::from_json(config).unwrap())
    }

    fn set(s: &mut EngineState, registry: &RuleRegistry, path: &str, value: serde_json::Value) {
        s.apply(
            registry,
            Action::SetAttr {
                path: path.into(),
                value: value.into(),
            },
        )
        .unwrap();
    }

    fn keys(s: &EngineState) -> Vec<&str> {
        s.errors().keys().map(String::as_str).collect()
    }

    #[test]
    fn validate_then_fix() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": ""}), r#"{"foo": "presence"}"#);
        let v = s.validate(&registry, None).unwrap();
        assert_eq!(
            v.errors().unwrap().get("foo").map(String::as_str),
            Some("Can't be empty")
        );
        assert!(s.is_validated());

        set(&mut s, &registry, "foo", json!("x"));
        assert!(s.is_valid());
        assert!(s.validate(&registry, None).unwrap().is_valid());
        assert!(!s.is_pristine());
    }

    #[test]
    fn on_any_error_waits_for_an_error() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": "x"}), r#"{"foo": "presence"}"#);
        set(&mut s, &registry, "foo", json!(""));
        assert!(s.errors().is_empty());

        s.validate(&registry, None).unwrap();
        assert_eq!(keys(&s), vec!["foo"]);
        set(&mut s, &registry, "foo", json!("y"));
        assert!(s.errors().is_empty());

        // No error left, so the next write is not checked.
        set(&mut s, &registry, "foo", json!(""));
        assert!(s.errors().is_empty());
    }

    #[test]
    fn dependents_are_revalidated() {
        let registry = RuleRegistry::with_builtins();
        let config = Config::builder()
            .rule("password", "presence")
            .rule(
                "confirm",
                ValidatorSpec::func(|value, ctx| {
                    if Some(value) == ctx.get("password") {
                        Outcome::Valid
                    } else {
                        Outcome::invalid("Doesn't match")
                    }
                }),
            )
            .dep("password", &["confirm"])
            .build()
            .unwrap();
        let mut s = EngineState::new(
            Value::from(json!({"password": "", "confirm": "abc"})),
            config,
        );
        s.validate(&registry, None).unwrap();
        assert_eq!(keys(&s), vec!["confirm", "password"]);

        set(&mut s, &registry, "password", json!("abc"));
        assert!(s.errors().is_empty());
    }

    #[test]
    fn pinned_dependents_stay_on_their_item() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"items": [{"price": 1, "total": ""}, {"price": 2, "total": ""}]}),
            r#"{"rules": {"items.*.total": "presence"}, "deps": {"items.^.price": ["items.*.total"]}}"#,
        );
        s.validate(&registry, None).unwrap();
        assert_eq!(keys(&s), vec!["items.0.total", "items.1.total"]);

        let fixed = Value::from(json!({"items": [{"price": 1, "total": "a"}, {"price": 2, "total": "b"}]}));
        s.apply(
            &registry,
            Action::SetFullAttrs {
                attrs: fixed,
                validate: false,
            },
        )
        .unwrap();
        set(&mut s, &registry, "items.1.price", json!(3));
        assert_eq!(keys(&s), vec!["items.0.total"]);
    }

    #[test]
    fn shrinking_a_list_drops_stale_item_errors() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"items": [{"name": ""}, {"name": ""}, {"name": ""}]}),
            r#"{"items.*.name": "presence"}"#,
        );
        s.validate(&registry, None).unwrap();
        assert_eq!(s.errors().len(), 3);

        set(&mut s, &registry, "items", json!([{"name": ""}]));
        assert_eq!(keys(&s), vec!["items.0.name"]);

        set(&mut s, &registry, "items", json!([{"name": "a"}, {"name": ""}]));
        assert_eq!(keys(&s), vec!["items.1.name"]);
    }

    #[test]
    fn on_after_validate_clears_until_validated() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"foo": "", "bar": ""}),
            r#"{"onChangeStrategy": "onAfterValidate", "rules": {"foo": "presence", "bar": "presence"}}"#,
        );
        s.apply(
            &registry,
            Action::SetErrors(ErrorMap::from([
                ("foo".to_string(), "Taken".to_string()),
                ("bar".to_string(), "Taken".to_string()),
            ])),
        )
        .unwrap();
        set(&mut s, &registry, "foo", json!(""));
        assert_eq!(keys(&s), vec!["bar"]);

        s.validate(&registry, Some("foo")).unwrap();
        assert!(s.is_validated());
        set(&mut s, &registry, "bar", json!("x"));
        set(&mut s, &registry, "foo", json!(""));
        assert_eq!(keys(&s), vec!["foo"]);
    }

    #[test]
    fn never_strategy_only_clears() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"foo": ""}),
            r#"{"onChangeStrategy": "none", "rules": {"foo": "presence"}}"#,
        );
        assert_eq!(s.strategy(), OnChangeStrategy::Never);
        s.validate(&registry, None).unwrap();
        assert_eq!(keys(&s), vec!["foo"]);

        set(&mut s, &registry, "foo", json!(""));
        assert!(s.errors().is_empty());
    }

    #[test]
    fn batched_updates_resolve_under_prefix() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"user": {"first": "", "last": ""}}),
            r#"{"user.first": "presence", "user.last": "presence"}"#,
        );
        s.validate(&registry, None).unwrap();
        s.apply(
            &registry,
            Action::SetAttrs {
                patch: Patch::Updater(Box::new(|user: &Value| {
                    let first = user
                        .as_map()
                        .and_then(|m| m.get("first"))
                        .cloned()
                        .unwrap_or_default();
                    vec![
                        ("first".into(), Value::from("Ada")),
                        ("last".into(), Value::from(first.as_str().unwrap_or("?"))),
                    ]
                })),
                prefix: Some("user".into()),
            },
        )
        .unwrap();
        assert_eq!(
            s.attrs(),
            &Value::from(json!({"user": {"first": "Ada", "last": ""}}))
        );
        assert_eq!(keys(&s), vec!["user.last"]);
    }

    #[test]
    fn config_layers_revalidate_when_errors_exist() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": "", "bar": ""}), r#"{"foo": "presence"}"#);
        s.validate(&registry, None).unwrap();

        let Response::ConfigAdded(id) = s
            .apply(
                &registry,
                Action::AddConfig(Config::from_json(r#"{"bar": "presence"}"#).unwrap()),
            )
            .unwrap()
        else {
            panic!("expected a config id");
        };
        assert_eq!(keys(&s), vec!["bar", "foo"]);

        s.apply(&registry, Action::RemoveConfig(id)).unwrap();
        assert_eq!(keys(&s), vec!["foo"]);
        assert_eq!(
            s.apply(&registry, Action::RemoveConfig(id)).unwrap_err(),
            Error::UnknownConfig { id }
        );
    }

    #[test]
    fn failed_transitions_leave_state_untouched() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": ""}), r#"{"foo": "presence"}"#);
        let before = s.configs().len();
        let err = s
            .apply(
                &registry,
                Action::AddConfig(Config::from_json(r#"{"foo": "mystery"}"#).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(s.configs().len(), before);

        s.apply(
            &registry,
            Action::AmendConfig(Config::from_json(r#"{"foo": "length"}"#).unwrap()),
        )
        .unwrap();
        assert_eq!(s.config().rules().get("foo").unwrap().rule_names(), vec!["length"]);
    }

    #[test]
    fn amending_the_base_recomputes_errors() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"foo": "", "bar": "", "baz": "x"}),
            r#"{"foo": "presence"}"#,
        );
        s.validate(&registry, None).unwrap();
        assert_eq!(keys(&s), vec!["foo"]);

        let base = Config::from_json(r#"{"bar": "presence", "baz": {"length": {"minimum": 2}}}"#)
            .unwrap();
        s.apply(&registry, Action::AmendConfig(base)).unwrap();
        assert_eq!(keys(&s), vec!["bar", "baz"]);
        assert_eq!(s.configs().len(), 1);
        assert!(s.config().rules().get("foo").is_none());

        // Without an active policy the amendment leaves errors for the next validate.
        let mut s = state(
            json!({"foo": ""}),
            r#"{"rules": {"foo": "presence"}, "onChangeStrategy": "onAfterValidate"}"#,
        );
        s.apply(
            &registry,
            Action::AmendConfig(Config::from_json(r#"{"foo": "length"}"#).unwrap()),
        )
        .unwrap();
        assert!(s.errors().is_empty());
    }

    #[test]
    fn out_of_range_writes_fail_cleanly() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"items": [1]}), r#"{"items.*": "presence"}"#);
        let err = s
            .apply(
                &registry,
                Action::SetAttr {
                    path: "items.99999999999".into(),
                    value: json!(2).into(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Path(PathError::IndexOutOfRange { len: 1, .. })
        ));
        assert_eq!(s.attrs(), &Value::from(json!({"items": [1]})));
        assert!(s.is_pristine());
    }

    #[test]
    fn reset_restores_and_replaces_snapshot() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": ""}), r#"{"foo": "presence"}"#);
        s.validate(&registry, None).unwrap();
        set(&mut s, &registry, "foo", json!("x"));

        s.apply(&registry, Action::Reset(ResetTo::Initial)).unwrap();
        assert_eq!(s.attrs(), &Value::from(json!({"foo": ""})));
        assert!(s.errors().is_empty());
        assert!(s.is_pristine());
        assert!(!s.is_validated());

        s.apply(
            &registry,
            Action::Reset(ResetTo::Tree(Value::from(json!({"foo": "new"})))),
        )
        .unwrap();
        set(&mut s, &registry, "foo", json!("other"));
        s.apply(&registry, Action::Reset(ResetTo::Initial)).unwrap();
        assert_eq!(s.attrs(), &Value::from(json!({"foo": "new"})));
    }

    #[test]
    fn error_injection_is_compacted() {
        let registry = RuleRegistry::new();
        let mut s = state(json!({}), "{}");
        s.apply(
            &registry,
            Action::SetErrors(ErrorMap::from([
                ("a".to_string(), "Bad".to_string()),
                ("b".to_string(), String::new()),
            ])),
        )
        .unwrap();
        assert_eq!(keys(&s), vec!["a"]);

        s.apply(
            &registry,
            Action::SetError {
                path: "c".into(),
                error: Some(String::new()),
            },
        )
        .unwrap();
        s.apply(
            &registry,
            Action::SetError {
                path: "a".into(),
                error: None,
            },
        )
        .unwrap();
        assert!(s.errors().is_empty());

        s.apply(
            &registry,
            Action::SetError {
                path: "d".into(),
                error: Some("Server said no".into()),
            },
        )
        .unwrap();
        s.apply(&registry, Action::DropError("d".into())).unwrap();
        assert!(s.is_valid());
    }

    #[test]
    fn settlement_respects_writes_made_in_flight() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(
            json!({"login": "ada", "nick": "x"}),
            r#"{"rules": {"login": "presence", "nick": "presence"},
                "async": {"rules": {"login": "presence", "nick": "presence"}}}"#,
        );
        s.validate(&registry, None).unwrap();
        let Response::AsyncStarted { pass, .. } = s
            .apply(
                &registry,
                Action::StartAsync {
                    path: None,
                    skip: BTreeSet::new(),
                },
            )
            .unwrap()
        else {
            panic!("expected an async pass");
        };

        set(&mut s, &registry, "login", json!(""));
        s.validate(&registry, Some("login")).unwrap();
        s.apply(
            &registry,
            Action::SetError {
                path: "nick".into(),
                error: Some("Server said no".into()),
            },
        )
        .unwrap();
        assert_eq!(keys(&s), vec!["login", "nick"]);

        s.apply(
            &registry,
            Action::SettleAsync {
                pass,
                patch: ErrorPatch::from([("login".to_string(), None), ("nick".to_string(), None)]),
            },
        )
        .unwrap();
        // `login` changed after the pass began; `nick` did not and passes synchronously.
        assert_eq!(keys(&s), vec!["login"]);
        assert!(s.validating().is_none());
    }

    #[test]
    fn stale_async_settlement_is_discarded() {
        let registry = RuleRegistry::with_builtins();
        let mut s = state(json!({"foo": ""}), r#"{"async": {"rules": {"foo": "presence"}}}"#);
        let Response::AsyncStarted { pass, .. } = s
            .apply(
                &registry,
                Action::StartAsync {
                    path: None,
                    skip: BTreeSet::new(),
                },
            )
            .unwrap()
        else {
            panic!("expected an async pass");
        };
        assert!(s.validating().is_some());

        s.apply(&registry, Action::Reset(ResetTo::Initial)).unwrap();
        s.apply(
            &registry,
            Action::SettleAsync {
                pass,
                patch: ErrorPatch::from([("foo".to_string(), Some("late".to_string()))]),
            },
        )
        .unwrap();
        assert!(s.errors().is_empty());
        assert!(s.validating().is_none());
    }
}
