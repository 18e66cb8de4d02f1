#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        CompiledPattern, DependencyEntry, PathError, PathPattern, Segment, Value, match_path,
        resolve_dependents,
    };

    fn pattern(s: &str) -> PathPattern {
        PathPattern::parse(s).unwrap()
    }

    fn paths(p: &str, tree: &Value) -> Vec<String> {
        CompiledPattern::parse(p)
            .unwrap()
            .expand(tree)
            .into_iter()
            .map(|e| e.path)
            .collect()
    }

    #[test]
    fn matches_capture_indices() {
        let p = CompiledPattern::parse("items.(i).tags.*").unwrap();
        let caps = p.matches("items.3.tags.7").unwrap();
        assert_eq!(caps.get("i"), Some(3));
        assert_eq!(caps.indices(), vec![3, 7]);
        assert_eq!(caps.at(3), Some(7));
        assert!(p.matches("items.x.tags.7").is_none());
        assert!(p.matches("items.3.tags").is_none());
        assert!(p.matches("items.3.tags.7.more").is_none());
    }

    #[test]
    fn wildcards_match_canonical_indices_only() {
        let p = CompiledPattern::parse("items.*.count").unwrap();
        assert!(p.matches("items.0.count").is_some());
        assert!(p.matches("items.10.count").is_some());
        assert!(p.matches("items.01.count").is_none());
        assert!(p.matches("items.00.count").is_none());
        assert_eq!(pattern("items.01").segments()[1], Segment::Key("01".into()));
        assert!(!pattern("items.01").is_wildcarded());
    }

    #[test]
    fn literal_segments_are_escaped() {
        let p = CompiledPattern::parse("a+b.c").unwrap();
        assert!(p.matches("a+b.c").is_some());
        assert!(p.matches("aab.c").is_none());
        assert!(p.matches("a+bxc").is_none());
    }

    #[test]
    fn match_path_accepts_pins() {
        let caps = match_path("items.^.max", "items.4.max").unwrap().unwrap();
        assert!(caps.iter().next().unwrap().pinned);
        assert_eq!(caps.indices(), vec![4]);
    }

    #[test]
    fn expand_visits_existing_indices_only() {
        let tree = Value::from(json!({
            "items": [
                {"tags": ["a"]},
                {"tags": ["b", "c"]},
                {"tags": "not a list"},
                {}
            ]
        }));
        assert_eq!(
            paths("items.*.count", &tree),
            vec!["items.0.count", "items.1.count", "items.2.count", "items.3.count"]
        );
        assert_eq!(
            paths("items.(i).tags.*", &tree),
            vec!["items.0.tags.0", "items.1.tags.0", "items.1.tags.1"]
        );
        assert!(paths("missing.*.x", &tree).is_empty());
        assert_eq!(paths("plain.path", &tree), vec!["plain.path"]);
    }

    #[test]
    fn expand_records_captures() {
        let tree = Value::from(json!({"rows": [[1, 2], [3]]}));
        let expanded = CompiledPattern::parse("rows.(r).(c)").unwrap().expand(&tree);
        let last = expanded.last().unwrap();
        assert_eq!(last.path, "rows.1.0");
        assert_eq!(last.captures.get("r"), Some(1));
        assert_eq!(last.captures.get("c"), Some(0));
    }

    #[test]
    fn matches_within_checks_collection_length() {
        let tree = Value::from(json!({"items": [{}, {}]}));
        let p = CompiledPattern::parse("items.*.name").unwrap();
        assert!(p.matches_within("items.1.name", &tree).is_some());
        assert!(p.matches_within("items.2.name", &tree).is_none());
        assert!(p.matches("items.2.name").is_some());
    }

    #[test]
    fn pins_resolve_to_the_changed_index() {
        let entry = DependencyEntry::new("items.^.max", vec![pattern("items.(i).count")]).unwrap();
        let resolved = entry.resolve("items.1.max").unwrap();
        assert_eq!(resolved, vec![pattern("items.1.count")]);
        assert!(entry.resolve("items.1.min").is_none());
    }

    #[test]
    fn anonymous_dependency_wildcards_do_not_substitute() {
        let entry = DependencyEntry::new("items.*.max", vec![pattern("items.*.count")]).unwrap();
        assert_eq!(
            entry.resolve("items.1.max").unwrap(),
            vec![pattern("items.*.count")]
        );
    }

    #[test]
    fn named_dependency_captures_substitute_by_name() {
        let entry = DependencyEntry::new(
            "groups.(g).limit",
            vec![pattern("groups.(g).members.(m).score")],
        )
        .unwrap();
        assert_eq!(
            entry.resolve("groups.2.limit").unwrap(),
            vec![pattern("groups.2.members.(m).score")]
        );
    }

    #[test]
    fn pin_only_touches_its_own_position() {
        // Deeper wildcard in the dependent stays open for expansion.
        let entry = DependencyEntry::new(
            "orders.^.currency",
            vec![pattern("orders.*.lines.*.price")],
        )
        .unwrap();
        assert_eq!(
            entry.resolve("orders.3.currency").unwrap(),
            vec![pattern("orders.3.lines.*.price")]
        );
    }

    #[test]
    fn misaligned_pins_are_rejected() {
        let err = DependencyEntry::new("items.^.max", vec![pattern("total")]).unwrap_err();
        assert!(matches!(err, PathError::MisalignedPin { .. }));
    }

    #[test]
    fn resolve_dependents_dedups_across_entries() {
        let entries = vec![
            DependencyEntry::new("a", vec![pattern("x"), pattern("y")]).unwrap(),
            DependencyEntry::new("a", vec![pattern("y"), pattern("z")]).unwrap(),
            DependencyEntry::new("b", vec![pattern("w")]).unwrap(),
        ];
        assert_eq!(
            resolve_dependents(&entries, "a"),
            vec![pattern("x"), pattern("y"), pattern("z")]
        );
    }
}
