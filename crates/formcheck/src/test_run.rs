#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        path::{Path, PathBuf},
        process,
        time::{SystemTime, UNIX_EPOCH},
    };

    use attrs::Value;
    use clap::Parser;
    use serde_json::json;

    use crate::{Cli, Error, parse_assignment, render, run};

    fn unique_tmp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let mut dir = env::temp_dir();
        dir.push(format!("formcheck-{name}-{}-{nanos}", process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn write(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, body).expect("write fixture");
        path.display().to_string()
    }

    #[test]
    fn assignments_parse_json_or_fall_back_to_strings() {
        assert_eq!(
            parse_assignment("items.0.count=3").unwrap(),
            ("items.0.count".to_string(), Value::from(json!(3)))
        );
        assert_eq!(
            parse_assignment("name=Ada").unwrap().1,
            Value::from("Ada")
        );
        assert_eq!(
            parse_assignment("tags=[\"a\"]").unwrap().1,
            Value::from(json!(["a"]))
        );
        assert!(matches!(
            parse_assignment("novalue"),
            Err(Error::Assignment { .. })
        ));
        assert!(matches!(parse_assignment("=1"), Err(Error::Assignment { .. })));
    }

    #[tokio::test]
    async fn checks_files_and_applies_sets() {
        let dir = unique_tmp_dir("check");
        let rules = write(
            &dir,
            "rules.ron",
            r#"{
                "name": "presence",
                "items.*.count": {"numericality": {"greaterThan": 0}},
            }"#,
        );
        let attrs = write(
            &dir,
            "attrs.json",
            r#"{"name": "", "items": [{"count": 1}, {"count": 0}]}"#,
        );

        let cli = Cli::parse_from(["formcheck", "--config", rules.as_str(), "--attrs", attrs.as_str()]);
        let verdict = run(&cli).await.unwrap();
        assert_eq!(
            render(&verdict, false),
            "items.1.count: Should be greater than 0\nname: Can't be empty"
        );

        let cli = Cli::parse_from([
            "formcheck",
            "--config",
            rules.as_str(),
            "--attrs",
            attrs.as_str(),
            "--set",
            "name=Ada",
            "--set",
            "items.1.count=2",
            "--json",
        ]);
        let verdict = run(&cli).await.unwrap();
        assert!(verdict.is_valid());
        assert_eq!(render(&verdict, cli.json), r#"{"errors":{},"valid":true}"#);
    }

    #[tokio::test]
    async fn scoped_path_and_async_rules() {
        let dir = unique_tmp_dir("scoped");
        let rules = write(
            &dir,
            "rules.json",
            r#"{"rules": {"name": "presence", "email": "presence"},
                "async": {"rules": {"login": "presence"}}}"#,
        );
        let cli = Cli::parse_from(["formcheck", "--config", rules.as_str(), "--path", "email"]);
        let verdict = run(&cli).await.unwrap();
        assert_eq!(render(&verdict, false), "email: Can't be empty");

        let cli = Cli::parse_from([
            "formcheck",
            "--config",
            rules.as_str(),
            "--set",
            "name=a",
            "--set",
            "email=b",
            "--async",
        ]);
        let verdict = run(&cli).await.unwrap();
        assert_eq!(render(&verdict, false), "login: Can't be empty");
    }

    #[tokio::test]
    async fn load_failures_are_errors() {
        let dir = unique_tmp_dir("fail");
        let rules = write(&dir, "rules.ron", r#"{"name": "nope"}"#);
        let cli = Cli::parse_from(["formcheck", "--config", rules.as_str()]);
        assert!(matches!(run(&cli).await, Err(Error::Form(_))));

        let cli = Cli::parse_from(["formcheck", "--config", "missing.toml"]);
        assert!(matches!(run(&cli).await, Err(Error::Config(_))));

        let rules = write(&dir, "ok.json", "{}");
        let attrs = write(&dir, "attrs.json", "{");
        let cli = Cli::parse_from(["formcheck", "--config", rules.as_str(), "--attrs", attrs.as_str()]);
        assert!(matches!(run(&cli).await, Err(Error::Attrs { .. })));
    }
}
