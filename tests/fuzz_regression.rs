//! Regression tests for odd manifest inputs

use std::panic::AssertUnwindSafe;

use npmdesc_lsp::parsers::npm::extract_dependencies;
use npmdesc_lsp::parsers::{ExtractedDependency, parse_manifest};

fn validate_deps(deps: &[ExtractedDependency], content: &str) {
    let lines: Vec<&str> = content.lines().collect();
    for dep in deps {
        assert!(
            (dep.line as usize) < lines.len(),
            "dep.line {} >= lines.len() {}",
            dep.line,
            lines.len()
        );
        let line = lines[dep.line as usize];
        assert!(
            line.contains(&format!("\"{}\"", dep.name)),
            "dep {} reported on line '{}'",
            dep.name,
            line
        );
    }
}

/// Parse and extract without panicking; invalid manifests are fine
fn run(content: &str) -> Vec<ExtractedDependency> {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        parse_manifest("package.json", content)
            .map(|manifest| extract_dependencies(&manifest, content))
            .unwrap_or_default()
    }));
    let deps = result.expect("extraction panicked");
    validate_deps(&deps, content);
    deps
}

#[test]
fn test_block_key_at_end_of_line() {
    let content = "{\"dependencies\"\n:\n{\"a\"\n:\"1\"}}";
    run(content);
}

#[test]
fn test_multibyte_names() {
    let content = r#"{
  "dependencies": {
    "пакет": "1.0.0",
    "日本語": "2.0.0",
    "emoji-📦": "3.0.0"
  }
}"#;
    let deps = run(content);
    assert_eq!(deps.len(), 3);
}

#[test]
fn test_single_line_manifest() {
    let content = r#"{"dependencies":{"a":"1","b":"2"},"devDependencies":{"c":"3"}}"#;
    let deps = run(content);
    assert_eq!(deps.len(), 3);
    assert!(deps.iter().all(|d| d.line == 0));
}

#[test]
fn test_non_object_sections() {
    run(r#"{"dependencies": ["a", "b"], "devDependencies": "c"}"#);
    run(r#"{"dependencies": null}"#);
    run(r#"[{"dependencies": {"a": "1"}}]"#);
}

#[test]
fn test_empty_and_garbage_inputs() {
    for content in ["", " ", "{", "}", "\"dependencies\":", "{\"dependencies\":{", "\u{feff}{}"] {
        assert!(run(content).is_empty());
    }
}

#[test]
fn test_escaped_quotes_in_values() {
    let content = r#"{
  "scripts": {
    "a": "echo \"a\": done"
  },
  "dependencies": {
    "a": "1.0.0"
  }
}"#;
    let deps = run(content);
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].line, 5);
}

#[test]
fn test_crlf_line_endings() {
    let content = "{\r\n  \"dependencies\": {\r\n    \"a\": \"1.0.0\"\r\n  }\r\n}\r\n";
    let deps = run(content);
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].line, 2);
}
