//! Property-based tests for fetch markup escaping and template rendering

use proptest::prelude::*;
use record_hooks::query::fetch::{double_braces, FetchTemplate};
use record_hooks::query::markup::{escape, parse, unescape};

#[test]
fn test_escape_round_trip() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |text| {
            let escaped = escape(&text);
            assert!(!escaped.contains('<'));
            assert!(!escaped.contains('"'));
            assert_eq!(unescape(&escaped).unwrap(), text);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_character_references_decode() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<char>(), |c| {
            let decimal = format!("&#{};", c as u32);
            let hex = format!("&#x{:x};", c as u32);
            assert_eq!(unescape(&decimal).unwrap(), c.to_string());
            assert_eq!(unescape(&hex).unwrap(), c.to_string());
            Ok(())
        })
        .unwrap();
}

/// A brace-doubled, escaped value renders back to its escaped form whatever braces it holds
#[test]
fn test_doubled_braces_survive_render() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[a-zA-Z0-9{}<>&\"' ]{0,30}", 1u32..50, "[a-z0-9{}]{0,12}"),
            |(value, page, token)| {
                let escaped = escape(&value);
                let template = format!(
                    r#"<fetch><entity name="account"><filter><condition attribute="code" operator="eq" value="{}" /></filter></entity></fetch>"#,
                    double_braces(&escaped)
                );
                let normalized = FetchTemplate::normalize(&template, 50).unwrap();
                let rendered = normalized.render(page, &token);

                assert!(rendered.contains(&format!("value=\"{}\"", escaped)));
                assert!(rendered.contains(&format!("page=\"{}\"", page)));

                let root = parse(&rendered).unwrap();
                assert_eq!(root.attribute("paging-cookie"), Some(token.as_str()));
                let condition = root
                    .child("entity")
                    .and_then(|e| e.child("filter"))
                    .and_then(|f| f.child("condition"))
                    .unwrap();
                assert_eq!(condition.attribute("value"), Some(value.as_str()));
                Ok(())
            },
        )
        .unwrap();
}
