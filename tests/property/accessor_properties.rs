//! Property-based tests for typed attribute reads

use proptest::prelude::*;
use record_hooks::record::accessor::{get_with, try_get};
use record_hooks::record::ZeroPolicy;
use record_hooks::Record;

/// Absent attributes always read as the supplied default
#[test]
fn test_absent_attribute_yields_default() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&("[a-z_]{1,12}", any::<i64>()), |(name, default)| {
            let record = Record::new("order_line").with("other", 5_i64);
            prop_assume!(name != "other");
            let value = record.get_or_default(&name, default).unwrap();
            assert_eq!(value, default);
            assert_eq!(try_get::<i64>(Some(&record), &name).unwrap(), None);
            assert_eq!(get_with(None, &name, default, ZeroPolicy::Strict).unwrap(), default);
            Ok(())
        })
        .unwrap();
}

/// Stored zero reads as the default only under the zero-is-missing policy
#[test]
fn test_zero_policy_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<i64>(), any::<i64>()), |(stored, default)| {
            let record = Record::new("order_line").with("quantity", stored);
            let lenient = get_with(Some(&record), "quantity", default, ZeroPolicy::ZeroIsMissing).unwrap();
            let strict = get_with(Some(&record), "quantity", default, ZeroPolicy::Strict).unwrap();

            assert_eq!(strict, stored);
            if stored == 0 {
                assert_eq!(lenient, default);
            } else {
                assert_eq!(lenient, stored);
            }
            // Presence-exact reads never substitute the default
            assert_eq!(record.try_get::<i64>("quantity").unwrap(), Some(stored));
            Ok(())
        })
        .unwrap();
}

/// Setting the same value twice leaves the record as after the first set
#[test]
fn test_set_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&("[a-z]{1,8}", ".{0,24}"), |(name, text)| {
            let mut once = Record::new("account");
            once.set(name.as_str(), text.as_str());
            let mut twice = once.clone();
            twice.set(name.as_str(), text.as_str());

            assert_eq!(once, twice);
            assert_eq!(twice.try_get::<String>(&name).unwrap(), Some(text.clone()));
            Ok(())
        })
        .unwrap();
}
