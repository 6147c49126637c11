//! Property-based tests for session_logger using proptest

use proptest::prelude::*;
use session_logger::config::{parse_retention, parse_size};
use session_logger::core::layout::{fit, Align, COLUMN_SEPARATOR};
use session_logger::prelude::*;
use session_logger::{ColumnLayout, Formatter, TimestampFormat};
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Ordering follows the numeric rank
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a <= b, a.rank() <= b.rank());
        prop_assert_eq!(a.cmp(&b), a.rank().cmp(&b.rank()));
    }

    /// Every named rank maps to itself
    #[test]
    fn test_nearest_is_identity_on_named_ranks(level in any_level()) {
        prop_assert_eq!(LogLevel::nearest(level.rank()), level);
    }

    /// No named level is strictly closer than the one picked
    #[test]
    fn test_nearest_minimizes_distance(rank in 0u32..100) {
        let picked = LogLevel::nearest(rank);
        let best = picked.rank().abs_diff(rank);
        for level in LogLevel::ALL {
            prop_assert!(level.rank().abs_diff(rank) >= best);
        }
    }

    /// An unknown name falls back to the numeric rank
    #[test]
    fn test_resolve_unknown_name(rank in 0u32..100) {
        prop_assert_eq!(LogLevel::resolve("VERBOSE", rank), LogLevel::nearest(rank));
    }
}

// ============================================================================
// Column Layout Tests
// ============================================================================

proptest! {
    /// fit always yields exactly the requested width
    #[test]
    fn test_fit_exact_width(value in "\\PC{0,64}", width in 0usize..40, right in any::<bool>()) {
        let align = if right { Align::Right } else { Align::Left };
        prop_assert_eq!(fit(&value, width, align).chars().count(), width);
    }

    /// A value that fits is kept whole
    #[test]
    fn test_fit_keeps_short_values(value in "[a-z_]{0,16}") {
        let fitted = fit(&value, 16, Align::Left);
        prop_assert_eq!(fitted.trim_end(), value.as_str());
    }

    /// The message column starts at the same offset whatever the record holds
    #[test]
    fn test_message_column_offset_is_fixed(
        level in any_level(),
        message in "[^\\n\\r\\t]{0,120}",
        name in "[a-z_:]{0,48}",
        function in "[a-z_]{0,48}",
        line in 0u32..1_000_000,
    ) {
        let layout = ColumnLayout::default();
        let offset = layout.time_len()
            + layout.level_len
            + layout.session_len
            + layout.name_len
            + layout.function_len
            + layout.line_len
            + 6 * COLUMN_SEPARATOR.chars().count();
        let formatter = Formatter::file(Arc::new(layout));

        let entry = LogEntry::new(level, message.clone())
            .with_logger_name(name)
            .with_call_site(CallSite::new("src/lib.rs", line).with_function(function));
        let rendered = formatter.format(&entry);

        let prefix: String = rendered.chars().take(offset).collect();
        let rest: String = rendered.chars().skip(offset).collect();
        prop_assert!(prefix.ends_with(COLUMN_SEPARATOR));
        prop_assert_eq!(rest, message);
    }
}

// ============================================================================
// Context Tests
// ============================================================================

proptest! {
    /// Merging keeps every key and the right-hand value wins
    #[test]
    fn test_context_merge_override(
        left in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8),
        right in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8),
    ) {
        let l: LogContext = left.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let r: LogContext = right.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let merged = l.merged(&r);

        for (key, value) in &left {
            let expected = right.get(key).unwrap_or(value);
            prop_assert_eq!(merged.get(key), Some(&FieldValue::Int(*expected)));
        }
        for (key, value) in &right {
            prop_assert_eq!(merged.get(key), Some(&FieldValue::Int(*value)));
        }
        prop_assert_eq!(l.len(), left.len());
    }
}

// ============================================================================
// Config Parsing Tests
// ============================================================================

proptest! {
    /// Sizes in whole units scale by their multiplier
    #[test]
    fn test_parse_size_units(n in 1u64..1024) {
        prop_assert_eq!(parse_size(&format!("{} KB", n)), Some(n * 1024));
        prop_assert_eq!(parse_size(&format!("{}MB", n)), Some(n * 1024 * 1024));
    }

    /// Count retention accepts any positive count
    #[test]
    fn test_parse_retention_count(n in 1usize..500) {
        let parsed = parse_retention(&format!("{} files", n));
        prop_assert!(parsed.is_ok());
    }

    /// Garbage never panics the parsers
    #[test]
    fn test_parsers_never_panic(input in "\\PC{0,32}") {
        let _ = parse_size(&input);
        let _ = parse_retention(&input);
        let _ = session_logger::config::parse_rotation(&input);
        let _ = TimestampFormat::parse(&input);
    }
}
