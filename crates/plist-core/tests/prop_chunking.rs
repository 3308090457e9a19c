//! Property tests for the incremental parser.
//!
//! The central property: for any document text that parses successfully and
//! any partition of that text into chunks (including one byte per chunk),
//! feeding the chunks in order produces a tree equal to parsing the whole
//! text at once. Strategies generate random well-formed documents; partitions
//! are generated as random cut points.

use plist_core::{NodeId, Parser, Tree};
use proptest::prelude::*;

// ============================================================================
// Strategies for generating document text
// ============================================================================

/// A string literal body: plain characters plus the escapes the grammar knows.
fn arb_string_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 _.]{0,12}".prop_map(|s| format!("\"{s}\"")),
        Just(r#""line\none""#.to_string()),
        Just(r#""say \"hi\"""#.to_string()),
        Just(r#""back\\slash""#.to_string()),
        Just("\"\"".to_string()),
    ]
}

fn arb_integer_text() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1_000_000i64..1_000_000).prop_map(|n| n.to_string()),
        (1i64..0xffff).prop_map(|n| format!("0x{n:x}")),
    ]
}

fn arb_real_text() -> impl Strategy<Value = String> {
    (-100_000i64..100_000, 1u32..4u32)
        .prop_map(|(mantissa, decimals)| format!("{:.*}", decimals as usize, mantissa as f64 / 10f64.powi(decimals as i32)))
}

fn arb_data_text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..8).prop_map(|bytes| {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
        format!("<{}>", hex.join(" "))
    })
}

fn arb_date_text() -> impl Strategy<Value = String> {
    (1990i32..2030, 1u32..13, 1u32..29, 0u32..24, 0u32..60, 0u32..60, -12i32..13).prop_map(
        |(y, mo, d, h, mi, s, tz)| {
            format!(
                "<*D{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02} {}{:02}00>",
                if tz < 0 { "-" } else { "+" },
                tz.abs()
            )
        },
    )
}

fn arb_scalar_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("true".to_string()),
        Just("TRUE".to_string()),
        Just("false".to_string()),
        Just("False".to_string()),
        arb_integer_text(),
        arb_real_text(),
        arb_string_text(),
        arb_data_text(),
        arb_date_text(),
    ]
}

/// A value of bounded depth: scalars at the leaves, dicts and arrays above.
/// Dict keys are index-named so they never collide.
fn arb_value_text(depth: u32) -> BoxedStrategy<String> {
    if depth == 0 {
        arb_scalar_text().boxed()
    } else {
        prop_oneof![
            3 => arb_scalar_text(),
            1 => prop::collection::vec(arb_value_text(depth - 1), 0..4).prop_map(|items| {
                if items.is_empty() {
                    "( )".to_string()
                } else {
                    format!("( {} )", items.join(" , "))
                }
            }),
            1 => prop::collection::vec(arb_value_text(depth - 1), 0..4).prop_map(|items| {
                let entries: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("\"k{i}\" : {v} ;"))
                    .collect();
                format!("{{ {} }}", entries.join(" "))
            }),
        ]
        .boxed()
    }
}

fn arb_document_text() -> impl Strategy<Value = String> {
    arb_value_text(3)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_whole(text: &str) -> (Tree, NodeId) {
    let mut parser = Parser::new();
    parser
        .feed(text.as_bytes())
        .unwrap_or_else(|e| panic!("whole parse failed for {text:?}: {e}"));
    parser
        .result()
        .unwrap_or_else(|e| panic!("whole result failed for {text:?}: {e}"))
}

fn parse_partitioned(text: &str, cuts: &[usize]) -> (Tree, NodeId) {
    let mut parser = Parser::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    for &cut in cuts {
        parser.feed(&bytes[start..cut]).unwrap();
        start = cut;
    }
    parser.feed(&bytes[start..]).unwrap();
    parser.result().unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(400))]

    /// Any partition of the input produces the same tree as the whole input.
    #[test]
    fn chunked_parse_equals_whole_parse(
        text in arb_document_text(),
        raw_cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let (whole, whole_root) = parse_whole(&text);
        let mut cuts: Vec<usize> = raw_cuts
            .iter()
            .map(|ix| ix.index(text.len().max(1)))
            .collect();
        cuts.sort_unstable();
        let (chunked, chunked_root) = parse_partitioned(&text, &cuts);
        prop_assert!(
            whole.subtree_eq(whole_root, &chunked, chunked_root),
            "partition {cuts:?} of {text:?} produced a different tree"
        );
    }

    /// The extreme partition: every byte its own chunk.
    #[test]
    fn bytewise_parse_equals_whole_parse(text in arb_document_text()) {
        let (whole, whole_root) = parse_whole(&text);
        let mut parser = Parser::new();
        for b in text.as_bytes() {
            parser.feed(std::slice::from_ref(b)).unwrap();
        }
        let (chunked, chunked_root) = parser.result().unwrap();
        prop_assert!(whole.subtree_eq(whole_root, &chunked, chunked_root));
    }

    /// Rendering an integer and parsing it back yields the same value.
    #[test]
    fn integer_text_round_trips(n in any::<i64>()) {
        let (tree, root) = parse_whole(&n.to_string());
        prop_assert_eq!(tree.integer_value(root), Some(n));
    }

    /// Deep copies of parsed documents are equal and disjoint.
    #[test]
    fn parsed_documents_copy_cleanly(text in arb_document_text()) {
        let (mut tree, root) = parse_whole(&text);
        let copy = tree.deep_copy(root).unwrap();
        prop_assert!(tree.subtree_eq(root, &tree, copy));
        tree.free(root);
        // The copy survives releasing the original.
        prop_assert!(tree.kind(copy).is_some());
    }

    /// A parser that failed stays failed until it is recycled.
    #[test]
    fn garbage_never_panics_and_errors_stick(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut parser = Parser::new();
        let mut failed = false;
        for chunk in bytes.chunks(7) {
            match parser.feed(chunk) {
                Ok(()) => {
                    prop_assert!(!failed, "feed succeeded after a failure");
                }
                Err(_) => failed = true,
            }
        }
        // result() either hands back a tree or resets; both must not panic.
        let _ = parser.result();
    }
}
