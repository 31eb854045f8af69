// Property: the latest-N window is the ordered tail of the listing.

use cdn_log_explainer::{select_latest, LogObjectKey};
use proptest::prelude::*;

fn listing_strategy() -> impl Strategy<Value = Vec<LogObjectKey>> {
    prop::collection::btree_set("cf/E1\\.2025-12-[0-3][0-9]-[0-2][0-9]\\.[a-f0-9]{4}\\.gz", 0..50)
        .prop_map(|keys| keys.into_iter().map(LogObjectKey::new).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_selects_tail(keys in listing_strategy(), n in -5i64..80) {
        let selected = select_latest(&keys, n);

        let expected_len = if n <= 0 { 0 } else { (n as usize).min(keys.len()) };
        prop_assert_eq!(selected.len(), expected_len);

        // Selection is a suffix of the listing, in listing order
        prop_assert_eq!(&selected[..], &keys[keys.len() - expected_len..]);
    }

    #[test]
    fn prop_larger_window_contains_smaller(keys in listing_strategy(), a in 0i64..60, b in 0i64..60) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let small_sel = select_latest(&keys, small);
        let large_sel = select_latest(&keys, large);

        prop_assert!(large_sel.ends_with(&small_sel));
    }
}
