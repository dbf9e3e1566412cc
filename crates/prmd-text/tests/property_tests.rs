use proptest::prelude::*;
use prmd_text::{Decision, compose_body, is_present, normalize, reconcile, remove};

const TEXT: &str = "[a-zA-Z0-9 #*>\\-\t\r\n]{0,64}";

proptest! {
    #[test]
    fn test_normalize_is_idempotent(s in TEXT) {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_has_no_carriage_returns_or_outer_whitespace(s in TEXT) {
        let out = normalize(&s);
        prop_assert!(!out.contains('\r'));
        prop_assert_eq!(out.trim(), out.as_str());
        for line in out.split('\n') {
            prop_assert_eq!(line.trim_end(), line);
        }
    }

    #[test]
    fn test_crlf_and_trailing_spaces_do_not_hide_block(block in "[a-z#*\\- ]{1,12}(\n[a-z#*\\- ]{1,12}){0,3}") {
        prop_assume!(!normalize(&block).is_empty());
        let noisy = block.split('\n').map(|line| format!("{line}  ")).collect::<Vec<_>>().join("\r\n");
        let doc = format!("intro\r\n\r\n{noisy}\r\n");
        prop_assert!(is_present(&doc, &block));
    }

    #[test]
    fn test_composed_body_contains_block(doc in TEXT, block in "[a-z#*\\- ]{1,12}(\n[a-z#*\\- ]{1,12}){0,3}") {
        prop_assume!(!normalize(&block).is_empty());
        let edited = remove(&doc, &block).into_body();
        let body = compose_body(&edited, &block);
        prop_assert!(is_present(&body, &block));
        prop_assert_eq!(reconcile(&body, &block), Decision::AlreadyPresent);
    }
}
