//! Proptest generators for vault paths, keys and credentials.

use proptest::prelude::*;

/// Generate raw paths as a host might submit them: mixed case, forward and
/// back slashes, surrounding whitespace.
pub fn raw_path_strategy() -> impl Strategy<Value = String> {
    (
        "[ \t]{0,2}",
        prop::collection::vec("[A-Za-z0-9_.-]{1,12}", 1..5),
        prop::collection::vec(prop_oneof![Just("/"), Just("\\"), Just(":")], 4),
        "[ \t]{0,2}",
    )
        .prop_map(|(lead, segments, separators, trail)| {
            let mut path = lead;
            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    path.push_str(separators[i - 1]);
                }
                path.push_str(segment);
            }
            path.push_str(&trail);
            path
        })
}

/// Generate logical keys made of folder segments joined by `/`.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z][A-Za-z0-9_-]{0,10}", 1..4).prop_map(|parts| parts.join("/"))
}

/// Generate base path prefixes.
pub fn prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("uipath".to_string()),
        "[a-z][a-z0-9-]{2,12}",
        "[A-Z][A-Za-z0-9]{2,12}",
    ]
}

/// Generate OAuth2 client ids.
pub fn client_id_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}"
}

/// Generate secret values, including symbols and non-ASCII text.
pub fn secret_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9!@#$%^&*()_+=-]{8,32}",
        "\\PC{1,24}",
    ]
}

/// Generate user names.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9._]{2,15}",
        "[a-z]{3,8}\\\\[a-z]{3,10}",
        "[a-z0-9._]{3,10}@[a-z]{3,8}\\.com",
    ]
}
