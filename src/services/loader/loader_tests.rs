use super::*;
use serde_json::json;

#[test]
fn get_by_path_traverses_nested_objects() {
    let v = json!({
        "data": {
            "keys": ["a", "b"],
            "meta": {"page": 1}
        }
    });
    assert_eq!(
        get_by_path(&v, "data.keys")
            .unwrap()
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        get_by_path(&v, "data.meta.page").unwrap().as_i64().unwrap(),
        1
    );
    assert!(get_by_path(&v, "data.missing").is_none());
    assert!(get_by_path(&v, "").is_none());
}

#[test]
fn parse_env_keys_supports_both_envelopes() {
    let flat = json!({"keys": ["HOMEPAGE_VAR_A", "HOMEPAGE_VAR_B"]});
    assert_eq!(
        parse_env_keys_from_json(&flat).unwrap(),
        vec!["HOMEPAGE_VAR_A".to_string(), "HOMEPAGE_VAR_B".to_string()]
    );
    let wrapped = json!({"data": {"keys": ["HOMEPAGE_FILE_C"]}});
    assert_eq!(
        parse_env_keys_from_json(&wrapped).unwrap(),
        vec!["HOMEPAGE_FILE_C".to_string()]
    );
}

#[test]
fn parse_env_keys_skips_non_strings() {
    let v = json!({"keys": ["HOMEPAGE_VAR_A", 7, null, "HOMEPAGE_VAR_B"]});
    assert_eq!(
        parse_env_keys_from_json(&v).unwrap(),
        vec!["HOMEPAGE_VAR_A".to_string(), "HOMEPAGE_VAR_B".to_string()]
    );
}

#[test]
fn parse_env_keys_rejects_malformed_envelopes() {
    assert!(parse_env_keys_from_json(&json!({})).is_none());
    assert!(parse_env_keys_from_json(&json!({"keys": "nope"})).is_none());
    assert!(parse_env_keys_from_json(&json!({"data": {"items": []}})).is_none());
}
