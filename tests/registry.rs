//! Strategy registry lookups as used by command line front ends.

use hugeenum::{Error, Strategy, REGISTRY};

#[test]
fn test_registry_lists_all_strategies_sorted() {
    let ids: Vec<&str> = REGISTRY.iter().map(|info| info.id).collect();
    assert_eq!(ids, vec!["ConDy", "ExtractMethod", "Unsafe"]);
}

#[test]
fn test_registry_limits() {
    let limits: Vec<(usize, usize)> = REGISTRY
        .iter()
        .map(|info| (info.default_elements, info.max_elements))
        .collect();
    assert_eq!(
        limits,
        vec![(10_963, 10_963), (10_920, 10_920), (65_410, 65_410)]
    );

    assert_eq!(
        Strategy::Unsafe.info().description,
        "Employ sun.misc.Unsafe for enum elements initialization"
    );
}

#[test]
fn test_lookup_by_id() {
    for info in &REGISTRY {
        assert_eq!(Strategy::from_id(info.id).unwrap(), info.strategy);
        assert_eq!(
            Strategy::from_id(&info.id.to_lowercase()).unwrap(),
            info.strategy
        );
        assert_eq!(
            Strategy::from_id(&info.id.to_uppercase()).unwrap(),
            info.strategy
        );
    }

    assert!(matches!(Strategy::from_id("Condy "), Err(Error::UnknownStrategy(_))));
}

#[test]
fn test_default_is_extract_method() {
    assert_eq!(Strategy::default(), Strategy::ExtractMethod);
    assert_eq!(Strategy::default().info().id, "ExtractMethod");
}
