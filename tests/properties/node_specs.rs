//! Property tests for node spec parsing.

use proptest::prelude::*;

use mirrorfleet::NodeSpec;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: parsing arbitrary input never panics.
    #[test]
    fn property_parse_never_panics(s in "(?s).{0,128}") {
        let _ = s.parse::<NodeSpec>();
    }

    /// PROPERTY: a well-formed spec keeps every part it was built from.
    #[test]
    fn property_well_formed_spec_parses(
        user in "[a-z_][a-z0-9_-]{0,15}",
        host in "[a-z0-9.-]{1,32}",
        port in 1u16..,
        root in "/[A-Za-z0-9/._-]{0,32}",
    ) {
        let spec: NodeSpec = format!("{user}@{host}:{port}:{root}").parse().unwrap();

        prop_assert_eq!(spec.id.user(), user.as_str());
        prop_assert_eq!(spec.id.host(), host.as_str());
        prop_assert_eq!(spec.id.port(), port);
        prop_assert_eq!(spec.remote_root, root);
    }
}
