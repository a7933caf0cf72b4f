//! Property tests for mapping local paths onto remote roots.

use std::path::{Path, PathBuf};

use proptest::prelude::*;

use mirrorfleet::domain::value_objects::shell_quote;
use mirrorfleet::RemoteRoot;

fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9._-]{1,12}")
        .unwrap()
        .prop_filter("not a dot segment", |s| s != "." && s != "..")
}

fn relative_path() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(segment(), 1..=5)
}

fn remote_root() -> impl Strategy<Value = String> {
    proptest::string::string_regex("/[a-z]{1,8}(/[a-z]{1,8}){0,2}/{0,2}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a mirror path is the remote root plus the relative path.
    #[test]
    fn property_mirror_stays_under_root(
        root in remote_root(),
        segments in relative_path(),
    ) {
        let root = RemoteRoot::new(root).unwrap();
        let local_root = Path::new("/src");
        let local: PathBuf = segments.iter().fold(local_root.to_path_buf(), |p, s| p.join(s));

        let mirror = root.mirror_of(local_root, &local).unwrap();

        prop_assert!(mirror.starts_with(root.as_str()));
        prop_assert_eq!(&mirror[root.as_str().len()..], segments.join("/"));
        prop_assert!(!mirror.ends_with('/'));
        prop_assert!(!mirror.contains("//"));
    }

    /// PROPERTY: nothing outside the local root, nor the root itself, maps anywhere.
    #[test]
    fn property_paths_outside_root_are_rejected(
        segments in relative_path(),
        other in segment(),
    ) {
        prop_assume!(other != "src");
        let root = RemoteRoot::new("/remote").unwrap();
        let local_root = Path::new("/src");
        let outside: PathBuf = segments
            .iter()
            .fold(Path::new("/").join(&other), |p, s| p.join(s));

        prop_assert!(root.mirror_of(local_root, &outside).is_err());
        prop_assert!(root.mirror_of(local_root, local_root).is_err());
    }

    /// PROPERTY: quoting yields a single shell word that unquotes to the input.
    #[test]
    fn property_shell_quote_is_one_word(s in "(?s).{0,64}") {
        let quoted = shell_quote(&s);

        prop_assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        let unquoted = quoted[1..quoted.len() - 1].replace("'\\''", "'");
        prop_assert_eq!(unquoted, s);
    }
}
