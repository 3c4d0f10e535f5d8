//! Property-based tests for document parsing.
//!
//! These tests use proptest to check parsing invariants across many randomly
//! generated image descriptors.

use proptest::prelude::*;

use crate::{ContainerConfig, ImageConfig, ImageDescriptor, IndexedImage, LabelValue};

/// Strategy for generating repository paths.
fn repository_strategy() -> impl Strategy<Value = String> {
    "(registry\\.example\\.com/|localhost:5000/)?[a-z][a-z0-9-]{1,12}(/[a-z][a-z0-9-]{1,12}){0,2}"
}

/// Strategy for generating tags, including the empty tag.
fn tag_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("([a-z0-9][a-z0-9._-]{0,15})?")
}

/// Strategy for generating `key[=value]` entries, some without `=`.
fn entry_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_.]{0,10}(=[ -~]{0,20})?"
}

/// Strategy for generating port specs, some malformed.
fn port_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u16..=65535, "(tcp|udp)").prop_map(|(port, proto)| format!("{port}/{proto}")),
        "[a-z]{1,6}",
    ]
}

fn descriptor_strategy() -> impl Strategy<Value = ImageDescriptor> {
    (
        "sha256:[a-f0-9]{64}",
        tag_strategy(),
        prop::option::of("[ -~]{0,30}"),
        "[ -~]{0,20}",
        "[ -~]{0,40}",
        prop::collection::vec(entry_strategy(), 0..6),
        prop::collection::vec(entry_strategy(), 0..6),
        prop::collection::vec("/[a-z]{1,8}", 0..4),
        prop::collection::vec(port_strategy(), 0..4),
    )
        .prop_map(
            |(id, tag, created, author, comment, labels, env, volumes, exposed_ports)| {
                ImageDescriptor {
                    id,
                    tag,
                    config: ImageConfig {
                        created,
                        author,
                        comment,
                        config: ContainerConfig {
                            labels,
                            env,
                            volumes,
                            exposed_ports,
                        },
                    },
                }
            },
        )
}

proptest! {
    #[test]
    fn test_parse_is_deterministic(repo in repository_strategy(), desc in descriptor_strategy()) {
        let first = IndexedImage::parse(&repo, &desc);
        let second = IndexedImage::parse(&repo, &desc);
        prop_assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_full_name_invariant(repo in repository_strategy(), desc in descriptor_strategy()) {
        let image = IndexedImage::parse(&repo, &desc);
        prop_assert_eq!(image.full_name, format!("{}:{}", image.name, image.tag));
        prop_assert!(!image.tag.is_empty());
        prop_assert!(!image.name.contains("example.com"));
        prop_assert!(!image.name.starts_with("localhost"));
    }

    #[test]
    fn test_every_label_entry_is_kept(desc in descriptor_strategy()) {
        let image = IndexedImage::parse("a/b", &desc);
        for entry in &desc.config.config.labels {
            let key = entry.split_once('=').map_or(entry.as_str(), |(k, _)| k);
            prop_assert!(image.labels.contains_key(key));
            if !entry.contains('=') {
                // a later `key=value` entry may override the flag
                let overridden = desc.config.config.labels.iter().any(|e| e.starts_with(&format!("{key}=")));
                if !overridden {
                    prop_assert_eq!(image.labels.get(key), Some(&LabelValue::Flag(true)));
                }
            }
        }
    }

    #[test]
    fn test_env_only_keeps_assignments(desc in descriptor_strategy()) {
        let image = IndexedImage::parse("a/b", &desc);
        for key in image.env.keys() {
            let assignment = format!("{key}=");
            let found = desc.config.config.env.iter().any(|e| e.starts_with(&assignment));
            prop_assert!(found, "no entry assigns {}", key);
        }
    }

    #[test]
    fn test_ports_sorted_and_unique(desc in descriptor_strategy()) {
        let image = IndexedImage::parse("a/b", &desc);
        prop_assert!(image.exposed_ports.windows(2).all(|w| w[0] < w[1]));
    }
}
