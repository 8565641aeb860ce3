// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end tests through the facade: namespaces, tags, values,
//! permissions, objects and queries against an in-memory store with the
//! recording index double.

mod common;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use tagstore_domain::{OpaqueValue, Operation, Policy, TagValue, TagstoreError};

#[tokio::test]
async fn namespace_create_get_round_trip() {
    let harness = common::harness().await;
    let created = harness
        .facade
        .create_namespaces(
            "alice",
            &[("alice/books".to_string(), "My books".to_string())],
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 1);

    let namespaces = harness
        .facade
        .get_namespaces("alice", &["alice/books".to_string()], true, false, false)
        .await
        .unwrap();
    let info = &namespaces["alice/books"];
    assert_eq!(info.description.as_deref(), Some("My books"));

    // The namespace's object carries the canonical about value.
    let values = harness
        .facade
        .get_values("alice", &[info.object_id], Some(&["fluiddb/about".to_string()]))
        .await
        .unwrap();
    let about = &values[&info.object_id]["fluiddb/about"];
    assert_eq!(
        about.value,
        TagValue::Text("Object for the namespace alice/books".to_string())
    );
}

#[tokio::test]
async fn missing_ancestors_are_created_implicitly() {
    let harness = common::harness().await;
    harness
        .facade
        .create_namespaces(
            "alice",
            &[("alice/books/fiction/scifi".to_string(), "Sci-fi".to_string())],
        )
        .await
        .unwrap();

    let namespaces = harness
        .facade
        .get_namespaces(
            "alice",
            &[
                "alice/books".to_string(),
                "alice/books/fiction".to_string(),
            ],
            true,
            false,
            false,
        )
        .await
        .unwrap();
    assert_eq!(namespaces.len(), 2);
    // Implicit ancestors get the generic description.
    assert_eq!(
        namespaces["alice/books"].description.as_deref(),
        Some("Object for the namespace alice/books")
    );
}

#[tokio::test]
async fn namespace_listing_shows_children() {
    let harness = common::harness().await;
    harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books".to_string())])
        .await
        .unwrap();
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let namespaces = harness
        .facade
        .get_namespaces("alice", &["alice/books".to_string()], false, true, true)
        .await
        .unwrap();
    let info = &namespaces["alice/books"];
    assert_eq!(info.namespace_names.as_deref(), Some(&[][..]));
    assert_eq!(
        info.tag_names.as_deref(),
        Some(&["rating".to_string()][..])
    );
}

#[tokio::test]
async fn non_empty_namespaces_refuse_deletion() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let result = harness
        .facade
        .delete_namespaces("alice", &["alice/books".to_string()])
        .await;
    assert!(matches!(result, Err(TagstoreError::NamespaceNotEmpty(_))));

    harness
        .facade
        .delete_tags("alice", &["alice/books/rating".to_string()])
        .await
        .unwrap();
    harness
        .facade
        .delete_namespaces("alice", &["alice/books".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn deleted_paths_keep_their_object_ids() {
    let harness = common::harness().await;
    let first = harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books".to_string())])
        .await
        .unwrap();
    harness
        .facade
        .delete_namespaces("alice", &["alice/books".to_string()])
        .await
        .unwrap();
    let second = harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books again".to_string())])
        .await
        .unwrap();
    // Same about value, same object.
    assert_eq!(first[0].0, second[0].0);
}

#[tokio::test]
async fn duplicate_namespace_paths_are_rejected() {
    let harness = common::harness().await;
    harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books".to_string())])
        .await
        .unwrap();
    let result = harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books".to_string())])
        .await;
    assert!(matches!(result, Err(TagstoreError::DuplicatePath(_))));
}

#[tokio::test]
async fn values_round_trip_for_every_type() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();

    let cases: Vec<(&str, TagValue)> = vec![
        ("alice/null", TagValue::Null),
        ("alice/bool", TagValue::Boolean(true)),
        ("alice/int", TagValue::Integer(5)),
        ("alice/float", TagValue::Float(2.5)),
        ("alice/text", TagValue::Text("hello".to_string())),
        (
            "alice/set",
            TagValue::StringSet(vec!["a".to_string(), "b".to_string()]),
        ),
        (
            "alice/opaque",
            TagValue::Opaque(OpaqueValue {
                mime_type: "text/plain".to_string(),
                contents: b"hello".to_vec(),
            }),
        ),
    ];

    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        cases
            .iter()
            .map(|(path, value)| (path.to_string(), value.clone()))
            .collect::<HashMap<_, _>>(),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    let paths: Vec<String> = cases.iter().map(|(path, _)| path.to_string()).collect();
    let values = harness
        .facade
        .get_values("alice", &[object_id], Some(&paths))
        .await
        .unwrap();
    for (path, expected) in &cases {
        let entry = &values[&object_id][*path];
        assert_eq!(&entry.value, expected, "{} should round-trip", path);
        assert_eq!(entry.username, "alice");
    }
}

#[tokio::test]
async fn setting_a_value_twice_replaces_it() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();

    for value in [TagValue::Integer(5), TagValue::Integer(7)] {
        let mut updates = HashMap::new();
        updates.insert(
            object_id,
            HashMap::from([("alice/rating".to_string(), value)]),
        );
        harness.facade.set_values("alice", &updates).await.unwrap();
    }

    let values = harness
        .facade
        .get_values("alice", &[object_id], Some(&["alice/rating".to_string()]))
        .await
        .unwrap();
    assert_eq!(values[&object_id]["alice/rating"].value, TagValue::Integer(7));
}

#[tokio::test]
async fn deleted_values_disappear() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    let deleted = harness
        .facade
        .delete_values("alice", &[(object_id, "alice/rating".to_string())])
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let values = harness
        .facade
        .get_values("alice", &[object_id], Some(&["alice/rating".to_string()]))
        .await
        .unwrap();
    assert!(values.get(&object_id).is_none());

    // Deleting again is a no-op.
    let deleted = harness
        .facade
        .delete_values("alice", &[(object_id, "alice/rating".to_string())])
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn single_value_reads_report_missing_instances() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();
    let object_id = harness.facade.create_object("alice", None).await.unwrap();

    let result = harness
        .facade
        .get_value("alice", object_id, "alice/books/rating")
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::NoInstanceOnObject { .. })
    ));

    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/books/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();
    let entry = harness
        .facade
        .get_value("alice", object_id, "alice/books/rating")
        .await
        .unwrap();
    assert_eq!(entry.value, TagValue::Integer(5));
}

#[tokio::test]
async fn reading_fluiddb_id_returns_the_object_id_itself() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let values = harness
        .facade
        .get_values("alice", &[object_id], Some(&["fluiddb/id".to_string()]))
        .await
        .unwrap();
    assert_eq!(
        values[&object_id]["fluiddb/id"].value,
        TagValue::Text(object_id.to_string())
    );
}

#[tokio::test]
async fn reads_without_paths_filter_unreadable_tags() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([
            ("alice/public".to_string(), TagValue::Integer(1)),
            ("alice/private".to_string(), TagValue::Integer(2)),
        ]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();
    harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/private".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec!["alice".to_string()],
            )],
        )
        .await
        .unwrap();

    // Bob sees only the readable path, silently.
    let values = harness
        .facade
        .get_values("bob", &[object_id], None)
        .await
        .unwrap();
    let paths = &values[&object_id];
    assert!(paths.contains_key("alice/public"));
    assert!(!paths.contains_key("alice/private"));

    // An explicit request for the private path fails loudly.
    let result = harness
        .facade
        .get_values("bob", &[object_id], Some(&["alice/private".to_string()]))
        .await;
    match result {
        Err(TagstoreError::PermissionDenied { username, denials }) => {
            assert_eq!(username, "bob");
            assert_eq!(
                denials,
                vec![("alice/private".to_string(), Operation::ReadTagValue)]
            );
        }
        other => panic!("expected PermissionDenied, got {:?}", other),
    }
}

#[tokio::test]
async fn closed_permission_denies_everyone_but_the_exceptions() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();
    harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec![],
            )],
        )
        .await
        .unwrap();

    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let result = harness
        .facade
        .get_values(
            "bob",
            &[object_id],
            Some(&["alice/books/rating".to_string()]),
        )
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::PermissionDenied { .. })
    ));

    // Superusers pass regardless of stored policy.
    harness
        .facade
        .get_values(
            "fluiddb",
            &[object_id],
            Some(&["alice/books/rating".to_string()]),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn creators_keep_access_to_what_they_created() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/books/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();
    harness
        .facade
        .get_values(
            "alice",
            &[object_id],
            Some(&["alice/books/rating".to_string()]),
        )
        .await
        .unwrap();
    harness
        .facade
        .delete_values("alice", &[(object_id, "alice/books/rating".to_string())])
        .await
        .unwrap();
    harness
        .facade
        .delete_tags("alice", &["alice/books/rating".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn anonymous_users_may_only_list_and_read() {
    let harness = common::harness().await;
    harness
        .facade
        .create_namespaces("alice", &[("alice/books".to_string(), "Books".to_string())])
        .await
        .unwrap();

    let result = harness
        .facade
        .create_namespaces("anon", &[("alice/books/x".to_string(), "X".to_string())])
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::PermissionDenied { .. })
    ));

    let result = harness.facade.create_object("anon", None).await;
    assert!(matches!(
        result,
        Err(TagstoreError::PermissionDenied { .. })
    ));

    // Listing is in the anonymous-allowed set.
    harness
        .facade
        .get_namespaces("anon", &["alice/books".to_string()], false, true, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn permission_reads_are_gated_on_control() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let result = harness
        .facade
        .get_permissions(
            "bob",
            &[("alice/books/rating".to_string(), Operation::ReadTagValue)],
        )
        .await;
    match result {
        Err(TagstoreError::PermissionDenied { denials, .. }) => {
            // The denial names the CONTROL operation, not the one asked
            // about.
            assert_eq!(
                denials,
                vec![(
                    "alice/books/rating".to_string(),
                    Operation::ControlTagValue
                )]
            );
        }
        other => panic!("expected PermissionDenied, got {:?}", other),
    }

    let permissions = harness
        .facade
        .get_permissions(
            "alice",
            &[("alice/books/rating".to_string(), Operation::ReadTagValue)],
        )
        .await
        .unwrap();
    let (policy, exceptions) =
        &permissions[&("alice/books/rating".to_string(), Operation::ReadTagValue)];
    assert_eq!(*policy, Policy::Open);
    assert!(exceptions.is_empty());
}

#[tokio::test]
async fn exception_lists_reject_superusers_and_misplaced_anons() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let result = harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec!["fluiddb".to_string()],
            )],
        )
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::UserNotAllowedInException(_))
    ));

    // Anonymous users may appear for value reads, but not writes.
    harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec!["anon".to_string()],
            )],
        )
        .await
        .unwrap();
    let result = harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::WriteTagValue,
                Policy::Closed,
                vec!["anon".to_string()],
            )],
        )
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::UserNotAllowedInException(_))
    ));

    let result = harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec!["nobody".to_string()],
            )],
        )
        .await;
    assert!(matches!(result, Err(TagstoreError::UnknownUser(_))));
}

#[tokio::test]
async fn implicit_tag_creation_uses_the_ancestor_namespace() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();

    // alice/books doesn't exist; writing a value under it walks up to the
    // alice namespace, where alice holds CreateNamespace.
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/books/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    // Bob holds no CreateNamespace anywhere under alice.
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/books/other".to_string(), TagValue::Integer(1))]),
    );
    let result = harness.facade.set_values("bob", &updates).await;
    assert!(matches!(
        result,
        Err(TagstoreError::PermissionDenied { .. })
    ));

    // No ancestor at all is an unknown path.
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("ghost/tag".to_string(), TagValue::Integer(1))]),
    );
    let result = harness.facade.set_values("alice", &updates).await;
    assert!(matches!(result, Err(TagstoreError::UnknownPath(_))));
}

#[tokio::test]
async fn about_values_identify_one_object_case_folded() {
    let harness = common::harness().await;
    let first = harness
        .facade
        .create_object("alice", Some("éric serra"))
        .await
        .unwrap();
    let second = harness
        .facade
        .create_object("alice", Some("Éric Serra"))
        .await
        .unwrap();
    assert_eq!(first, second);

    // The stored about value keeps the case supplied on first create.
    let values = harness
        .facade
        .get_values("alice", &[first], Some(&["fluiddb/about".to_string()]))
        .await
        .unwrap();
    assert_eq!(
        values[&first]["fluiddb/about"].value,
        TagValue::Text("éric serra".to_string())
    );

    // URLs are compared exactly.
    let lower = harness
        .facade
        .create_object("alice", Some("http://example.com/a"))
        .await
        .unwrap();
    let upper = harness
        .facade
        .create_object("alice", Some("http://example.com/A"))
        .await
        .unwrap();
    assert_ne!(lower, upper);
}

#[tokio::test]
async fn about_queries_never_touch_the_index() {
    let harness = common::harness().await;
    let object_id = harness
        .facade
        .create_object("alice", Some("éric serra"))
        .await
        .unwrap();

    let results = harness
        .facade
        .resolve_queries("alice", &[r#"fluiddb/about = "éric serra""#.to_string()])
        .await
        .unwrap();
    assert_eq!(
        results[r#"fluiddb/about = "éric serra""#],
        HashSet::from([object_id])
    );
    assert!(harness.index.queries().is_empty());
}

#[tokio::test]
async fn id_queries_resolve_locally_and_validate() {
    let harness = common::harness().await;
    let object_id = Uuid::new_v4();
    let text = format!(r#"fluiddb/id = "{}""#, object_id);
    let results = harness
        .facade
        .resolve_queries("alice", &[text.clone()])
        .await
        .unwrap();
    assert_eq!(results[&text], HashSet::from([object_id]));

    let result = harness
        .facade
        .resolve_queries("alice", &[r#"fluiddb/id = "not-a-uuid""#.to_string()])
        .await;
    assert!(matches!(result, Err(TagstoreError::SearchError(_))));
}

#[tokio::test]
async fn has_queries_run_on_the_main_store() {
    let harness = common::harness().await;
    let tagged = harness.facade.create_object("alice", None).await.unwrap();
    let untagged = harness.facade.create_object("alice", None).await.unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        tagged,
        HashMap::from([("alice/books/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    let results = harness
        .facade
        .resolve_queries("alice", &["has alice/books/rating".to_string()])
        .await
        .unwrap();
    let found = &results["has alice/books/rating"];
    assert!(found.contains(&tagged));
    assert!(!found.contains(&untagged));
    assert!(harness.index.queries().is_empty());
}

#[tokio::test]
async fn has_on_universal_tags_is_illegal() {
    let harness = common::harness().await;
    for text in ["has fluiddb/about", "has fluiddb/id"] {
        let result = harness
            .facade
            .resolve_queries("alice", &[text.to_string()])
            .await;
        assert!(
            matches!(result, Err(TagstoreError::IllegalQuery(_))),
            "{} should be illegal",
            text
        );
    }
}

#[tokio::test]
async fn unauthenticated_callers_are_rejected() {
    let harness = common::harness().await;
    let result = harness.facade.create_object("", None).await;
    assert!(matches!(result, Err(TagstoreError::Unauthorized(_))));
}

#[tokio::test]
async fn unparsable_queries_raise_parse_errors() {
    let harness = common::harness().await;
    let result = harness
        .facade
        .resolve_queries("alice", &["alice/books = ".to_string()])
        .await;
    assert!(matches!(result, Err(TagstoreError::ParseError(_))));
}

#[tokio::test]
async fn general_queries_go_to_the_index() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();

    let object_id = Uuid::new_v4();
    harness
        .index
        .set_result("alice/books/rating_tag_number:[5 TO *]", HashSet::from([object_id]));

    let text = "alice/books/rating >= 5".to_string();
    let results = harness
        .facade
        .resolve_queries("alice", &[text.clone()])
        .await
        .unwrap();
    assert_eq!(results[&text], HashSet::from([object_id]));
    assert_eq!(
        harness.index.queries(),
        vec!["alice/books/rating_tag_number:[5 TO *]".to_string()]
    );
}

#[tokio::test]
async fn queries_require_read_permission_on_their_paths() {
    let harness = common::harness().await;
    harness
        .facade
        .create_tags(
            "alice",
            &[("alice/books/rating".to_string(), "stars".to_string())],
        )
        .await
        .unwrap();
    harness
        .facade
        .set_permissions(
            "alice",
            &[(
                "alice/books/rating".to_string(),
                Operation::ReadTagValue,
                Policy::Closed,
                vec!["alice".to_string()],
            )],
        )
        .await
        .unwrap();

    let result = harness
        .facade
        .resolve_queries("bob", &["has alice/books/rating".to_string()])
        .await;
    assert!(matches!(
        result,
        Err(TagstoreError::PermissionDenied { .. })
    ));
}

#[tokio::test]
async fn opaque_payloads_share_storage_until_the_last_link_goes() {
    let harness = common::harness().await;
    let first = harness.facade.create_object("alice", None).await.unwrap();
    let second = harness.facade.create_object("alice", None).await.unwrap();

    let opaque = TagValue::Opaque(OpaqueValue {
        mime_type: "text/plain".to_string(),
        contents: b"hello".to_vec(),
    });
    for object_id in [first, second] {
        let mut updates = HashMap::new();
        updates.insert(
            object_id,
            HashMap::from([("alice/cover".to_string(), opaque.clone())]),
        );
        harness.facade.set_values("alice", &updates).await.unwrap();
    }

    harness
        .facade
        .delete_values("alice", &[(first, "alice/cover".to_string())])
        .await
        .unwrap();

    // The second link still resolves to the shared payload.
    let values = harness
        .facade
        .get_values("alice", &[second], Some(&["alice/cover".to_string()]))
        .await
        .unwrap();
    assert_eq!(values[&second]["alice/cover"].value, opaque);
}

#[tokio::test]
async fn user_lifecycle_updates_system_metadata() {
    let harness = common::harness().await;
    let user = harness.facade.get_user("alice", "bob").await.unwrap();
    assert_eq!(user.username, "bob");

    let values = harness
        .facade
        .get_values(
            "alice",
            &[user.object_id],
            Some(&[
                "fluiddb/about".to_string(),
                "fluiddb/users/username".to_string(),
                "fluiddb/users/name".to_string(),
            ]),
        )
        .await
        .unwrap();
    let entries = &values[&user.object_id];
    assert_eq!(entries["fluiddb/about"].value, TagValue::Text("@bob".to_string()));
    assert_eq!(
        entries["fluiddb/users/username"].value,
        TagValue::Text("bob".to_string())
    );
    assert_eq!(
        entries["fluiddb/users/name"].value,
        TagValue::Text("Bob".to_string())
    );

    // Plain users may update themselves, not others.
    let update = tagstore::application::services::user::UserUpdate {
        username: "bob".to_string(),
        fullname: Some("Robert".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        harness.facade.set_users("alice", &[update.clone()]).await,
        Err(TagstoreError::PermissionDenied { .. })
    ));
    harness.facade.set_users("bob", &[update]).await.unwrap();
    let user = harness.facade.get_user("alice", "bob").await.unwrap();
    assert_eq!(user.fullname, "Robert");

    // Plain users may not create or delete users.
    assert!(matches!(
        harness
            .facade
            .create_users(
                "bob",
                &[(
                    "carol".to_string(),
                    "pw".to_string(),
                    "Carol".to_string(),
                    "carol@example.com".to_string(),
                )],
            )
            .await,
        Err(TagstoreError::PermissionDenied { .. })
    ));
    harness
        .facade
        .delete_users("fluiddb", &["bob".to_string()])
        .await
        .unwrap();
    assert!(matches!(
        harness.facade.get_user("alice", "bob").await,
        Err(TagstoreError::UnknownUser(_))
    ));
}

#[tokio::test]
async fn recent_activity_lists_newest_first() {
    let harness = common::harness().await;
    let object_id = harness
        .facade
        .create_object("alice", Some("A Book"))
        .await
        .unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    let entries = harness
        .facade
        .recent_activity_for_objects("alice", &[object_id])
        .await
        .unwrap();
    assert!(!entries.is_empty());
    assert_eq!(entries[0].about.as_deref(), Some("A Book"));

    let entries = harness
        .facade
        .recent_activity_for_users("alice", &["alice".to_string()])
        .await
        .unwrap();
    assert!(entries.iter().any(|entry| entry.tag_path == "alice/rating"));

    assert!(matches!(
        harness
            .facade
            .recent_activity_for_users("alice", &["nobody".to_string()])
            .await,
        Err(TagstoreError::UnknownUser(_))
    ));
}

#[tokio::test]
async fn dirty_log_feeds_the_index_job() {
    let harness = common::harness().await;
    let object_id = harness.facade.create_object("alice", None).await.unwrap();
    let mut updates = HashMap::new();
    updates.insert(
        object_id,
        HashMap::from([("alice/rating".to_string(), TagValue::Integer(5))]),
    );
    harness.facade.set_values("alice", &updates).await.unwrap();

    let documents = tagstore::infrastructure::index::sync::update_index(
        harness.facade.pool(),
        harness.facade.index(),
    )
    .await
    .unwrap();
    assert!(documents >= 1);
    assert!(harness
        .index
        .documents()
        .iter()
        .any(|doc| doc["fluiddb/id"] == serde_json::json!(object_id.to_string())));

    // The delta is consumed: a second run imports nothing.
    let documents = tagstore::infrastructure::index::sync::update_index(
        harness.facade.pool(),
        harness.facade.index(),
    )
    .await
    .unwrap();
    assert_eq!(documents, 0);
}
