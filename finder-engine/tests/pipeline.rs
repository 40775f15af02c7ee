mod common;

use common::*;
use finder_core::{ForumBucket, UserHandle, EXEMPLAR_LIMIT};
use finder_engine::{summarize, HistoryClassifier, HistoryError};

#[tokio::test]
async fn test_scenario_b_bucket_contents() {
    let platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "Shooter".to_string(),
        submissions: vec![
            submission("t3_a", "Guns", 5),
            submission("t3_b", "guns", 10),
            submission("t3_c", "guns", -2),
        ],
        ..Default::default()
    });
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let history = classifier.classify(&platform, "shooter").await.unwrap();
    assert_eq!(history.user.name, "Shooter");

    let buckets = summarize(&platform, &history).await.unwrap();
    assert_eq!(
        buckets,
        vec![ForumBucket {
            forum: "guns".to_string(),
            submission_count: 3,
            comment_count: 0,
            total_submission_karma: 13,
            total_comment_karma: 0,
            submission_permalinks: vec![
                permalink_for("t3_a"),
                permalink_for("t3_b"),
                permalink_for("t3_c"),
            ],
            comment_permalinks: vec![],
        }]
    );

    let text = renderer().render(&history.user.name, &buckets);
    assert!(text.contains("###Total score: 13\n\n"));
    assert!(text.contains("###Chance of being a gunnut: 2744%."));
}

#[tokio::test]
async fn test_history_limit_is_passed_to_platform() {
    let platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "someone".to_string(),
        ..Default::default()
    });
    let classifier = HistoryClassifier::new(allow_list(), 250);

    classifier.classify(&platform, "someone").await.unwrap();

    let calls = platform.calls();
    assert!(calls.contains(&"fetch_submissions:someone:250".to_string()));
    assert!(calls.contains(&"fetch_comments:someone:250".to_string()));
}

#[tokio::test]
async fn test_exemplars_are_capped_prefix_and_lookups_bounded() {
    let submissions: Vec<_> = (0..30)
        .map(|i| submission(&format!("t3_{i}"), "guns", 1))
        .collect();
    let comments: Vec<_> = (0..3)
        .map(|i| comment(&format!("t1_{i}"), "guns", 2))
        .chain((0..40).map(|i| comment(&format!("t1_x{i}"), "cats", 100)))
        .collect();
    let platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "busy".to_string(),
        submissions,
        comments,
        ..Default::default()
    });
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let history = classifier.classify(&platform, "busy").await.unwrap();
    let buckets = summarize(&platform, &history).await.unwrap();

    assert_eq!(buckets.len(), 1);
    let guns = &buckets[0];
    assert_eq!(guns.submission_count, 30);
    assert_eq!(guns.total_submission_karma, 30);
    assert_eq!(guns.submission_permalinks.len(), EXEMPLAR_LIMIT);
    assert_eq!(guns.submission_permalinks[0], permalink_for("t3_0"));
    assert_eq!(guns.submission_permalinks[7], permalink_for("t3_7"));
    assert_eq!(guns.comment_count, 3);
    assert_eq!(guns.comment_permalinks.len(), 3);

    for bucket in &buckets {
        assert!(bucket.submission_permalinks.len() <= EXEMPLAR_LIMIT);
        assert!(bucket.submission_permalinks.len() <= bucket.submission_count);
        assert!(bucket.comment_permalinks.len() <= EXEMPLAR_LIMIT);
        assert!(bucket.comment_permalinks.len() <= bucket.comment_count);
    }

    let lookups = platform
        .calls()
        .iter()
        .filter(|c| c.starts_with("resolve_permalink:"))
        .count();
    assert_eq!(lookups, EXEMPLAR_LIMIT + 3);
}

#[tokio::test]
async fn test_comment_only_forum_gets_a_bucket() {
    let platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "talker".to_string(),
        submissions: vec![submission("t3_a", "progun", 4)],
        comments: vec![comment("t1_a", "ar15", -3), comment("t1_b", "progun", 1)],
        ..Default::default()
    });
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let history = classifier.classify(&platform, "talker").await.unwrap();
    let buckets = summarize(&platform, &history).await.unwrap();

    let order: Vec<&str> = buckets.iter().map(|b| b.forum.as_str()).collect();
    assert_eq!(order, vec!["progun", "ar15"]);

    let ar15 = &buckets[1];
    assert_eq!(ar15.submission_count, 0);
    assert!(ar15.submission_permalinks.is_empty());
    assert_eq!(ar15.comment_count, 1);
    assert_eq!(ar15.total_comment_karma, -3);
}

#[tokio::test]
async fn test_missing_and_suspended_users_are_distinguished() {
    let platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "banned".to_string(),
        suspended: true,
        ..Default::default()
    });
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let missing = classifier.classify(&platform, "ghost").await.unwrap_err();
    assert!(matches!(missing, HistoryError::UserNotFound { ref username } if username == "ghost"));

    let suspended = classifier.classify(&platform, "banned").await.unwrap_err();
    assert!(matches!(suspended, HistoryError::AccessForbidden { .. }));
}

#[tokio::test]
async fn test_permalink_failure_propagates() {
    let mut platform = FakePlatform::new().with_user(FakeUser {
        canonical_name: "someone".to_string(),
        submissions: vec![submission("t3_a", "guns", 1)],
        ..Default::default()
    });
    platform.fail_lookups = true;
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let history = classifier.classify(&platform, "someone").await.unwrap();
    assert!(summarize(&platform, &history).await.is_err());
}

#[tokio::test]
async fn test_buckets_are_fresh_per_request() {
    let platform = FakePlatform::new()
        .with_user(FakeUser {
            canonical_name: "first".to_string(),
            submissions: vec![submission("t3_a", "guns", 7)],
            ..Default::default()
        })
        .with_user(FakeUser {
            canonical_name: "second".to_string(),
            comments: vec![comment("t1_a", "guns", 2)],
            ..Default::default()
        });
    let classifier = HistoryClassifier::new(allow_list(), 1000);

    let first = classifier.classify(&platform, "first").await.unwrap();
    let first_buckets = summarize(&platform, &first).await.unwrap();
    let second = classifier.classify(&platform, "second").await.unwrap();
    let second_buckets = summarize(&platform, &second).await.unwrap();

    assert_eq!(first_buckets[0].total_submission_karma, 7);
    assert_eq!(second_buckets[0].submission_count, 0);
    assert_eq!(second_buckets[0].total_submission_karma, 0);
    assert_eq!(second_buckets[0].comment_count, 1);
    assert_eq!(
        second.user,
        UserHandle {
            name: "second".to_string()
        }
    );
}
