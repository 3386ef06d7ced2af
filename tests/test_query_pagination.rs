mod common;

use common::seeded_client;
use doclink::{Direction, DocLinkError, FilterOp, QueryDescription, DEFAULT_QUERY_LIMIT};
use serde_json::json;

#[tokio::test]
async fn test_filters_combine_with_and() {
    common::init_logging();
    let (client, _store) = seeded_client().await;
    let page = client
        .collection("users")
        .query(
            &QueryDescription::new()
                .filter("age", FilterOp::GreaterThanOrEqual, json!(25))
                .filter("favFoods.asian", FilterOp::Equal, json!("ramen")),
        )
        .await
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "d"]);
}

#[tokio::test]
async fn test_shape_and_dotted_paths_are_equivalent() {
    let (client, _store) = seeded_client().await;
    let users = client.collection("users");

    let dotted = users
        .query(&QueryDescription::new().filter(
            "favFoods.asian",
            FilterOp::Equal,
            json!("sushi"),
        ))
        .await
        .unwrap();
    let shaped = users
        .query(&QueryDescription::new().filter(
            json!({"favFoods": {"asian": true}}),
            FilterOp::Equal,
            json!("sushi"),
        ))
        .await
        .unwrap();
    assert_eq!(dotted.items, shaped.items);
    assert_eq!(dotted.items[0].id, "b");
}

#[tokio::test]
async fn test_order_by_with_id_tiebreak() {
    let (client, _store) = seeded_client().await;
    let page = client
        .collection("users")
        .query(&QueryDescription::new().order_by("age", Direction::Ascending))
        .await
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
    // b and d share age 25; id breaks the tie.
    assert_eq!(ids, vec!["b", "d", "a", "c"]);
}

#[tokio::test]
async fn test_default_limit_applies() {
    let (client, _store) = seeded_client().await;
    let page = client
        .collection("users")
        .query(&QueryDescription::new())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 4);
    assert!(page.is_last(), "well under {DEFAULT_QUERY_LIMIT}");
}

#[tokio::test]
async fn test_page_walk_visits_everything_once() {
    let (client, _store) = seeded_client().await;
    let users = client.collection("users");

    let mut desc = QueryDescription::new()
        .order_by("age", Direction::Descending)
        .with_limit(3);
    let mut seen = Vec::new();
    let mut pages = 0;
    loop {
        let page = users.query(&desc).await.unwrap();
        pages += 1;
        seen.extend(page.items.iter().map(|d| d.id.clone()));
        match page.next {
            Some(next) => desc = next,
            None => break,
        }
    }
    // 4 items at limit 3: one full page, then a short one.
    assert_eq!(pages, 2);
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_continuation_token_overrides_start_at() {
    let (client, _store) = seeded_client().await;
    let page = client
        .collection("users")
        .query(
            &QueryDescription::new()
                .order_by("age", Direction::Ascending)
                .start_at(vec![json!(35)])
                .continue_after("b"),
        )
        .await
        .unwrap();
    // Resumes after b (age 25), not at age 35.
    let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d", "a", "c"]);
}

#[tokio::test]
async fn test_start_and_end_cursors() {
    let (client, _store) = seeded_client().await;
    let page = client
        .collection("users")
        .query(
            &QueryDescription::new()
                .order_by("age", Direction::Ascending)
                .start_at(vec![json!(25)])
                .end_at(vec![json!(30)]),
        )
        .await
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "d", "a"]);
}

#[tokio::test]
async fn test_stale_continuation_token_errors() {
    let (client, _store) = seeded_client().await;
    let users = client.collection("users");
    users
        .delete("b", doclink::WriteOptions::default())
        .await
        .unwrap();
    let err = users
        .query(&QueryDescription::new().continue_after("b"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocLinkError::QueryError(_)));
}

#[tokio::test]
async fn test_unknown_filter_operator_is_rejected() {
    assert!(FilterOp::parse("in").is_err());
    assert!(FilterOp::parse("!=").is_err());
}
