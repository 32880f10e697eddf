use serde_json::{Value, json};

use crate::common::{TestApp, routes};

/// Create a note at a fixed UTC instant with the given tags and title.
async fn note_at(
    app: &TestApp,
    token: &str,
    config: (i32, i32),
    created_at: &str,
    tags: Value,
    title: &str,
) -> i32 {
    app.create_entity(
        token,
        &json!({
            "entityConfigId": config.0,
            "tags": tags,
            "createdAt": created_at,
            "properties": [{"propertyConfigId": config.1, "value": title, "order": 0}],
        }),
    )
    .await
}

fn created_asc() -> Value {
    json!({"property": "createdAt", "direction": "ASC"})
}

mod basics {
    use super::*;

    #[tokio::test]
    async fn default_list_is_newest_first_and_scoped_to_caller() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1);
        let bob = app.token_for(2);
        let config = app.create_note_config(&alice).await;
        let old = note_at(&app, &alice, config, "2024-01-01T08:00:00Z", json!([]), "old").await;
        let new = note_at(&app, &alice, config, "2024-02-01T08:00:00Z", json!([]), "new").await;
        let bob_config = app.create_note_config(&bob).await;
        note_at(&app, &bob, bob_config, "2024-03-01T08:00:00Z", json!([]), "bob").await;

        let res = app.list_entities(&alice, None, None).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![new, old]);
        assert_eq!(res.body["total"], 2);
        assert!(res.body["context"].as_object().unwrap().is_empty());
        assert_eq!(res.body["items"][0]["properties"][0]["value"], "new");
    }

    #[tokio::test]
    async fn pagination_reports_full_total() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        let mut ids = Vec::new();
        for day in 1..=5 {
            let at = format!("2024-01-0{day}T12:00:00Z");
            ids.push(note_at(&app, &token, config, &at, json!([]), "n").await);
        }

        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[
                    ("start", "2".to_string()),
                    ("perPage", "2".to_string()),
                    ("sort", created_asc().to_string()),
                ],
                Some(&token),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![ids[2], ids[3]]);
        assert_eq!(res.body["total"], 5);
    }

    #[tokio::test]
    async fn start_beyond_bigint_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[("start", u64::MAX.to_string())],
                Some(&app.token_for(1)),
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_filter_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[("filter", "{nope".to_string())],
                Some(&app.token_for(1)),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn include_types_restricts_entity_configs() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let notes = app.create_note_config(&token).await;
        let tasks = app.create_note_config(&token).await;
        let note = note_at(&app, &token, notes, "2024-01-01T08:00:00Z", json!([]), "n").await;
        note_at(&app, &token, tasks, "2024-01-01T09:00:00Z", json!([]), "t").await;

        let res = app
            .list_entities(&token, Some(json!({"includeTypes": [notes.0]})), None)
            .await;
        assert_eq!(res.item_ids(), vec![note]);
        assert_eq!(res.body["total"], 1);
    }
}

mod time_filter {
    use super::*;

    #[tokio::test]
    async fn exact_date_covers_the_whole_day() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        note_at(&app, &token, config, "2023-12-31T23:59:59Z", json!([]), "before").await;
        let start = note_at(&app, &token, config, "2024-01-01T00:00:00Z", json!([]), "start").await;
        let end = note_at(&app, &token, config, "2024-01-01T23:59:59Z", json!([]), "end").await;
        note_at(&app, &token, config, "2024-01-02T00:00:00Z", json!([]), "after").await;

        let res = app
            .list_entities(
                &token,
                Some(json!({"time": {"type": "EXACT_DATE", "date": "2024-01-01"}})),
                Some(created_asc()),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![start, end]);
    }

    #[tokio::test]
    async fn range_includes_the_end_day() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        let a = note_at(&app, &token, config, "2024-01-01T10:00:00Z", json!([]), "a").await;
        let b = note_at(&app, &token, config, "2024-01-02T22:00:00Z", json!([]), "b").await;
        note_at(&app, &token, config, "2024-01-03T00:00:00Z", json!([]), "c").await;

        let res = app
            .list_entities(
                &token,
                Some(json!({"time": {"type": "RANGE", "start": "2024-01-01", "end": "2024-01-02"}})),
                Some(created_asc()),
            )
            .await;
        assert_eq!(res.item_ids(), vec![a, b]);
    }

    #[tokio::test]
    async fn date_at_the_end_of_the_calendar_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .list_entities(
                &app.token_for(1),
                Some(json!({"time": {"type": "EXACT_DATE", "date": "+262142-12-31"}})),
                None,
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let res = app
            .list_entities(
                &token,
                Some(json!({"time": {"type": "RANGE", "start": "2024-02-01", "end": "2024-01-01"}})),
                None,
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn client_time_zone_shifts_created_at() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (config_id, _) = app.create_note_config(&token).await;

        // 23:30 local at UTC-2 is 01:30 UTC the next day.
        let res = app
            .post_with_token(
                routes::ENTITIES,
                &json!({
                    "entityConfigId": config_id,
                    "createdAt": "2024-01-01T23:30:00",
                    "timeZone": 120,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert!(
            res.body["createdAt"]
                .as_str()
                .unwrap()
                .starts_with("2024-01-02T01:30:00")
        );
    }
}

mod tag_filter {
    use super::*;

    async fn tagged_fixture(app: &TestApp, token: &str) -> (i32, i32, i32, i32) {
        let config = app.create_note_config(token).await;
        let ab = note_at(app, token, config, "2024-01-01T01:00:00Z", json!(["a", "b"]), "ab").await;
        let a = note_at(app, token, config, "2024-01-01T02:00:00Z", json!(["a"]), "a").await;
        let c = note_at(app, token, config, "2024-01-01T03:00:00Z", json!(["c"]), "c").await;
        let none = note_at(app, token, config, "2024-01-01T04:00:00Z", json!([]), "none").await;
        (ab, a, c, none)
    }

    #[tokio::test]
    async fn contains_one_of() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (ab, a, _, _) = tagged_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                Some(json!({"tagging": {"containsOneOf": ["a"]}})),
                Some(created_asc()),
            )
            .await;
        assert_eq!(res.item_ids(), vec![ab, a]);
    }

    #[tokio::test]
    async fn contains_all_of() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (ab, _, _, _) = tagged_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                Some(json!({"tagging": {"containsAllOf": ["a", "b"]}})),
                Some(created_asc()),
            )
            .await;
        assert_eq!(res.item_ids(), vec![ab]);
    }

    #[tokio::test]
    async fn include_untagged_adds_entities_without_tags() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (_, _, c, none) = tagged_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                Some(json!({
                    "includeUntagged": true,
                    "tagging": {"containsOneOf": ["c"]},
                })),
                Some(created_asc()),
            )
            .await;
        assert_eq!(res.item_ids(), vec![c, none]);
    }

    #[tokio::test]
    async fn include_all_tagging_skips_the_tag_predicate() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        tagged_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                Some(json!({
                    "includeAllTagging": true,
                    "tagging": {"containsOneOf": ["zzz"]},
                })),
                None,
            )
            .await;
        assert_eq!(res.body["total"], 4);
    }
}

mod text_filter {
    use super::*;

    #[tokio::test]
    async fn matches_text_values_case_insensitively() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        let hello = note_at(&app, &token, config, "2024-01-01T01:00:00Z", json!([]), "Hello world").await;
        let percent = note_at(&app, &token, config, "2024-01-01T02:00:00Z", json!([]), "100% done").await;
        let bye = note_at(&app, &token, config, "2024-01-01T03:00:00Z", json!([]), "goodbye").await;

        let cases = [
            (json!({"type": "contains", "subStr": "WORLD"}), vec![hello]),
            (json!({"type": "startsWith", "subStr": "hel"}), vec![hello]),
            (json!({"type": "endsWith", "subStr": "BYE"}), vec![bye]),
            (json!({"type": "equals", "subStr": "hello world"}), vec![hello]),
            (json!({"type": "contains", "subStr": "%"}), vec![percent]),
            (json!({"type": "contains", "subStr": ""}), vec![hello, percent, bye]),
        ];
        for (rule, expected) in cases {
            let res = app
                .list_entities(&token, Some(json!({"text": [rule.clone()]})), Some(created_asc()))
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.item_ids(), expected, "rule {rule}");
        }
    }
}

mod custom_sort {
    use super::*;

    async fn ranked_fixture(app: &TestApp, token: &str) -> (i32, Vec<i32>, i32) {
        let body = app
            .create_entity_config(token, "Ranked", json!([{"name": "Rank", "dataType": "int"}]))
            .await;
        let config_id = body["id"].as_i64().unwrap() as i32;
        let rank = body["properties"][0]["id"].as_i64().unwrap() as i32;

        let mut by_rank = Vec::new();
        for value in [3, 1, 2] {
            let id = app
                .create_entity(
                    token,
                    &json!({
                        "entityConfigId": config_id,
                        "properties": [{"propertyConfigId": rank, "value": value, "order": 0}],
                    }),
                )
                .await;
            by_rank.push((value, id));
        }
        let unranked = app
            .create_entity(token, &json!({"entityConfigId": config_id}))
            .await;
        by_rank.sort();
        (rank, by_rank.into_iter().map(|(_, id)| id).collect(), unranked)
    }

    #[tokio::test]
    async fn ascending_puts_missing_values_last() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (rank, ordered, unranked) = ranked_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": rank, "dataType": "int"}, "direction": "ASC"})),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let mut expected = ordered;
        expected.push(unranked);
        assert_eq!(res.item_ids(), expected);
    }

    #[tokio::test]
    async fn descending_also_puts_missing_values_last() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (rank, ordered, unranked) = ranked_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": rank, "dataType": "int"}, "direction": "DESC"})),
            )
            .await;
        let mut expected: Vec<i32> = ordered.into_iter().rev().collect();
        expected.push(unranked);
        assert_eq!(res.item_ids(), expected);
    }

    /// One entity per value of a single `data_type` property, plus one without
    /// the property. Ids come back in `values` order.
    async fn typed_fixture(
        app: &TestApp,
        token: &str,
        data_type: &str,
        values: &[Value],
    ) -> (i32, Vec<i32>, i32) {
        let body = app
            .create_entity_config(token, "Typed", json!([{"name": "Key", "dataType": data_type}]))
            .await;
        let config_id = body["id"].as_i64().unwrap() as i32;
        let key = body["properties"][0]["id"].as_i64().unwrap() as i32;

        let mut ids = Vec::new();
        for value in values {
            let id = app
                .create_entity(
                    token,
                    &json!({
                        "entityConfigId": config_id,
                        "properties": [{"propertyConfigId": key, "value": value, "order": 0}],
                    }),
                )
                .await;
            ids.push(id);
        }
        let missing = app
            .create_entity(token, &json!({"entityConfigId": config_id}))
            .await;
        (key, ids, missing)
    }

    #[tokio::test]
    async fn date_property_sorts_chronologically() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (key, ids, missing) = typed_fixture(
            &app,
            &token,
            "date",
            &[
                json!("2024-03-01T00:00:00Z"),
                json!("2023-01-01T00:00:00Z"),
                json!("2024-01-15T00:00:00Z"),
            ],
        )
        .await;

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": key, "dataType": "date"}, "direction": "ASC"})),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![ids[1], ids[2], ids[0], missing]);

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": key, "dataType": "date"}, "direction": "DESC"})),
            )
            .await;
        assert_eq!(res.item_ids(), vec![ids[0], ids[2], ids[1], missing]);
    }

    #[tokio::test]
    async fn short_text_property_sorts_alphabetically() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (key, ids, missing) = typed_fixture(
            &app,
            &token,
            "shortText",
            &[json!("pear"), json!("apple"), json!("fig")],
        )
        .await;

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": key, "dataType": "shortText"}, "direction": "ASC"})),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![ids[1], ids[2], ids[0], missing]);
    }

    #[tokio::test]
    async fn mismatched_data_type_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (rank, _, _) = ranked_fixture(&app, &token).await;

        let res = app
            .list_entities(
                &token,
                None,
                Some(json!({"property": {"propertyId": rank, "dataType": "shortText"}})),
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);

        let res = app
            .list_entities(
                &app.token_for(2),
                None,
                Some(json!({"property": {"propertyId": rank, "dataType": "int"}})),
            )
            .await;
        assert_eq!(res.status, 400, "another user's property cannot be used");
    }
}

mod context {
    use super::*;

    #[tokio::test]
    async fn before_window_collects_earlier_neighbours() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        let early = note_at(&app, &token, config, "2024-01-01T10:00:00Z", json!([]), "early").await;
        let anchor = note_at(&app, &token, config, "2024-01-01T10:30:00Z", json!(["x"]), "anchor").await;
        let late = note_at(&app, &token, config, "2024-01-01T12:00:00Z", json!([]), "late").await;

        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[
                    ("filter", json!({"tagging": {"containsOneOf": ["x"]}}).to_string()),
                    (
                        "context",
                        json!({"type": "BEFORE", "quantity": 1, "unit": "HOUR"}).to_string(),
                    ),
                ],
                Some(&token),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![anchor]);

        let neighbours = res.body["context"][anchor.to_string()].as_array().unwrap();
        let ids: Vec<i64> = neighbours.iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![early as i64]);
        assert!(!ids.contains(&(late as i64)));
    }

    #[tokio::test]
    async fn after_window_excludes_the_anchor() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        let anchor = note_at(&app, &token, config, "2024-01-01T10:00:00Z", json!(["x"]), "anchor").await;
        let soon = note_at(&app, &token, config, "2024-01-01T10:20:00Z", json!([]), "soon").await;
        note_at(&app, &token, config, "2024-01-01T11:00:01Z", json!([]), "later").await;

        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[
                    ("filter", json!({"tagging": {"containsOneOf": ["x"]}}).to_string()),
                    (
                        "context",
                        json!({"type": "AFTER", "quantity": 60, "unit": "MINUTE"}).to_string(),
                    ),
                ],
                Some(&token),
            )
            .await;
        let neighbours = res.body["context"][anchor.to_string()].as_array().unwrap();
        let ids: Vec<i64> = neighbours.iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![soon as i64]);
    }

    #[tokio::test]
    async fn window_beyond_the_calendar_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let config = app.create_note_config(&token).await;
        note_at(&app, &token, config, "2024-01-01T10:00:00Z", json!([]), "anchor").await;

        let res = app
            .get_with_query(
                routes::ENTITIES,
                &[(
                    "context",
                    json!({"type": "BEFORE", "quantity": u32::MAX, "unit": "DAY"}).to_string(),
                )],
                Some(&token),
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
