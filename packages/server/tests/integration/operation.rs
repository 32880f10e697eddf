use serde_json::{Value, json};

use crate::common::{TestApp, routes};

/// Three notes of user 1 tagged `a`, `a b` and nothing.
async fn fixture(app: &TestApp, token: &str) -> Vec<i32> {
    let (config_id, _) = app.create_note_config(token).await;
    let mut ids = Vec::new();
    for tags in [json!(["a"]), json!(["a", "b"]), json!([])] {
        ids.push(
            app.create_entity(token, &json!({"entityConfigId": config_id, "tags": tags}))
                .await,
        );
    }
    ids
}

async fn tags_of(app: &TestApp, token: &str, id: i32) -> Value {
    let res = app.get_with_token(&routes::entity(id), token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    res.body["tags"].clone()
}

#[tokio::test]
async fn add_tags_keeps_existing_ones() {
    let app = TestApp::spawn().await;
    let token = app.token_for(1);
    let ids = fixture(&app, &token).await;

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": ids, "operation": {"type": "ADD_TAGS", "tags": ["b", " c "]}}),
            &token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["operation"], "ADD_TAGS");
    assert_eq!(res.body["entities"], json!(ids));

    assert_eq!(tags_of(&app, &token, ids[0]).await, json!(["a", "b", "c"]));
    assert_eq!(tags_of(&app, &token, ids[1]).await, json!(["a", "b", "c"]));
    assert_eq!(tags_of(&app, &token, ids[2]).await, json!(["b", "c"]));
}

#[tokio::test]
async fn remove_tags_ignores_missing_labels() {
    let app = TestApp::spawn().await;
    let token = app.token_for(1);
    let ids = fixture(&app, &token).await;

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": ids, "operation": {"type": "REMOVE_TAGS", "tags": ["a", "zzz"]}}),
            &token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    assert_eq!(tags_of(&app, &token, ids[0]).await, json!([]));
    assert_eq!(tags_of(&app, &token, ids[1]).await, json!(["b"]));

    // Tags stay available for filtering other entities.
    let res = app
        .list_entities(&token, Some(json!({"tagging": {"containsOneOf": ["b"]}})), None)
        .await;
    assert_eq!(res.item_ids(), vec![ids[1]]);
}

#[tokio::test]
async fn replace_tags_sets_the_whole_tag_set() {
    let app = TestApp::spawn().await;
    let token = app.token_for(1);
    let ids = fixture(&app, &token).await;

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": [ids[1], ids[2]], "operation": {"type": "REPLACE_TAGS", "tags": ["z"]}}),
            &token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(tags_of(&app, &token, ids[0]).await, json!(["a"]));
    assert_eq!(tags_of(&app, &token, ids[1]).await, json!(["z"]));
    assert_eq!(tags_of(&app, &token, ids[2]).await, json!(["z"]));

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": [ids[1]], "operation": {"type": "REPLACE_TAGS", "tags": []}}),
            &token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(tags_of(&app, &token, ids[1]).await, json!([]));
}

#[tokio::test]
async fn delete_removes_every_listed_entity() {
    let app = TestApp::spawn().await;
    let token = app.token_for(1);
    let ids = fixture(&app, &token).await;

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": [ids[0], ids[1], ids[0]], "operation": {"type": "DELETE"}}),
            &token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["entities"], json!([ids[0], ids[1]]));

    let res = app.list_entities(&token, None, None).await;
    assert_eq!(res.item_ids(), vec![ids[2]]);
    let res = app.get_with_token(&routes::entity(ids[0]), &token).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn foreign_entity_aborts_the_whole_batch() {
    let app = TestApp::spawn().await;
    let alice = app.token_for(1);
    let bob = app.token_for(2);
    let ids = fixture(&app, &alice).await;
    let bobs = fixture(&app, &bob).await;

    let res = app
        .post_with_token(
            routes::OPERATIONS,
            &json!({"entities": [ids[0], bobs[0]], "operation": {"type": "DELETE"}}),
            &alice,
        )
        .await;
    assert_eq!(res.status, 404, "{}", res.text);
    assert_eq!(res.body["code"], "NOT_FOUND");

    // Nothing was deleted, including the caller's own entity.
    let res = app.get_with_token(&routes::entity(ids[0]), &alice).await;
    assert_eq!(res.status, 200);
    let res = app.get_with_token(&routes::entity(bobs[0]), &bob).await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn malformed_operations_are_rejected() {
    let app = TestApp::spawn().await;
    let token = app.token_for(1);
    let ids = fixture(&app, &token).await;

    for body in [
        json!({"entities": [], "operation": {"type": "DELETE"}}),
        json!({"entities": ids, "operation": {"type": "ADD_TAGS", "tags": []}}),
        json!({"entities": ids, "operation": {"type": "ARCHIVE"}}),
    ] {
        let res = app.post_with_token(routes::OPERATIONS, &body, &token).await;
        assert_eq!(res.status, 400, "{body}: {}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    let res = app
        .post_without_token(
            routes::OPERATIONS,
            &json!({"entities": ids, "operation": {"type": "DELETE"}}),
        )
        .await;
    assert_eq!(res.status, 401);
}
