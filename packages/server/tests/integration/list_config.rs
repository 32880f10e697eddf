use serde_json::{Value, json};

use crate::common::{TestApp, routes};

async fn create_list_config(app: &TestApp, token: &str, body: Value) -> i32 {
    let res = app.post_with_token(routes::LIST_CONFIGS, &body, token).await;
    assert_eq!(res.status, 201, "create_list_config failed: {}", res.text);
    res.id()
}

mod crud {
    use super::*;

    #[tokio::test]
    async fn create_stores_filter_and_sort() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);

        let res = app
            .post_with_token(
                routes::LIST_CONFIGS,
                &json!({
                    "name": "Reading",
                    "filter": {"tagging": {"containsOneOf": ["book"]}},
                    "sort": {"property": "updatedAt", "direction": "ASC"},
                    "perPage": 10,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Reading");
        assert_eq!(res.body["perPage"], 10);
        assert_eq!(res.body["isPublic"], false);
        assert_eq!(res.body["filter"]["tagging"]["containsOneOf"], json!(["book"]));
        assert_eq!(res.body["filter"]["includeAll"], false);
        assert_eq!(res.body["sort"]["property"], "updatedAt");
        assert_eq!(res.body["sort"]["direction"], "ASC");

        let fetched = app
            .get_with_token(&routes::list_config(res.id()), &token)
            .await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body, res.body);
    }

    #[tokio::test]
    async fn per_page_above_maximum_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .post_with_token(
                routes::LIST_CONFIGS,
                &json!({"name": "Huge", "perPage": 100000}),
                &app.token_for(1),
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
    }

    #[tokio::test]
    async fn update_and_delete_are_owner_only() {
        let app = TestApp::spawn().await;
        let owner = app.token_for(1);
        let other = app.token_for(2);
        let id = create_list_config(&app, &owner, json!({"name": "Mine"})).await;

        let res = app
            .put_with_token(&routes::list_config(id), &json!({"name": "Stolen"}), &other)
            .await;
        assert_eq!(res.status, 404);
        let res = app.delete_with_token(&routes::list_config(id), &other).await;
        assert_eq!(res.status, 404);

        let res = app
            .put_with_token(
                &routes::list_config(id),
                &json!({"name": "Renamed", "isPublic": true}),
                &owner,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Renamed");
        assert_eq!(res.body["isPublic"], true);

        let res = app.delete_with_token(&routes::list_config(id), &owner).await;
        assert_eq!(res.status, 204);
        let res = app.get_with_token(&routes::list_config(id), &owner).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn list_returns_only_own_presets() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1);
        create_list_config(&app, &alice, json!({"name": "b"})).await;
        create_list_config(&app, &alice, json!({"name": "a"})).await;
        create_list_config(&app, &app.token_for(2), json!({"name": "c"})).await;

        let res = app.get_with_token(routes::LIST_CONFIGS, &alice).await;
        let names: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}

mod apply {
    use super::*;

    /// Owner 1 with a tagged and an untagged note; returns `(tagged, untagged)`.
    async fn fixture(app: &TestApp) -> (i32, i32) {
        let token = app.token_for(1);
        let (config_id, property_id) = app.create_note_config(&token).await;
        let tagged = app
            .create_entity(
                &token,
                &json!({
                    "entityConfigId": config_id,
                    "tags": ["pick"],
                    "properties": [{"propertyConfigId": property_id, "value": "yes", "order": 0}],
                }),
            )
            .await;
        let untagged = app
            .create_entity(&token, &json!({"entityConfigId": config_id}))
            .await;
        (tagged, untagged)
    }

    #[tokio::test]
    async fn public_preset_is_readable_anonymously() {
        let app = TestApp::spawn().await;
        let (tagged, _) = fixture(&app).await;
        let id = create_list_config(
            &app,
            &app.token_for(1),
            json!({
                "name": "Picks",
                "filter": {"tagging": {"containsOneOf": ["pick"]}},
                "isPublic": true,
            }),
        )
        .await;

        let res = app.get_without_token(&routes::list_entities(id)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.item_ids(), vec![tagged]);
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["items"][0]["properties"][0]["value"], "yes");

        // Other users see the owner's entities through the preset.
        let res = app
            .get_with_token(&routes::list_entities(id), &app.token_for(2))
            .await;
        assert_eq!(res.item_ids(), vec![tagged]);
    }

    #[tokio::test]
    async fn private_preset_is_owner_only() {
        let app = TestApp::spawn().await;
        let (tagged, untagged) = fixture(&app).await;
        let id = create_list_config(&app, &app.token_for(1), json!({"name": "All"})).await;

        let res = app.get_without_token(&routes::list_entities(id)).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app
            .get_with_token(&routes::list_entities(id), &app.token_for(2))
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app
            .get_with_token(&routes::list_entities(id), &app.token_for(1))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let mut ids = res.item_ids();
        ids.sort();
        let mut expected = vec![tagged, untagged];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_even_for_public_presets() {
        let app = TestApp::spawn().await;
        fixture(&app).await;
        let id = create_list_config(
            &app,
            &app.token_for(1),
            json!({"name": "Open", "isPublic": true}),
        )
        .await;

        let res = app
            .get_with_token(&routes::list_entities(id), "not-a-jwt")
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn per_page_from_preset_applies() {
        let app = TestApp::spawn().await;
        fixture(&app).await;
        let id = create_list_config(
            &app,
            &app.token_for(1),
            json!({"name": "One", "perPage": 1, "isPublic": true}),
        )
        .await;

        let res = app.get_without_token(&routes::list_entities(id)).await;
        assert_eq!(res.item_ids().len(), 1);
        assert_eq!(res.body["total"], 2);

        let res = app
            .get_with_query(
                &routes::list_entities(id),
                &[("perPage", "5".to_string())],
                None,
            )
            .await;
        assert_eq!(res.item_ids().len(), 2);
    }

    #[tokio::test]
    async fn unknown_preset_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.get_without_token(&routes::list_entities(4242)).await;
        assert_eq!(res.status, 404);
    }
}
