//! Store management integration tests.

#[cfg(test)]
mod tests {
    use crate::{api_client, api_url, register_test_store, remove_test_store};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_register_list_and_delete_store() {
        let api = api_client();
        let name = register_test_store(&api).await;

        let stores: serde_json::Value = api
            .get(api_url("/regions"))
            .send()
            .await
            .expect("list stores")
            .json()
            .await
            .expect("stores JSON");
        let entry = stores
            .as_array()
            .expect("array")
            .iter()
            .find(|s| s["name"] == name.as_str())
            .expect("registered store listed");
        assert!(entry.get("secretKey").is_none());

        let dup = api
            .post(api_url("/stores"))
            .json(&serde_json::json!({"name": name, "accessKey": "a", "secretKey": "b"}))
            .send()
            .await
            .expect("duplicate request");
        assert_eq!(dup.status(), reqwest::StatusCode::CONFLICT);

        let resp = api
            .delete(api_url(&format!("/stores/{name}")))
            .send()
            .await
            .expect("delete request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = api
            .delete(api_url(&format!("/stores/{name}")))
            .send()
            .await
            .expect("delete request");
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        remove_test_store(&api, &name).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_keys() {
        let api = api_client();
        let resp = api
            .post(api_url("/stores"))
            .json(&serde_json::json!({"name": crate::unique_name("nokeys")}))
            .send()
            .await
            .expect("create request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(body["message"], "name, access_key and secret_key are required");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_store_parameter() {
        let api = api_client();
        let resp = api
            .get(api_url("/buckets/b/objects?store=does-not-exist"))
            .send()
            .await
            .expect("list request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(body["code"], "StoreNotFound");
    }
}
