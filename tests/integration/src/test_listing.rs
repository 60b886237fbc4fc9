//! Listing and prefix stats integration tests.

#[cfg(test)]
mod tests {
    use crate::{
        api_client, api_url, cleanup_bucket, poll_prefix_stats, prefix_stats_url,
        register_test_store, remove_test_store, s3_client, seed_bucket,
    };

    const OBJECTS: &[(&str, &[u8])] = &[
        ("root.txt", b"root"),
        ("photos/", b""),
        ("photos/2024/img1.jpg", &[1u8; 100]),
        ("photos/2024/img2.jpg", &[2u8; 250]),
        ("photos/2025/img3.jpg", &[3u8; 50]),
        ("documents/report.pdf", &[4u8; 1000]),
    ];

    async fn list(
        client: &reqwest::Client,
        store: &str,
        bucket: &str,
        prefix: &str,
    ) -> serde_json::Value {
        let resp = client
            .get(api_url(&format!(
                "/buckets/{bucket}/objects?store={}&prefix={}",
                urlencoding::encode(store),
                urlencoding::encode(prefix),
            )))
            .send()
            .await
            .expect("list request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        resp.json().await.expect("list JSON")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_files_before_folders() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(&s3, "listing", OBJECTS).await;

        let entries = list(&api, &store, &bucket, "").await;
        let keys: Vec<_> = entries
            .as_array()
            .expect("array")
            .iter()
            .map(|e| (e["Key"].as_str().unwrap_or_default(), e["IsFolder"] == true))
            .collect();
        assert_eq!(
            keys,
            vec![("root.txt", false), ("documents/", true), ("photos/", true)]
        );

        let nested = list(&api, &store, &bucket, "photos").await;
        let keys: Vec<_> = nested
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|e| e["Key"].as_str())
            .collect();
        assert_eq!(keys, vec!["photos/2024/", "photos/2025/"]);

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_compute_folder_stats_in_background() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(&s3, "stats", OBJECTS).await;

        list(&api, &store, &bucket, "").await;
        let stats = poll_prefix_stats(&api, &store, &bucket, "photos/")
            .await
            .expect("stats should settle");
        assert_eq!(stats["ready"], true);
        assert_eq!(stats["size"], 400);
        assert!(stats["lastModified"].is_string());
        assert!(stats["updatedAt"].is_string());

        let entries = list(&api, &store, &bucket, "").await;
        let photos = entries
            .as_array()
            .expect("array")
            .iter()
            .find(|e| e["Key"] == "photos/")
            .expect("photos folder");
        assert_eq!(photos["Size"], 400);

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_recompute_after_invalidation() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(&s3, "invalidate", OBJECTS).await;

        list(&api, &store, &bucket, "").await;
        poll_prefix_stats(&api, &store, &bucket, "documents/")
            .await
            .expect("stats should settle");

        s3.put_object()
            .bucket(&bucket)
            .key("documents/extra.bin")
            .body(vec![0u8; 24].into())
            .send()
            .await
            .expect("put extra");

        let resp = api
            .delete(prefix_stats_url(&store, &bucket, "documents/"))
            .send()
            .await
            .expect("invalidate");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let unscheduled: serde_json::Value = api
            .get(prefix_stats_url(&store, &bucket, "documents/"))
            .send()
            .await
            .expect("stats request")
            .json()
            .await
            .expect("stats JSON");
        assert_eq!(unscheduled, serde_json::json!({"ready": false}));

        list(&api, &store, &bucket, "").await;
        let stats = poll_prefix_stats(&api, &store, &bucket, "documents/")
            .await
            .expect("stats should settle");
        assert_eq!(stats["size"], 1024);

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_failed_computation() {
        let api = api_client();
        let store = register_test_store(&api).await;
        let missing = crate::unique_name("missing");

        let resp = api
            .get(api_url(&format!("/buckets/{missing}/objects?store={store}")))
            .send()
            .await
            .expect("list request");
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(body["code"], "UpstreamError");

        remove_test_store(&api, &store).await;
    }
}
