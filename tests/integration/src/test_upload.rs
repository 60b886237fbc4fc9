//! Upload integration tests.

#[cfg(test)]
mod tests {
    use crate::{
        api_client, api_url, cleanup_bucket, register_test_store, remove_test_store, s3_client,
        seed_bucket, upload_form,
    };

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_with_exact_length() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(&s3, "upload", &[]).await;
        let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();

        let (content_type, body) = upload_form(Some("incoming/2024"), "data.bin", &payload);
        let resp = api
            .post(api_url(&format!("/buckets/{bucket}/objects?store={store}")))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .expect("upload request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let result: serde_json::Value = resp.json().await.expect("upload JSON");
        assert_eq!(result["key"], "incoming/2024/data.bin");
        assert_eq!(result["size"], 300_000);

        let head = s3
            .head_object()
            .bucket(&bucket)
            .key("incoming/2024/data.bin")
            .send()
            .await
            .expect("head uploaded object");
        assert_eq!(head.content_length(), Some(300_000));

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_form_without_file() {
        let api = api_client();
        let resp = api
            .post(api_url("/buckets/any/objects"))
            .header("content-type", "multipart/form-data; boundary=abc")
            .body("--abc\r\nContent-Disposition: form-data; name=\"prefix\"\r\n\r\nx\r\n--abc--\r\n")
            .send()
            .await
            .expect("upload request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
