//! Health, CORS and error envelope integration tests.

#[cfg(test)]
mod tests {
    use crate::{api_base, api_client, api_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let api = api_client();
        let root = api_base().trim_end_matches('/').trim_end_matches("/api").to_owned();
        let body: serde_json::Value = api
            .get(format!("{root}/health"))
            .send()
            .await
            .expect("health request")
            .json()
            .await
            .expect("health JSON");
        assert_eq!(body, serde_json::json!({"status": "running", "service": "bucketlens"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_cors_preflight() {
        let api = api_client();
        let resp = api
            .request(reqwest::Method::OPTIONS, api_url("/buckets/b/objects"))
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .send()
            .await
            .expect("preflight request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_json_error_with_request_id() {
        let api = api_client();
        let resp = api
            .get(api_url("/no/such/route"))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let header_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("x-request-id header");
        let body: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(body["code"], "NoSuchRoute");
        assert_eq!(body["requestId"], header_id.as_str());
    }
}
