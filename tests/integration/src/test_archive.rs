//! Folder download integration tests.

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use crate::{api_client, api_url, cleanup_bucket, register_test_store, remove_test_store, s3_client, seed_bucket};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_download_folder_as_zip() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(
            &s3,
            "archive",
            &[
                ("reports/2024/q1.csv", b"a,b\n1,2\n"),
                ("reports/2024/deep/q2.csv", b"c,d\n3,4\n"),
                ("reports/other.txt", b"skip"),
            ],
        )
        .await;

        let resp = api
            .get(api_url(&format!(
                "/buckets/{bucket}/folders/reports/2024/?download=true&store={store}"
            )))
            .send()
            .await
            .expect("download request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("content-disposition")
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"reports/2024.zip\"")
        );
        let bytes = resp.bytes().await.expect("archive body");

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid archive");
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("reports/2024/deep/q2.csv")
            .expect("entry")
            .read_to_string(&mut content)
            .expect("read entry");
        assert_eq!(content, "c,d\n3,4\n");

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_empty_archive_for_empty_prefix() {
        let api = api_client();
        let s3 = s3_client();
        let store = register_test_store(&api).await;
        let bucket = seed_bucket(&s3, "empty-archive", &[("other/file.txt", b"x")]).await;

        let resp = api
            .get(api_url(&format!(
                "/buckets/{bucket}/folders/nothing/?download=true&store={store}"
            )))
            .send()
            .await
            .expect("download request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let bytes = resp.bytes().await.expect("archive body");
        let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid archive");
        assert_eq!(zip.len(), 0);

        cleanup_bucket(&s3, &bucket).await;
        remove_test_store(&api, &store).await;
    }
}
