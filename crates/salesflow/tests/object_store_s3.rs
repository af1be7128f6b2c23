use anyhow::{Context, Result};
use bytes::Bytes;
use salesflow_bucket::{BucketError, BucketStore, S3BucketStore, S3Config};

const REQUIRED_VARS: &[&str] = &[
    "SALESFLOW_TEST_S3_BUCKET",
    "SALESFLOW_TEST_S3_ENDPOINT",
    "SALESFLOW_TEST_S3_ACCESS_KEY_ID",
    "SALESFLOW_TEST_S3_SECRET_ACCESS_KEY",
];

#[tokio::test]
async fn s3_bucket_store_round_trips_csv() -> Result<()> {
    let Some(config) = test_config() else {
        eprintln!(
            "Skipping S3 bucket store test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };

    let store = S3BucketStore::new(config)
        .await
        .context("failed to build S3 bucket store")?;
    let key = format!("silver/integration-{}.csv", std::process::id());
    let payload = Bytes::from_static(b"Fecha,Total\n2024-01-01,20.0\n");

    let round_trip = async {
        store
            .put_object(&key, payload.clone(), "text/csv")
            .await
            .context("upload to S3 failed")?;
        let fetched = store.get_object(&key).await.context("download failed")?;
        anyhow::ensure!(fetched == payload, "downloaded bytes differ from upload");
        Ok::<(), anyhow::Error>(())
    }
    .await;

    store
        .delete_object(&key)
        .await
        .context("failed to clean up test object")?;
    round_trip?;

    let deleted = store.get_object(&key).await;
    assert!(matches!(deleted, Err(BucketError::NotFound(_))));
    let missing = store.get_object("silver/does-not-exist.csv").await;
    assert!(matches!(missing, Err(BucketError::NotFound(_))));

    Ok(())
}

fn test_config() -> Option<S3Config> {
    let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());

    if REQUIRED_VARS.iter().any(|name| var(name).is_none()) {
        return None;
    }

    Some(S3Config {
        bucket: var("SALESFLOW_TEST_S3_BUCKET")?,
        region: var("SALESFLOW_TEST_S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        endpoint: var("SALESFLOW_TEST_S3_ENDPOINT"),
        access_key_id: var("SALESFLOW_TEST_S3_ACCESS_KEY_ID"),
        secret_access_key: var("SALESFLOW_TEST_S3_SECRET_ACCESS_KEY"),
        force_path_style: true,
    })
}
