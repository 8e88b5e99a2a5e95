use crate::{
    aws_clients::{create_dynamodb_client, create_s3_client, create_sdk_config},
    config::{Config, ExportTarget, StoreBackend},
    domain::{FileStorage, KeyValueStore},
    errors::AppError,
    gemini::GeminiClient,
    repositories::{DynamoDbKeyValueStore, FileKeyValueStore, MemoryKeyValueStore, KEY_ATTRIBUTE},
    storage::{LocalFileStorage, S3FileStorage},
    studio::{Studio, StudioDeps},
};
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use aws_sdk_s3::{
    error::SdkError as S3SdkError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client,
};
use backoff::{future::retry, ExponentialBackoff};
use std::{sync::Arc, time::Duration};
use tracing;

/// How long startup keeps retrying while AWS (or LocalStack) comes up.
const RESOURCE_RETRY_WINDOW: Duration = Duration::from_secs(30);

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(RESOURCE_RETRY_WINDOW),
        ..ExponentialBackoff::default()
    }
}

// Connection problems are retried; anything the service rejected is permanent.
async fn create_state_table(client: &DynamoDbClient, table_name: &str) -> Result<(), backoff::Error<AppError>> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(KEY_ATTRIBUTE)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| backoff::Error::permanent(AppError::from(e)))?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(KEY_ATTRIBUTE)
                .key_type(KeyType::Hash)
                .build()
                .map_err(|e| backoff::Error::permanent(AppError::from(e)))?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created.", table_name);
            Ok(())
        }
        Err(DynamoSdkError::ServiceError(service_err)) if service_err.err().is_resource_in_use_exception() => {
            tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
            Ok(())
        }
        Err(e @ (DynamoSdkError::DispatchFailure(_) | DynamoSdkError::TimeoutError(_) | DynamoSdkError::ResponseError(_))) => {
            tracing::warn!("Startup: DynamoDB not reachable yet for table '{}': {}", table_name, e);
            Err(backoff::Error::transient(AppError::InitError(format!(
                "Startup: SDK error creating DynamoDB table '{}': {}",
                table_name, e
            ))))
        }
        Err(e) => {
            let context = format!("Startup: Error creating DynamoDB table '{}'", table_name);
            tracing::error!("{}: {:?}", context, e);
            Err(backoff::Error::permanent(AppError::InitError(format!("{}: {}", context, e))))
        }
    }
}

/// Creates the state table if it doesn't exist.
pub async fn ensure_state_table(client: &DynamoDbClient, table_name: &str) -> Result<(), AppError> {
    retry(retry_policy(), || create_state_table(client, table_name)).await
}

async fn create_export_bucket(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), backoff::Error<AppError>> {
    let mut request = client.create_bucket().bucket(bucket_name);
    if region_str != "us-east-1" {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region_str))
                .build(),
        );
    }

    match request.send().await {
        Ok(_) => {
            tracing::info!("Startup: S3 bucket '{}' created.", bucket_name);
            Ok(())
        }
        Err(S3SdkError::ServiceError(service_err))
            if service_err.err().is_bucket_already_owned_by_you() || service_err.err().is_bucket_already_exists() =>
        {
            tracing::info!("Startup: S3 bucket '{}' already exists.", bucket_name);
            Ok(())
        }
        Err(e @ (S3SdkError::DispatchFailure(_) | S3SdkError::TimeoutError(_) | S3SdkError::ResponseError(_))) => {
            tracing::warn!("Startup: S3 not reachable yet for bucket '{}': {}", bucket_name, e);
            Err(backoff::Error::transient(AppError::InitError(format!(
                "Startup: SDK error creating S3 bucket '{}': {}",
                bucket_name, e
            ))))
        }
        Err(e) => {
            let context = format!("Startup: Error creating S3 bucket '{}'", bucket_name);
            tracing::error!("{}: {:?}", context, e);
            Err(backoff::Error::permanent(AppError::InitError(format!("{}: {}", context, e))))
        }
    }
}

/// Ensures the export bucket exists, with the region's location constraint.
pub async fn ensure_export_bucket(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), AppError> {
    retry(retry_policy(), || create_export_bucket(client, bucket_name, region_str)).await
}

/// Wires configured backends into a ready studio.
pub async fn build_studio(config: &Config) -> Result<Arc<Studio>, AppError> {
    let sdk_config = if config.needs_aws() {
        tracing::info!("Startup: Initializing AWS resources...");
        Some(create_sdk_config(config).await)
    } else {
        None
    };

    let store: Arc<dyn KeyValueStore> = match (&config.store, &sdk_config) {
        (StoreBackend::File { dir }, _) => Arc::new(
            FileKeyValueStore::new(dir.clone()).map_err(|e| AppError::InitError(e.to_string()))?,
        ),
        (StoreBackend::DynamoDb { table_name }, Some(sdk)) => {
            let client = create_dynamodb_client(sdk);
            ensure_state_table(&client, table_name).await?;
            Arc::new(DynamoDbKeyValueStore::new(client, table_name.clone()))
        }
        (StoreBackend::Memory, _) => {
            tracing::warn!("Startup: Using in-memory store; nothing will survive a restart");
            Arc::new(MemoryKeyValueStore::default())
        }
        (StoreBackend::DynamoDb { .. }, None) => {
            return Err(AppError::InitError("DynamoDB store selected without AWS configuration".to_string()));
        }
    };

    let exports: Arc<dyn FileStorage> = match (&config.export, &sdk_config) {
        (ExportTarget::S3 { bucket_name }, Some(sdk)) => {
            let client = create_s3_client(sdk);
            ensure_export_bucket(&client, bucket_name, &config.aws_region).await?;
            Arc::new(S3FileStorage::new(client, bucket_name.clone()))
        }
        (ExportTarget::Directory(dir), _) => Arc::new(LocalFileStorage::new(dir.clone())),
        (ExportTarget::S3 { .. }, None) => {
            return Err(AppError::InitError("S3 exports selected without AWS configuration".to_string()));
        }
    };

    let backend = GeminiClient::new(&config.ai)
        .map_err(|e| AppError::InitError(format!("Failed to build generative content client: {}", e)))?;

    let mut deps = StudioDeps::new(store, Arc::new(backend), exports);
    deps.celebration = config.celebration;
    let studio = Studio::open(deps).await;
    tracing::info!("Startup: Studio ready.");
    Ok(studio)
}
