//! Stage definitions
//!
//! Pure builders turning (bucket, credentials, transfer flag) into the task
//! request for each stage. Nothing here performs I/O.

use ferry_core::domain::credentials::{CredentialPair, Credentials, Dataset};
use ferry_core::domain::pipeline::Stage;
use ferry_core::domain::task::{ExecutionSettings, InputValue, TaskRequest};
use std::collections::BTreeMap;

pub const INPUT_REGION: &str = "AWS_DEFAULT_REGION";
pub const INPUT_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const INPUT_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const INPUT_BUCKET: &str = "BUCKET";
pub const INPUT_GCP_ACCESS: &str = "GCP_ACCESS";
pub const INPUT_TRANSFER_ACTION: &str = "TRANSFER_ACTION";

/// Remote app identifiers, one per stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageApps {
    pub source_manifest: String,
    pub transfer: String,
    pub destination_manifest: String,
}

impl StageApps {
    pub fn app_for(&self, stage: Stage) -> &str {
        match stage {
            Stage::SourceManifest => &self.source_manifest,
            Stage::Transfer => &self.transfer,
            Stage::DestinationManifest => &self.destination_manifest,
        }
    }
}

/// Fixed parts of every submission
#[derive(Debug, Clone)]
pub struct StageTemplates {
    pub project: String,
    pub apps: StageApps,
    pub region: String,
    /// Access descriptor for the destination provider
    pub access_descriptor: String,
}

impl StageTemplates {
    /// Builds the request for `stage`, selecting credentials for `dataset`
    pub fn build(
        &self,
        stage: Stage,
        bucket: &str,
        dataset: Dataset,
        credentials: &Credentials,
        transfer_job_exists: bool,
    ) -> TaskRequest {
        let pair = credentials.select(dataset);
        match stage {
            Stage::SourceManifest => self.source_manifest(bucket, pair),
            Stage::Transfer => self.transfer(bucket, pair, transfer_job_exists),
            Stage::DestinationManifest => self.destination_manifest(bucket, pair),
        }
    }

    /// Stage 1: manifest generation on the source bucket
    pub fn source_manifest(&self, bucket: &str, credentials: &CredentialPair) -> TaskRequest {
        let inputs = self.base_inputs(bucket, credentials);
        self.request(Stage::SourceManifest, bucket, inputs)
    }

    /// Stage 2: cross-provider transfer
    ///
    /// When the transfer job is already provisioned remotely, the app is told
    /// to only run it. Otherwise the input is omitted and the app creates the
    /// job before running it.
    pub fn transfer(
        &self,
        bucket: &str,
        credentials: &CredentialPair,
        transfer_job_exists: bool,
    ) -> TaskRequest {
        let mut inputs = self.base_inputs(bucket, credentials);
        inputs.insert(
            INPUT_GCP_ACCESS.to_string(),
            InputValue::from(self.access_descriptor.as_str()),
        );
        if transfer_job_exists {
            inputs.insert(INPUT_TRANSFER_ACTION.to_string(), InputValue::from("run"));
        }
        self.request(Stage::Transfer, bucket, inputs)
    }

    /// Stage 3: manifest generation on the destination bucket
    pub fn destination_manifest(&self, bucket: &str, credentials: &CredentialPair) -> TaskRequest {
        let mut inputs = self.base_inputs(bucket, credentials);
        inputs.insert(
            INPUT_GCP_ACCESS.to_string(),
            InputValue::from(self.access_descriptor.as_str()),
        );
        self.request(Stage::DestinationManifest, bucket, inputs)
    }

    fn base_inputs(
        &self,
        bucket: &str,
        credentials: &CredentialPair,
    ) -> BTreeMap<String, InputValue> {
        BTreeMap::from([
            (
                INPUT_REGION.to_string(),
                InputValue::from(self.region.as_str()),
            ),
            (
                INPUT_ACCESS_KEY_ID.to_string(),
                InputValue::from(credentials.access_key_id.as_str()),
            ),
            (
                INPUT_SECRET_ACCESS_KEY.to_string(),
                InputValue::from(credentials.secret_access_key.as_str()),
            ),
            (INPUT_BUCKET.to_string(), InputValue::from(bucket)),
        ])
    }

    fn request(
        &self,
        stage: Stage,
        bucket: &str,
        inputs: BTreeMap<String, InputValue>,
    ) -> TaskRequest {
        TaskRequest {
            name: format!("{} - {}", stage, bucket),
            description: Some(format!(
                "stage {}/3 of the transfer pipeline for {}",
                stage.position(),
                bucket
            )),
            app: self.apps.app_for(stage).to_string(),
            project: self.project.clone(),
            inputs,
            execution_settings: Some(ExecutionSettings {
                use_memoization: Some(false),
            }),
        }
    }
}
