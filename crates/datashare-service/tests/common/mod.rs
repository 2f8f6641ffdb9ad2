//! Shared fixture for service scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use datashare_auth::ResourcePolicyStore;
use datashare_auth::permissions::DATASET_OWNER;
use datashare_cloud::InMemoryCloudAccount;
use datashare_core::config::SharingConfig;
use datashare_core::types::{BucketId, DatasetId, EnvironmentId, ShareId, TableId};
use datashare_database::{MemoryShareStore, ShareSession, ShareStore};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::permission::ResourceType;
use datashare_entity::share::{ShareItem, ShareItemType};
use uuid::Uuid;

use datashare_service::{
    DatasetTableService, RequestContext, ShareObjectService, ShareProcessorDispatcher,
};

pub const SOURCE_ACCOUNT: &str = "111111111111";
pub const TARGET_ACCOUNT: &str = "222222222222";
pub const REQUESTER_GROUP: &str = "analysts";
pub const MARKETING_GROUP: &str = "marketing";
pub const ADMIN_GROUP: &str = "data-owners";
pub const STEWARDS_GROUP: &str = "data-stewards";
pub const TOPIC: &str = "dataset-updates";

/// A source environment with one dataset (two tables, one bucket) and a
/// target environment the analysts and marketing groups are invited to.
pub struct Fixture {
    pub store: Arc<MemoryShareStore>,
    pub cloud: InMemoryCloudAccount,
    pub config: SharingConfig,
    pub shares: ShareObjectService,
    pub tables: DatasetTableService,
    pub dispatcher: ShareProcessorDispatcher,
    pub source_env: Environment,
    pub target_env: Environment,
    pub dataset: Dataset,
    pub table: DatasetTable,
    pub second_table: DatasetTable,
    pub bucket: DatasetBucket,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryShareStore::new());
        let cloud = InMemoryCloudAccount::new();
        let config = SharingConfig::default();
        let dyn_store: Arc<dyn ShareStore> = store.clone();

        let source_env = environment("producers", SOURCE_ACCOUNT);
        let target_env = environment("consumers", TARGET_ACCOUNT);

        let dataset = Dataset {
            id: DatasetId::new(),
            label: "Sales".to_string(),
            environment_id: source_env.id,
            admin_group: ADMIN_GROUP.to_string(),
            stewards: Some(STEWARDS_GROUP.to_string()),
            aws_account_id: SOURCE_ACCOUNT.to_string(),
            region: "eu-west-1".to_string(),
            glue_database_name: "sales_db".to_string(),
            s3_bucket_name: "sales-data".to_string(),
        };
        let table = DatasetTable {
            id: TableId::new(),
            dataset_id: dataset.id,
            name: "Orders".to_string(),
            glue_database_name: "sales_db".to_string(),
            glue_table_name: "orders".to_string(),
            s3_prefix: "s3://sales-data/orders/".to_string(),
            aws_account_id: SOURCE_ACCOUNT.to_string(),
            region: "eu-west-1".to_string(),
        };
        let second_table = DatasetTable {
            id: TableId::new(),
            name: "Customers".to_string(),
            glue_table_name: "customers".to_string(),
            s3_prefix: "s3://sales-data/customers/".to_string(),
            ..table.clone()
        };
        let bucket = DatasetBucket {
            id: BucketId::new(),
            dataset_id: dataset.id,
            name: "Sales raw".to_string(),
            bucket_name: "sales-raw".to_string(),
            aws_account_id: SOURCE_ACCOUNT.to_string(),
            region: "eu-west-1".to_string(),
        };

        store.insert_environment(source_env.clone()).await;
        store.insert_environment(target_env.clone()).await;
        store
            .insert_environment_group(EnvironmentGroup {
                environment_id: target_env.id,
                group_name: REQUESTER_GROUP.to_string(),
                iam_role_name: "analysts-role".to_string(),
                iam_role_arn: format!("arn:aws:iam::{TARGET_ACCOUNT}:role/analysts-role"),
            })
            .await;
        store
            .insert_environment_group(EnvironmentGroup {
                environment_id: target_env.id,
                group_name: MARKETING_GROUP.to_string(),
                iam_role_name: "marketing-role".to_string(),
                iam_role_arn: format!("arn:aws:iam::{TARGET_ACCOUNT}:role/marketing-role"),
            })
            .await;
        store.insert_dataset(dataset.clone()).await;
        store.insert_table(table.clone()).await;
        store.insert_table(second_table.clone()).await;
        store.insert_bucket(bucket.clone()).await;

        Self {
            shares: ShareObjectService::new(dyn_store.clone()),
            tables: DatasetTableService::new(dyn_store.clone()),
            dispatcher: ShareProcessorDispatcher::new(dyn_store, &cloud.providers(), &config),
            store,
            cloud,
            config,
            source_env,
            target_env,
            dataset,
            table,
            second_table,
            bucket,
        }
    }

    pub fn requester(&self) -> RequestContext {
        RequestContext::new("alice", &[REQUESTER_GROUP])
    }

    pub fn approver(&self) -> RequestContext {
        RequestContext::new("olivia", &[ADMIN_GROUP])
    }

    pub fn marketer(&self) -> RequestContext {
        RequestContext::new("mia", &[MARKETING_GROUP])
    }

    /// A draft share of `group` holding the given resources.
    pub async fn share_with(
        &self,
        requester: &RequestContext,
        group: &str,
        items: &[(ShareItemType, Uuid)],
    ) -> ShareId {
        let share = self
            .shares
            .create_share_object(requester, self.dataset.id, self.target_env.id, group, None)
            .await
            .unwrap();
        for (kind, uri) in items {
            self.shares
                .add_shared_item(requester, share.id, *kind, *uri)
                .await
                .unwrap();
        }
        share.id
    }

    /// Submit a draft share and approve it.
    pub async fn submit_and_approve(&self, requester: &RequestContext, share_id: ShareId) {
        self.shares
            .submit_share_object(requester, share_id)
            .await
            .unwrap();
        self.shares
            .approve_share_object(&self.approver(), share_id)
            .await
            .unwrap();
    }

    /// A draft share holding one table and one bucket item.
    pub async fn draft_share(&self) -> ShareId {
        let share = self
            .shares
            .create_share_object(
                &self.requester(),
                self.dataset.id,
                self.target_env.id,
                REQUESTER_GROUP,
                Some("quarterly reporting".to_string()),
            )
            .await
            .unwrap();
        self.shares
            .add_shared_item(
                &self.requester(),
                share.id,
                ShareItemType::Table,
                self.table.id.into_uuid(),
            )
            .await
            .unwrap();
        self.shares
            .add_shared_item(
                &self.requester(),
                share.id,
                ShareItemType::Bucket,
                self.bucket.id.into_uuid(),
            )
            .await
            .unwrap();
        share.id
    }

    /// A submitted and approved share, waiting for its grant run.
    pub async fn approved_share(&self) -> ShareId {
        let share_id = self.draft_share().await;
        self.shares
            .submit_share_object(&self.requester(), share_id)
            .await
            .unwrap();
        self.shares
            .approve_share_object(&self.approver(), share_id)
            .await
            .unwrap();
        share_id
    }

    /// An approved share whose grant run has completed.
    pub async fn granted_share(&self) -> ShareId {
        let share_id = self.approved_share().await;
        assert!(self.dispatcher.approve_share(share_id).await.unwrap());
        share_id
    }

    pub async fn item(&self, share_id: ShareId, kind: ShareItemType) -> ShareItem {
        self.store
            .share_items(share_id)
            .await
            .into_iter()
            .find(|i| i.item_type == kind)
            .unwrap()
    }

    /// Give the dataset admin group ownership permissions on the dataset.
    pub async fn grant_dataset_owner(&self) {
        let mut session = self.store.begin().await.unwrap();
        ResourcePolicyStore::new()
            .attach_resource_policy(
                session.as_mut(),
                ADMIN_GROUP,
                self.dataset.id.into_uuid(),
                ResourceType::Dataset,
                DATASET_OWNER,
            )
            .await
            .unwrap();
        session.commit().await.unwrap();
    }

    /// Replace the stored copy of an environment.
    pub async fn update_environment(&self, environment: Environment) {
        self.store.insert_environment(environment).await;
    }

    /// Database holding the share's resource links in the target account.
    pub fn shared_database(&self, share_id: ShareId) -> String {
        format!(
            "{}{}{}",
            self.dataset.glue_database_name,
            self.config.shared_database_suffix,
            share_id.as_uuid().simple()
        )
    }
}

fn environment(label: &str, account: &str) -> Environment {
    Environment {
        id: EnvironmentId::new(),
        label: label.to_string(),
        aws_account_id: account.to_string(),
        region: "eu-west-1".to_string(),
        sharing_enabled: true,
        subscriptions_enabled: true,
        subscriptions_producers_topic_name: Some(TOPIC.to_string()),
    }
}
