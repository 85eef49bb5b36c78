//! One place that owns the configured clients
//!
//! Built once from a `ClientConfig` and shared by reference; nothing here is
//! global.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::AgentSession;
use crate::assignments::AssignmentManagerClient;
use crate::chain::{Contract, EthTransport, JsonRpcTransport, LocalSigner, PendingTransaction};
use crate::config::{ClientConfig, StorageBackend};
use crate::error::{ClientError, Result};
use crate::mentora::MentoraClient;
use crate::models::{CourseManifest, Difficulty, NewCourse};
use crate::review::AssignmentReviewer;
use crate::storage::{
    ContentId, ContentStore, FileUpload, GatewayStore, IpfsNodeStore, ProgressFn, StorageClient,
};

/// Step of `publish_course` currently uploading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStage {
    Thumbnail,
    IntroVideo,
    ModuleVideo { module: usize },
    Material { module: usize, index: usize },
    Manifest,
    Transaction,
}

/// Called with the current stage and the bytes sent for it so far
pub type PublishProgress = Arc<dyn Fn(&PublishStage, u64) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ModuleDraft {
    pub title: String,
    pub video: FileUpload,
    pub materials: Vec<FileUpload>,
}

/// Everything needed to publish a new course
#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Minutes
    pub duration: u64,
    /// Ether, e.g. "0.05"
    pub price: String,
    pub thumbnail: FileUpload,
    pub intro_video: FileUpload,
    pub modules: Vec<ModuleDraft>,
}

#[derive(Debug)]
pub struct PublishedCourse {
    pub thumbnail: ContentId,
    pub manifest: CourseManifest,
    pub content: ContentId,
    pub transaction: PendingTransaction,
}

pub struct MentoraContext {
    config: ClientConfig,
    transport: Arc<dyn EthTransport>,
    mentora: Option<Arc<MentoraClient>>,
    assignments: Option<Arc<AssignmentManagerClient>>,
    storage: Arc<StorageClient>,
    reviewer: Arc<AssignmentReviewer>,
}

impl MentoraContext {
    /// Build every client from `config`.
    ///
    /// JSON-RPC calls are bounded by `http_timeout_secs` end to end. Storage
    /// transfers only bound the connect, so large uploads are not cut off.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let limit = Duration::from_secs(config.http_timeout_secs);
        let rpc_http = reqwest::Client::builder()
            .timeout(limit)
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client: {e}")))?;
        let storage_http = reqwest::Client::builder()
            .connect_timeout(limit)
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client: {e}")))?;

        let transport: Arc<dyn EthTransport> = Arc::new(JsonRpcTransport::with_client(
            &config.network.rpc_url,
            rpc_http,
        ));
        let store: Arc<dyn ContentStore> = match config.storage.backend {
            StorageBackend::Gateway => Arc::new(GatewayStore::with_client(
                &config.storage.api_base,
                storage_http,
            )),
            StorageBackend::IpfsNode => Arc::new(IpfsNodeStore::with_client(
                &config.storage.api_base,
                storage_http,
            )),
        };
        Self::with_backends(config, transport, store)
    }

    /// Build the clients over caller-supplied chain and storage backends
    pub fn with_backends(
        config: ClientConfig,
        transport: Arc<dyn EthTransport>,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self> {
        let signer = config
            .private_key
            .as_deref()
            .map(|key| LocalSigner::from_hex(key, config.network.chain_id))
            .transpose()?
            .map(Arc::new);
        if let (Some(signer), Some(account)) = (&signer, config.default_account) {
            if signer.address() != account {
                warn!(
                    configured = %account,
                    key = %signer.address(),
                    "default_account does not match the private key; using the key's address"
                );
            }
        }

        let contract = |address| {
            let contract = Contract::new(transport.clone(), address).with_polling(config.transactions);
            contract.set_default_account(config.default_account);
            match &signer {
                Some(signer) => contract.with_signer(signer.clone()),
                None => contract,
            }
        };

        let mentora = config
            .contracts
            .mentora
            .map(|a| Arc::new(MentoraClient::from_contract(contract(a))));
        let assignments = config
            .contracts
            .assignment_manager
            .map(|a| Arc::new(AssignmentManagerClient::from_contract(contract(a))));

        let storage = Arc::new(StorageClient::with_gateways(
            store,
            &config.storage.public_gateway,
            &config.storage.alternate_gateway,
        ));
        let reviewer = Arc::new(AssignmentReviewer::new(config.reviewer.clone())?);

        info!(
            network = %config.network.name,
            chain_id = config.network.chain_id,
            local_signer = signer.is_some(),
            mentora = mentora.is_some(),
            assignments = assignments.is_some(),
            "Mentora context ready"
        );

        Ok(Self {
            config,
            transport,
            mentora,
            assignments,
            storage,
            reviewer,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn EthTransport> {
        self.transport.clone()
    }

    pub fn mentora(&self) -> Result<Arc<MentoraClient>> {
        self.mentora.clone().ok_or_else(|| {
            ClientError::Configuration("Mentora contract address is not configured".into())
        })
    }

    pub fn assignments(&self) -> Result<Arc<AssignmentManagerClient>> {
        self.assignments.clone().ok_or_else(|| {
            ClientError::Configuration("Assignment manager address is not configured".into())
        })
    }

    pub fn storage(&self) -> Arc<StorageClient> {
        self.storage.clone()
    }

    pub fn reviewer(&self) -> Arc<AssignmentReviewer> {
        self.reviewer.clone()
    }

    /// Open a session with the configured review agent
    pub async fn connect_agent(&self) -> Result<AgentSession> {
        let url = self.config.agent.url.as_deref().ok_or_else(|| {
            ClientError::Configuration("Review agent URL is not configured".into())
        })?;
        AgentSession::connect(url).await
    }

    /// Upload a course's media and manifest, then create it on-chain.
    ///
    /// Order: thumbnail, intro video, each module's video followed by its
    /// materials, manifest, `createCourse`. The first failure aborts; uploads
    /// that already succeeded are not undone.
    pub async fn publish_course(
        &self,
        draft: &CourseDraft,
        progress: Option<PublishProgress>,
    ) -> Result<PublishedCourse> {
        let mentora = self.mentora()?;
        validate_draft(draft)?;

        let report = |stage: PublishStage| -> Option<ProgressFn> {
            progress.clone().map(|cb| -> ProgressFn {
                Arc::new(move |bytes: u64| cb(&stage, bytes))
            })
        };

        let thumbnail = self
            .storage
            .upload_image(&draft.thumbnail, report(PublishStage::Thumbnail))
            .await?;
        let intro = self
            .storage
            .upload_video(&draft.intro_video, report(PublishStage::IntroVideo))
            .await?;

        let mut manifest = CourseManifest {
            intro_video_ipfs_hash: intro.into_string(),
            module_ipfs_hashes: Vec::with_capacity(draft.modules.len()),
            module_titles: Vec::with_capacity(draft.modules.len()),
            material_ipfs_hashes: BTreeMap::new(),
            material_count: 0,
        };

        for (module, draft_module) in draft.modules.iter().enumerate() {
            let video = self
                .storage
                .upload_video(&draft_module.video, report(PublishStage::ModuleVideo { module }))
                .await?;
            manifest.module_ipfs_hashes.push(video.into_string());
            manifest.module_titles.push(draft_module.title.clone());

            let mut materials = Vec::with_capacity(draft_module.materials.len());
            for (index, material) in draft_module.materials.iter().enumerate() {
                let id = self
                    .storage
                    .upload_file(material, report(PublishStage::Material { module, index }))
                    .await?;
                materials.push(id.into_string());
            }
            manifest.material_count += materials.len();
            manifest
                .material_ipfs_hashes
                .insert(module.to_string(), materials);
        }

        if let Some(cb) = &progress {
            cb(&PublishStage::Manifest, 0);
        }
        let content = self.storage.upload_json(&manifest).await?;

        if let Some(cb) = &progress {
            cb(&PublishStage::Transaction, 0);
        }
        let transaction = mentora
            .create_course(&NewCourse {
                title: draft.title.clone(),
                description: draft.description.clone(),
                category: draft.category.clone(),
                thumbnail_ipfs_hash: thumbnail.to_string(),
                content_ipfs_hash: content.to_string(),
                difficulty: draft.difficulty,
                duration: draft.duration,
                price: draft.price.clone(),
                module_count: draft.modules.len() as u64,
            })
            .await?;

        info!(
            title = %draft.title,
            content = %content,
            tx = %transaction.hash(),
            "Course published"
        );

        Ok(PublishedCourse {
            thumbnail,
            manifest,
            content,
            transaction,
        })
    }
}

/// Required fields, and a price that parses, before anything is uploaded
fn validate_draft(draft: &CourseDraft) -> Result<()> {
    let missing = [
        ("title", &draft.title),
        ("description", &draft.description),
        ("price", &draft.price),
        ("category", &draft.category),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(ClientError::Validation(format!(
            "Please fill in all required fields: {}",
            missing.join(", ")
        )));
    }
    crate::chain::units::parse_ether(&draft.price)?;
    Ok(())
}
