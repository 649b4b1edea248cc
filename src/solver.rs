use crate::{
    config::{
        ConfigError,
        ConfigResolver,
        ResolvedConfig,
    },
    context::Context,
    dns::{
        Connector,
        ProviderError,
        RecordApi,
    },
    reconcile::{
        Presence,
        ReconcileError,
        RecordReconciler,
        Removal,
    },
    resources::{
        ChallengeAction,
        ChallengeRequest,
        ChallengeResponse,
        ChallengeReview,
    },
    secrets::{
        KubeSecretStore,
        SecretStore,
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Name under which issuers reference this solver (`webhook.solverName`).
pub const SOLVER_NAME: &str = "infoblox";

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to set up infoblox client: {0}")]
    Connect(#[source] ProviderError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("unable to create kubernetes client: {0}")]
    Kube(#[from] kube::Error),
}

/// The Infoblox DNS-01 solver. Cheap to clone, all clones share the same clients.
#[derive(Clone)]
pub struct Solver {
    ctx: Arc<Context>,
}

impl Solver {
    pub fn new(secrets: impl SecretStore + 'static, connector: impl Connector + 'static) -> Self {
        Self {
            ctx: Arc::new(Context {
                secrets: Box::new(secrets),
                connector: Box::new(connector),
            }),
        }
    }

    /// Sets up the Kubernetes client used to resolve credential secrets. Must run before the first challenge.
    pub fn initialize(config: kube::Config, connector: impl Connector + 'static) -> Result<Self, SolverError> {
        let client = kube::Client::try_from(config)?;
        info!("Initialized kubernetes client for secret lookups");
        Ok(Self::new(KubeSecretStore::new(client), connector))
    }

    pub fn name(&self) -> &'static str {
        SOLVER_NAME
    }

    /// Presents the challenge record. Safe to call repeatedly with the same request.
    #[instrument(level = "debug", skip_all, fields(uid = %request.uid, fqdn = %request.resolved_fqdn))]
    pub async fn present(&self, request: &ChallengeRequest) -> Result<Presence, SolverError> {
        let resolved = self.resolve(request).await?;
        let api = self.connect(&resolved)?;

        Ok(RecordReconciler::new(api.as_ref(), &resolved.config.view)
            .present(&request.resolved_fqdn, &request.key)
            .await?)
    }

    /// Removes the challenge record with this request's key. Records for other keys on the same name survive.
    #[instrument(level = "debug", skip_all, fields(uid = %request.uid, fqdn = %request.resolved_fqdn))]
    pub async fn cleanup(&self, request: &ChallengeRequest) -> Result<Removal, SolverError> {
        let resolved = self.resolve(request).await?;
        let api = self.connect(&resolved)?;

        Ok(RecordReconciler::new(api.as_ref(), &resolved.config.view)
            .cleanup(&request.resolved_fqdn, &request.key)
            .await?)
    }

    /// Runs the request of a `ChallengeReview` and fills in its response.
    pub async fn review(&self, mut review: ChallengeReview) -> ChallengeReview {
        let response = match &review.request {
            Some(request) => self.run(request).await,
            None => ChallengeResponse::failure("", "ChallengeReview has no request"),
        };
        review.response = Some(response);
        review
    }

    async fn run(&self, request: &ChallengeRequest) -> ChallengeResponse {
        let result = match request.action {
            ChallengeAction::Present => self.present(request).await.map(|_| ()),
            ChallengeAction::CleanUp => self.cleanup(request).await.map(|_| ()),
            ChallengeAction::Unknown => {
                warn!(uid = %request.uid, "Unsupported challenge action");
                return ChallengeResponse::failure(&request.uid, "unsupported challenge action");
            }
        };

        match result {
            Ok(()) => ChallengeResponse::success(&request.uid),
            Err(err) => {
                error!(uid = %request.uid, %err, "Challenge failed");
                ChallengeResponse::failure(&request.uid, err)
            }
        }
    }

    async fn resolve(&self, request: &ChallengeRequest) -> Result<ResolvedConfig, ConfigError> {
        ConfigResolver::new(self.ctx.secrets.as_ref())
            .resolve(request.raw_config(), &request.resource_namespace)
            .await
    }

    fn connect(&self, resolved: &ResolvedConfig) -> Result<Box<dyn RecordApi>, SolverError> {
        self.ctx
            .connector
            .connect(&resolved.connection_params())
            .map_err(SolverError::Connect)
    }
}
