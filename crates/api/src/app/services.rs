//! Storage wiring: in-memory stores for dev/test, Postgres when configured.

use std::sync::Arc;

use warehouse_auth::TokenManager;
use warehouse_core::{Clock, SystemClock};
use warehouse_infra::{
    pg, schema, AccountService, AuditLedger, HistoryStore, InMemoryHistoryStore, InMemoryItemStore,
    InMemoryUserStore, InventoryService, ItemStore, PostgresHistoryStore, PostgresItemStore,
    PostgresUserStore, StoreError, UserStore,
};

use crate::config::ApiConfig;

pub struct AppServices {
    pub inventory: InventoryService,
    pub accounts: AccountService,
    pub tokens: Arc<TokenManager>,
    pub clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("inventory", &self.inventory)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    fn assemble(
        items: Arc<dyn ItemStore>,
        history: Arc<dyn HistoryStore>,
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = AuditLedger::new(history, clock.clone());
        Self {
            inventory: InventoryService::new(items, ledger),
            accounts: AccountService::new(users, tokens.clone(), clock.clone()),
            tokens,
            clock,
        }
    }

    /// Process-local stores; state is lost on restart.
    pub fn in_memory(tokens: Arc<TokenManager>, clock: Arc<dyn Clock>) -> Self {
        let history = Arc::new(InMemoryHistoryStore::new());
        let items = Arc::new(InMemoryItemStore::new(history.clone()));
        Self::assemble(items, history, Arc::new(InMemoryUserStore::new()), tokens, clock)
    }

    pub fn postgres(pool: pg::PgPool, tokens: Arc<TokenManager>, clock: Arc<dyn Clock>) -> Self {
        Self::assemble(
            Arc::new(PostgresItemStore::new(pool.clone())),
            Arc::new(PostgresHistoryStore::new(pool.clone())),
            Arc::new(PostgresUserStore::new(pool)),
            tokens,
            clock,
        )
    }
}

/// Build services from configuration. `DATABASE_URL` selects Postgres (and
/// bootstraps the schema); otherwise everything lives in memory.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StoreError> {
    let tokens = Arc::new(TokenManager::new(config.jwt_secret.as_bytes(), config.token_ttl));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match &config.database_url {
        Some(url) => {
            let pool = pg::connect(url, config.db_max_connections).await?;
            schema::migrate(&pool).await?;
            tracing::info!(max_connections = config.db_max_connections, "using postgres stores");
            Ok(AppServices::postgres(pool, tokens, clock))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory stores");
            Ok(AppServices::in_memory(tokens, clock))
        }
    }
}
