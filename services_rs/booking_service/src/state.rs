use crate::catalog::CatalogClient;
use crate::gateway::GatewayClient;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub db_schema: Option<String>,
    pub env_name: String,
    pub default_currency: String,
    pub upload_dir: String,
    pub require_admin_secret: bool,
    pub admin_secret: Option<String>,
    pub gateway: Option<GatewayClient>,
    pub catalog: CatalogClient,
}

impl AppState {
    pub fn table(&self, name: &str) -> String {
        match &self.db_schema {
            Some(s) => format!("{s}.{name}"),
            None => name.to_string(),
        }
    }
}
