use std::sync::Arc;

use crate::backend::Backend;
use crate::catalog::CategoryCatalog;
use crate::config::Config;
use crate::session::SessionContext;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    pub session: SessionContext,
    pub catalog: Arc<CategoryCatalog>,
}
