use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::urls::Urls;

pub type SafeDb = Arc<dyn Db + Send + Sync>;

/// The injected capabilities every handler works against: the logger,
/// the store and the URL scheme.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: SafeDb,
    pub urls: Arc<Urls>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: SafeDb, urls: Arc<Urls>) -> Self {
        Self { logger, db, urls }
    }
}
