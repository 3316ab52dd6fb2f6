use std::{fmt, sync::Arc};

use shellac_core::AlbumRepository;

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<AlbumRepository>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(repository: Arc<AlbumRepository>, config: Arc<Config>) -> Self {
        Self { repository, config }
    }
}
