use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::generator::{CodeGenerator, RandomCodeGenerator};
use crate::config::ShortLinkConfig;
use crate::storage::{Storage, StorageError};

#[derive(Debug, Error)]
pub enum ShortLinkError {
    #[error("short link '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Maps full URLs to short codes and back.
///
/// Every call goes to storage; nothing about issued codes is kept in memory.
pub struct ShortLinkService {
    storage: Arc<dyn Storage>,
    generator: Arc<dyn CodeGenerator>,
    config: ShortLinkConfig,
}

impl ShortLinkService {
    pub fn new(storage: Arc<dyn Storage>, config: ShortLinkConfig) -> Self {
        let generator = Arc::new(RandomCodeGenerator::new(config.code_length));
        Self::with_generator(storage, config, generator)
    }

    pub fn with_generator(
        storage: Arc<dyn Storage>,
        config: ShortLinkConfig,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            storage,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &ShortLinkConfig {
        &self.config
    }

    /// Return the code already mapped to `full_url`, or mint and store a new one.
    ///
    /// Candidates are drawn until one is free, with no retry limit.
    pub async fn get_or_create_short_code(&self, full_url: &str) -> anyhow::Result<String> {
        if let Some(link) = self.storage.find_short_link_by_url(full_url).await? {
            return Ok(link.code);
        }

        loop {
            let code = self.generator.generate();

            if self.storage.short_code_exists(&code).await? {
                warn!(code = %code, "short code collision, drawing again");
                continue;
            }

            match self.storage.create_short_link(&code, full_url).await {
                Ok(link) => {
                    debug!(code = %link.code, full_url = %link.full_url, "created short link");
                    return Ok(link.code);
                }
                // Either the code was taken after the existence check, or a
                // concurrent request already shortened this URL.
                Err(StorageError::Conflict) => {
                    if let Some(link) = self.storage.find_short_link_by_url(full_url).await? {
                        return Ok(link.code);
                    }
                    warn!(code = %code, "short code taken during insert, drawing again");
                }
                Err(StorageError::Other(err)) => return Err(err),
            }
        }
    }

    /// Look up the full URL behind a code.
    pub async fn resolve(&self, code: &str) -> Result<String, ShortLinkError> {
        match self.storage.find_short_link(code).await? {
            Some(link) => Ok(link.full_url),
            None => Err(ShortLinkError::NotFound(code.to_string())),
        }
    }

    /// Absolute short URL for `full_url`, creating the mapping on first use.
    pub async fn shorten(&self, full_url: &str) -> anyhow::Result<String> {
        let code = self.get_or_create_short_code(full_url).await?;
        Ok(self.config.short_url(&code))
    }
}
