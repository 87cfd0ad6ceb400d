use std::sync::Arc;

use mirror_core::{SessionState, StaticAssetSet};
use mirror_logging::mirror_debug;
use url::Url;

use crate::{Retrieval, Retriever};

/// Direct fetch first for static assets, browser rendering for everything else
/// and as the fallback.
pub struct TieredRetriever {
    statics: StaticAssetSet,
    direct: Arc<dyn Retriever>,
    rendered: Arc<dyn Retriever>,
}

impl TieredRetriever {
    pub fn new(
        statics: StaticAssetSet,
        direct: Arc<dyn Retriever>,
        rendered: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            statics,
            direct,
            rendered,
        }
    }
}

#[async_trait::async_trait]
impl Retriever for TieredRetriever {
    async fn retrieve(&self, url: &Url, session: &SessionState) -> Retrieval {
        if self.statics.is_static(url) {
            match self.direct.retrieve(url, session).await {
                success @ Retrieval::Success(_) => return success,
                other => {
                    mirror_debug!("Direct fetch of {} gave {}; rendering", url, label(&other))
                }
            }
        }
        self.rendered.retrieve(url, session).await
    }
}

fn label(retrieval: &Retrieval) -> String {
    match retrieval {
        Retrieval::Success(_) => "success".to_string(),
        Retrieval::NotFound => "not found".to_string(),
        Retrieval::Failure(key) => key.to_string(),
    }
}
