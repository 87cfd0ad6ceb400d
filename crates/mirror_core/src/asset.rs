use std::collections::BTreeSet;

use url::Url;

/// Extensions fetched with the direct strategy first.
pub const DEFAULT_STATIC_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // stylesheets and scripts
    "css", "js", "mjs", "map", "json",
    // documents
    "pdf", "txt", "xml", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // archives
    "zip", "gz", "tar", "rar", "7z",
    // media
    "mp4", "webm", "mp3", "ogg", "wav", "mov",
];

/// Request profile of a target, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Document,
    Stylesheet,
    Script,
    Image,
    /// Fonts, documents, archives, media: no type-specific headers.
    Other,
}

impl AssetKind {
    pub fn of(url: &Url) -> Self {
        match extension_of(url).as_deref() {
            None | Some("html" | "htm" | "xhtml" | "php" | "aspx" | "jsp") => AssetKind::Document,
            Some("css") => AssetKind::Stylesheet,
            Some("js" | "mjs") => AssetKind::Script,
            Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" | "ico" | "bmp") => {
                AssetKind::Image
            }
            Some(_) => AssetKind::Other,
        }
    }
}

/// Lower-cased extension of the last path segment, if any.
pub fn extension_of(url: &Url) -> Option<String> {
    let last = url.path_segments()?.last()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// The set of extensions treated as static assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAssetSet {
    extensions: BTreeSet<String>,
}

impl StaticAssetSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_static(&self, url: &Url) -> bool {
        extension_of(url).is_some_and(|ext| self.extensions.contains(&ext))
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for StaticAssetSet {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_EXTENSIONS)
    }
}
