//! Dictionary descriptions and acquisition.
//!
//! A [`Dictionary`] names where an archive lives, which cache bucket holds
//! its extracted files, and optionally how to turn a node's feature fields
//! into a typed record. [`DictionaryAcquirer`] does the actual work of
//! getting the files onto local storage.

mod acquire;
mod files;
mod unidic;

pub use acquire::{DictionaryAcquirer, DictionarySource, Origin, ProgressEvent};
pub use files::{DICRC, DictionaryFile, DictionaryFiles};
pub use unidic::{UnidicFeature26, UnidicFeature29};

use std::fmt;
use std::sync::Arc;

/// Maps a node's feature fields to a fixed-arity record.
///
/// Returns `None` when the fields do not fit, e.g. a field count mismatch.
pub type FeatureMapper<T> = Arc<dyn Fn(&[String]) -> Option<T> + Send + Sync>;

/// A dictionary archive and how to interpret its output
pub struct Dictionary<T = ()> {
    /// Archive location: an `http(s)://` URL or a local path
    pub url: String,
    /// Cache bucket holding the extracted files
    pub cache_name: String,
    pub mapper: Option<FeatureMapper<T>>,
}

impl<T> Dictionary<T> {
    pub fn new(url: impl Into<String>, cache_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_name: cache_name.into(),
            mapper: None,
        }
    }

    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&[String]) -> Option<T> + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Resolve a relative archive url against `base`.
    pub fn with_base_url(mut self, base: &str) -> Self {
        if !base.is_empty() && !crate::io::is_http_url(&self.url) {
            self.url = format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.url.trim_start_matches('/')
            );
        }
        self
    }
}

impl<T> Clone for Dictionary<T> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            cache_name: self.cache_name.clone(),
            mapper: self.mapper.clone(),
        }
    }
}

impl<T> fmt::Debug for Dictionary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dictionary")
            .field("url", &self.url)
            .field("cache_name", &self.cache_name)
            .field("mapper", &self.mapper.is_some())
            .finish()
    }
}

/// IPAdic 2.7.0, no feature mapper
pub fn ipadic() -> Dictionary {
    Dictionary::new("/ipadic-2.7.0_bin.zip", "ipadic-2.7.0_bin")
}

/// JUMAN dictionary 7.0, no feature mapper
pub fn jumandic() -> Dictionary {
    Dictionary::new("/jumandic-7.0_bin.zip", "jumandic-7.0_bin")
}

/// UniDic 2.1.2 with its 26-field feature record
pub fn unidic2() -> Dictionary<UnidicFeature26> {
    Dictionary::new("/unidic-mecab-2.1.2_bin.zip", "unidic-2.1.2_bin")
        .with_mapper(UnidicFeature26::from_fields)
}

/// UniDic 3.1.0 with its 29-field feature record
pub fn unidic3() -> Dictionary<UnidicFeature29> {
    Dictionary::new("/unidic-3.1.0.zip", "unidic-3.1.0").with_mapper(UnidicFeature29::from_fields)
}
