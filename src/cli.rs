use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dictionary::{self, Dictionary};
use crate::io::is_http_url;

/// Built-in dictionaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Ipadic,
    Jumandic,
    Unidic2,
    Unidic3,
}

impl Preset {
    /// Archive location and cache name of the preset, without its mapper
    pub fn dictionary(self) -> Dictionary {
        match self {
            Preset::Ipadic => dictionary::ipadic(),
            Preset::Jumandic => dictionary::jumandic(),
            Preset::Unidic2 => strip(dictionary::unidic2()),
            Preset::Unidic3 => strip(dictionary::unidic3()),
        }
    }
}

fn strip<T>(dict: Dictionary<T>) -> Dictionary {
    Dictionary::new(dict.url, dict.cache_name)
}

#[derive(Parser, Debug)]
#[command(name = "mecab-worker")]
#[command(version)]
#[command(about = "Fetch, cache and unpack MeCab dictionaries", long_about = None)]
#[command(after_help = "Examples:\n  \
  mecab-worker https://example.com/ipadic-2.7.0_bin.zip   fetch and cache a dictionary\n  \
  mecab-worker --preset unidic3 --base-url URL -d dict    unpack a preset into dict/\n  \
  mecab-worker -l ./jumandic-7.0_bin.zip                  list files of a local archive")]
pub struct Cli {
    /// Dictionary archive path or HTTP URL
    #[arg(value_name = "SOURCE", required_unless_present = "preset")]
    pub source: Option<String>,

    /// Use a built-in dictionary
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Base URL for relative preset locations
    #[arg(long, value_name = "URL", default_value = "")]
    pub base_url: String,

    /// Cache identifier (default: archive file stem or preset name)
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Cache directory
    #[arg(long, value_name = "DIR", default_value = ".mecab-cache")]
    pub cache_dir: PathBuf,

    /// Always fetch the archive and do not cache it
    #[arg(long)]
    pub no_cache: bool,

    /// Write the dictionary files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<PathBuf>,

    /// List acquired files
    #[arg(short = 'l')]
    pub list: bool,

    /// Verbose logging
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// HTTP connect and read timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The dictionary to acquire: an explicit source wins over a preset,
    /// and an explicit name wins over the derived one.
    pub fn dictionary(&self) -> Option<Dictionary> {
        let mut dict = match (&self.source, self.preset) {
            (Some(source), _) => Dictionary::new(source.clone(), derive_name(source)),
            (None, Some(preset)) => preset.dictionary().with_base_url(&self.base_url),
            (None, None) => return None,
        };
        if let Some(name) = &self.name {
            dict.cache_name = name.clone();
        }
        Some(dict)
    }

    pub fn is_http_source(&self) -> bool {
        self.dictionary().is_some_and(|d| is_http_url(&d.url))
    }
}

/// Cache name for an archive: its file stem, without query or fragment.
fn derive_name(source: &str) -> String {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(path.trim_end_matches('/'))
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dictionary".to_string())
}
