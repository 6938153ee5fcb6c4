//! Tokenizer configuration
//!
//! A JSON document tagged by `backend` selects and parameterizes one of the
//! file-backed tokenizers:
//!
//! ```json
//! { "backend": "huggingface", "path": "tokenizer.json", "eos_token": "</s>", "bos_token": "<s>" }
//! { "backend": "sentencepiece", "path": "tokenizer.model", "eos_token_id": 2 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::tokenizer::{HfTokenizer, SentencePieceTokenizer, TokenId, Tokenizer, TokenizerAdapter};
use crate::{Error, Result};

pub type DynTokenizer = Box<dyn Tokenizer + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", deny_unknown_fields)]
pub enum TokenizerConfig {
    #[serde(rename = "huggingface")]
    HuggingFace {
        path: PathBuf,
        eos_token: String,
        #[serde(default)]
        bos_token: Option<String>,
        #[serde(default)]
        add_special_tokens: bool,
    },
    #[serde(rename = "sentencepiece")]
    SentencePiece {
        path: PathBuf,
        #[serde(default)]
        eos_token_id: Option<TokenId>,
    },
}

impl TokenizerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        // Tokenizer paths are relative to the config file
        if let Some(dir) = path.parent() {
            let tokenizer_path = config.path_mut();
            if tokenizer_path.is_relative() {
                let joined = dir.join(&*tokenizer_path);
                *tokenizer_path = joined;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.path().as_os_str().is_empty() {
            return Err(Error::InvalidConfig("path must not be empty".into()));
        }
        if let TokenizerConfig::HuggingFace { eos_token, .. } = self {
            if eos_token.is_empty() {
                return Err(Error::InvalidConfig("eos_token must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        match self {
            TokenizerConfig::HuggingFace { path, .. } | TokenizerConfig::SentencePiece { path, .. } => path,
        }
    }

    fn path_mut(&mut self) -> &mut PathBuf {
        match self {
            TokenizerConfig::HuggingFace { path, .. } | TokenizerConfig::SentencePiece { path, .. } => path,
        }
    }

    /// Load the configured backend
    pub fn build(&self) -> Result<DynTokenizer> {
        self.validate()?;
        info!("Building {} tokenizer", self.backend_name());
        let tokenizer: DynTokenizer = match self {
            TokenizerConfig::HuggingFace {
                path,
                eos_token,
                bos_token,
                add_special_tokens,
            } => Box::new(
                HfTokenizer::from_file(path, eos_token, bos_token.as_deref())?
                    .with_special_tokens(*add_special_tokens),
            ),
            TokenizerConfig::SentencePiece { path, eos_token_id } => {
                Box::new(SentencePieceTokenizer::load_from_file(path, *eos_token_id)?)
            }
        };
        Ok(tokenizer)
    }

    pub fn build_adapter(&self) -> Result<TokenizerAdapter<DynTokenizer>> {
        TokenizerAdapter::new(self.build()?)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            TokenizerConfig::HuggingFace { .. } => "huggingface",
            TokenizerConfig::SentencePiece { .. } => "sentencepiece",
        }
    }
}
