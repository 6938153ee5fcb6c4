use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use log::error;
use tokenizer_adapter::config::DynTokenizer;
use tokenizer_adapter::{Error, Result, TokenId, TokenizerAdapter, TokenizerConfig};

const DEFAULT_EOS_TOKEN: &str = "</s>";

/// Print the mid-stream token ids of text using a Hugging Face or
/// SentencePiece tokenizer
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON tokenizer configuration
    #[arg(long, conflicts_with_all = ["tokenizer_json", "sentencepiece"])]
    config: Option<PathBuf>,

    /// Hugging Face tokenizer.json file
    #[arg(long, conflicts_with = "sentencepiece")]
    tokenizer_json: Option<PathBuf>,

    /// SentencePiece model file
    #[arg(long)]
    sentencepiece: Option<PathBuf>,

    /// End-of-sequence token, `</s>` when omitted
    #[arg(long, requires = "tokenizer_json")]
    eos_token: Option<String>,

    /// Beginning-of-sequence token
    #[arg(long, requires = "tokenizer_json")]
    bos_token: Option<String>,

    /// Print adapter details before encoding
    #[arg(long)]
    info: bool,

    /// Print each result as a JSON array
    #[arg(long)]
    json: bool,

    /// Texts to encode; stdin lines are used when empty
    text: Vec<String>,
}

impl Cli {
    fn tokenizer_config(&self) -> Result<TokenizerConfig> {
        if let Some(path) = &self.config {
            return TokenizerConfig::from_file(path);
        }
        if let Some(path) = &self.tokenizer_json {
            return Ok(TokenizerConfig::HuggingFace {
                path: path.clone(),
                eos_token: self.eos_token.clone().unwrap_or_else(|| DEFAULT_EOS_TOKEN.to_string()),
                bos_token: self.bos_token.clone(),
                add_special_tokens: false,
            });
        }
        if let Some(path) = &self.sentencepiece {
            return Ok(TokenizerConfig::SentencePiece {
                path: path.clone(),
                eos_token_id: None,
            });
        }
        Err(Error::InvalidConfig(
            "one of --config, --tokenizer-json or --sentencepiece is required".into(),
        ))
    }
}

fn format_ids(ids: &[TokenId], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(ids)?);
    }
    Ok(ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" "))
}

fn print_info(adapter: &TokenizerAdapter<DynTokenizer>, out: &mut impl Write) -> Result<()> {
    writeln!(out, "input: {}", adapter.input_kind())?;
    writeln!(out, "prefix_tokens: {:?}", adapter.prefix_tokens())?;
    writeln!(out, "vocab_size: {}", adapter.vocab_size())?;
    writeln!(out, "eos_token_id: {}", adapter.eos_token_id())?;
    match adapter.bos_token_id() {
        Some(id) => writeln!(out, "bos_token_id: {}", id)?,
        None => writeln!(out, "bos_token_id: none")?,
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let adapter = cli.tokenizer_config()?.build_adapter()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.info {
        print_info(&adapter, &mut out)?;
    }

    if cli.text.is_empty() {
        for line in io::stdin().lock().lines() {
            let ids = adapter.encode(&line?)?;
            writeln!(out, "{}", format_ids(&ids, cli.json)?)?;
        }
    } else {
        for text in &cli.text {
            let ids = adapter.encode(text)?;
            writeln!(out, "{}", format_ids(&ids, cli.json)?)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
