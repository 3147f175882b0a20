//! Minimal CLI: infer → schema view
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConflictPolicy};
use crate::ident::Dialect;
use crate::inference::{Inference, InferredSchema};
use crate::view::{self, ViewOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer one schema from sample JSON documents and print it as a JSON-schema-ish view
#[derive(Parser, Debug)]
#[command(name = "json-shape")]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); without it RUST_LOG decides, default warn
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and print the schema view
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths, quoted glob patterns, or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct InferenceSettings {
    /// JSON config file; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// name of the top-level object
    #[arg(long)]
    root_name: Option<String>,

    /// dotted member path to treat as a key/value map (repeatable, '\.' for a literal dot)
    #[arg(long = "kv-path")]
    kv_paths: Vec<String>,

    /// emit borrowed string views instead of owned strings
    #[arg(long)]
    use_view: bool,

    /// fail on conflicting observations instead of keeping the first
    #[arg(long)]
    strict: bool,

    /// keyword table used when sanitizing names
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    inference_settings: InferenceSettings,

    /// leave out members only ever seen as null
    #[arg(long)]
    hide_null_only: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Read every input in order and fold it into `state`.
    fn load_process<T>(&self, state: T, mut apply: impl FnMut(T, &str, &str) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let sources = resolve_file_path_patterns(&self.input)?;
        let mut state = state;
        for source in sources {
            let text = match &source {
                Source::Stdin => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("failed to read stdin")?;
                    text
                }
                Source::File(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read source file {}", path.display()))?,
            };
            let label = source.label();
            debug!(source = %label, bytes = text.len(), "loaded input");
            state = apply(state, &label, &text)?;
        }
        Ok(state)
    }
}

impl InferenceSettings {
    fn build_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(dialect) = self.dialect {
            config = config.with_dialect(dialect);
        }
        if let Some(root_name) = &self.root_name {
            config = config.with_root_name(root_name);
        }
        for kv_path in &self.kv_paths {
            config = config.with_kv_path(kv_path);
        }
        if self.use_view {
            config = config.with_use_view(true);
        }
        if self.strict {
            config = config.with_conflict_policy(ConflictPolicy::Strict);
        }
        Ok(config)
    }
}

impl SchemaOut {
    fn infer(&self) -> anyhow::Result<InferredSchema> {
        let config = self.inference_settings.build_config()?;
        debug!(?config, "resolved configuration");
        let run = self.input_settings.load_process(Inference::new(config), |run, label, text| {
            run.observe_str(text)
                .with_context(|| format!("failed to infer schema from {label}"))
        })?;
        let schema = run.finish();
        info!(
            documents = schema.documents,
            objects = schema.registry.len(),
            "inference finished"
        );
        Ok(schema)
    }

    fn render(&self) -> anyhow::Result<String> {
        let schema = self.infer()?;
        let options = ViewOptions { hide_null_only: self.hide_null_only };
        let view = view::render_with(&schema, options);
        serde_json::to_string_pretty(&view).context("failed to serialize schema view")
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    pub fn log_filter(&self, rust_log: Option<&str>) -> EnvFilter {
        EnvFilter::builder().parse_lossy(self.log_directives(rust_log))
    }

    /// `-v` flags win; otherwise `RUST_LOG` when set; otherwise `warn`.
    fn log_directives(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim) {
            Some(directives) if self.verbose == 0 && !directives.is_empty() => directives.to_string(),
            _ => self.log_level().as_str().to_ascii_lowercase(),
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let schema_src = target.render()?;
                match target.out.as_ref() {
                    Some(out) => write_output(out, &schema_src)?,
                    None => println!("{schema_src}"),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::Stdin => "<stdin>".to_string(),
            Source::File(path) => path.display().to_string(),
        }
    }
}

fn write_output(out: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<Source>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                let path = entry.with_context(|| format!("failed to expand glob pattern: {pattern}"))?;
                matched_any = true;
                out.push(Source::File(path));
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
