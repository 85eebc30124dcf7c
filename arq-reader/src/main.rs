//! Command line reader for Arq object stores: list commit chains and
//! walk snapshot trees.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use arq_datastore::hierarchy::{walk_tree, CommitChain};
use arq_datastore::{ObjectId, ObjectStore};
use arq_key_config::{KeyTriple, MasterKeys};

#[derive(Parser)]
#[command(name = "arq-reader", version, about = "Read-only access to Arq object stores")]
struct Cli {
    /// Computer directory of the store (holds packsets/, objects/,
    /// bucketdata/ and encryptionv3.dat)
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Bucket (backed-up folder) UUID
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// JSON file with the three master keys in hex
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    /// File holding the store passphrase
    #[arg(long, global = true)]
    passphrase_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the commit chain of a bucket, newest first
    Commits,
    /// Walk a commit's tree, printing every node pre-order
    Tree {
        /// Commit id; defaults to the bucket head
        #[arg(long)]
        commit: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let bucket = cli
        .bucket
        .clone()
        .context("--bucket is required")?;
    let mut store = open_store(&cli)?;

    match &cli.command {
        Command::Commits => list_commits(&mut store, &bucket),
        Command::Tree { commit } => show_tree(&mut store, &bucket, commit.as_deref()),
    }
}

fn open_store(cli: &Cli) -> Result<ObjectStore> {
    if let Some(key_file) = &cli.key_file {
        let json = fs::read_to_string(key_file)
            .with_context(|| format!("reading key file {}", key_file.display()))?;
        let triple: KeyTriple = serde_json::from_str(&json)
            .with_context(|| format!("parsing key file {}", key_file.display()))?;
        let keys = MasterKeys::from_key_triple(&triple)?;
        return Ok(ObjectStore::open(&cli.repo, keys));
    }

    let passphrase = match &cli.passphrase_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading passphrase file {}", path.display()))?
            .trim_end()
            .to_string(),
        None => match std::env::var("ARQ_PASSPHRASE") {
            Ok(passphrase) => passphrase,
            Err(_) => bail!("provide --key-file, --passphrase-file or ARQ_PASSPHRASE"),
        },
    };
    Ok(ObjectStore::open_with_passphrase(&cli.repo, &passphrase)?)
}

fn list_commits(store: &mut ObjectStore, bucket: &str) -> Result<()> {
    for item in CommitChain::from_head(store, bucket)? {
        let (id, commit) = item?;
        let date = commit
            .creation_date_millis
            .map(|millis| format!("{}.{:03}", millis / 1000, millis % 1000))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{id} date={date} complete={} failures={} path={} {}",
            commit.is_complete,
            commit.failures.len(),
            commit.folder_path,
            commit.comment,
        );
    }
    Ok(())
}

fn show_tree(store: &mut ObjectStore, bucket: &str, commit: Option<&str>) -> Result<()> {
    let commit_id = match commit {
        Some(hex) => ObjectId::from_hex(hex)?,
        None => store.head_commit_id(bucket)?,
    };
    let commit = store.commit(bucket, &commit_id)?;
    log::info!("walking tree {} of commit {commit_id}", commit.tree_sha1);

    let mut count = 0u64;
    walk_tree(
        store,
        bucket,
        &commit.tree_sha1,
        commit.tree_compression,
        &mut |item| {
            if item.node.is_tree {
                println!("{}/", item.path);
            } else {
                println!("{} ({} bytes)", item.path, item.node.data_size);
            }
            count += 1;
            Ok(())
        },
    )?;
    log::info!("visited {count} nodes");
    Ok(())
}
