//! # Wallets
//!
//! A wallet is a file holding a 64-character hex Ed25519 seed. Named
//! wallets live at `<wallet_dir>/<name>.key`; any argument that names a
//! signer may also be a direct path to such a file.
//!
//! Arguments that only need a principal's address accept either a hex
//! address or a wallet name.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use escrow_core::{Address, Keypair};

use crate::config::CliConfig;

/// Arguments for `escrow keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Wallet name, stored as `<wallet_dir>/<name>.key`.
    pub name: String,

    /// Overwrite an existing wallet.
    #[arg(long)]
    pub force: bool,
}

/// Execute `escrow keygen`.
pub fn run_keygen(args: &KeygenArgs, config: &CliConfig) -> Result<u8> {
    let path = wallet_path(&config.wallet_dir, &args.name)?;
    if path.exists() && !args.force {
        bail!("wallet already exists: {} (use --force to overwrite)", path.display());
    }
    let keypair = Keypair::generate();
    save_keypair(&path, &keypair)?;
    tracing::info!(wallet = %path.display(), address = %keypair.address(), "wallet created");
    println!("{}", keypair.address());
    Ok(0)
}

/// Path of the named wallet, rejecting names that would escape the
/// wallet directory.
pub fn wallet_path(wallet_dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        bail!("wallet name must not be empty");
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') || name.starts_with('.') {
        bail!("wallet name contains invalid path characters: {name:?}");
    }
    Ok(wallet_dir.join(format!("{name}.key")))
}

/// Write `keypair`'s seed to `path`, creating parent directories.
pub fn save_keypair(path: &Path, keypair: &Keypair) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create wallet directory: {}", parent.display()))?;
    }
    std::fs::write(path, format!("{}\n", keypair.to_seed_hex()))
        .with_context(|| format!("failed to write wallet: {}", path.display()))
}

/// Load a signer from a wallet file path or a wallet name.
pub fn load_keypair(wallet: &str, wallet_dir: &Path) -> Result<Keypair> {
    let direct = Path::new(wallet);
    let path = if direct.is_file() {
        direct.to_path_buf()
    } else {
        wallet_path(wallet_dir, wallet)?
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read wallet: {}", path.display()))?;
    Keypair::from_seed_hex(&content)
        .with_context(|| format!("malformed wallet file: {}", path.display()))
}

/// Resolve a hex address or, failing that, a wallet's address.
pub fn resolve_address(value: &str, wallet_dir: &Path) -> Result<Address> {
    if let Ok(address) = Address::from_hex(value) {
        return Ok(address);
    }
    load_keypair(value, wallet_dir)
        .map(|kp| kp.address())
        .with_context(|| format!("{value:?} is neither an address nor a wallet"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let kp = Keypair::from_seed(&[4; 32]);
        save_keypair(&wallet_path(dir.path(), "alice").unwrap(), &kp).unwrap();
        let loaded = load_keypair("alice", dir.path()).unwrap();
        assert_eq!(loaded.address(), kp.address());
    }

    #[test]
    fn load_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.key");
        let kp = Keypair::from_seed(&[5; 32]);
        save_keypair(&path, &kp).unwrap();
        let loaded = load_keypair(path.to_str().unwrap(), Path::new("/nonexistent")).unwrap();
        assert_eq!(loaded.address(), kp.address());
    }

    #[test]
    fn resolve_hex_or_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let kp = Keypair::from_seed(&[6; 32]);
        save_keypair(&wallet_path(dir.path(), "bob").unwrap(), &kp).unwrap();
        assert_eq!(resolve_address("bob", dir.path()).unwrap(), kp.address());
        let hex = kp.address().to_hex();
        assert_eq!(resolve_address(&hex, dir.path()).unwrap(), kp.address());
        assert!(resolve_address("carol", dir.path()).is_err());
    }

    #[test]
    fn rejects_traversal_names() {
        let dir = Path::new("/wallets");
        assert!(wallet_path(dir, "../etc").is_err());
        assert!(wallet_path(dir, "a/b").is_err());
        assert!(wallet_path(dir, "").is_err());
        assert_eq!(
            wallet_path(dir, "arbiter").unwrap(),
            PathBuf::from("/wallets/arbiter.key")
        );
    }

    #[test]
    fn keygen_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            wallet_dir: dir.path().to_path_buf(),
            ..CliConfig::default()
        };
        let args = KeygenArgs {
            name: "alice".to_string(),
            force: false,
        };
        assert_eq!(run_keygen(&args, &config).unwrap(), 0);
        assert!(run_keygen(&args, &config).is_err());
        let forced = KeygenArgs {
            name: "alice".to_string(),
            force: true,
        };
        assert_eq!(run_keygen(&forced, &config).unwrap(), 0);
    }

    #[test]
    fn malformed_wallet_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.key"), "not hex").unwrap();
        assert!(load_keypair("bad", dir.path()).is_err());
    }
}
