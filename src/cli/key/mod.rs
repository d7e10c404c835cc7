//! Key command - prints the cache key for a call without touching any cache

use clap::Args;
use serde_json::Value;

use crate::domain::cache::{encode_args, DefaultKeyDeriver, HashedKeyDeriver, KeyDeriver};
use crate::domain::DomainError;

/// Arguments for the key command
#[derive(Args, Clone, Debug)]
pub struct KeyArgs {
    /// Owner of the operation, e.g. a service or type name
    pub owner: String,

    /// Operation name
    pub operation: String,

    /// Call arguments as JSON; an array is read as the argument list
    #[arg(default_value = "[]")]
    pub args: String,

    /// Print the SHA-256 form of the key
    #[arg(long)]
    pub hashed: bool,
}

/// Print the derived key to stdout
pub async fn run(args: KeyArgs) -> anyhow::Result<()> {
    let key = derive_key(&args)?;
    println!("{}", key);
    Ok(())
}

/// Derives the key exactly as a memoized operation would
pub fn derive_key(args: &KeyArgs) -> Result<String, DomainError> {
    let value: Value = serde_json::from_str(&args.args).map_err(|e| {
        DomainError::serialization(format!("Arguments are not valid JSON: {}", e))
    })?;
    let values = encode_args(&value)?;

    let key = if args.hashed {
        HashedKeyDeriver::new().derive(&args.owner, &args.operation, &values)
    } else {
        DefaultKeyDeriver::new().derive(&args.owner, &args.operation, &values)
    };

    Ok(key)
}
