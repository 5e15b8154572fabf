//! Configuration for Contracter
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

use crate::auth::jwt::JwtValidator;
use crate::types::{ContracterError, Result};

/// Contracter - smart-contract deployment gateway with custodial signing
#[derive(Parser, Debug, Clone)]
#[command(name = "contracter")]
#[command(about = "Deploys smart contracts signed by a remote custodial wallet")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory account store, default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "contracter")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Whole-request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "60000")]
    pub request_timeout_ms: u64,

    /// Public base URL of this instance, used in logged verification links
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8000")]
    pub public_url: String,

    /// Custody service configuration
    #[command(flatten)]
    pub custody: CustodyArgs,

    /// Chain and contract configuration
    #[command(flatten)]
    pub chain: ChainArgs,
}

/// Remote custody (wallet) service connection settings
#[derive(Parser, Debug, Clone)]
pub struct CustodyArgs {
    /// Custody service base URL
    #[arg(long, env = "CUSTODY_BASE_URL", default_value = "https://api.playground.upvest.co")]
    pub custody_base_url: String,

    /// OAuth2 client id for the custody service
    #[arg(long, env = "CUSTODY_OAUTH_ID", default_value = "")]
    pub custody_oauth_id: String,

    /// OAuth2 client secret for the custody service
    #[arg(long, env = "CUSTODY_OAUTH_SECRET", default_value = "")]
    pub custody_oauth_secret: String,

    /// Custody account username
    #[arg(long, env = "CUSTODY_USERNAME", default_value = "")]
    pub custody_username: String,

    /// Custody account password (also unlocks the wallet for signing)
    #[arg(long, env = "CUSTODY_PASSWORD", default_value = "")]
    pub custody_password: String,

    /// Identifier of the custodial wallet that signs deployments
    #[arg(long, env = "CUSTODY_WALLET_ID", default_value = "")]
    pub custody_wallet_id: String,
}

/// Chain endpoint and contract deployment settings
#[derive(Parser, Debug, Clone)]
pub struct ChainArgs {
    /// Chain JSON-RPC endpoint URL
    #[arg(long, env = "CHAIN_RPC_URL", default_value = "http://localhost:8545")]
    pub chain_rpc_url: String,

    /// Chain id for replay protection; fetched from the node when omitted
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Path to the contract ABI JSON file
    #[arg(long, env = "CONTRACT_ABI_PATH", default_value = "contract.abi.json")]
    pub contract_abi_path: String,

    /// Path to the contract bytecode file (hex string)
    #[arg(long, env = "CONTRACT_BYTECODE_PATH", default_value = "contract.bin")]
    pub contract_bytecode_path: String,

    /// Constructor arguments, comma separated, matched to the ABI constructor
    #[arg(long, env = "CONTRACT_CONSTRUCTOR_ARGS", value_delimiter = ',')]
    pub constructor_args: Vec<String>,

    /// Gas limit for deployment transactions
    #[arg(long, env = "DEPLOY_GAS_LIMIT", default_value = "300000")]
    pub deploy_gas_limit: u64,
}

/// Contract material loaded from disk at startup
#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub abi_json: String,
    pub bytecode_hex: String,
    pub constructor_args: Vec<String>,
    pub gas_limit: u64,
}

impl Args {
    /// Read ABI and bytecode files into memory
    pub fn load_contract(&self) -> Result<ContractConfig> {
        let abi_json = std::fs::read_to_string(&self.chain.contract_abi_path).map_err(|e| {
            ContracterError::Config(format!(
                "Failed to read ABI file '{}': {}",
                self.chain.contract_abi_path, e
            ))
        })?;
        let bytecode_hex = std::fs::read_to_string(&self.chain.contract_bytecode_path)
            .map_err(|e| {
                ContracterError::Config(format!(
                    "Failed to read bytecode file '{}': {}",
                    self.chain.contract_bytecode_path, e
                ))
            })?
            .trim()
            .to_string();

        Ok(ContractConfig {
            abi_json,
            bytecode_hex,
            constructor_args: self.chain.constructor_args.clone(),
            gas_limit: self.chain.deploy_gas_limit,
        })
    }

    /// Build the session token validator.
    ///
    /// There is exactly one rule, shared by whoever issues tokens and
    /// whoever checks them: a configured secret always wins, the
    /// development fallback applies only when dev mode runs without one.
    pub fn jwt_validator(&self) -> Result<JwtValidator> {
        match &self.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            None if self.dev_mode => Ok(JwtValidator::new_dev()),
            None => Err(ContracterError::Config("JWT secret not configured".into())),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.custody.custody_wallet_id.is_empty() {
                return Err("CUSTODY_WALLET_ID is required in production mode".to_string());
            }
            if self.custody.custody_oauth_id.is_empty()
                || self.custody.custody_oauth_secret.is_empty()
            {
                return Err(
                    "CUSTODY_OAUTH_ID and CUSTODY_OAUTH_SECRET are required in production mode"
                        .to_string(),
                );
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if self.chain.deploy_gas_limit == 0 {
            return Err("DEPLOY_GAS_LIMIT must be greater than zero".to_string());
        }

        Ok(())
    }
}
