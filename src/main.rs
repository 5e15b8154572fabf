//! Contracter - smart-contract deployment gateway with custodial signing

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contracter::{
    chain::EthRpcClient,
    config::Args,
    custody::CustodyClient,
    db::schemas::{ACCOUNT_COLLECTION, DEPLOYMENT_COLLECTION},
    db::{MemoryAccountDirectory, MongoAccountDirectory, MongoClient},
    deploy::Deployer,
    server::{self, AppState},
    services::AccountService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("contracter={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Contracter - deployment gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("Chain RPC: {}", args.chain.chain_rpc_url);
    info!("Custody: {}", args.custody.custody_base_url);
    info!("Custody wallet: {}", args.custody.custody_wallet_id);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Contract material is required before anything can be served
    let contract = match args.load_contract() {
        Ok(c) => c,
        Err(e) => {
            error!("Contract configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, using in-memory accounts): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Account directory and deployment audit collection
    let (directory, deployments): (Arc<dyn contracter::db::AccountDirectory>, _) = match &mongo {
        Some(client) => {
            let accounts: contracter::db::MongoCollection<contracter::db::schemas::AccountDoc> =
                client.collection(ACCOUNT_COLLECTION).await?;
            let deployments: contracter::db::MongoCollection<
                contracter::db::schemas::DeploymentDoc,
            > = client.collection(DEPLOYMENT_COLLECTION).await?;
            (
                Arc::new(MongoAccountDirectory::new(accounts)),
                Some(deployments),
            )
        }
        None => (Arc::new(MemoryAccountDirectory::new()), None),
    };

    // One session token validator serves both issuance and the gate
    let jwt = args.jwt_validator()?;

    let accounts =
        AccountService::new(Arc::clone(&directory), jwt.clone(), args.public_url.clone());

    // Custody and chain clients
    let custody = Arc::new(CustodyClient::new(&args.custody)?);
    let chain = Arc::new(EthRpcClient::new(&args.chain.chain_rpc_url)?);

    let deployer = Arc::new(Deployer::new(
        custody,
        chain,
        args.custody.custody_wallet_id.clone(),
        args.custody.custody_password.clone(),
        contract,
        args.chain.chain_id,
    ));

    let state = Arc::new(AppState::new(
        args,
        mongo,
        directory,
        jwt,
        accounts,
        deployer,
        deployments,
    ));

    server::run(state).await?;

    Ok(())
}
