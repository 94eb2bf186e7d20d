// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Paygate CLI
//!
//! Entry point for the `paygate` binary and the composition root of the
//! client: it builds one [`GatewayConfig`] from flags and environment,
//! constructs one [`PaymentClient`], and runs a single operation.
//!
//! - `create` : start a payment
//! - `mock`   : synthetic payment, sandbox only
//! - `verify` : detail lookup, optionally polling until terminal
//! - `check`  : check-transaction lookup
//! - `close`  : close a transaction
//! - `rate`   : exchange-rate quote
//! - `version`: print build version information
//!
//! Results go to stdout as JSON. Logs and metrics go to stderr.

mod cli;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::ExposeSecret;
use serde::Serialize;

use paygate_client::{
    Customer, Environment, GatewayConfig, PaymentClient, PaymentRequest, PaymentRequestBuilder,
    TransactionRecord,
};

use cli::{Commands, GatewayArgs, PaygateCli, PaymentArgs, VerifyArgs};

const DEFAULT_LOG_LEVEL: &str = "paygate=info,paygate_client=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PaygateCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    logging::init_logging(DEFAULT_LOG_LEVEL, cli.log_format);

    let client = build_client(&cli.gateway)?;
    let result = run(&client, cli.command).await;

    if cli.print_metrics {
        eprint!("{}", client.metrics().render());
    }
    result
}

fn build_client(args: &GatewayArgs) -> Result<PaymentClient> {
    let environment: Environment = args
        .environment
        .parse()
        .context("invalid --environment")?;

    let mut builder = GatewayConfig::builder()
        .environment(environment)
        .request_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(merchant_id) = &args.merchant_id {
        builder = builder.merchant_id(merchant_id);
    }
    if let Some(secret) = &args.secret {
        builder = builder.secret(secret.expose_secret().as_str());
    }
    if let Some(url) = &args.base_url {
        builder = builder.base_url(url);
    }
    if let Some(key) = &args.rsa_public_key {
        builder = builder.rsa_public_key(key);
    }
    if let Some(key) = &args.rsa_private_key {
        builder = builder.rsa_private_key(key.expose_secret().as_str());
    }

    let config = builder.build().context("invalid gateway configuration")?;
    PaymentClient::new(config).context("failed to construct payment client")
}

async fn run(client: &PaymentClient, command: Commands) -> Result<()> {
    match command {
        Commands::Create(args) => {
            let request = payment_request(args);
            let outcome = client
                .create_payment(&request)
                .await
                .with_context(|| format!("create payment for order {}", request.order_id))?;
            if !outcome.success {
                tracing::warn!(order_id = %request.order_id, "gateway declined to create payment");
            }
            print_json(&outcome)
        }
        Commands::Mock(args) => {
            let request = payment_request(args);
            let outcome = client
                .create_mock_payment(&request)
                .await
                .context("create mock payment")?;
            print_json(&outcome)
        }
        Commands::Verify(args) => {
            let record = verify(client, &args).await?;
            print_json(&record)
        }
        Commands::Check(args) => {
            let record = client
                .check_transaction(&args.transaction_id)
                .await
                .with_context(|| format!("check transaction {}", args.transaction_id))?;
            print_json(&record)
        }
        Commands::Close(args) => {
            let receipt = client
                .close_transaction(&args.transaction_id)
                .await
                .with_context(|| format!("close transaction {}", args.transaction_id))?;
            print_json(&receipt)
        }
        Commands::Rate(args) => {
            let rate = client
                .get_exchange_rate(args.from, args.to)
                .await
                .with_context(|| format!("exchange rate {} -> {}", args.from, args.to))?;
            print_json(&rate)
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// One detail lookup, or with `--wait` a fixed-interval poll until the
/// status is terminal. Transport faults on a poll are retried; rejections
/// are not.
async fn verify(client: &PaymentClient, args: &VerifyArgs) -> Result<TransactionRecord> {
    let id = &args.transaction_id;
    if !args.wait {
        return client
            .verify_payment(id)
            .await
            .with_context(|| format!("verify transaction {id}"));
    }

    let interval = Duration::from_secs(args.interval_secs);
    let attempts = args.max_attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        match client.verify_payment(id).await {
            Ok(record) if record.status.is_terminal() => return Ok(record),
            Ok(record) => {
                tracing::info!(attempt, status = %record.status, "transaction not final yet");
                last = Some(record);
            }
            Err(e) if e.is_retryable(paygate_client::Operation::TransactionDetail) => {
                tracing::warn!(attempt, error = %e, "verify failed, will retry");
            }
            Err(e) => return Err(e).with_context(|| format!("verify transaction {id}")),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    match last {
        Some(record) => {
            tracing::warn!(attempts, status = %record.status, "gave up waiting for a final status");
            Ok(record)
        }
        None => anyhow::bail!("transaction {id} could not be read after {attempts} attempts"),
    }
}

fn payment_request(args: PaymentArgs) -> PaymentRequest {
    let mut customer = Customer::new(args.customer_name, args.customer_email);
    if let Some(phone) = args.customer_phone {
        customer = customer.with_phone(phone);
    }

    let mut builder = PaymentRequestBuilder::new(args.amount, args.currency, args.order_id)
        .description(args.description)
        .customer(customer);
    if let Some(url) = args.return_url {
        builder = builder.return_url(url);
    }
    if let Some(url) = args.cancel_url {
        builder = builder.cancel_url(url);
    }
    if let Some(option) = args.payment_option {
        builder = builder.payment_option(option);
    }
    for item in args.items {
        builder = builder.item(item);
    }
    builder.build()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize result")?;
    println!("{text}");
    Ok(())
}

fn print_version() {
    println!("paygate {}", env!("CARGO_PKG_VERSION"));
    println!("  client  : paygate-client {}", env!("CARGO_PKG_VERSION"));
    println!("  rustc   : {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
    println!("  target  : {}", std::env::consts::ARCH);
    println!("  os      : {}", std::env::consts::OS);
}
