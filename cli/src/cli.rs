//! # CLI Interface
//!
//! Command-line structure for `paygate`. Gateway settings are global flags
//! with environment fallbacks; each subcommand runs one operation and
//! prints its result as JSON.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use secrecy::SecretString;

use paygate_client::{Currency, LineItem};

use crate::logging::LogFormat;

/// Client for the hosted payment gateway.
#[derive(Parser, Debug)]
#[command(
    name = "paygate",
    about = "Create, track and close gateway payments",
    version,
    propagate_version = true
)]
pub struct PaygateCli {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Log format on stderr.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Print Prometheus metrics to stderr after the command.
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Merchant credentials and endpoint.
#[derive(Args, Debug)]
pub struct GatewayArgs {
    #[arg(long, global = true, env = "PAYGATE_MERCHANT_ID")]
    pub merchant_id: Option<String>,

    /// Shared signing secret. Prefer the environment variable over the flag.
    #[arg(long, global = true, env = "PAYGATE_SECRET", hide_env_values = true)]
    pub secret: Option<SecretString>,

    /// `sandbox` or `production`.
    #[arg(long, global = true, env = "PAYGATE_ENVIRONMENT", default_value = "sandbox")]
    pub environment: String,

    /// Gateway base URL. Required in production.
    #[arg(long, global = true, env = "PAYGATE_BASE_URL")]
    pub base_url: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, global = true, env = "PAYGATE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, global = true, env = "PAYGATE_RSA_PUBLIC_KEY")]
    pub rsa_public_key: Option<String>,

    #[arg(long, global = true, env = "PAYGATE_RSA_PRIVATE_KEY", hide_env_values = true)]
    pub rsa_private_key: Option<SecretString>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a payment and print the checkout URL.
    Create(PaymentArgs),
    /// Create a synthetic payment without contacting the gateway.
    Mock(PaymentArgs),
    /// Look up a transaction through the detail endpoint.
    Verify(VerifyArgs),
    /// Look up a transaction through the check endpoint.
    Check(TransactionArgs),
    /// Close a transaction.
    Close(TransactionArgs),
    /// Quote an exchange rate.
    Rate(RateArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct PaymentArgs {
    /// Amount in major units, e.g. `25.00`.
    #[arg(long)]
    pub amount: Decimal,

    #[arg(long, default_value = "USD")]
    pub currency: Currency,

    /// Merchant order id, unique per merchant.
    #[arg(long)]
    pub order_id: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub customer_name: String,

    #[arg(long)]
    pub customer_email: String,

    #[arg(long)]
    pub customer_phone: Option<String>,

    #[arg(long)]
    pub return_url: Option<String>,

    #[arg(long)]
    pub cancel_url: Option<String>,

    /// Line item as `name:quantity:price`. Repeatable.
    #[arg(long = "item", value_parser = parse_item)]
    pub items: Vec<LineItem>,

    /// Payment method hint, e.g. `cards` or `abapay`.
    #[arg(long)]
    pub payment_option: Option<String>,
}

#[derive(Args, Debug)]
pub struct TransactionArgs {
    pub transaction_id: String,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    pub transaction_id: String,

    /// Keep polling until the status is terminal.
    #[arg(long)]
    pub wait: bool,

    /// Seconds between polls.
    #[arg(long, default_value_t = 5, requires = "wait")]
    pub interval_secs: u64,

    /// Polls before giving up.
    #[arg(long, default_value_t = 12, requires = "wait")]
    pub max_attempts: u32,
}

#[derive(Args, Debug)]
pub struct RateArgs {
    #[arg(long)]
    pub from: Currency,

    #[arg(long)]
    pub to: Currency,
}

/// Parses `name:quantity:price`. The name may itself contain colons.
fn parse_item(raw: &str) -> Result<LineItem, String> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected name:quantity:price, got {raw:?}"));
    };
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad quantity {quantity:?}: {e}"))?;
    let price = price
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("bad price {price:?}: {e}"))?;
    Ok(LineItem::new(name.trim(), quantity, price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        PaygateCli::command().debug_assert();
    }

    #[test]
    fn parses_create() {
        let cli = PaygateCli::try_parse_from([
            "paygate",
            "--merchant-id",
            "ec000262",
            "--secret",
            "hunter2",
            "create",
            "--amount",
            "25.00",
            "--order-id",
            "ORD-1001",
            "--customer-name",
            "Jane Doe",
            "--customer-email",
            "jane@example.com",
            "--item",
            "Widget:1:25.00",
        ])
        .unwrap();

        assert_eq!(cli.gateway.merchant_id.as_deref(), Some("ec000262"));
        assert!(!format!("{:?}", cli.gateway).contains("hunter2"));
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.amount, Decimal::new(2500, 2));
        assert_eq!(args.currency, Currency::USD);
        assert_eq!(args.items.len(), 1);
        assert_eq!(args.items[0].quantity, 1);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = PaygateCli::try_parse_from([
            "paygate",
            "rate",
            "--from",
            "usd",
            "--to",
            "KHR",
            "--log-format",
            "json",
            "--print-metrics",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(cli.print_metrics);
        let Commands::Rate(args) = cli.command else {
            panic!("expected rate");
        };
        assert_eq!(args.from, Currency::USD);
        assert_eq!(args.to, Currency::KHR);
    }

    #[test]
    fn polling_flags_need_wait() {
        assert!(PaygateCli::try_parse_from(["paygate", "verify", "TX-1", "--max-attempts", "3"]).is_err());
        assert!(PaygateCli::try_parse_from(["paygate", "verify", "TX-1", "--wait", "--max-attempts", "3"]).is_ok());
    }

    #[test]
    fn item_parsing() {
        let item = parse_item("Cable 2:1m:3:4.50").unwrap();
        assert_eq!(item.name, "Cable 2:1m");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.price, Decimal::new(450, 2));

        assert!(parse_item("Widget:1").is_err());
        assert!(parse_item("Widget:one:1.00").is_err());
        assert!(parse_item("Widget:1:abc").is_err());
    }
}
