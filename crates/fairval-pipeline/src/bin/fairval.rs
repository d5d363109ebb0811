//! fairval command-line interface
//!
//! ```bash
//! # Yahoo Finance (default, no key needed)
//! fairval value AAPL
//!
//! # Alpha Vantage
//! export ALPHA_VANTAGE_API_KEY=...
//! fairval --provider alpha-vantage value AAPL --growth 0.10
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use fairval_core::config::{ProviderKind, ValuationConfig};
use fairval_pipeline::{DcfAssumptionOverrides, ValuationService};
use std::env;

#[derive(Parser, Debug)]
#[command(name = "fairval")]
#[command(about = "DCF intrinsic-value estimates from public market data", long_about = None)]
struct Args {
    /// Data provider to use
    #[arg(long, value_enum, default_value_t = Provider::Yahoo)]
    provider: Provider,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    Yahoo,
    AlphaVantage,
}

impl From<Provider> for ProviderKind {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Yahoo => ProviderKind::Yahoo,
            Provider::AlphaVantage => ProviderKind::AlphaVantage,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show descriptive company information
    Info { ticker: String },

    /// Show the latest free-cash-flow metrics
    Metrics { ticker: String },

    /// Run a DCF valuation
    Value {
        ticker: String,

        /// Annual FCF growth rate over the projection horizon
        #[arg(long)]
        growth: Option<f64>,

        /// Discount rate
        #[arg(long)]
        discount: Option<f64>,

        /// Terminal growth rate
        #[arg(long)]
        terminal: Option<f64>,

        /// Projection horizon in years
        #[arg(long)]
        years: Option<u32>,
    },

    /// Compute a weighted average cost of capital
    Wacc {
        #[arg(long)]
        risk_free: f64,
        #[arg(long)]
        market_premium: f64,
        #[arg(long)]
        beta: f64,
        #[arg(long)]
        cost_of_debt: f64,
        #[arg(long)]
        tax_rate: f64,
        #[arg(long)]
        debt_weight: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "warn,fairval_pipeline=info,fairval_providers=info".to_string()),
        )
        .init();

    let args = Args::parse();

    // The wacc subcommand is a pure calculation; no provider needed
    if let Command::Wacc {
        risk_free,
        market_premium,
        beta,
        cost_of_debt,
        tax_rate,
        debt_weight,
    } = args.command
    {
        let rate = fairval_engine::wacc(
            risk_free,
            market_premium,
            beta,
            cost_of_debt,
            tax_rate,
            debt_weight,
        );
        println!("WACC: {:.2}%", rate * 100.0);
        return Ok(());
    }

    let config = ValuationConfig {
        provider: args.provider.into(),
        ..ValuationConfig::default()
    }
    .with_env_api_key();
    config.validate()?;

    let service = ValuationService::from_config(config)?;

    match args.command {
        Command::Info { ticker } => {
            let info = service.get_stock_info(&ticker).await?;
            println!("{} - {}", info.ticker, info.name);
            println!("  Price:    {:.2} {}", info.current_price, info.currency);
            println!("  Sector:   {}", info.sector);
            println!("  Industry: {}", info.industry);
        }

        Command::Metrics { ticker } => {
            let metrics = service.get_financial_metrics(&ticker).await?;
            println!("Fiscal year end:  {}", metrics.fiscal_year_end);
            println!("Free cash flow:   {:.0}", metrics.free_cash_flow);
        }

        Command::Value {
            ticker,
            growth,
            discount,
            terminal,
            years,
        } => {
            let overrides = DcfAssumptionOverrides {
                growth_rate: growth,
                discount_rate: discount,
                terminal_growth_rate: terminal,
                projection_years: years,
            };
            let result = service
                .calculate_intrinsic_value_with(&ticker, overrides)
                .await?;

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Year", "Projected FCF", "Present Value"]);
            for row in &result.calculation_rows {
                table.add_row(vec![
                    row.year.to_string(),
                    format!("{:.0}", row.projected_fcf),
                    format!("{:.0}", row.present_value),
                ]);
            }
            println!("{table}");

            println!();
            println!("Methodology:     {}", result.methodology);
            for (name, assumption) in &result.assumptions {
                println!(
                    "  {name}: {:.2}% - {}",
                    assumption.value * 100.0,
                    assumption.rationale
                );
            }
            println!();
            println!("Intrinsic value: {:.0}", result.intrinsic_value);
            println!("Current price:   {:.0}", result.current_price);
            println!(
                "Upside:          {:+.1}% ({})",
                result.upside * 100.0,
                result.valuation
            );
        }

        Command::Wacc { .. } => unreachable!("handled above"),
    }

    Ok(())
}
