mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::debug;

use commands::automotive::{HorsepowerArgs, TireArgs, TireCompareArgs};
use commands::finance::{AmortizeArgs, CompoundArgs, LoanArgs, MortgageArgs};
use commands::health::{BmiArgs, BodyFatArgs, EnergyArgs};
use commands::keywords::KeywordsArgs;
use commands::math::{CorrelationArgs, GcfArgs, HalfLifeArgs, PercentageArgs, StatsArgs};

/// Finance, health, math and automotive calculators
#[derive(Parser)]
#[command(
    name = "mcalc",
    version,
    about = "Finance, health, math and automotive calculators",
    long_about = "Runs the MainCalculators formulas from the command line with decimal \
                  precision. Every calculator reads a JSON file (--input), JSON piped on \
                  stdin, or individual flags, and prints JSON, a table, CSV or just the answer."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log calculation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Loan payment, amortization schedule and payoff with extra payments
    Loan(LoanArgs),
    /// Amortize a loan with a monthly payment of your choosing
    Amortize(AmortizeArgs),
    /// Mortgage payment with taxes, insurance, HOA and PMI
    Mortgage(MortgageArgs),
    /// Compound interest with monthly contributions
    Compound(CompoundArgs),
    /// BMR, TDEE, calorie goals and macro targets
    #[command(alias = "tdee")]
    Energy(EnergyArgs),
    /// Body mass index
    Bmi(BmiArgs),
    /// U.S. Navy body fat estimate
    BodyFat(BodyFatArgs),
    /// Half-life decay; solves for whichever quantity is missing
    HalfLife(HalfLifeArgs),
    /// Greatest common factor with Euclid's steps
    Gcf(GcfArgs),
    /// Descriptive statistics for a sample
    Stats(StatsArgs),
    /// Pearson correlation and least-squares line
    Correlation(CorrelationArgs),
    /// Percent of, what percent, and percent change
    Percentage(PercentageArgs),
    /// Horsepower and torque conversion
    Horsepower(HorsepowerArgs),
    /// Tire dimensions from a size such as 225/45R17
    Tire(TireArgs),
    /// Compare two tire sizes and the speedometer error
    TireCompare(TireCompareArgs),
    /// Filter and export a keyword plan
    Keywords(KeywordsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Loan(args) => commands::finance::run_loan(args),
        Commands::Amortize(args) => commands::finance::run_amortize(args),
        Commands::Mortgage(args) => commands::finance::run_mortgage(args),
        Commands::Compound(args) => commands::finance::run_compound(args),
        Commands::Energy(args) => commands::health::run_energy(args),
        Commands::Bmi(args) => commands::health::run_bmi(args),
        Commands::BodyFat(args) => commands::health::run_body_fat(args),
        Commands::HalfLife(args) => commands::math::run_half_life(args),
        Commands::Gcf(args) => commands::math::run_gcf(args),
        Commands::Stats(args) => commands::math::run_stats(args),
        Commands::Correlation(args) => commands::math::run_correlation(args),
        Commands::Percentage(args) => commands::math::run_percentage(args),
        Commands::Horsepower(args) => commands::automotive::run_horsepower(args),
        Commands::Tire(args) => commands::automotive::run_tire(args),
        Commands::TireCompare(args) => commands::automotive::run_tire_compare(args),
        Commands::Keywords(args) => commands::keywords::run_keywords(args),
        Commands::Version => {
            println!("mcalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_loan_flags() {
        let cli = Cli::try_parse_from([
            "mcalc", "loan", "--principal", "100000", "--rate", "6", "--years", "30", "--output", "minimal",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Minimal));
        let Commands::Loan(args) = cli.command else {
            panic!("expected the loan command");
        };
        assert_eq!(args.principal, Some("100000".parse().unwrap()));
        assert_eq!(args.term_years, Some("30".parse().unwrap()));
        assert!(args.extra_payment.is_none());
    }

    #[test]
    fn test_parse_typed_values() {
        let cli = Cli::try_parse_from(["mcalc", "tire-compare", "--original", "205/55R16", "--replacement", "225/45R17"]).unwrap();
        let Commands::TireCompare(args) = cli.command else {
            panic!("expected the tire-compare command");
        };
        assert_eq!(args.original.map(|s| s.to_string()).as_deref(), Some("205/55R16"));

        assert!(Cli::try_parse_from(["mcalc", "tire", "--size", "not-a-tire"]).is_err());
        assert!(Cli::try_parse_from(["mcalc", "tdee", "--activity", "moderate", "--sex", "female"]).is_ok());
        assert!(Cli::try_parse_from(["mcalc", "tdee", "--sex", "other"]).is_err());
    }

    #[test]
    fn test_parse_percentage_question() {
        let cli = Cli::try_parse_from(["mcalc", "percentage", "change", "--from", "-20", "--to", "10"]).unwrap();
        let Commands::Percentage(args) = cli.command else {
            panic!("expected the percentage command");
        };
        assert!(matches!(
            args.question,
            Some(commands::math::PercentageQuestion::Change { .. })
        ));
    }

    #[test]
    fn test_parse_stats_list() {
        let cli = Cli::try_parse_from(["mcalc", "stats", "--values", "4,-1,2.5", "--percentiles", "10,90"]).unwrap();
        let Commands::Stats(args) = cli.command else {
            panic!("expected the stats command");
        };
        assert_eq!(args.values.map(|v| v.len()), Some(3));
        assert_eq!(args.percentiles.len(), 2);
    }
}
