pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "risk-etl")]
#[command(about = "Classify patients into risk tiers from a CSV table")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "risk-config.toml")]
    pub config: String,

    /// Override data.input_file from the config
    #[arg(short, long)]
    pub input: Option<String>,

    /// Override output.path from the config
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override pipeline.formula from the config (bmi, glucose)
    #[arg(long)]
    pub formula: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Show the configuration and tier table without reading data
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_overrides(
        &self,
        config: &mut toml_config::RiskConfig,
    ) -> crate::utils::error::Result<()> {
        if let Some(input) = &self.input {
            tracing::info!("Input file overridden to: {}", input);
            config.data.input_file = input.clone();
        }
        if let Some(output) = &self.output {
            tracing::info!("Output path overridden to: {}", output);
            config.output.path = output.clone();
        }
        if let Some(formula) = &self.formula {
            config.pipeline.formula = formula.parse()?;
            tracing::info!("Formula overridden to: {}", config.pipeline.formula);
        }
        Ok(())
    }
}
