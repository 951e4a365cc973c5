use anyhow::{bail, Context, Result};
use clap::Parser;
use log::error;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use docfill::config::{list_config_files, ConfigSummary, ProductConfig};
use docfill::mapper::SubstitutionMap;
use docfill::report::ReplacementReport;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing product configuration files
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Path to the tabular input file (tab-separated, or .csv for comma)
    #[arg(short, long, default_value = "input.txt")]
    input: PathBuf,

    /// Keep running after completion, allowing re-selection
    #[arg(short = 'l', long = "loop", visible_alias = "lp")]
    loop_mode: bool,

    /// Show per-part replacement detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let configs = list_config_files(&cli.config_dir)
        .with_context(|| format!("Failed to list configs in {:?}", cli.config_dir))?;
    if configs.is_empty() {
        bail!("No valid config files found in {:?}", cli.config_dir);
    }

    loop {
        let selected = match prompt_selection(&configs)? {
            Some(summary) => summary,
            None => break,
        };

        match run_substitution(selected, &cli) {
            Ok(()) => {}
            Err(e) if cli.loop_mode => {
                // One failed run must not take down the loop.
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
            }
            Err(e) => return Err(e),
        }

        if !cli.loop_mode {
            break;
        }
        match prompt("\nPress ENTER to continue... (or 'q' to quit) ")? {
            Some(answer) if answer.eq_ignore_ascii_case("q") => break,
            Some(_) => {}
            None => break,
        }
    }

    Ok(())
}

/// Shows the configuration menu and reads a selection. Returns `None`
/// when the user quits (or input ends).
fn prompt_selection<'a>(configs: &'a [ConfigSummary]) -> Result<Option<&'a ConfigSummary>> {
    loop {
        println!("\nAvailable Configurations:");
        for (idx, summary) in configs.iter().enumerate() {
            println!("{}. {} ({})", idx + 1, summary.product_name, summary.file_name);
        }

        let answer = match prompt("\nEnter the number of the configuration to use (or 'q' to quit): ")? {
            Some(answer) => answer,
            None => return Ok(None),
        };
        if answer.eq_ignore_ascii_case("q") {
            println!("Exiting selection...");
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if n >= 1 && n <= configs.len() => return Ok(Some(&configs[n - 1])),
            Ok(_) => println!("Invalid selection. Please enter a valid number."),
            Err(_) => println!("Invalid input. Please enter a number."),
        }
    }
}

/// Prints `message` and reads one trimmed line from stdin. Returns `None`
/// on end of input.
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// One full run: load the config, read the input, resolve the mappings,
/// substitute, and print the report.
fn run_substitution(summary: &ConfigSummary, cli: &Cli) -> Result<()> {
    let config = ProductConfig::load(&summary.path)
        .with_context(|| format!("Failed to load config '{}'", summary.file_name))?;

    let records = docfill::input::read_records(&cli.input)
        .with_context(|| format!("Failed to read input data from {:?}", cli.input))?;
    // Only the first record is used; batch runs are out of scope.
    let record = records.first().context("Input file has no data rows")?;

    let map = docfill::mapper::resolve(&config, record)
        .context("Failed to resolve placeholder mappings")?;

    let report = docfill::document::substitute(
        &config.template_path,
        &map,
        &config.output_path,
        config.expected_replacement_count,
    )
    .context("Failed to fill the template")?;

    print_report(&map, &report, cli.verbose);
    println!("Document successfully saved (template: {:?}).", config.template_path);
    Ok(())
}

/// Prints the replacement table, widths fitted to the content, followed
/// by warnings and the total.
fn print_report(map: &SubstitutionMap, report: &ReplacementReport, verbose: bool) {
    println!("\nPlaceholder Replacement Log:");

    let col_width = column_width(map.iter().map(|s| s.input_field.len()), "INPUT");
    let placeholder_width = column_width(map.iter().map(|s| s.placeholder.len()), "PLACEHOLDER");
    let value_width = column_width(map.iter().map(|s| s.value.len()), "VALUE");

    println!(
        "\n{:col$}      {:ph$}      {:val$}      COUNT",
        "INPUT",
        "PLACEHOLDER",
        "VALUE",
        col = col_width,
        ph = placeholder_width,
        val = value_width,
    );
    for sub in map.iter() {
        let count = report.count_for(&sub.placeholder);
        println!(
            "{:col$}  ->  {:ph$}  ->  {:val$}  ->  {}",
            sub.input_field,
            sub.placeholder,
            sub.value,
            count,
            col = col_width,
            ph = placeholder_width,
            val = value_width,
        );
        if verbose {
            if let Some(stats) = report
                .entries()
                .iter()
                .find(|s| s.placeholder == sub.placeholder)
            {
                for (part, part_count) in &stats.per_part {
                    println!(
                        "    {} time{} in {}",
                        part_count,
                        if *part_count > 1 { "s" } else { "" },
                        part
                    );
                }
            }
        }
    }

    for warning in report.warnings() {
        println!("Warning: {}", warning);
    }
    println!("\nTotal placeholder values changed: {}.", report.total());
}

fn column_width(lengths: impl Iterator<Item = usize>, heading: &str) -> usize {
    lengths.chain(std::iter::once(heading.len())).max().unwrap_or(0)
}
