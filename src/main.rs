//! rdgai CLI - Classify the relations between variant readings in TEI apparatuses.

use clap::Parser;
use rdgai::classify::{ClassifyOptions, OpenAiClassifier};
use rdgai::cli::{Cli, Commands, ConfigCommands, EditCommands};
use rdgai::commands::{self, ClassifySettings, CommandResult};
use rdgai::config::{
    ConfigOverrides, OutputFormat, ResolvedConfig, locate_config, resolve_config,
};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "RDGAI_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();
    let mut human = cli.human_readable;

    let result = run_command(cli, &mut human);

    // Handle result
    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Log to stderr so JSON on stdout stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config values the command line can override.
fn overrides_for(command: &Commands) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    match command {
        Commands::Import {
            responsible: Some(responsible),
            ..
        }
        | Commands::Edit {
            command:
                EditCommands::RelationType {
                    responsible: Some(responsible),
                    ..
                },
            ..
        } => {
            overrides = overrides.with_responsible(responsible.clone());
        }
        Commands::Classify {
            examples,
            seed,
            model,
            endpoint,
            temperature,
            ..
        } => {
            overrides.examples = *examples;
            overrides.seed = *seed;
            overrides.model = model.clone();
            overrides.endpoint = endpoint.clone();
            overrides.temperature = *temperature;
        }
        Commands::Examples { count, seed, .. } => {
            overrides.examples = *count;
            overrides.seed = *seed;
        }
        _ => {}
    }
    overrides
}

fn run_command(cli: Cli, human: &mut bool) -> Result<(), rdgai::Error> {
    // `config init` must work even when the existing file is unreadable.
    if let Commands::Config {
        command: ConfigCommands::Init { force },
    } = &cli.command
    {
        let location = locate_config(cli.config_path.as_deref());
        let result = commands::config_init(location.as_ref().map(|l| l.path.as_path()), *force)?;
        output(&result, *human);
        return Ok(());
    }

    let mut overrides = overrides_for(&cli.command);
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config = resolve_config(cli.config_path.as_deref(), &overrides)?;
    *human = config.is_human();

    match cli.command {
        Commands::Show { doc, ignore } => {
            let result = commands::show(&doc, &ignore)?;
            output(&result, *human);
        }
        Commands::Summary { doc } => {
            let result = commands::summary(&doc)?;
            output(&result, *human);
        }
        Commands::Clean { doc, output: out } => {
            let result = commands::clean(&doc, &out)?;
            output(&result, *human);
        }
        Commands::Export {
            doc,
            output: out,
            categories,
            all_pairs,
        } => {
            let result = commands::export(&doc, &out, categories.as_deref(), all_pairs)?;
            output(&result, *human);
        }
        Commands::Import {
            doc,
            spreadsheet,
            output: out,
            ..
        } => {
            let result = commands::import(&doc, &spreadsheet, &out, &config.responsible.value)?;
            output(&result, *human);
        }
        Commands::Classify {
            doc,
            output: out,
            mode,
            prompt_only,
            ignore,
            all_pairs,
            apparatus,
            limit,
            ..
        } => {
            let settings = ClassifySettings {
                mode,
                options: ClassifyOptions {
                    examples: config.examples.value,
                    ignore,
                    ..ClassifyOptions::default()
                },
                seed: config.seed.value,
                all_pairs,
                apparatus,
                limit,
            };
            if prompt_only {
                let result = commands::classify_prompts(&doc, &settings)?;
                output(&result, *human);
            } else {
                let mut classifier = classifier(&config)?;
                let result = commands::classify(&doc, &out, &settings, &mut classifier)?;
                output(&result, *human);
            }
        }
        Commands::Examples { doc, category, .. } => {
            let result =
                commands::examples(&doc, &category, config.examples.value, config.seed.value)?;
            output(&result, *human);
        }
        Commands::Keys { doc } => {
            let result = commands::keys(&doc)?;
            output(&result, *human);
        }
        Commands::Edit {
            doc,
            output: out,
            command,
        } => {
            let result = match command {
                EditCommands::RelationType {
                    pair,
                    relation_type,
                    operation,
                    ..
                } => commands::edit_relation_type(
                    &doc,
                    &out,
                    &pair,
                    &relation_type,
                    operation,
                    Some(config.responsible.value.clone()),
                )?,
                EditCommands::Description { pair, text } => {
                    commands::edit_description(&doc, &out, &pair, text.as_deref())?
                }
            };
            output(&result, *human);
            if !result.response.success {
                process::exit(1);
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(&config);
                output(&result, *human);
            }
            ConfigCommands::Init { .. } => unreachable!("handled before config resolution"),
        },
    }

    Ok(())
}

fn classifier(config: &ResolvedConfig) -> Result<OpenAiClassifier, rdgai::Error> {
    OpenAiClassifier::from_env(
        &config.endpoint.value,
        &config.model.value,
        config.temperature.value,
    )
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
