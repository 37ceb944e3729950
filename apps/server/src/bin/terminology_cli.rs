//! Operator CLI for the terminology crosswalk
//!
//! Loads the configured CSV catalogs into memory, derives mappings from the
//! catalog cross-references and runs one command against the result.
//!
//! Usage:
//!   cargo run --bin terminology-cli -- --namaste-csv data/namaste_codes.csv search-namaste jwara
//!   cargo run --bin terminology-cli -- translate-tm2 AY001
//!   cargo run --bin terminology-cli -- fhir concept-map --format xml

use anyhow::{Context, Result};
use ayush_terminology::{
    api::{
        content_negotiation::{ContentFormat, ContentNegotiation},
        resource_formatter::format_resource,
    },
    logging,
    models::{Catalog, TraditionalSystem},
    services::ConditionOptions,
    AppState, Config,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Parser, Debug)]
#[clap(name = "terminology-cli")]
#[clap(about = "Query and export the NAMASTE / ICD-11 crosswalk")]
struct Args {
    /// NAMASTE CSV (defaults to terminology.namaste_csv_path)
    #[clap(long)]
    namaste_csv: Option<String>,

    /// Optional ICD-11 CSV (code,title,definition,code_type,chapter,parent)
    #[clap(long)]
    icd11_csv: Option<String>,

    /// Skip automatic mapping generation after loading
    #[clap(long)]
    no_auto_map: bool,

    /// Pretty-print JSON output
    #[clap(long)]
    pretty: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Paged search over NAMASTE codes
    SearchNamaste {
        term: String,
        #[clap(long, default_value_t = 0)]
        page: usize,
        #[clap(long, default_value_t = 20)]
        size: usize,
    },
    /// Paged search over ICD-11 codes
    SearchIcd11 {
        term: String,
        #[clap(long, default_value_t = 0)]
        page: usize,
        #[clap(long, default_value_t = 20)]
        size: usize,
    },
    /// NAMASTE code to ICD-11 TM2 mappings
    TranslateTm2 { code: String },
    /// NAMASTE code to ICD-11 Biomedicine mappings
    TranslateBiomedicine { code: String },
    /// ICD-11 TM2 code back to NAMASTE mappings
    TranslateToNamaste { code: String },
    /// Catalog and mapping counts
    Stats,
    /// Emit a dual-coded Condition
    CreateCondition {
        namaste_code: String,
        patient_id: String,
        #[clap(long)]
        clinical_status: Option<String>,
        #[clap(long)]
        verification_status: Option<String>,
        #[clap(long)]
        onset_date: Option<String>,
        #[clap(long)]
        note: Option<String>,
        /// Wrap the Condition in a collection Bundle with its Patient
        #[clap(long)]
        bundle: bool,
    },
    /// Run automatic mapping generation and print the report
    GenerateMappings,
    /// Load the catalogs and report how many codes were read
    LoadCsv,
    /// Emit a synthesized FHIR resource
    Fhir {
        #[clap(value_enum)]
        resource: FhirResource,
        #[clap(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// ValueSet text filter
        #[clap(long)]
        filter: Option<String>,
        /// ValueSet traditional medicine system
        #[clap(long)]
        system: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FhirResource {
    CodeSystem,
    ConceptMap,
    ValueSet,
    Capability,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Json,
    Xml,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_simple_logging();
    let args = Args::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = &args.namaste_csv {
        config.terminology.namaste_csv_path = path.clone();
    }
    if let Some(path) = &args.icd11_csv {
        config.terminology.icd11_csv_path = Some(path.clone());
    }

    let state = AppState::new(config).context("Failed to initialize application state")?;
    let namaste = state
        .loader
        .load_namaste(&state.config.terminology.namaste_csv_path)
        .await
        .context("Failed to load NAMASTE CSV")?;
    let icd11 = match state.config.terminology.icd11_csv_path.clone() {
        Some(path) => state
            .loader
            .load_icd11(&path)
            .await
            .with_context(|| format!("Failed to load ICD-11 CSV {path}"))?,
        None => 0,
    };

    let skip_generation = args.no_auto_map || matches!(args.command, Command::GenerateMappings);
    if !skip_generation {
        state.generator.generate().await;
    }

    match args.command {
        Command::SearchNamaste { term, page, size } => {
            let results = state
                .terminology
                .search(Catalog::Namaste, &term, page, size)
                .await?;
            print_json(&results, args.pretty)?;
        }
        Command::SearchIcd11 { term, page, size } => {
            let results = state
                .terminology
                .search(Catalog::Icd11, &term, page, size)
                .await?;
            print_json(&results, args.pretty)?;
        }
        Command::TranslateTm2 { code } => {
            print_json(&state.translation.namaste_to_tm2(&code).await?, args.pretty)?;
        }
        Command::TranslateBiomedicine { code } => {
            print_json(
                &state.translation.namaste_to_biomedicine(&code).await?,
                args.pretty,
            )?;
        }
        Command::TranslateToNamaste { code } => {
            print_json(&state.translation.tm2_to_namaste(&code).await?, args.pretty)?;
        }
        Command::Stats => {
            let mapping_count = state.mappings.count().await?;
            print_json(&state.terminology.stats(mapping_count).await?, args.pretty)?;
        }
        Command::CreateCondition {
            namaste_code,
            patient_id,
            clinical_status,
            verification_status,
            onset_date,
            note,
            bundle,
        } => {
            let options = ConditionOptions {
                clinical_status,
                verification_status,
                onset_date,
                note,
            };
            let condition = state
                .problem_list
                .create_dual_coded_condition(&namaste_code, &patient_id, &options)
                .await?;
            if bundle {
                let bundle = state.fhir.collection_bundle(vec![condition], &patient_id);
                print_json(&bundle, args.pretty)?;
            } else {
                print_json(&condition, args.pretty)?;
            }
        }
        Command::GenerateMappings => {
            let report = state.generator.generate().await;
            print_json(&report, args.pretty)?;
        }
        Command::LoadCsv => {
            println!("NAMASTE codes loaded: {namaste}");
            println!("ICD-11 codes loaded: {icd11}");
        }
        Command::Fhir {
            resource,
            format,
            filter,
            system,
        } => {
            let system = system
                .as_deref()
                .map(|s| {
                    TraditionalSystem::parse(s)
                        .with_context(|| format!("Unknown traditional medicine system: {s}"))
                })
                .transpose()?;
            let value: JsonValue = match resource {
                FhirResource::CodeSystem => state.fhir.code_system().await?,
                FhirResource::ConceptMap => state.fhir.concept_map().await?,
                FhirResource::ValueSet => state.fhir.value_set(filter.as_deref(), system),
                FhirResource::Capability => state.fhir.capability_statement(),
            };
            let negotiation = ContentNegotiation {
                format: match format {
                    OutputFormat::Json => ContentFormat::Json,
                    OutputFormat::Xml => ContentFormat::Xml,
                },
                pretty: args.pretty,
            };
            let bytes = format_resource(&value, &negotiation)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
