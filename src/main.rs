//! Command-line interface for xsdcheck

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
use serde::Serialize;

#[cfg(feature = "cli")]
use xsdcheck::{ValidationError, XsdSchema};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdcheck")]
#[command(author, version, about = "XML Schema compilation and validation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile XSD schema documents and print a summary
    Compile {
        /// Paths to the XSD schema files
        #[arg(value_name = "SCHEMA", required = true)]
        schemas: Vec<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate XML documents against XSD schemas
    Validate {
        /// Path to an XSD schema file; repeat for multi-document schemas
        #[arg(short, long = "schema", value_name = "SCHEMA", required = true)]
        schemas: Vec<PathBuf>,

        /// Paths to the XML files to validate
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output errors as a JSON array
        #[arg(short, long)]
        json: bool,
    },
}

/// Process exit status
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Status {
    Valid = 0,
    Invalid = 1,
    Failed = 2,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct FileError<'a> {
    file: String,
    #[serde(flatten)]
    error: &'a ValidationError,
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();

    let status = match cli.command {
        Commands::Compile { schemas, json } => cmd_compile(&schemas, json),
        Commands::Validate {
            schemas,
            files,
            json,
        } => cmd_validate(&schemas, &files, json),
    };

    ExitCode::from(status as u8)
}

#[cfg(feature = "cli")]
fn cmd_compile(schema_paths: &[PathBuf], json_output: bool) -> Status {
    let schema = match XsdSchema::from_files(schema_paths) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Status::Failed;
        }
    };

    let counts = schema.counts();
    if json_output {
        let summary = serde_json::json!({
            "target_namespaces": schema.target_namespaces(),
            "types": counts.types,
            "elements": counts.elements,
            "attributes": counts.attributes,
            "groups": counts.groups,
            "attribute_groups": counts.attribute_groups,
            "global_elements": schema
                .global_element_names()
                .iter()
                .map(|name| name.to_string())
                .collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Status::Failed;
            }
        }
    } else {
        println!("Schema compiled");
        for namespace in schema.target_namespaces() {
            println!("  Target namespace: {}", namespace.as_deref().unwrap_or("(none)"));
        }
        println!("  Types:            {}", counts.types);
        println!("  Elements:         {}", counts.elements);
        println!("  Attributes:       {}", counts.attributes);
        println!("  Groups:           {}", counts.groups);
        println!("  Attribute groups: {}", counts.attribute_groups);
        for name in schema.global_element_names() {
            println!("    {}", name);
        }
    }
    Status::Valid
}

#[cfg(feature = "cli")]
fn cmd_validate(schema_paths: &[PathBuf], files: &[PathBuf], json_output: bool) -> Status {
    let schema = match XsdSchema::from_files(schema_paths) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Status::Failed;
        }
    };

    let mut status = Status::Valid;
    let mut results: Vec<(String, Vec<ValidationError>)> = Vec::new();

    for file in files {
        let name = file.display().to_string();
        match schema.validate_file(file) {
            Ok(errors) => {
                if !errors.is_empty() {
                    status = status.max(Status::Invalid);
                }
                results.push((name, errors));
            }
            Err(e) => {
                eprintln!("{}: {}", name, e);
                status = Status::Failed;
            }
        }
    }

    if json_output {
        let flat: Vec<FileError<'_>> = results
            .iter()
            .flat_map(|(file, errors)| {
                errors.iter().map(move |error| FileError {
                    file: file.clone(),
                    error,
                })
            })
            .collect();
        match serde_json::to_string_pretty(&flat) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Status::Failed;
            }
        }
    } else {
        for (file, errors) in &results {
            if errors.is_empty() {
                println!("{} validates", file);
            }
            for error in errors {
                println!("{}:{}", file, error);
            }
        }
    }

    status
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
