use anyhow::{Context, Result};
use clap::Parser;
use opsrouter::input::InputSources;
use opsrouter::logging::{init_logging_with_config, LogConfig};
use opsrouter::{
    Completion, Dispatcher, HttpMethod, OperationConfig, OperationError, OutputLocation,
    RawRequest, Validate,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch one request against the demo pet lookup and print the response
#[derive(Parser, Debug)]
#[command(name = "opsrouter-demo", version, about, long_about = None)]
struct Cli {
    /// Request URI, e.g. `/pets/1?verbose=true`
    uri: Option<String>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as `name: value`; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body; `@path` reads it from a file
    #[arg(short, long)]
    body: Option<String>,

    /// Print the registered routes and exit
    #[arg(long, default_value_t = false)]
    routes: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `name: value`, got `{raw}`"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

/// In-memory pets served by the demo operation
#[derive(Debug)]
struct PetStore {
    pets: Vec<(u64, &'static str, &'static str)>,
    lookups: AtomicU64,
}

impl Default for PetStore {
    fn default() -> Self {
        Self {
            pets: vec![(1, "Rex", "dog"), (2, "Tom", "cat"), (3, "Polly", "parrot")],
            lookups: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetPet {
    pet_id: u64,
    #[serde(default)]
    verbose: bool,
}

impl Validate for GetPet {
    fn validate(&self) -> Result<(), String> {
        if self.pet_id == 0 {
            return Err("petId must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Pet {
    id: u64,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    species: Option<String>,
    #[serde(rename = "x-lookup")]
    lookup: u64,
}

impl Validate for Pet {}

#[derive(Debug, thiserror::Error)]
enum PetError {
    #[error("no pet with id {0}")]
    NotFound(u64),
}

impl OperationError for PetError {
    fn identity(&self) -> &str {
        match self {
            PetError::NotFound(_) => "NotFound",
        }
    }
}

fn get_pet(input: GetPet, store: &PetStore, done: Completion<Pet, PetError>) -> Result<(), PetError> {
    let lookup = store.lookups.fetch_add(1, Ordering::Relaxed) + 1;
    let found = store
        .pets
        .iter()
        .find(|(id, _, _)| *id == input.pet_id)
        .map(|(id, name, species)| (*id, name.to_string(), species.to_string()));
    let Some((id, name, species)) = found else {
        return Err(PetError::NotFound(input.pet_id));
    };

    // Completes from a worker thread.
    std::thread::spawn(move || {
        done.succeed(Pet {
            id,
            name,
            species: input.verbose.then_some(species),
            lookup,
        });
    });
    Ok(())
}

fn build_dispatcher() -> Result<Dispatcher<PetStore>> {
    let mut dispatcher = Dispatcher::new(PetStore::default());
    dispatcher.register(
        "pets/{petId}",
        HttpMethod::Get,
        get_pet,
        OperationConfig::new()
            .input_sources(InputSources::PATH | InputSources::QUERY)
            .output(OutputLocation::BodyAndHeaders(&["x-lookup"]))
            .allow("NotFound", 404),
    )?;
    Ok(dispatcher)
}

fn read_body(body: Option<&str>) -> Result<Vec<u8>> {
    match body {
        None => Ok(Vec::new()),
        Some(path) if path.starts_with('@') => {
            std::fs::read(&path[1..]).with_context(|| format!("Failed to read body from {}", &path[1..]))
        }
        Some(inline) => Ok(inline.as_bytes().to_vec()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging_with_config(&LogConfig::from_env())?;

    let dispatcher = build_dispatcher()?;
    dispatcher.table().log_routes();

    if cli.routes {
        for (method, pattern) in dispatcher.table().routes() {
            println!("{method:<8} {pattern}");
        }
        return Ok(());
    }

    let uri = cli
        .uri
        .context("a request URI is required unless --routes is given")?;
    let mut request = RawRequest::new(HttpMethod::from_wire(&cli.method.to_ascii_uppercase()), uri)
        .with_body(read_body(cli.body.as_deref())?);
    for (name, value) in &cli.headers {
        request = request.with_header(name, value.clone());
    }

    let response = dispatcher.dispatch(&request);
    println!("{} {}", response.status, opsrouter::server::status_reason(response.status));
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    if let Some(body) = &response.body {
        println!();
        println!(
            "{}",
            serde_json::to_string_pretty(body).context("Failed to render response body")?
        );
    }
    Ok(())
}
