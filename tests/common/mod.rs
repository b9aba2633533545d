#![allow(dead_code)]
//! Shared fixtures for the integration tests
//!
//! The example operations: a body-only operation, a token + query + header
//! operation completing on a worker thread whose `theHeader` output goes back
//! as a response header, no-output operations for both input styles and
//! operations failing with an allowed error.

use opsrouter::input::InputSources;
use opsrouter::runtime_config::RuntimeConfig;
use opsrouter::{
    Completion, Dispatcher, HttpMethod, OperationConfig, OperationError, OutputLocation,
    Validate,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

pub const BLUE_ID: &str = "123456789012";
pub const YELLOW_ID: &str = "888888888888";

pub fn serialized_input() -> Value {
    json!({ "theID": BLUE_ID })
}

/// Decodes but produces an output that fails validation
pub fn serialized_alternate_input() -> Value {
    json!({ "theID": YELLOW_ID })
}

/// Does not decode into `ExampleInput`
pub fn serialized_invalid_input() -> Value {
    json!({ "theID": 1234 })
}

/// Routes log output through the test harness for the current thread
pub struct TestTracing {
    _guard: DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("opsrouter=debug")
            .with_test_writer()
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

/// Records formatted log output for the current thread so tests can assert on it
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn init() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("opsrouter=debug")
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_string)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ExampleContext {
    pub invocations: AtomicU64,
    /// `(theToken, theParameter, theHeader)` of every HTTP-style input seen.
    pub http_inputs: Mutex<Vec<(String, String, String)>>,
}

impl ExampleContext {
    pub fn record(&self) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_http(&self, input: &ExampleHttpInput) {
        self.record();
        self.http_inputs.lock().unwrap().push((
            input.the_token.clone(),
            input.the_parameter.clone(),
            input.the_header.clone(),
        ));
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn http_inputs(&self) -> Vec<(String, String, String)> {
        self.http_inputs.lock().unwrap().clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct ExampleInput {
    #[serde(rename = "theID")]
    pub the_id: String,
}

impl Validate for ExampleInput {
    fn validate(&self) -> Result<(), String> {
        if self.the_id.len() == 12 {
            Ok(())
        } else {
            Err(format!("theID must be 12 characters, got {}", self.the_id.len()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleHttpInput {
    #[serde(rename = "theID")]
    pub the_id: String,
    pub the_token: String,
    pub the_parameter: String,
    pub the_header: String,
}

impl Validate for ExampleHttpInput {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyColor {
    Blue,
    Yellow,
}

impl BodyColor {
    pub fn for_id(id: &str) -> Self {
        if id == BLUE_ID {
            BodyColor::Blue
        } else {
            BodyColor::Yellow
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAttributes {
    pub body_color: BodyColor,
    pub is_great: bool,
}

impl Validate for OutputAttributes {
    fn validate(&self) -> Result<(), String> {
        if self.body_color == BodyColor::Yellow {
            return Err("yellow is not a valid body color".to_string());
        }
        Ok(())
    }
}

/// `theHeader` is sent as a response header, the rest as the body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputHttpAttributes {
    pub body_color: BodyColor,
    pub is_great: bool,
    pub the_header: String,
}

pub const HTTP_OUTPUT: OutputLocation = OutputLocation::BodyAndHeaders(&["theHeader"]);

impl Validate for OutputHttpAttributes {}

#[derive(Debug, thiserror::Error)]
pub enum ExampleError {
    #[error("{reason}")]
    TheError { reason: String },
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl OperationError for ExampleError {
    fn identity(&self) -> &str {
        match self {
            ExampleError::TheError { .. } => "TheError",
            ExampleError::Unexpected(_) => "Unexpected",
        }
    }
}

pub fn the_error() -> ExampleError {
    ExampleError::TheError {
        reason: "Is bad!".to_string(),
    }
}

pub fn example_operation(
    input: ExampleInput,
    ctx: &ExampleContext,
) -> Result<OutputAttributes, ExampleError> {
    ctx.record();
    Ok(OutputAttributes {
        body_color: BodyColor::for_id(&input.the_id),
        is_great: true,
    })
}

pub fn example_http_operation(
    input: ExampleHttpInput,
    ctx: &ExampleContext,
    done: Completion<OutputHttpAttributes, ExampleError>,
) -> Result<(), ExampleError> {
    ctx.record_http(&input);
    std::thread::spawn(move || {
        done.succeed(OutputHttpAttributes {
            body_color: BodyColor::for_id(&input.the_id),
            is_great: true,
            the_header: input.the_header,
        });
    });
    Ok(())
}

pub fn example_void_operation(
    _input: ExampleInput,
    ctx: &ExampleContext,
) -> Result<(), ExampleError> {
    ctx.record();
    Ok(())
}

pub fn example_http_void_operation(
    input: ExampleHttpInput,
    ctx: &ExampleContext,
) -> Result<(), ExampleError> {
    ctx.record_http(&input);
    Ok(())
}

pub fn bad_operation(
    _input: ExampleInput,
    ctx: &ExampleContext,
) -> Result<OutputAttributes, ExampleError> {
    ctx.record();
    Err(the_error())
}

pub fn bad_void_operation(_input: ExampleInput, ctx: &ExampleContext) -> Result<(), ExampleError> {
    ctx.record();
    Err(the_error())
}

pub fn example_dispatcher() -> Dispatcher<ExampleContext> {
    let mut dispatcher =
        Dispatcher::with_config(ExampleContext::default(), RuntimeConfig::default());
    let everything = InputSources::ALL;

    dispatcher
        .register_sync(
            "exampleoperation",
            HttpMethod::Post,
            example_operation,
            OperationConfig::new().allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register(
            "exampleoperation/{theToken}",
            HttpMethod::Post,
            example_http_operation,
            OperationConfig::new()
                .input_sources(everything)
                .output(HTTP_OUTPUT)
                .allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register_sync(
            "examplegetoperation",
            HttpMethod::Get,
            example_operation,
            OperationConfig::new().allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register(
            "examplegetoperation/{theToken}",
            HttpMethod::Get,
            example_http_operation,
            OperationConfig::new()
                .input_sources(everything)
                .output(HTTP_OUTPUT)
                .allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register_sync(
            "examplenobodyoperation",
            HttpMethod::Post,
            example_void_operation,
            OperationConfig::new()
                .output(OutputLocation::None)
                .allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register_sync(
            "examplenobodyoperation/{theToken}",
            HttpMethod::Post,
            example_http_void_operation,
            OperationConfig::new()
                .input_sources(everything)
                .output(OutputLocation::None)
                .allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register_sync(
            "badoperation",
            HttpMethod::Post,
            bad_operation,
            OperationConfig::new().allow("TheError", 400),
        )
        .unwrap();
    dispatcher
        .register_sync(
            "badoperationvoidresponse",
            HttpMethod::Post,
            bad_void_operation,
            OperationConfig::new()
                .output(OutputLocation::None)
                .allow("TheError", 400),
        )
        .unwrap();

    dispatcher
}
