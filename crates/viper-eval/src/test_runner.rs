//! Viper test runner: executes `test*` functions of a program.
//!
//! Every module-level function whose name starts with `test` and that takes
//! no parameters is one case. Each case runs against a freshly loaded
//! `Module`, so bindings made by one case never leak into the next.

use crate::config::Config;
use crate::error::EvalResult;
use crate::module::Module;
use crate::value::Value;
use serde::Serialize;
use tracing::debug;
use viper_types::ast::Block;

/// Result of running a single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// Name of the test function.
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub error: Option<String>,
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed {
            write!(f, "  ✓ {}", self.name)
        } else {
            write!(
                f,
                "  ✗ {}: {}",
                self.name,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// Summary of running every test case in a program.
#[derive(Debug, Clone, Serialize)]
pub struct TestRunSummary {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
}

impl std::fmt::Display for TestRunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in &self.results {
            writeln!(f, "{r}")?;
        }
        writeln!(f, "\n{} passed, {} failed", self.passed, self.failed)
    }
}

impl TestRunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run all test functions of `program`, in name order.
///
/// Fails only if the program cannot be loaded to discover its cases; errors
/// inside a case are recorded on that case.
#[tracing::instrument(level = "debug", skip_all)]
pub fn run_tests(program: &Block, config: &Config) -> EvalResult<TestRunSummary> {
    let cases = discover(&Module::load(program, config.clone())?);

    let results: Vec<TestResult> = cases
        .iter()
        .map(|name| run_single_test(program, config, name))
        .collect();

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    Ok(TestRunSummary {
        results,
        passed,
        failed,
    })
}

/// Names of the test functions bound in `module`, sorted.
fn discover(module: &Module) -> Vec<String> {
    module
        .names()
        .into_iter()
        .filter(|name| name.starts_with("test"))
        .filter(|name| {
            matches!(module.get(name), Some(Value::Function(def)) if def.params.is_empty())
        })
        .map(str::to_string)
        .collect()
}

/// Run a single case with a fresh module.
fn run_single_test(program: &Block, config: &Config, name: &str) -> TestResult {
    let outcome =
        Module::load(program, config.clone()).and_then(|mut module| module.call(name, &[]));
    debug!(test = name, passed = outcome.is_ok(), "test case");

    match outcome {
        Ok(_) => TestResult {
            name: name.to_string(),
            passed: true,
            error: None,
        },
        Err(e) => TestResult {
            name: name.to_string(),
            passed: false,
            error: Some(e.to_string()),
        },
    }
}
