//! Python bindings for the underwriting reward.
//!
//! ```python
//! import underwrite
//!
//! reward = underwrite.score(completion)
//! breakdown = underwrite.score(completion, return_dict=True)  # {"reward": r}
//! labeled = underwrite.score_with_truth(completion, truth=row["truth"], return_dict=True)
//! print(underwrite.explain(completion))
//! ```
//!
//! Responses may be `str` or any object `json.dumps` accepts. Scoring runs
//! with the GIL released.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyFloat, PyString};
use serde_json::Value;

use underwrite_core::{Response, RewardOutput};

/// Serialize a Python object to JSON text through the `json` module.
fn dumps(obj: &Bound<'_, PyAny>) -> PyResult<String> {
    let json = obj.py().import("json")?;
    json.call_method1("dumps", (obj,))?.extract()
}

fn to_response(obj: &Bound<'_, PyAny>) -> PyResult<Response> {
    if obj.is_instance_of::<PyString>() {
        return Ok(Response::text(obj.extract::<String>()?));
    }
    Ok(Response::text(dumps(obj)?))
}

/// Prompts may be chat messages or a task mapping; non-strings are serialized.
fn to_prompt(obj: Option<&Bound<'_, PyAny>>) -> PyResult<Option<String>> {
    match obj {
        None => Ok(None),
        Some(obj) if obj.is_none() => Ok(None),
        Some(obj) if obj.is_instance_of::<PyString>() => Ok(Some(obj.extract()?)),
        Some(obj) => dumps(obj).map(Some),
    }
}

fn to_truth(obj: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Value>> {
    let Some(obj) = obj else {
        return Ok(None);
    };
    if obj.is_none() {
        return Ok(None);
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(Some(Value::String(obj.extract()?)));
    }
    let text = dumps(obj)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| PyValueError::new_err(format!("truth is not valid JSON: {}", e)))
}

fn to_python(py: Python<'_>, output: RewardOutput) -> PyResult<PyObject> {
    match output {
        RewardOutput::Scalar(reward) => Ok(PyFloat::new(py, reward).into_any().unbind()),
        breakdown => {
            let text = breakdown.to_value().to_string();
            Ok(py.import("json")?.call_method1("loads", (text,))?.unbind())
        }
    }
}

/// Score a response with the rule-based reward.
///
/// Returns a float in [0, 1], or `{"reward": float}` with `return_dict`.
/// `prompt` and `truth` are accepted for host compatibility and ignored.
#[pyfunction]
#[pyo3(signature = (response, prompt=None, truth=None, return_dict=false))]
fn score(
    py: Python<'_>,
    response: &Bound<'_, PyAny>,
    prompt: Option<&Bound<'_, PyAny>>,
    truth: Option<&Bound<'_, PyAny>>,
    return_dict: bool,
) -> PyResult<PyObject> {
    let response = to_response(response)?;
    let prompt = to_prompt(prompt)?;
    let truth = to_truth(truth)?;

    let output = py.allow_threads(|| {
        underwrite_core::score(response, prompt.as_deref(), truth.as_ref(), return_dict)
    });
    to_python(py, output)
}

/// Score a response against the `reward_breakdown` labels in `truth`.
#[pyfunction]
#[pyo3(signature = (response, prompt=None, truth=None, return_dict=false))]
fn score_with_truth(
    py: Python<'_>,
    response: &Bound<'_, PyAny>,
    prompt: Option<&Bound<'_, PyAny>>,
    truth: Option<&Bound<'_, PyAny>>,
    return_dict: bool,
) -> PyResult<PyObject> {
    let response = to_response(response)?;
    let prompt = to_prompt(prompt)?;
    let truth = to_truth(truth)?;

    let output = py.allow_threads(|| {
        underwrite_core::score_with_truth(response, prompt.as_deref(), truth.as_ref(), return_dict)
    });
    to_python(py, output)
}

/// Full evaluation of a response as a JSON string.
#[pyfunction]
fn explain(py: Python<'_>, response: &Bound<'_, PyAny>) -> PyResult<String> {
    let response = to_response(response)?;
    let evaluation = py.allow_threads(|| underwrite_core::evaluate(response));
    serde_json::to_string_pretty(&evaluation)
        .map_err(|e| PyValueError::new_err(format!("failed to serialize evaluation: {}", e)))
}

#[pymodule]
fn underwrite(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(score, m)?)?;
    m.add_function(wrap_pyfunction!(score_with_truth, m)?)?;
    m.add_function(wrap_pyfunction!(explain, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
