use idfix::{
    interpret, FitConfig, FixedDetections, IdFixError, Issue, PhotoPipeline, PrecomputedSubject,
    RelativeBox, ValidationReport,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

fn to_py_err(e: IdFixError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn issues_to_list<'py>(py: Python<'py>, issues: &[Issue]) -> PyResult<Bound<'py, PyList>> {
    let list = PyList::empty(py);
    for issue in issues {
        let dict = PyDict::new(py);
        dict.set_item("key", &issue.key)?;
        dict.set_item("status", issue.status.as_str())?;
        dict.set_item("message", &issue.message)?;
        list.append(dict)?;
    }
    Ok(list)
}

/// Classify a validation report into fatal issues and warnings.
///
/// Args:
///     report: Raw validation service answer; surrounding prose and code
///             fences are ignored
///
/// Returns:
///     dict with keys: decision (str), accepted (bool), fatal_issues (list),
///                     warnings (list), overall_score (float)
#[pyfunction]
fn interpret_report(py: Python<'_>, report: &str) -> PyResult<Py<PyDict>> {
    let report = ValidationReport::from_model_text(report).map_err(to_py_err)?;
    let verdict = interpret(&report);

    let decision = if verdict.is_accepted() {
        "processed"
    } else {
        "rejected"
    };

    let dict = PyDict::new(py);
    dict.set_item("decision", decision)?;
    dict.set_item("accepted", verdict.is_accepted())?;
    dict.set_item("fatal_issues", issues_to_list(py, &verdict.fatal_issues)?)?;
    dict.set_item("warnings", issues_to_list(py, &verdict.warnings)?)?;
    dict.set_item("overall_score", report.overall_score())?;
    Ok(dict.into())
}

/// Run the auto-fit pipeline on one photo.
///
/// Args:
///     input: Raw image bytes (JPEG, PNG, or WebP)
///     report: Raw validation service answer for this photo
///     face_box: (xmin, ymin, width, height, confidence) relative to the
///               photo, or None to fit the whole subject
///     subject: Background-removed PNG of the same size as the photo
///              (optional, default: photo used as-is)
///     config: JSON object overriding framing targets (optional)
///
/// Returns:
///     str: JSON response with decision, issues, base64 images, and the
///          applied processing steps
#[pyfunction]
#[pyo3(signature = (input, report, *, face_box=None, subject=None, config=None))]
fn process(
    input: Vec<u8>,
    report: &str,
    face_box: Option<(f64, f64, f64, f64, f64)>,
    subject: Option<Vec<u8>>,
    config: Option<&str>,
) -> PyResult<String> {
    let report = ValidationReport::from_model_text(report).map_err(to_py_err)?;
    let mut pipeline = PhotoPipeline::new(input).map_err(to_py_err)?;

    if let Some(json) = config {
        let config =
            FitConfig::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        pipeline = pipeline.config(config);
    }
    if let Some((xmin, ymin, width, height, confidence)) = face_box {
        let bbox = RelativeBox {
            xmin,
            ymin,
            width,
            height,
        };
        pipeline = pipeline.face_locator(Box::new(FixedDetections::single(bbox, confidence)));
    }
    if let Some(png) = subject {
        let subject = PrecomputedSubject::from_encoded(&png).map_err(to_py_err)?;
        pipeline = pipeline.subject_extractor(Box::new(subject));
    }

    let outcome = pipeline.process_with_report(report).map_err(to_py_err)?;
    outcome
        .to_response()
        .to_json()
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn idfix_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(interpret_report, m)?)?;
    m.add_function(wrap_pyfunction!(process, m)?)?;
    Ok(())
}
