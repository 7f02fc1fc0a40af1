#![cfg(feature = "python")]

use arrayfunc::init_test_module;
use libloading::Library;
use pyo3::exceptions::{PyOverflowError, PyTypeError, PyValueError, PyZeroDivisionError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

static PY_RUNTIME: Once = Once::new();

fn default_python() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push(".venv");
    path.push("bin");
    path.push("python");
    path
}

fn resolve_python_executable() -> PathBuf {
    if let Ok(explicit) = std::env::var("ARRAYFUNC_TEST_PYTHON") {
        let candidate = PathBuf::from(explicit);
        if candidate.is_file() {
            return candidate;
        }
    }
    let candidate = default_python();
    if candidate.is_file() {
        return candidate;
    }
    PathBuf::from("python3")
}

fn resolve_python_library(python: &Path) -> PathBuf {
    let script = r#"
import sysconfig, pathlib
libdir = sysconfig.get_config_var('LIBDIR')
name = sysconfig.get_config_var('INSTSONAME') or sysconfig.get_config_var('LDLIBRARY')
path = pathlib.Path(libdir) / name
print(path.resolve())
"#;
    let output = Command::new(python)
        .args(["-c", script])
        .output()
        .unwrap_or_else(|err| panic!("Failed to execute {}: {err}", python.display()));
    if !output.status.success() {
        panic!(
            "Python reported failure while locating libpython:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    let path = String::from_utf8(output.stdout)
        .expect("python output should be utf-8")
        .trim()
        .to_owned();
    let path = PathBuf::from(path);
    if !path.exists() {
        panic!("Resolved libpython path does not exist: {}", path.display());
    }
    path
}

fn ensure_python_initialized() {
    PY_RUNTIME.call_once(|| {
        let python = resolve_python_executable();
        let libpython = resolve_python_library(&python);
        unsafe {
            Library::new(&libpython).unwrap_or_else(|err| {
                panic!(
                    "Failed to load libpython from {}: {err}",
                    libpython.display()
                )
            });
        }
        pyo3::prepare_freethreaded_python();
    });
}

/// Drives the exported module through CPython `array.array` buffers.
///
/// Needs a Python runtime with a shared libpython. Run with
/// `cargo test --features python --test python_api`.

fn init(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let module = PyModule::new_bound(py, "_arrayfunc_test")?;
    init_test_module(py, &module)?;
    Ok(module)
}

fn typed_array<'py>(
    py: Python<'py>,
    code: &str,
    values: Bound<'py, PyList>,
) -> PyResult<Bound<'py, PyAny>> {
    PyModule::import_bound(py, "array")?
        .getattr("array")?
        .call1((code, values))
}

#[test]
fn add_updates_the_buffer_in_place() -> PyResult<()> {
    ensure_python_initialized();

    Python::with_gil(|py| -> PyResult<()> {
        let module = init(py)?;
        let data = typed_array(py, "i", PyList::new_bound(py, [1, 2, 3]))?;
        let result = module.getattr("add")?.call1((data.clone(), 10))?;
        assert!(result.is_none());
        let values: Vec<i32> = data.call_method0("tolist")?.extract()?;
        assert_eq!(values, vec![11, 12, 13]);

        let out = typed_array(py, "i", PyList::new_bound(py, [0, 0, 0]))?;
        module
            .getattr("mul")?
            .call1((data.clone(), 2, out.clone()))?;
        let values: Vec<i32> = out.call_method0("tolist")?.extract()?;
        assert_eq!(values, vec![22, 24, 26]);
        Ok(())
    })?;

    Ok(())
}

#[test]
fn kernel_errors_map_to_python_exceptions() -> PyResult<()> {
    ensure_python_initialized();

    Python::with_gil(|py| -> PyResult<()> {
        let module = init(py)?;
        let data = typed_array(py, "b", PyList::new_bound(py, [4, 5]))?;

        let err = module
            .getattr("floordiv")?
            .call1((data.clone(), 0))
            .unwrap_err();
        assert!(err.is_instance_of::<PyZeroDivisionError>(py));

        let err = module.getattr("add")?.call1((data.clone(), 128)).unwrap_err();
        assert!(err.is_instance_of::<PyOverflowError>(py));

        let err = module
            .getattr("pow")?
            .call1((data.clone(), -1))
            .unwrap_err();
        assert!(err.is_instance_of::<PyValueError>(py));

        let floats = typed_array(py, "d", PyList::new_bound(py, [1.0, 2.0]))?;
        let err = module.getattr("add")?.call1((data.clone(), floats)).unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));

        let values: Vec<i8> = data.call_method0("tolist")?.extract()?;
        assert_eq!(values, vec![4, 5]);
        Ok(())
    })?;

    Ok(())
}

#[test]
fn options_are_keyword_checked() -> PyResult<()> {
    ensure_python_initialized();

    Python::with_gil(|py| -> PyResult<()> {
        let module = init(py)?;
        let data = typed_array(py, "h", PyList::new_bound(py, [100, 200, 300]))?;

        let kwargs = PyDict::new_bound(py);
        kwargs.set_item("maxlen", 2)?;
        module.getattr("sub")?.call((data.clone(), 100), Some(&kwargs))?;
        let values: Vec<i16> = data.call_method0("tolist")?.extract()?;
        assert_eq!(values, vec![0, 100, 300]);

        let kwargs = PyDict::new_bound(py);
        kwargs.set_item("nosimd", true)?;
        let err = module
            .getattr("xor")?
            .call((data.clone(), 1), Some(&kwargs))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));

        let kwargs = PyDict::new_bound(py);
        kwargs.set_item("bogus", true)?;
        let err = module
            .getattr("amax")?
            .call((data.clone(),), Some(&kwargs))
            .unwrap_err();
        assert!(err.is_instance_of::<PyTypeError>(py));
        Ok(())
    })?;

    Ok(())
}

#[test]
fn reductions_return_python_numbers() -> PyResult<()> {
    ensure_python_initialized();

    Python::with_gil(|py| -> PyResult<()> {
        let module = init(py)?;
        let bytes = typed_array(py, "b", PyList::new_bound(py, vec![100; 50]))?;
        let total: i64 = module.getattr("asum")?.call1((bytes,))?.extract()?;
        assert_eq!(total, 5000);

        let floats = typed_array(py, "d", PyList::new_bound(py, [1.5, f64::NAN]))?;
        let nan: bool = module.getattr("isnan")?.call1((floats.clone(),))?.extract()?;
        assert!(nan);
        let finite: bool = module.getattr("isfinite")?.call1((floats,))?.extract()?;
        assert!(!finite);

        let data = typed_array(py, "l", PyList::new_bound(py, [1, 2, 3, 4, 5, 6]))?;
        let out = typed_array(py, "l", PyList::new_bound(py, [0; 6]))?;
        let selector = typed_array(py, "l", PyList::new_bound(py, [0, 1]))?;
        let copied: usize = module
            .getattr("compress")?
            .call1((data, out.clone(), selector))?
            .extract()?;
        assert_eq!(copied, 3);
        let values: Vec<i64> = out.call_method0("tolist")?.extract()?;
        assert_eq!(values[..3], [2, 4, 6]);
        Ok(())
    })?;

    Ok(())
}

#[test]
fn simd_info_exposes_expected_keys() -> PyResult<()> {
    ensure_python_initialized();

    Python::with_gil(|py| -> PyResult<()> {
        let module = init(py)?;
        let info = module.getattr("simd_info")?.call0()?;
        let info = info.downcast::<PyDict>()?;
        assert!(info.contains("feature_level")?);
        assert!(info.contains("mode")?);
        assert!(info.contains("selected")?);

        let usage = module.getattr("simd_usage")?.call0()?;
        assert!(usage.downcast::<PyList>().is_ok());
        Ok(())
    })?;

    Ok(())
}
