//! Python bindings (enabled with the `python` feature)

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use crate::lists::{CollisionPolicy, ImportOutcome, ListRepository};
use crate::spreadsheet;
use crate::storage::SqliteStore;

fn to_py_err(e: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

fn open_repo(db_path: &str) -> PyResult<ListRepository<SqliteStore>> {
    let store = SqliteStore::open(db_path).map_err(to_py_err)?;
    Ok(ListRepository::new(store))
}

/// A word as seen from Python
#[pyclass(name = "Word")]
#[derive(Debug, Clone)]
pub struct PyWord {
    #[pyo3(get)]
    pub english: String,
    #[pyo3(get)]
    pub turkish: String,
    #[pyo3(get)]
    pub status: String,
    #[pyo3(get)]
    pub example_sentence: Option<String>,
    #[pyo3(get)]
    pub correct_count: u32,
}

#[pymethods]
impl PyWord {
    fn __repr__(&self) -> String {
        format!(
            "Word(english='{}', turkish='{}', status='{}')",
            self.english, self.turkish, self.status
        )
    }
}

impl From<crate::word::WordRecord> for PyWord {
    fn from(r: crate::word::WordRecord) -> Self {
        PyWord {
            english: r.english,
            turkish: r.turkish,
            status: r.status.to_string(),
            example_sentence: r.example_sentence,
            correct_count: r.correct_count,
        }
    }
}

#[pyfunction]
#[pyo3(name = "import_file")]
pub fn py_import_file(db_path: &str, file_path: &str, list_name: &str) -> PyResult<usize> {
    let rows = spreadsheet::read_rows(file_path).map_err(to_py_err)?;
    let mut repo = open_repo(db_path)?;
    repo.merge_rows(list_name, rows, &mut rand::thread_rng())
        .map_err(to_py_err)
}

#[pyfunction]
#[pyo3(name = "list_names")]
pub fn py_list_names(db_path: &str) -> PyResult<Vec<String>> {
    let repo = open_repo(db_path)?;
    let lists = repo.lists().map_err(to_py_err)?;
    Ok(lists.into_iter().map(|l| l.name).collect())
}

#[pyfunction]
#[pyo3(name = "get_words")]
pub fn py_get_words(db_path: &str, list_name: &str) -> PyResult<Vec<PyWord>> {
    let repo = open_repo(db_path)?;
    let list = repo.load_list(list_name).map_err(to_py_err)?;
    Ok(list.cards.into_iter().map(PyWord::from).collect())
}

#[pyfunction]
#[pyo3(name = "get_practice_words")]
pub fn py_get_practice_words(db_path: &str) -> PyResult<Vec<PyWord>> {
    let repo = open_repo(db_path)?;
    let words = repo.practice_words().map_err(to_py_err)?;
    Ok(words.into_iter().map(PyWord::from).collect())
}

#[pyfunction]
#[pyo3(name = "export_list")]
pub fn py_export_list(db_path: &str, list_name: &str) -> PyResult<String> {
    open_repo(db_path)?.export_list(list_name).map_err(to_py_err)
}

/// Returns True when an existing list was replaced
#[pyfunction]
#[pyo3(name = "import_list")]
pub fn py_import_list(db_path: &str, contents: &str, overwrite: Option<bool>) -> PyResult<bool> {
    let policy = if overwrite.unwrap_or(false) {
        CollisionPolicy::Overwrite
    } else {
        CollisionPolicy::Abort
    };
    let outcome = open_repo(db_path)?.import_list(contents, policy).map_err(to_py_err)?;
    Ok(outcome == ImportOutcome::Replaced)
}

#[pyfunction]
#[pyo3(name = "delete_list")]
pub fn py_delete_list(db_path: &str, list_name: &str) -> PyResult<bool> {
    open_repo(db_path)?.delete_list(list_name).map_err(to_py_err)
}

/// Flashdeck Core Python Module
#[pymodule]
fn flashdeck_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_import_file, m)?)?;
    m.add_function(wrap_pyfunction!(py_list_names, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_words, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_practice_words, m)?)?;
    m.add_function(wrap_pyfunction!(py_export_list, m)?)?;
    m.add_function(wrap_pyfunction!(py_import_list, m)?)?;
    m.add_function(wrap_pyfunction!(py_delete_list, m)?)?;

    m.add_class::<PyWord>()?;

    Ok(())
}
