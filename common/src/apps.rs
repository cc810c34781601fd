use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use crate::kv::KeyValue;

/// Funciones de usuario que ejecuta el worker.
/// Tienen que ser deterministas: una tarea puede correr más de una vez.
pub trait MapReduceApp: Send + Sync {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue>;

    fn reduce(&self, key: &str, values: &[String]) -> String;
}

/// Separa en palabras: cualquier cosa que no sea letra corta la palabra.
fn words(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
}

/// WordCount clásico: (palabra, "1") en map, cantidad de valores en reduce.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCount;

impl MapReduceApp for WordCount {
    fn map(&self, _filename: &str, contents: &str) -> Vec<KeyValue> {
        words(contents).map(|w| KeyValue::new(w, "1")).collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        values.len().to_string()
    }
}

/// Índice invertido: para cada palabra, en qué archivos aparece.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvertedIndex;

impl MapReduceApp for InvertedIndex {
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        let mut seen = HashSet::new();
        words(contents)
            .filter(|w| seen.insert(*w))
            .map(|w| KeyValue::new(w, filename))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let files: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        let joined = files.iter().copied().collect::<Vec<_>>().join(",");
        format!("{} {}", files.len(), joined)
    }
}

pub const APP_NAMES: &[&str] = &["wordcount", "indexer"];

/// Busca una app por nombre (el que se pasa con `--app`).
pub fn app_by_name(name: &str) -> Option<Arc<dyn MapReduceApp>> {
    match name.to_ascii_lowercase().as_str() {
        "wordcount" | "wc" => Some(Arc::new(WordCount)),
        "indexer" | "index" => Some(Arc::new(InvertedIndex)),
        _ => None,
    }
}
