//! Ejecución de una tarea map o reduce ya asignada. Todo es bloqueante; el
//! loop del worker lo corre dentro de `spawn_blocking`.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use common::{
    bucket_by_partition, write_output_atomically, IntermediateStore, LocalIntermediateStore,
    MapReduceApp, TaskDescriptor, TaskKind,
};

/// Ejecuta la tarea usando el directorio intermedio que indica el descriptor.
pub fn execute(app: &dyn MapReduceApp, task: &TaskDescriptor, reducers: u32) -> Result<()> {
    match task.kind {
        TaskKind::Map => {
            let store = LocalIntermediateStore::new(&task.output);
            run_map(app, task, reducers, &store)
        }
        TaskKind::Reduce => {
            let store = LocalIntermediateStore::new(&task.input);
            run_reduce(app, task, &store)
        }
    }
}

/// Lee el archivo entero, aplica `map` y publica las `reducers` particiones
/// de este mapper (también las vacías, para que un reintento pise todo).
pub fn run_map<S: IntermediateStore>(
    app: &dyn MapReduceApp,
    task: &TaskDescriptor,
    reducers: u32,
    store: &S,
) -> Result<()> {
    let contents = fs::read_to_string(&task.input)
        .with_context(|| format!("no se pudo leer la entrada {}", task.input))?;

    let pairs = app.map(&task.input, &contents);
    let emitted = pairs.len();
    let buckets = bucket_by_partition(pairs, reducers);

    for (pid, records) in buckets.iter().enumerate() {
        store
            .write_partition(task.id, pid as u32, records)
            .with_context(|| {
                format!("map {}: no se pudo escribir la partición {}", task.id, pid)
            })?;
    }

    info!("map {} listo: {} pares en {} particiones", task.id, emitted, reducers);
    Ok(())
}

/// Junta la partición `task.id` de todos los mappers, agrupa por clave y
/// escribe `<clave> <valor>` por línea, ordenado por clave.
pub fn run_reduce<S: IntermediateStore>(
    app: &dyn MapReduceApp,
    task: &TaskDescriptor,
    store: &S,
) -> Result<()> {
    let records = store
        .read_partition(task.id)
        .with_context(|| format!("reduce {}: no se pudo leer la partición", task.id))?;

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for kv in records {
        grouped.entry(kv.key).or_default().push(kv.value);
    }

    let lines: Vec<(String, String)> = grouped
        .into_iter()
        .map(|(key, values)| {
            let out = app.reduce(&key, &values);
            (key, out)
        })
        .collect();

    write_output_atomically(Path::new(&task.output), &lines)
        .with_context(|| format!("reduce {}: no se pudo escribir {}", task.id, task.output))?;

    info!("reduce {} listo: {} claves -> {}", task.id, lines.len(), task.output);
    Ok(())
}
