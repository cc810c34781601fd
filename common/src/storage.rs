//! Almacenamiento de particiones intermedias y salidas finales.
//!
//! Los workers sólo ven dos operaciones: "escribir la partición completa de
//! (mapper, partición)" y "leer todas las particiones de un índice". Cómo se
//! llaman los archivos queda escondido acá.

use std::{
    fs,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::kv::KeyValue;
use crate::task::TaskId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error en {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("registro inválido en {path}:{line}: {source}")]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("patrón de búsqueda inválido: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Nombre del archivo intermedio de (mapper, partición).
pub fn partition_file_name(mapper_id: TaskId, partition: u32) -> String {
    format!("mr-{}-{}", mapper_id, partition)
}

/// Nombre del archivo final de un reducer.
pub fn output_file_name(reduce_id: TaskId) -> String {
    format!("mr-out-{}", reduce_id)
}

pub trait IntermediateStore {
    /// Publica la partición completa; un lector nunca ve un archivo a medias.
    fn write_partition(
        &self,
        mapper_id: TaskId,
        partition: u32,
        records: &[KeyValue],
    ) -> StoreResult<()>;

    /// Lee los registros de `partition` de todos los mappers.
    fn read_partition(&self, partition: u32) -> StoreResult<Vec<KeyValue>>;
}

/// Particiones como archivos JSONL en un directorio local (o NFS compartido).
#[derive(Debug, Clone)]
pub struct LocalIntermediateStore {
    dir: PathBuf,
}

impl LocalIntermediateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn partition_path(&self, mapper_id: TaskId, partition: u32) -> PathBuf {
        self.dir.join(partition_file_name(mapper_id, partition))
    }

    /// Archivos `mr-<mapper>-<partition>` existentes, ordenados por nombre.
    pub fn partition_files(&self, partition: u32) -> StoreResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .glob_in_dir(&format!("mr-*-{}", partition))?
            .into_iter()
            .filter(|p| matches!(parse_partition_file(p), Some((_, pid)) if pid == partition))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Borra los archivos intermedios que haya dejado una corrida anterior.
    /// Sólo toca nombres `mr-<mapper>-<partition>`; el resto del directorio
    /// queda como está.
    pub fn clear(&self) -> StoreResult<usize> {
        let stale: Vec<PathBuf> = self
            .glob_in_dir("mr-*-*")?
            .into_iter()
            .filter(|p| parse_partition_file(p).is_some())
            .collect();

        for path in &stale {
            fs::remove_file(path).map_err(io_err(path))?;
        }
        Ok(stale.len())
    }

    // El directorio puede traer `[`, `*` o `?`; sólo el nombre es patrón.
    fn glob_in_dir(&self, file_pattern: &str) -> StoreResult<Vec<PathBuf>> {
        let dir = glob::Pattern::escape(&self.dir.to_string_lossy());
        let pattern = Path::new(&dir).join(file_pattern);
        Ok(glob::glob(&pattern.to_string_lossy())?
            .flatten()
            .filter(|p| p.is_file())
            .collect())
    }
}

/// `mr-*-3` también matchea `mr-out-3` y, con nombres raros, `mr-1-2-3`;
/// sólo cuenta `mr-<número>-<número>`.
fn parse_partition_file(path: &Path) -> Option<(TaskId, u32)> {
    let name = path.file_name()?.to_str()?;
    let mut parts = name.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("mr"), Some(mapper), Some(pid), None) => {
            Some((mapper.parse().ok()?, pid.parse().ok()?))
        }
        _ => None,
    }
}

impl IntermediateStore for LocalIntermediateStore {
    fn write_partition(
        &self,
        mapper_id: TaskId,
        partition: u32,
        records: &[KeyValue],
    ) -> StoreResult<()> {
        let path = self.partition_path(mapper_id, partition);
        write_atomically(&path, |w| {
            for kv in records {
                serde_json::to_writer(&mut *w, kv).map_err(io::Error::from)?;
                w.write_all(b"\n")?;
            }
            Ok(())
        })?;
        debug!("partición publicada {} ({} registros)", path.display(), records.len());
        Ok(())
    }

    fn read_partition(&self, partition: u32) -> StoreResult<Vec<KeyValue>> {
        let mut out = Vec::new();
        for path in self.partition_files(partition)? {
            read_jsonl_into(&path, &mut out)?;
        }
        Ok(out)
    }
}

fn read_jsonl_into(path: &Path, out: &mut Vec<KeyValue>) -> StoreResult<()> {
    let file = fs::File::open(path).map_err(io_err(path))?;
    let reader = BufReader::new(file);

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(kv);
    }
    Ok(())
}

/// Escribe la salida final de un reducer: una línea `<clave> <valor>` por par.
pub fn write_output_atomically(path: &Path, lines: &[(String, String)]) -> StoreResult<()> {
    write_atomically(path, |w| {
        for (key, value) in lines {
            writeln!(w, "{} {}", key, value)?;
        }
        Ok(())
    })
}

/// Escribe en un temporal del mismo directorio y lo renombra al destino sólo
/// después del flush. Si el proceso muere antes, el temporal se descarta y el
/// destino queda como estaba.
fn write_atomically<F>(path: &Path, fill: F) -> StoreResult<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_err(&parent))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err(&parent))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        fill(&mut writer).map_err(io_err(path))?;
        writer.flush().map_err(io_err(path))?;
    }
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
