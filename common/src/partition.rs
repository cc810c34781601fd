use std::hash::Hasher;

use fnv::FnvHasher;

use crate::kv::KeyValue;

/// Hash estable de una clave intermedia (FNV-1a, 31 bits).
/// No depende del proceso ni de la versión del compilador, así que todos los
/// workers mandan la misma clave a la misma partición.
pub fn ihash(key: &str) -> u32 {
    let mut h = FnvHasher::default();
    h.write(key.as_bytes());
    (h.finish() & 0x7fff_ffff) as u32
}

/// Partición (reducer) que le toca a `key`: `ihash(key) % reducers`.
pub fn partition_for(key: &str, reducers: u32) -> u32 {
    debug_assert!(reducers > 0, "reducers debe ser >= 1");
    ihash(key) % reducers.max(1)
}

/// Reparte los pares en `reducers` buckets; el índice del vector es la partición.
/// Siempre devuelve `reducers` buckets, aunque alguno quede vacío.
pub fn bucket_by_partition(pairs: Vec<KeyValue>, reducers: u32) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = (0..reducers.max(1)).map(|_| Vec::new()).collect();
    for kv in pairs {
        let pid = partition_for(&kv.key, reducers) as usize;
        buckets[pid].push(kv);
    }
    buckets
}
