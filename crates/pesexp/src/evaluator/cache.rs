use std::{path::Path, sync::RwLock};

use normal::GeneralizedCoordinateVector;
use psqs::Calculation;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// one oracle result and the point it was computed at
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub vector: GeneralizedCoordinateVector,
    pub calc: Calculation,
}

/// Oracle results keyed by generalized coordinate vector. Vectors are rounded
/// to `resolution` before hashing, so two stencils that land on the same point
/// share one calculation. Inserting is insert-if-absent: the first result for
/// a point wins and later ones are dropped.
#[derive(Debug)]
pub struct SampleCache {
    resolution: f64,
    map: RwLock<FxHashMap<Vec<i64>, Sample>>,
}

impl SampleCache {
    pub fn new(resolution: f64) -> Self {
        Self {
            resolution,
            map: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn key(&self, vector: &GeneralizedCoordinateVector) -> Vec<i64> {
        vector.key(self.resolution)
    }

    /// store `calc` for `vector` unless there is already a result there.
    /// returns whether anything was inserted
    pub fn insert(
        &self,
        vector: &GeneralizedCoordinateVector,
        calc: Calculation,
    ) -> bool {
        let key = self.key(vector);
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        if map.contains_key(&key) {
            log::trace!("already have a result for {vector}");
            return false;
        }
        map.insert(
            key,
            Sample {
                vector: vector.clone(),
                calc,
            },
        );
        true
    }

    pub fn get(
        &self,
        vector: &GeneralizedCoordinateVector,
    ) -> Option<Calculation> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(&self.key(vector)).map(|s| s.calc.clone())
    }

    pub fn contains(&self, vector: &GeneralizedCoordinateVector) -> bool {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.contains_key(&self.key(vector))
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// every stored sample, sorted by key so the output is reproducible
    pub fn samples(&self) -> Vec<Sample> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        let mut pairs: Vec<_> = map.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter().map(|(_, s)| s.clone()).collect()
    }

    /// write the samples to `path` as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let f = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(f, &self.samples())?;
        Ok(())
    }

    /// load samples written by [SampleCache::save], rounding them to
    /// `resolution`
    pub fn load(
        path: impl AsRef<Path>,
        resolution: f64,
    ) -> std::io::Result<Self> {
        let f = std::fs::File::open(path)?;
        let samples: Vec<Sample> = serde_json::from_reader(f)?;
        let ret = Self::new(resolution);
        for Sample { vector, calc } in samples {
            ret.insert(&vector, calc);
        }
        Ok(ret)
    }
}
