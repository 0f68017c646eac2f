pub mod engine;
pub mod error;
pub mod memory;
pub mod native;
pub mod stemmer;
pub mod tokenize;

pub use engine::{
    normalize_scores, open_fts_engine, persist_memory_engine, EngineChoice, FtsEngine, FtsHit,
    FtsStats, NATIVE_ENGINE_FILE_THRESHOLD,
};
pub use error::{FtsError, Result};
pub use memory::MemoryFtsEngine;
pub use native::NativeFtsEngine;
