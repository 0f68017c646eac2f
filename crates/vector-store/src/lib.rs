pub mod embedder;
pub mod error;
pub mod store;
pub mod templates;

pub use embedder::{Device, Embedder, EmbedderConfig, Purpose};
pub use error::{Result, VectorStoreError};
pub use store::{AnnIndex, SearchHit, VectorRow, VectorStore, ANN_THRESHOLD};
pub use templates::{
    classify_document_kind, DocumentKind, EmbeddingTemplates, QueryKind,
    EMBEDDING_TEMPLATES_SCHEMA_VERSION,
};
