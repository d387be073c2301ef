pub mod document_loader;
pub mod ingestion_service;
pub mod kpi_service;
pub mod llm_service;
pub mod rag_pipeline;
pub mod rag_service;
pub mod text_splitter;
pub mod vector_store;
