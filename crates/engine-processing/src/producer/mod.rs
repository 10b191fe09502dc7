pub mod chunk_reader;
