pub mod namespaces;
mod tokenizer;

pub use tokenizer::StreamTokenizer;
