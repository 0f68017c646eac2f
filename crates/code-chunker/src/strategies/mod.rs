pub mod ast;
pub mod character;
pub mod code_aware;
pub mod line_count;
pub mod markdown;
