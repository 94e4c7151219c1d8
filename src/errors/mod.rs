mod assembler_errors;
mod dispatch_errors;
mod error_printer;
mod patch_errors;
mod tokenizer_errors;

pub use assembler_errors::AsmError;
pub use dispatch_errors::DispatchError;
pub use error_printer::ErrorPrinter;
pub use patch_errors::PatchError;
pub use tokenizer_errors::LexError;
