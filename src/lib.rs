//! Splices compiled code into a pre-built binary image.
//!
//! A build resolves symbol tables, generates trampolines from hook contracts,
//! assembles patch files into [`patch::PatchOperation`]s, applies them to the
//! image and injects the compiled blob into a reserved slot.

pub mod assembler;
pub mod cli_integration;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod expression;
pub mod image;
pub mod image_patcher;
pub mod injector;
pub mod patch;
pub mod patch_parser;
pub mod pipeline;
pub mod src_file;
pub mod symbol_file;
pub mod symbol_table;
pub mod tokenizer;
pub mod trampoline;

#[cfg(test)]
mod test;
