mod assembler_tests;
mod dispatch_tests;
mod image_patcher_tests;
mod patch_parser_tests;
mod symbol_table_tests;
