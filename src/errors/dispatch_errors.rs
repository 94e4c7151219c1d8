use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq,)]
pub enum DispatchError {
  #[error(
    "\x1b[93mDISPATCH INDEX OUT OF RANGE:\x1b[0m {category} id {id} is not registered; ids start at {first} and {len} are registered."
  )]
  IndexOutOfRange {
    category:&'static str,
    id:u32,
    first:u32,
    len:usize,
  },
}
