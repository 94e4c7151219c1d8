use super::Outcome;
use crate::errors::DispatchError;

/// An owned table of entries addressed by id, starting at `first_id`. Built
/// once at startup and immutable afterwards. Lookups are bounds checked.
#[derive(Debug, Clone,)]
pub struct Registry<T,> {
  category:&'static str,
  first_id:u32,
  entries:Vec<T,>,
}

impl<T,> Registry<T,> {
  /// `category` doubles as the log target.
  pub fn new(category:&'static str, first_id:u32, entries:Vec<T,>,) -> Self {
    Registry {
      category,
      first_id,
      entries,
    }
  }

  /// Builds a registry from a static configuration list.
  pub fn from_static(category:&'static str, first_id:u32, entries:&[T],) -> Self
  where T: Clone {
    Self::new(category, first_id, entries.to_vec(),)
  }

  pub fn first_id(&self,) -> u32 {
    self.first_id
  }

  pub fn len(&self,) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.entries.is_empty()
  }

  /// Position of `id` inside the registry.
  pub fn index_of(&self, id:u32,) -> Result<usize, DispatchError,> {
    id.checked_sub(self.first_id,)
      .map(|idx| idx as usize,)
      .filter(|idx| *idx < self.entries.len(),)
      .ok_or(DispatchError::IndexOutOfRange {
        category:self.category,
        id,
        first:self.first_id,
        len:self.entries.len(),
      },)
  }

  pub fn get(&self, id:u32,) -> Result<&T, DispatchError,> {
    let idx = self.index_of(id,)?;
    Ok(&self.entries[idx],)
  }

  /// Runs `f` on the entry registered for `id`. An unknown id is logged and
  /// treated as not handled.
  pub fn dispatch<F,>(&self, id:u32, f:F,) -> Outcome
  where F: FnOnce(&T,) -> Outcome {
    match self.get(id,) {
      Ok(entry,) => f(entry,),
      Err(err,) => {
        log::error!(target: self.category, "{err}");
        Outcome::NotHandled
      }
    }
  }
}
