//! The runtime contract generated trampolines call into.
//!
//! A trampoline hands its normalized arguments to a dispatch function, which
//! walks a [`HandlerChain`] and returns an [`Outcome`] in `r0:r1`.

mod hooks;
mod instructions;
mod registry;

pub use hooks::{
  dispatch_registers, CustomInstructionArgs, HookArgs, HookCategory, ItemEffectArgs, MoveEffectArgs, ObjectRef,
  ScriptMenuArgs, SpecialProcessArgs,
};
pub use instructions::{CustomInstruction, CustomMenu, FIRST_CUSTOM_MENU, FIRST_CUSTOM_OPCODE};
pub use registry::Registry;

/// Result of offering an event to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Outcome {
  /// The handler took over. The payload is written to the hook's result
  /// register.
  Handled(Option<i32,>,),
  /// Continue with the original code.
  NotHandled,
}

impl Outcome {
  pub fn is_handled(&self,) -> bool {
    matches!(self, Outcome::Handled(_,))
  }

  pub fn payload(&self,) -> Option<i32,> {
    match self {
      Outcome::Handled(payload,) => *payload,
      Outcome::NotHandled => None,
    }
  }

  /// Encodes the outcome as the 64 bit value returned in `r0:r1`. `r0` is
  /// nonzero when handled, `r1` carries the payload.
  pub fn into_abi(self,) -> u64 {
    match self {
      Outcome::Handled(payload,) => (payload.unwrap_or(0,) as u32 as u64) << 32 | 1,
      Outcome::NotHandled => 0,
    }
  }

  /// Decodes an `r0:r1` pair. The ABI cannot tell a missing payload from a zero
  /// one, so a handled outcome always carries a payload.
  pub fn from_abi(value:u64,) -> Self {
    if value as u32 == 0 {
      Outcome::NotHandled
    }
    else {
      Outcome::Handled(Some((value >> 32) as u32 as i32,),)
    }
  }
}

/// Something that may handle an event with arguments `A`.
pub trait Handler<A:?Sized,> {
  fn try_handle(&self, args:&mut A,) -> Outcome;
}

impl<A:?Sized, F,> Handler<A,> for F
where F: Fn(&mut A,) -> Outcome
{
  fn try_handle(&self, args:&mut A,) -> Outcome {
    self(args,)
  }
}

/// Handlers consulted in priority order. The first one to handle an event wins
/// and the rest are not asked.
pub struct HandlerChain<A:?Sized,> {
  target:&'static str,
  handlers:Vec<(String, Box<dyn Handler<A,>,>,),>,
}

impl<A:?Sized,> HandlerChain<A,> {
  /// Creates an empty chain that logs under `target`.
  pub fn new(target:&'static str,) -> Self {
    HandlerChain {
      target,
      handlers:Vec::new(),
    }
  }

  /// Appends a handler with the lowest priority so far.
  pub fn push<H:Handler<A,> + 'static,>(&mut self, name:&str, handler:H,) {
    self.handlers.push((name.to_string(), Box::new(handler,),),);
  }

  /// Builder form of [`HandlerChain::push`].
  pub fn with<H:Handler<A,> + 'static,>(mut self, name:&str, handler:H,) -> Self {
    self.push(name, handler,);
    self
  }

  pub fn len(&self,) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self,) -> bool {
    self.handlers.is_empty()
  }

  pub fn dispatch(&self, args:&mut A,) -> Outcome {
    for (name, handler,) in &self.handlers {
      let outcome = handler.try_handle(args,);
      if outcome.is_handled() {
        log::trace!(target: self.target, "handled by {name}");
        return outcome;
      }
    }
    Outcome::NotHandled
  }
}
