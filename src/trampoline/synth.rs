use super::contract::{ArgSource, Divert, HookContract};
use crate::{
  assembler::{register_list, Assembler, Register},
  errors::PatchError,
  src_file::SourceLoc,
  symbol_table::{ScopedLookup, SymbolLookup},
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum StubLine {
  Label(String,),
  Instruction(String,),
}

/// Generated glue for one hook point.
///
/// ```text
/// name:            [cmp rF, #min; blt name_replay]
///                  push {saved}; [sub sp, sp, #4]
///                  load r0..r3 from the saved frame
///                  bl dispatch; cmp r0, #0; bne name_divert
///                  [add sp, sp, #4]; pop {saved}
/// name_replay:     replay; b hook+4
/// name_divert:     [str r1, <result slot>]; [add sp, sp, #4]; pop {saved}
///                  bx lr | b divert
/// ```
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Trampoline {
  pub name:String,
  /// Region of the hook point.
  pub region:String,
  pub hook_address:u32,
  lines:Vec<StubLine,>,
  loc:SourceLoc,
}

impl Trampoline {
  /// Builds the stub for `contract`, whose hook point is at `hook_address`.
  pub fn synthesize(contract:&HookContract, hook_address:u32, loc:&SourceLoc,) -> Trampoline {
    let name = &contract.name;
    let replay_label = format!("{name}_replay");
    let divert_label = format!("{name}_divert");

    let saved = contract.saved_registers();
    // Keep the stack 8 byte aligned across the call
    let pad = if saved.len() % 2 == 1 { 4 } else { 0 };
    let frame = pad + 4 * saved.len() as u32;
    let slot = |reg:Register| {
      let idx = saved.iter().position(|saved| *saved == reg,).unwrap_or_default();
      pad + 4 * idx as u32
    };

    let mut lines = vec![StubLine::Label(name.clone(),)];
    let mut emit = |text:String| lines.push(StubLine::Instruction(text,),);

    if let Some(filter,) = contract.filter {
      emit(format!("cmp {}, #{:#x}", filter.register, filter.min),);
      emit(format!("blt {replay_label}"),);
    }

    emit(format!("push {}", register_list(&saved,)),);
    if pad != 0 {
      emit("sub sp, sp, #4".to_string(),);
    }
    for (idx, arg,) in contract.args.iter().enumerate() {
      match arg {
        ArgSource::Register(reg,) => emit(format!("ldr r{idx}, [sp, #{:#x}]", slot(*reg)),),
        ArgSource::Stack(offset,) => emit(format!("ldr r{idx}, [sp, #{:#x}]", frame + offset),),
        ArgSource::Immediate(imm,) => emit(format!("mov r{idx}, #{imm:#x}"),),
      }
    }
    emit(format!("bl {}", contract.dispatch),);
    emit("cmp r0, #0".to_string(),);
    emit(format!("bne {divert_label}"),);
    if pad != 0 {
      emit("add sp, sp, #4".to_string(),);
    }
    emit(format!("pop {}", register_list(&saved,)),);

    lines.push(StubLine::Label(replay_label,),);
    for replay in &contract.replay {
      lines.push(StubLine::Instruction(replay.trim().to_string(),),);
    }
    lines.push(StubLine::Instruction(format!("b {:#x}", hook_address.wrapping_add(4,)),),);

    lines.push(StubLine::Label(divert_label,),);
    if let Some(result,) = contract.result {
      lines.push(StubLine::Instruction(format!("str r1, [sp, #{:#x}]", slot(result)),),);
    }
    if pad != 0 {
      lines.push(StubLine::Instruction("add sp, sp, #4".to_string(),),);
    }
    lines.push(StubLine::Instruction(format!("pop {}", register_list(&saved,)),),);
    lines.push(StubLine::Instruction(match &contract.divert {
      Divert::Return => "bx lr".to_string(),
      Divert::Branch(target,) => format!("b {target}"),
    },),);

    Trampoline {
      name:name.clone(),
      region:contract.region.clone(),
      hook_address,
      lines,
      loc:loc.clone(),
    }
  }

  pub fn lines(&self,) -> &[StubLine] {
    &self.lines
  }

  /// Assembly text of the stub.
  pub fn source(&self,) -> String {
    let mut out = format!("// {}: hook at {:#010x} in {}\n", self.name, self.hook_address, self.region);
    for line in &self.lines {
      match line {
        StubLine::Label(label,) => out.push_str(&format!("{label}:\n"),),
        StubLine::Instruction(text,) => out.push_str(&format!("  {text}\n"),),
      }
    }
    out
  }

  /// Assembles the stub at `origin`. Labels are resolved in a first pass that
  /// only measures instruction sizes.
  pub fn assemble(&self, origin:u32, assembler:&dyn Assembler, symbols:&dyn SymbolLookup,) -> Result<Vec<u8,>, PatchError,> {
    let placeholders = self
      .label_names()
      .map(|label| (label.to_string(), origin,),)
      .collect::<HashMap<_, _,>>();
    let (_, labels,) = self.pass(origin, assembler, symbols, &placeholders,)?;
    let (bytes, _,) = self.pass(origin, assembler, symbols, &labels,)?;
    Ok(bytes,)
  }

  fn label_names(&self,) -> impl Iterator<Item = &str,> {
    self.lines.iter().filter_map(|line| match line {
      StubLine::Label(label,) => Some(label.as_str(),),
      StubLine::Instruction(_,) => None,
    },)
  }

  fn pass(
    &self,
    origin:u32,
    assembler:&dyn Assembler,
    symbols:&dyn SymbolLookup,
    labels:&HashMap<String, u32,>,
  ) -> Result<(Vec<u8,>, HashMap<String, u32,>,), PatchError,> {
    let lookup = ScopedLookup { locals:labels, parent:symbols, };
    let mut bytes = Vec::new();
    let mut found = HashMap::new();

    for line in &self.lines {
      let address = origin.wrapping_add(bytes.len() as u32,);
      match line {
        StubLine::Label(label,) => {
          found.insert(label.clone(), address,);
        }
        StubLine::Instruction(text,) => {
          let code = assembler
            .assemble(text, address, &lookup,)
            .map_err(|err| PatchError::from_asm(err, text, self.loc.clone(),),)?;
          bytes.extend_from_slice(&code,);
        }
      }
    }
    Ok((bytes, found,),)
  }
}
