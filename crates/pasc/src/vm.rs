//! Interpreter for compiled programs.
//!
//! Runs the instruction list over an operand stack and one value per slot.
//! Labels are resolved once before the first instruction executes.

use std::collections::HashMap;
use std::io::Write;

use pasc_syntax::codegen::{BinaryOp, Label, Slot};
use pasc_syntax::{Instr, Program, Value};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub(crate) struct VmConfig {
    /// Upper bound on executed instructions. `None` runs until `halt`.
    pub(crate) max_steps: Option<u64>,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum VmError {
    #[error("division by zero at instruction {at}")]
    DivisionByZero { at: usize },

    #[error("operand stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    #[error("`{instr}` at instruction {at} cannot operate on {found}")]
    KindMismatch {
        at: usize,
        instr: String,
        found: String,
    },

    #[error("jump to unknown label {0}")]
    UnknownLabel(Label),

    #[error("slot {0} is not declared")]
    UnknownSlot(Slot),

    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),

    #[error("failed to write program output")]
    Output(#[from] std::io::Error),
}

/// Runs `program` to completion, writing its output to `out`. Returns the
/// number of executed instructions.
pub(crate) fn run<W: Write>(
    program: &Program,
    out: W,
    config: &VmConfig,
) -> Result<u64, VmError> {
    let mut vm = Vm::new(program, out, config)?;
    let steps = vm.execute()?;
    debug!(steps, "program halted");
    Ok(steps)
}

struct Vm<'p, W> {
    code: &'p [Instr],
    targets: HashMap<Label, usize>,
    stack: Vec<Value>,
    slots: Vec<Value>,
    out: W,
    max_steps: Option<u64>,
}

impl<'p, W: Write> Vm<'p, W> {
    fn new(program: &'p Program, out: W, config: &VmConfig) -> Result<Self, VmError> {
        let targets = program.label_targets();
        for instr in &program.code {
            if let Instr::Jump(label) | Instr::JumpIfFalse(label) = instr {
                if !targets.contains_key(label) {
                    return Err(VmError::UnknownLabel(*label));
                }
            }
        }
        Ok(Vm {
            code: &program.code,
            targets,
            stack: Vec::new(),
            slots: program.slots.iter().map(|ty| ty.zero_value()).collect(),
            out,
            max_steps: config.max_steps,
        })
    }

    fn execute(&mut self) -> Result<u64, VmError> {
        let code = self.code;
        let mut pc = 0;
        let mut steps = 0u64;

        while let Some(instr) = code.get(pc) {
            steps += 1;
            if self.max_steps.is_some_and(|limit| steps > limit) {
                return Err(VmError::StepLimit(steps - 1));
            }
            trace!(pc, depth = self.stack.len(), "{instr}");

            let at = pc;
            pc += 1;
            match instr {
                Instr::Push(value) => self.stack.push(value.clone()),
                Instr::Load(slot) => {
                    let value = self.slot(*slot)?.clone();
                    self.stack.push(value);
                }
                Instr::Store(slot) => {
                    let value = self.pop(at)?;
                    *self.slot(*slot)? = value;
                }
                Instr::Neg => {
                    let value = match self.pop(at)? {
                        Value::Integer(v) => Value::Integer(v.wrapping_neg()),
                        Value::Real(v) => Value::Real(-v),
                        other => return Err(mismatch(at, instr, &[other])),
                    };
                    self.stack.push(value);
                }
                Instr::Not => {
                    let value = match self.pop(at)? {
                        Value::Boolean(v) => Value::Boolean(!v),
                        other => return Err(mismatch(at, instr, &[other])),
                    };
                    self.stack.push(value);
                }
                Instr::Widen => {
                    let value = match self.pop(at)? {
                        Value::Integer(v) => Value::Real(f64::from(v)),
                        other => return Err(mismatch(at, instr, &[other])),
                    };
                    self.stack.push(value);
                }
                Instr::Binary(op) => {
                    let right = self.pop(at)?;
                    let left = self.pop(at)?;
                    let value = binary(*op, left, right, at, instr)?;
                    self.stack.push(value);
                }
                Instr::Concat => {
                    let right = self.pop(at)?;
                    let left = self.pop(at)?;
                    match (left, right) {
                        (Value::String(mut l), Value::String(r)) => {
                            l.push_str(&r);
                            self.stack.push(Value::String(l));
                        }
                        (l, r) => return Err(mismatch(at, instr, &[l, r])),
                    }
                }
                Instr::Label(_) => {}
                Instr::Jump(label) => pc = self.target(*label)?,
                Instr::JumpIfFalse(label) => match self.pop(at)? {
                    Value::Boolean(true) => {}
                    Value::Boolean(false) => pc = self.target(*label)?,
                    other => return Err(mismatch(at, instr, &[other])),
                },
                Instr::Print(ty) => {
                    let value = self.pop(at)?;
                    if value.ty() != *ty {
                        return Err(mismatch(at, instr, &[value]));
                    }
                    writeln!(self.out, "{}", render(&value))?;
                }
                Instr::Halt => break,
            }
        }

        self.out.flush()?;
        Ok(steps)
    }

    fn pop(&mut self, at: usize) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { at })
    }

    fn slot(&mut self, slot: Slot) -> Result<&mut Value, VmError> {
        self.slots
            .get_mut(slot.0 as usize)
            .ok_or(VmError::UnknownSlot(slot))
    }

    fn target(&self, label: Label) -> Result<usize, VmError> {
        self.targets
            .get(&label)
            .copied()
            .ok_or(VmError::UnknownLabel(label))
    }
}

fn mismatch(at: usize, instr: &Instr, operands: &[Value]) -> VmError {
    let found = operands
        .iter()
        .map(|value| value.ty().to_string())
        .collect::<Vec<_>>()
        .join(" and ");
    VmError::KindMismatch {
        at,
        instr: instr.to_string().trim().to_owned(),
        found,
    }
}

fn binary(
    op: BinaryOp,
    left: Value,
    right: Value,
    at: usize,
    instr: &Instr,
) -> Result<Value, VmError> {
    use Value::*;

    let value = match (op, left, right) {
        (BinaryOp::Div | BinaryOp::Mod, Integer(_), Integer(0)) => {
            return Err(VmError::DivisionByZero { at });
        }
        (BinaryOp::Add, Integer(l), Integer(r)) => Integer(l.wrapping_add(r)),
        (BinaryOp::Sub, Integer(l), Integer(r)) => Integer(l.wrapping_sub(r)),
        (BinaryOp::Mul, Integer(l), Integer(r)) => Integer(l.wrapping_mul(r)),
        (BinaryOp::Div, Integer(l), Integer(r)) => Integer(l.wrapping_div(r)),
        (BinaryOp::Mod, Integer(l), Integer(r)) => Integer(l.wrapping_rem(r)),
        (BinaryOp::Eq, Integer(l), Integer(r)) => Boolean(l == r),
        (BinaryOp::Lt, Integer(l), Integer(r)) => Boolean(l < r),
        (BinaryOp::Gt, Integer(l), Integer(r)) => Boolean(l > r),

        (BinaryOp::And, Boolean(l), Boolean(r)) => Boolean(l && r),
        (BinaryOp::Or, Boolean(l), Boolean(r)) => Boolean(l || r),
        (BinaryOp::Eq, Boolean(l), Boolean(r)) => Boolean(l == r),
        (BinaryOp::Eq, String(l), String(r)) => Boolean(l == r),

        (op, left, right) => match (as_real(&left), as_real(&right)) {
            (Some(_), Some(r)) if op == BinaryOp::Div && r == 0.0 => {
                return Err(VmError::DivisionByZero { at });
            }
            (Some(l), Some(r)) => match op {
                BinaryOp::Add => Real(l + r),
                BinaryOp::Sub => Real(l - r),
                BinaryOp::Mul => Real(l * r),
                BinaryOp::Div => Real(l / r),
                BinaryOp::Eq => Boolean(l == r),
                BinaryOp::Lt => Boolean(l < r),
                BinaryOp::Gt => Boolean(l > r),
                BinaryOp::Mod | BinaryOp::And | BinaryOp::Or => {
                    return Err(mismatch(at, instr, &[left, right]));
                }
            },
            _ => return Err(mismatch(at, instr, &[left, right])),
        },
    };
    Ok(value)
}

/// Integers take part in real arithmetic when mixed with reals.
fn as_real(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(f64::from(*v)),
        Value::Real(v) => Some(*v),
        _ => None,
    }
}

/// Text written by `print`.
fn render(value: &Value) -> String {
    match value {
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Boolean(true) => "True".to_owned(),
        Value::Boolean(false) => "False".to_owned(),
    }
}
