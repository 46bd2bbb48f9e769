use pasc_syntax::codegen::{BinaryOp, Label, Slot};
use pasc_syntax::{CType, ErrorCode, Instr, Value, compile};

const COUNTDOWN: &str = "\
program countdown;
var
  n: integer;
  total: real;
  done: boolean;
begin
  n := 3;
  while n > 0 do
  begin
    writeln('tick ', n);
    total := total + n / 2;
    n := n - 1
  end;
  done := n = 0;
  if done then writeln('total', total) else writeln('never')
end.
";

#[test]
fn compiles_a_complete_program() -> anyhow::Result<()> {
    let program = compile(COUNTDOWN)?;
    assert_eq!(program.slots, vec![CType::Integer, CType::Real, CType::Boolean]);
    assert_eq!(program.code.last(), Some(&Instr::Halt));

    let targets = program.label_targets();
    assert_eq!(targets.len(), 4);
    for instr in &program.code {
        if let Instr::Jump(label) | Instr::JumpIfFalse(label) = instr {
            assert!(targets.contains_key(label), "{label} is never marked");
        }
    }
    Ok(())
}

#[test]
fn compilation_is_deterministic() -> anyhow::Result<()> {
    let first = compile(COUNTDOWN)?;
    let second = compile(COUNTDOWN)?;
    assert_eq!(first, second);
    assert_eq!(serde_json::to_vec(&first)?, serde_json::to_vec(&second)?);
    assert_eq!(first.to_string(), second.to_string());
    Ok(())
}

#[test]
fn program_survives_json() -> anyhow::Result<()> {
    let program = compile(COUNTDOWN)?;
    let json = serde_json::to_string(&program)?;
    let back: pasc_syntax::Program = serde_json::from_str(&json)?;
    assert_eq!(back, program);
    Ok(())
}

#[test]
fn simple_assignment_code() -> anyhow::Result<()> {
    let program = compile("program p; var x: integer; begin x := 1 + 2 end.")?;
    assert_eq!(
        program.code,
        vec![
            Instr::Push(Value::Integer(0)),
            Instr::Store(Slot(0)),
            Instr::Push(Value::Integer(1)),
            Instr::Push(Value::Integer(2)),
            Instr::Binary(BinaryOp::Add),
            Instr::Store(Slot(0)),
            Instr::Halt,
        ]
    );
    Ok(())
}

#[test]
fn while_loop_layout() -> anyhow::Result<()> {
    let program = compile("program p; var b: boolean; begin while b do b := false end.")?;
    assert_eq!(
        program.code[2..],
        [
            Instr::Label(Label(0)),
            Instr::Load(Slot(0)),
            Instr::JumpIfFalse(Label(1)),
            Instr::Push(Value::Boolean(false)),
            Instr::Store(Slot(0)),
            Instr::Jump(Label(0)),
            Instr::Label(Label(1)),
            Instr::Halt,
        ]
    );
    Ok(())
}

#[test]
fn mixing_integer_and_string_is_a_type_error() {
    let failure = compile("program p; var x: integer; begin x := 1 + 'a' end.").unwrap_err();
    assert_eq!(failure.codes(), vec![ErrorCode::TypeError]);
    let fatal = failure.fatal.unwrap();
    assert_eq!(fatal.line, 0);
    assert_eq!(fatal.position, 38);
}

#[test]
fn integer_condition_is_a_type_error() {
    let source = "program p;\nbegin\n  if 1 then writeln('x')\nend.";
    let failure = compile(source).unwrap_err();
    let fatal = failure.fatal.unwrap();
    assert_eq!(fatal.code(), ErrorCode::TypeError);
    assert_eq!(fatal.line, 2);
    assert_eq!(fatal.to_string().split(':').next(), Some("line 3"));
}

#[test]
fn lexical_errors_alone_withhold_the_program() {
    let failure = compile("program p; var x: integer; begin x := 99999999999 + 1 end.")
        .unwrap_err();
    assert!(failure.fatal.is_none());
    assert_eq!(failure.codes(), vec![ErrorCode::OverflowException]);
    assert_eq!(failure.count(), 1);
}

#[test]
fn unterminated_comment() {
    let failure = compile("program p; begin end { trailing").unwrap_err();
    assert_eq!(
        failure.codes(),
        vec![ErrorCode::CommentWithoutEnd, ErrorCode::SyntaxError]
    );
}

#[test]
fn lexical_diagnostics_come_before_the_fatal_one() {
    let source = "program p;\nvar s: string;\nbegin\n  s := 'open\n  + 1\nend.";
    let failure = compile(source).unwrap_err();
    let all = failure.all();
    assert_eq!(
        all.iter().map(|d| d.code()).collect::<Vec<_>>(),
        vec![ErrorCode::StringExceedsLine, ErrorCode::TypeError]
    );
    assert_eq!(all[0].line, 3);
    assert_eq!(all[1].line, 4);
    assert_eq!(failure.count(), 2);
}

#[test]
fn undeclared_and_duplicate_names() {
    let failure = compile("program p; begin y := 1 end.").unwrap_err();
    assert_eq!(failure.codes(), vec![ErrorCode::UndefinedIdentifier]);

    let failure = compile("program p; var a: integer; A: real; begin end.").unwrap_err();
    assert_eq!(failure.codes(), vec![ErrorCode::DuplicateIdentifier]);
}

#[test]
fn unsupported_features_are_syntax_errors() {
    for source in [
        "program p; const c = 1; begin end.",
        "program p; procedure q; begin end; begin end.",
        "program p; var a: array[1..2] of integer; begin end.",
        "program p; var i: integer; begin for i := 1 to 2 do writeln(i) end.",
        "program p; begin repeat until true end.",
    ] {
        let failure = compile(source).unwrap_err();
        assert_eq!(failure.codes(), vec![ErrorCode::SyntaxError], "{source}");
        let message = failure.fatal.unwrap().message();
        assert!(message.ends_with("are not supported"), "{message}");
    }
}
