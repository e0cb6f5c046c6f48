use insta::assert_snapshot;
use quill::{compile, Backend, CompileError, CompileOptions, GenError};
use quill_value::chunk::OpCode;

fn text(source: &str) -> String {
    let program = compile(source, &CompileOptions::default()).unwrap();
    program.as_text().unwrap().to_string()
}

fn error(source: &str) -> CompileError {
    compile(source, &CompileOptions::default()).unwrap_err()
}

#[test]
fn test_factorial() {
    assert_snapshot!(text("
        ' recursive factorial
        function fact(n as integer) as integer
            if n < 2 then
                return 1
            end if
            return n * fact(n - 1)
        end function

        dim result as integer = fact(5)
        print(result)
    "), @r###"
    .IFJcode17
    DEFVAR GF@$lhs
    DEFVAR GF@$rhs
    DEFVAR GF@$ltype
    DEFVAR GF@$rtype
    DEFVAR GF@$result
    DEFVAR GF@result
    JUMP FUNCTION_END_fact
    LABEL fact
    CREATEFRAME
    DEFVAR TF@n
    POPS TF@n
    TYPE GF@$ltype TF@n
    TYPE GF@$rtype int@2
    JUMPIFNEQ TYPE_MISMATCH GF@$ltype GF@$rtype
    LT GF@$result TF@n int@2
    JUMPIFEQ RES_IF_1 GF@$result bool@true
    JUMP END_IF_1
    LABEL RES_IF_1
    PUSHS int@1
    RETURN
    JUMP END_IF_1
    LABEL END_IF_1
    TYPE GF@$ltype TF@n
    TYPE GF@$rtype int@1
    JUMPIFNEQ TYPE_MISMATCH GF@$ltype GF@$rtype
    SUB GF@$result TF@n int@1
    PUSHS GF@$result
    PUSHFRAME
    CALL fact
    POPFRAME
    POPS GF@$rhs
    TYPE GF@$ltype TF@n
    TYPE GF@$rtype GF@$rhs
    JUMPIFNEQ TYPE_MISMATCH GF@$ltype GF@$rtype
    MUL GF@$result TF@n GF@$rhs
    PUSHS GF@$result
    RETURN
    PUSHS int@0
    RETURN
    LABEL FUNCTION_END_fact
    PUSHS int@5
    CREATEFRAME
    PUSHFRAME
    CALL fact
    POPFRAME
    POPS GF@result
    WRITE GF@result
    JUMP END_PROGRAM
    LABEL TYPE_MISMATCH
    EXIT int@53
    LABEL END_PROGRAM
    "###);
}

#[test]
fn test_case_insensitive() {
    let lower = text("dim count as integer\ncount = count + 1");
    let mixed = text("DIM Count AS Integer\nCOUNT = count + 1");
    assert_eq!(lower, mixed);
}

#[test]
fn test_repeated_compilations_agree() {
    let source = "
        dim i as integer
        do while i < 10
            if i == 5 then
                print(i)
            end if
            i += 1
        loop
    ";
    assert_eq!(text(source), text(source));
}

#[test]
fn test_lexical_error() {
    let err = error("dim s = !\"abc");
    assert_eq!(err.exit_code(), 1);
    let report = err.to_string();
    assert!(report.starts_with("quill(stdin:1). syntax error in "), "{}", report);
    assert!(report.ends_with(", unterminated string literal."), "{}", report);
}

#[test]
fn test_parse_error() {
    let options = CompileOptions::default().filename("main.q");
    let err = compile("if 1 < 2 x = 1\nend", &options).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    let report = err.to_string();
    assert!(report.starts_with("quill(main.q:"), "{}", report);
    assert!(report.contains(". parse error in if statement"), "{}", report);
    assert!(report.ends_with(", missing 'then'."), "{}", report);
}

#[test]
fn test_semantic_errors_are_collected() {
    match error("x = 1\ndim y as integer\ny = z") {
        CompileError::Semantic(errors) => {
            let lines: Vec<_> = errors.iter().map(|err| err.line).collect();
            assert_eq!(lines, vec![1, 3]);
        }
        err => panic!("unexpected error: {}", err),
    }
    assert_eq!(error("x = 1").exit_code(), 3);
}

#[test]
fn test_semantic_exit_codes() {
    assert_eq!(error("function f(a as integer)\nend\nf(1, 2)").exit_code(), 4);
    assert_eq!(error("dim x as whatever").exit_code(), 6);
    assert_eq!(error("dim a = 1 + !\"x\"").exit_code(), 53);
    assert_eq!(error("dim a = 1 / 0").exit_code(), 57);
}

#[test]
fn test_codegen_error() {
    let err = error("dim a = 7 % 2");
    assert_eq!(err.exit_code(), 99);
    assert_eq!(
        err,
        CompileError::Codegen(GenError::Unsupported {
            construct: "operator `%`".to_string(),
            line: 1,
        })
    );
}

#[test]
fn test_register_backend() {
    let options = CompileOptions::default()
        .backend(Backend::Register)
        .dump_chunk(true);

    let program = compile("dim a = 1\nwhile a < 10\na *= 2\nloop", &options).unwrap();
    let chunk = program.as_chunk().unwrap();
    assert_eq!(
        chunk.code.last().and_then(|instr| instr.op()),
        Some(OpCode::Halt)
    );

    // calls have no register rendering
    let err = compile("print(1)", &options).unwrap_err();
    assert_eq!(err.exit_code(), 99);
}

#[test]
fn test_dumps_do_not_change_output() {
    let source = "dim a as double = 1.5\na = a / 2";
    let options = CompileOptions::default().dump_tokens(true).dump_ast(true);
    let dumped = compile(source, &options).unwrap();
    assert_eq!(dumped.as_text().unwrap(), text(source));
}
