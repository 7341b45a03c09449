//! Diagnostics: exact rows and messages for rejected programs.

use kolak::{ArchInfo, CBuilder, COptions, CompilerError, ErrorKind};

fn build_err(src: &str) -> CompilerError {
    CBuilder::new(ArchInfo::example(), COptions::default())
        .build(src)
        .unwrap_err()
}

#[test]
fn bit_width_outside_struct() {
    let err = build_err(
        "
         int b:2+5, c:9, d;
        ",
    );
    assert_eq!(err.loc.row, 2);
    assert!(err.message.contains("Expected \";\""));
}

#[test]
fn wrong_tag_kind() {
    let err = build_err(
        "
        union S { int x;};
        int B = sizeof(struct S);
        ",
    );
    assert_eq!(err.loc.row, 3);
    assert!(err.message.contains("Wrong tag kind"));
}

#[test]
fn loose_case() {
    let err = build_err(
        "
        void main() {
          case 34: break;
        }
        ",
    );
    assert_eq!(err.loc.row, 3);
    assert!(err.message.contains("Case statement outside"));
}

#[test]
fn loose_default() {
    let err = build_err(
        "
        void main() {
          default: break;
        }
        ",
    );
    assert_eq!(err.loc.row, 3);
    assert!(err.message.contains("Default statement outside"));
}

#[test]
fn loose_break() {
    let err = build_err("void main() { ; break; }");
    assert!(err.message.contains("Break statement outside a loop or switch"));
}

#[test]
fn loose_continue() {
    let err = build_err("void main() { continue; }");
    assert!(err.message.contains("Continue statement outside a loop"));
}

#[test]
fn undeclared_identifier() {
    let err = build_err("int main() { return nope; }");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("Undeclared identifier 'nope'"));
}

#[test]
fn undefined_goto_label() {
    let err = build_err("void main() { goto skip; }");
    assert!(err.message.contains("Undefined label 'skip'"));
}

#[test]
fn duplicate_label() {
    let err = build_err("void main() { x: ; x: ; }");
    assert!(err.message.contains("Duplicate label 'x'"));
}

#[test]
fn redefinition_of_global() {
    let err = build_err("int a = 1;\nint a = 2;\n");
    assert!(err.message.contains("Redefinition of 'a'"));
}

#[test]
fn wrong_argument_count() {
    let err = build_err(
        "
        void add(int a, int b);
        void main() { add(1); }
        ",
    );
    assert!(err.message.contains("Expected 2 arguments, got 1"));
}

#[test]
fn call_of_non_function() {
    let err = build_err("int a;\nvoid main() { a(); }\n");
    assert!(err.message.contains("Called object is not a function"));
}

#[test]
fn assignment_needs_lvalue() {
    let err = build_err("void main() { 3 = 4; }");
    assert!(err.message.contains("Lvalue required"));
}

#[test]
fn deref_of_non_pointer() {
    let err = build_err("void main() { int a; *a; }");
    assert!(err.message.contains("Cannot dereference non-pointer type"));
}

#[test]
fn unknown_struct_field() {
    let err = build_err(
        "
        struct P { int x; };
        void main() { struct P p; p.y = 1; }
        ",
    );
    assert!(err.message.contains("Unknown field 'y'"));
}

#[test]
fn sizeof_incomplete_type() {
    let err = build_err("struct s;\nint n = sizeof(struct s);\n");
    assert!(err.message.contains("incomplete type"));
}

#[test]
fn unsupported_directive() {
    let err = build_err("#include <stdio.h>\n");
    assert_eq!(err.kind, ErrorKind::Lexical);
    assert!(err.message.contains("Unsupported directive"));
}

#[test]
fn unterminated_comment() {
    let err = build_err("int a; /* open");
    assert_eq!(err.kind, ErrorKind::Lexical);
    assert!(err.message.contains("Unterminated comment"));
}

#[test]
fn render_shows_caret_under_offender() {
    let src = "\n int b:2+5, c:9, d;\n";
    let err = build_err(src);
    let lines: Vec<&str> = src.lines().collect();
    let rendered = err.render(&lines);
    assert!(rendered.contains("Expected \";\" at 2:"));
    assert!(rendered.ends_with('^'));
}
