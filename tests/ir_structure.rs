//! Structural properties of produced modules.

use kolak::ir::{Inst, Terminator};
use kolak::{ArchInfo, CBuilder, COptions, IrModule, Verifier};

fn build(src: &str) -> IrModule {
    let module = CBuilder::new(ArchInfo::example(), COptions::default())
        .build(src)
        .unwrap();
    Verifier::verify(&module).unwrap();
    module
}

#[test]
fn builds_are_deterministic() {
    let src = "
        int counter;
        int bump(int by) {
          counter += by;
          return counter;
        }
        ";
    assert_eq!(build(src), build(src));
}

#[test]
fn every_block_is_terminated() {
    let module = build(
        "
        int f(int a) {
          if (a > 3) { return 1; } else { return 2; }
        }
        ",
    );
    for func in &module.functions {
        assert!(func.blocks.iter().any(|b| b.id == func.entry));
        for block in &func.blocks {
            assert!(block.terminator.is_some());
        }
    }
}

#[test]
fn falling_off_the_end_returns_zero() {
    let module = build("int f() { int a; a = 1; }");
    let last = module.functions[0]
        .blocks
        .iter()
        .find(|b| matches!(b.terminator, Some(Terminator::Return(Some(_)))));
    assert!(last.is_some());
}

#[test]
fn global_scalars_encode_little_endian() {
    let module = build(
        "
        int x = 0x11223344;
        short s = 0x0102;
        char c = 7;
        int* ptr = (int*)0x1000;
        ",
    );
    let by_name = |n: &str| module.globals.iter().find(|g| g.name == n).unwrap();
    assert_eq!(by_name("x").init, vec![0x44, 0x33, 0x22, 0x11]);
    assert_eq!(by_name("s").init, vec![0x02, 0x01]);
    assert_eq!(by_name("c").init, vec![7]);
    assert_eq!(by_name("ptr").init, vec![0x00, 0x10, 0x00, 0x00]);
    assert_eq!(by_name("x").align, 4);
}

#[test]
fn array_initializer_layout() {
    let module = build("int b[] = {1, 2};\nint A[][3] = {1,2,3,4,5,6,7,8,9};\n");
    let b = module.globals.iter().find(|g| g.name == "b").unwrap();
    assert_eq!(b.init.len(), 8);
    assert_eq!(&b.init[0..4], &[1, 0, 0, 0]);
    assert_eq!(&b.init[4..8], &[2, 0, 0, 0]);
    let a = module.globals.iter().find(|g| g.name == "A").unwrap();
    assert_eq!(a.init.len(), 36);
    assert_eq!(&a.init[32..36], &[9, 0, 0, 0]);
}

#[test]
fn string_array_global_keeps_nul() {
    let module = build(
        "
        void use(char*);
        void main() { static unsigned char msg[] = \"Hi\\n\"; use(msg); }
        ",
    );
    let msg = module.globals.iter().find(|g| g.name == "main.msg").unwrap();
    assert_eq!(msg.init, b"Hi\n\0".to_vec());
}

#[test]
fn declared_only_functions_become_externals() {
    let module = build(
        "
        void out(int);
        int helper(int v) { out(v); return v; }
        ",
    );
    assert_eq!(module.externals.len(), 1);
    assert_eq!(module.externals[0].name, "out");
    assert_eq!(module.functions.len(), 1);
}

#[test]
fn string_literals_are_interned_once() {
    let module = build(
        r#"
        void printf(char*);
        void main() { printf("same"); printf("same"); }
        "#,
    );
    assert_eq!(module.datas.len(), 1);
    assert_eq!(module.datas[0], b"same\0".to_vec());
}

#[test]
fn comparisons_branch_without_boolean_values() {
    let module = build("int f(int a) { if (a < 10) { return 1; } return 0; }");
    let has_cond = module.functions[0]
        .blocks
        .iter()
        .any(|b| matches!(b.terminator, Some(Terminator::CondJump { .. })));
    assert!(has_cond);
}

#[test]
fn parameters_spill_to_stack_slots() {
    let module = build("int id(int a) { return a; }");
    let entry = &module.functions[0].blocks[0];
    let allocs = entry
        .insts
        .iter()
        .filter(|i| matches!(i, Inst::Alloc { .. }))
        .count();
    let stores = entry
        .insts
        .iter()
        .filter(|i| matches!(i, Inst::Store { .. }))
        .count();
    assert_eq!(allocs, 1);
    assert!(stores >= 1);
}

#[test]
fn module_renders_as_text() {
    let module = build(
        r#"
        int total;
        void bump(int by) { total += by; }
        "#,
    );
    let text = module.to_string();
    assert!(text.contains("global @total align 4"));
    assert!(text.contains("function bump(i32)"));
    assert!(text.contains("return"));
}
