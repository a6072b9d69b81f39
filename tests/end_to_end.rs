mod common;

use minijava::compile::compile_source;
use minijava::compile::llvm::CodegenError;
use minijava::compile::semantic::SemanticError;
use minijava::infra::{ExitCode, MiniJavaError};

fn main_class(locals: &str, body: &str) -> String {
    format!("class Main {{ public static void main(String[] args) {{ {locals} {body} }} }}")
}

fn run(src: &str) -> Vec<i32> {
    let ir = compile_source(src).expect("program should compile");
    common::run(&ir)
}

#[test]
fn folded_sum_is_printed() {
    let src = main_class("int x;", "x = 2 + 3; System.out.println(x);");
    let ir = compile_source(&src).unwrap();

    assert!(ir.contains("store i32 5, i32* %x"));
    assert_eq!(common::run(&ir), vec![5]);
}

#[test]
fn short_circuit_truth_table() {
    for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
        let src = main_class(
            "boolean a; boolean b; boolean c;",
            &format!(
                "a = {a}; b = {b}; c = a && b; \
                 if (c) System.out.println(1); else System.out.println(0);"
            ),
        );
        let ir = compile_source(&src).unwrap();

        assert_eq!(ir.matches("phi i1").count(), 1);
        assert_eq!(common::run(&ir), vec![(a && b) as i32], "{a} && {b}");
    }
}

#[test]
fn right_operand_only_runs_when_left_is_true() {
    let program = |left: bool| {
        format!(
            "{} class Noisy {{ public boolean say(int v) {{ System.out.println(v); return true; }} }}",
            main_class(
                "boolean a; boolean c;",
                &format!(
                    "a = {left}; c = a && (new Noisy().say(7)); \
                     if (c) System.out.println(1); else System.out.println(0);"
                ),
            )
        )
    };

    assert_eq!(run(&program(true)), vec![7, 1]);
    assert_eq!(run(&program(false)), vec![0]);
}

#[test]
fn constant_condition_still_branches() {
    let src = main_class(
        "boolean b;",
        "b = true && false; if (b) System.out.println(1); else System.out.println(2);",
    );
    let ir = compile_source(&src).unwrap();

    assert!(!ir.contains("and.rhs"));
    assert_eq!(ir.matches("br i1").count(), 1);
    assert_eq!(common::run(&ir), vec![2]);
}

#[test]
fn negation_inside_and_outside_conditions() {
    let src = main_class(
        "int x; boolean b;",
        "x = 1; b = !(x < 2); \
         if (b) System.out.println(1); else System.out.println(0); \
         if (!(x < 0)) System.out.println(3); else System.out.println(4);",
    );

    assert_eq!(run(&src), vec![0, 3]);
}

#[test]
fn while_loop_sums() {
    let src = main_class(
        "int i; int sum;",
        "i = 1; sum = 0; while (i < 11) { sum = sum + i; i = i + 1; } System.out.println(sum);",
    );

    assert_eq!(run(&src), vec![55]);
}

#[test]
fn loop_with_compound_condition() {
    let src = main_class(
        "int i; boolean go;",
        "i = 0; go = true; while (go && (i < 3)) { System.out.println(i); i = i + 1; }",
    );

    assert_eq!(run(&src), vec![0, 1, 2]);
}

#[test]
fn recursive_factorial() {
    let src = r#"
        class Factorial {
            public static void main(String[] a) {
                System.out.println(new Fac().ComputeFac(10));
            }
        }

        class Fac {
            public int ComputeFac(int num) {
                int num_aux;
                if (num < 1)
                    num_aux = 1;
                else
                    num_aux = num * (this.ComputeFac(num - 1));
                return num_aux;
            }
        }
    "#;

    assert_eq!(run(src), vec![3628800]);
}

#[test]
fn int_arrays_keep_their_length_across_rebinding() {
    let src = main_class(
        "int[] xs; int[] ys; int i; int s;",
        "xs = new int[5]; i = 0; \
         while (i < (xs.length)) { xs[i] = i * i; i = i + 1; } \
         ys = xs; s = 0; i = 0; \
         while (i < (ys.length)) { s = s + (ys[i]); i = i + 1; } \
         System.out.println(s); System.out.println(ys.length);",
    );

    assert_eq!(run(&src), vec![30, 5]);
}

#[test]
fn dynamic_array_length() {
    let src = main_class(
        "int[] xs; int n;",
        "n = 3 * 4; xs = new int[n]; xs[11] = 9; System.out.println(xs.length); System.out.println(xs[11]);",
    );

    assert_eq!(run(&src), vec![12, 9]);
}

#[test]
fn array_lengths_survive_branches_and_loops() {
    let src = main_class(
        "int[] xs; int n; int m; int i;",
        "n = 2; m = 6; \
         if (n < m) xs = new int[n]; else xs = new int[m]; \
         System.out.println(xs.length); \
         if (m < n) xs = new int[n]; else xs = new int[m]; \
         System.out.println(xs.length); \
         xs = new int[1]; i = 0; \
         while (i < 3) { i = i + 1; xs = new int[i * 10]; } \
         System.out.println(xs.length);",
    );

    assert_eq!(run(&src), vec![2, 6, 30]);
}

#[test]
fn array_length_after_reassignment_from_a_call_is_refused() {
    let src = format!(
        "{} {}",
        main_class("", "System.out.println(new Maker().f());"),
        "class Maker { \
            public int[] make() { return new int[7]; } \
            public int f() { int[] xs; xs = new int[3]; xs = this.make(); return xs.length; } \
         }"
    );

    let err = compile_source(&src).unwrap_err();
    assert!(matches!(
        err,
        MiniJavaError::CodegenError(CodegenError::UntrackedArrayLength(_))
    ));
    assert_eq!(ExitCode::from(&err), ExitCode::FAIL_INTERNAL);
}

#[test]
fn boolean_arrays() {
    let src = main_class(
        "boolean[] flags;",
        "flags = new boolean[3]; flags[1] = true; \
         if (flags[1]) System.out.println(1); else System.out.println(0); \
         if (flags[0]) System.out.println(1); else System.out.println(0);",
    );

    assert_eq!(run(&src), vec![1, 0]);
}

#[test]
fn inherited_fields_and_methods() {
    let src = format!(
        "{} {}",
        main_class("", "System.out.println(new B().both(4));"),
        r#"
        class A {
            int x;
            public int set(int v) { x = v; return x; }
            public int get() { return x; }
        }
        class B extends A {
            int y;
            public int both(int v) { int r; r = this.set(v); y = v + 1; return (this.get()) + y; }
        }
        "#
    );

    assert_eq!(run(&src), vec![9]);
}

#[test]
fn overriding_method_is_called_on_subclass() {
    let src = format!(
        "{} {}",
        main_class("", "System.out.println(new B().id());"),
        r#"
        class A { public int id() { return 1; } }
        class B extends A { public int id() { return 2; } }
        "#
    );

    assert_eq!(run(&src), vec![2]);
}

#[test]
fn objects_in_fields_and_boolean_parameters() {
    let src = format!(
        "{} {}",
        main_class(
            "",
            "System.out.println((new List().init(1, new List().init(2, new List().init(3, new List(), true), false), false)).sum());"
        ),
        r#"
        class List {
            int value;
            List next;
            boolean last;

            public List init(int v, List n, boolean l) {
                value = v;
                next = n;
                last = l;
                return this;
            }

            public int sum() {
                int s;
                if (last) s = value; else s = value + (next.sum());
                return s;
            }
        }
        "#
    );

    assert_eq!(run(&src), vec![6]);
}

#[test]
fn boolean_return_values() {
    let src = format!(
        "{} {}",
        main_class(
            "",
            "if (new Flip().neg(false)) System.out.println(1); else System.out.println(0);"
        ),
        "class Flip { public boolean neg(boolean v) { return !v; } }"
    );

    assert_eq!(run(&src), vec![1]);
}

#[test]
fn wrong_allocation_is_a_semantic_failure() {
    let err = compile_source(&main_class("boolean b;", "b = new int[3];")).unwrap_err();

    assert!(matches!(
        err,
        MiniJavaError::SemanticError(SemanticError::WrongAllocation { .. })
    ));
    assert_eq!(ExitCode::from(&err), ExitCode::FAIL_SEMANTIC);
    assert!(err.to_string().starts_with("Semantic Error, wrong allocation"));
}

#[test]
fn duplicate_declarations_are_semantic_failures() {
    let err = compile_source(&format!(
        "{} class A {{ int x; int x; }}",
        main_class("", "")
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        MiniJavaError::SemanticError(SemanticError::DuplicateField { .. })
    ));

    let err = compile_source(&format!(
        "{} class A {{ public int f() {{ return 1; }} public int f() {{ return 2; }} }}",
        main_class("", "")
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        MiniJavaError::SemanticError(SemanticError::DuplicateMethod { .. })
    ));
}

#[test]
fn syntax_errors_fail_parsing() {
    let err = compile_source("class Main { public static void main(String[] a) { x = ; } }")
        .unwrap_err();

    assert!(matches!(err, MiniJavaError::ParsingError(_)));
    assert_eq!(ExitCode::from(&err), ExitCode::FAIL_PARSING);
    assert!(!err.diagnostics().is_empty());
}
